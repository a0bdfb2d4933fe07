//! Verified identity, as returned by the identity provider

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A verified end-user identity.
///
/// Sourced from the identity provider once per request and immutable for the
/// request's lifetime. The gateway never persists it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Identity {
    /// Display name, falling back to the email address
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}
