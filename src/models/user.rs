//! Business-user and profile records

use serde::{Deserialize, Serialize};

/// A business-user row.
///
/// Existence here is distinct from existence at the identity provider: an
/// identity can authenticate and still have no user record in this system.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub profile_id: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A profile row (named permission bundle assigned to users)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}
