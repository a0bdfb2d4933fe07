//! Trusted identity envelope
//!
//! The header set the gateway injects so the studio service can trust an
//! already-authenticated identity without re-validating the original token.
//! Header names are exact; the studio matches on them verbatim.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use crate::models::{Identity, RbacContext};
use crate::utils::error::AppError;

pub const PROXY_SECRET_HEADER: &str = "x-proxy-secret";
pub const USER_ID_HEADER: &str = "x-trusted-user-id";
pub const USER_EMAIL_HEADER: &str = "x-trusted-user-email";
pub const USER_NAME_HEADER: &str = "x-trusted-user-name";
pub const USER_PROFILE_HEADER: &str = "x-trusted-user-profile";
pub const USER_PERMISSIONS_HEADER: &str = "x-trusted-user-permissions";

/// Identity and RBAC context serialized for the studio service.
///
/// Constructed fresh per forwarded request from the current context; never
/// cached or reused across requests or users.
#[derive(Debug, Clone, Serialize)]
pub struct TrustedEnvelope {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub profile: String,
    pub permissions: Vec<String>,
}

impl TrustedEnvelope {
    pub fn new(identity: &Identity, context: &RbacContext) -> Self {
        Self {
            user_id: context.user_id.to_string(),
            email: identity.email.clone(),
            name: identity.name().to_string(),
            profile: context.profile.clone().unwrap_or_default(),
            permissions: context.permissions_sorted(),
        }
    }

    /// Serialize into the trusted header set, including the shared secret.
    ///
    /// Header values must be visible ASCII; anything else (e.g. a display
    /// name with control characters) is a hard serialization failure rather
    /// than a silently mangled identity.
    pub fn to_headers(&self, proxy_secret: &str) -> Result<HeaderMap, AppError> {
        let mut headers = HeaderMap::new();

        let mut put = |name: &'static str, value: &str| -> Result<(), AppError> {
            let value = HeaderValue::from_str(value).map_err(|_| {
                AppError::internal(format!("Trusted header {} is not serializable", name))
            })?;
            headers.insert(HeaderName::from_static(name), value);
            Ok(())
        };

        put(PROXY_SECRET_HEADER, proxy_secret)?;
        put(USER_ID_HEADER, &self.user_id)?;
        put(USER_EMAIL_HEADER, &self.email)?;
        put(USER_NAME_HEADER, &self.name)?;
        put(USER_PROFILE_HEADER, &self.profile)?;
        let permissions_json = serde_json::to_string(&self.permissions)
            .map_err(|e| AppError::internal(format!("Failed to encode permissions: {}", e)))?;
        put(USER_PERMISSIONS_HEADER, &permissions_json)?;

        Ok(headers)
    }
}
