//! Invite token records and API payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// An invite token row.
///
/// `PENDING -> USED` and `PENDING -> REVOKED` are terminal transitions;
/// `EXPIRED` is derived from `expires_at` at read time, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InviteToken {
    pub id: String,
    pub token: String,
    pub email: String,
    pub profile_name: String,
    pub created_by: String,
    pub created_at: String,
    pub expires_at: String,
    pub used_at: Option<String>,
    pub used_by_user_id: Option<String>,
    pub is_revoked: bool,
}

/// Derived lifecycle state of an invite token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Used,
    Revoked,
    Expired,
}

impl InviteToken {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.expires_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expires_at) => now >= expires_at,
            // An unparseable expiry is treated as expired, not as eternal
            None => true,
        }
    }

    /// Derived status; revocation and use take precedence over expiry
    pub fn status(&self, now: DateTime<Utc>) -> InviteStatus {
        if self.is_revoked {
            InviteStatus::Revoked
        } else if self.used_at.is_some() {
            InviteStatus::Used
        } else if self.is_expired(now) {
            InviteStatus::Expired
        } else {
            InviteStatus::Pending
        }
    }
}

/// Redacted invite view for listings; never exposes the token value
#[derive(Debug, Clone, Serialize)]
pub struct InviteTokenPublic {
    pub id: String,
    pub email: String,
    pub profile_name: String,
    pub created_by: String,
    pub created_at: String,
    pub expires_at: String,
    pub status: InviteStatus,
}

impl InviteTokenPublic {
    pub fn from_token(token: &InviteToken, now: DateTime<Utc>) -> Self {
        Self {
            id: token.id.clone(),
            email: token.email.clone(),
            profile_name: token.profile_name.clone(),
            created_by: token.created_by.clone(),
            created_at: token.created_at.clone(),
            expires_at: token.expires_at.clone(),
            status: token.status(now),
        }
    }
}

/// Request body for invite creation
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInviteRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 64))]
    pub profile_name: String,
    /// Days until expiry; defaults to the configured TTL when omitted
    pub ttl_days: Option<u32>,
}

/// Response body for invite creation
#[derive(Debug, Serialize)]
pub struct CreateInviteResponse {
    pub invite: InviteTokenPublic,
    /// The one-time token value, shown only at creation
    pub token: String,
    /// Whether the invite email was sent; false is a soft warning, not an error
    pub email_sent: bool,
}

/// Request body for invite validation
#[derive(Debug, Deserialize, Validate)]
pub struct ValidateInviteRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(email)]
    pub email: String,
}

/// Response body for a successful invite validation
#[derive(Debug, Serialize)]
pub struct ValidateInviteResponse {
    pub email: String,
    pub profile_name: String,
    pub expires_at: String,
}

/// Request body for invite consumption
#[derive(Debug, Deserialize, Validate)]
pub struct ConsumeInviteRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub name: String,
}

/// Response body for invite consumption
#[derive(Debug, Serialize)]
pub struct ConsumeInviteResponse {
    pub user_id: Uuid,
    pub profile_name: String,
}
