//! Invite token lifecycle
//!
//! Single-use, time-limited, profile-carrying tokens for onboarding users
//! outside self-service signup. Validation failures are deliberately
//! collapsed into one generic error so callers cannot probe which tokens
//! exist or why one stopped working.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::InviteConfig;
use crate::db::invite_repository::InviteRepository;
use crate::db::user_repository::UserRepository;
use crate::db::DbPool;
use crate::models::{
    CreateInviteResponse, InviteStatus, InviteToken, InviteTokenPublic, ValidateInviteResponse,
};
use crate::services::mailer::Mailer;
use crate::services::rbac::RbacResolver;
use crate::utils::error::AppError;
use crate::utils::validation::validate_profile_name;

/// Invite token lifecycle manager
#[derive(Clone)]
pub struct InviteService {
    db: DbPool,
    config: InviteConfig,
    mailer: Option<Arc<dyn Mailer>>,
    resolver: RbacResolver,
}

impl InviteService {
    pub fn new(
        db: DbPool,
        config: InviteConfig,
        mailer: Option<Arc<dyn Mailer>>,
        resolver: RbacResolver,
    ) -> Self {
        Self {
            db,
            config,
            mailer,
            resolver,
        }
    }

    /// Create a new invite.
    ///
    /// Rejects unknown profiles and emails that already have a pending
    /// unexpired token. A failed invite email never fails the creation; the
    /// response carries `email_sent: false` instead.
    pub async fn create(
        &self,
        email: &str,
        profile_name: &str,
        ttl_days: Option<u32>,
        created_by: Uuid,
    ) -> Result<CreateInviteResponse, AppError> {
        let email = email.trim().to_lowercase();

        if !validate_profile_name(profile_name) {
            return Err(AppError::bad_request(format!(
                "Invalid profile name: {}",
                profile_name
            )));
        }

        let users = UserRepository::new(&self.db);
        if users
            .get_profile_by_name(profile_name)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .is_none()
        {
            return Err(AppError::bad_request(format!(
                "Unknown profile: {}",
                profile_name
            )));
        }

        let ttl_days = ttl_days.unwrap_or(self.config.default_ttl_days);
        if !(self.config.min_ttl_days..=self.config.max_ttl_days).contains(&ttl_days) {
            return Err(AppError::ValidationError(format!(
                "ttl_days must be between {} and {}",
                self.config.min_ttl_days, self.config.max_ttl_days
            )));
        }

        let invites = InviteRepository::new(&self.db);
        if invites
            .find_pending_by_email(&email)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .is_some()
        {
            return Err(AppError::InviteConflict(format!(
                "A pending invitation already exists for {}",
                email
            )));
        }

        let now = Utc::now();
        let invite = InviteToken {
            id: Uuid::new_v4().to_string(),
            token: generate_token(),
            email: email.clone(),
            profile_name: profile_name.to_string(),
            created_by: created_by.to_string(),
            created_at: now.to_rfc3339(),
            expires_at: (now + Duration::days(i64::from(ttl_days))).to_rfc3339(),
            used_at: None,
            used_by_user_id: None,
            is_revoked: false,
        };

        invites
            .insert(&invite)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(invite_id = %invite.id, %email, profile_name, "Invite created");

        let email_sent = match &self.mailer {
            Some(mailer) => {
                let params = serde_json::json!({
                    "profile_name": invite.profile_name,
                    "token": invite.token,
                    "expires_at": invite.expires_at,
                });
                match mailer
                    .send(&email, "You're invited to the console", "invite", &params)
                    .await
                {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(invite_id = %invite.id, error = %e, "Invite email failed to send");
                        false
                    }
                }
            }
            None => false,
        };

        Ok(CreateInviteResponse {
            invite: InviteTokenPublic::from_token(&invite, now),
            token: invite.token,
            email_sent,
        })
    }

    /// Validate a token against an email, read-only.
    ///
    /// Every failure (unknown token, wrong email, expired, revoked, already
    /// used) returns the same generic error by design.
    pub async fn validate(
        &self,
        token: &str,
        email: &str,
    ) -> Result<ValidateInviteResponse, AppError> {
        let invite = self.lookup_pending(token, email).await?;
        Ok(ValidateInviteResponse {
            email: invite.email,
            profile_name: invite.profile_name,
            expires_at: invite.expires_at,
        })
    }

    /// Consume a token for a freshly authenticated user.
    ///
    /// Idempotent: re-consuming an already-used token for the same email
    /// succeeds without a second write. A successful consume upserts the
    /// business-user row with the invite's profile and invalidates any
    /// cached RBAC outcome for the user.
    pub async fn consume(
        &self,
        token: &str,
        email: &str,
        user_id: Uuid,
        name: &str,
    ) -> Result<String, AppError> {
        let email = email.trim().to_lowercase();
        let invites = InviteRepository::new(&self.db);

        let invite = invites
            .find_by_token(token)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or(AppError::InviteInvalid)?;

        if invite.email != email {
            return Err(AppError::InviteInvalid);
        }

        match invite.status(Utc::now()) {
            InviteStatus::Used => {
                // Already consumed for this email: report success, write nothing
                return Ok(invite.profile_name);
            }
            InviteStatus::Revoked | InviteStatus::Expired => {
                return Err(AppError::InviteInvalid);
            }
            InviteStatus::Pending => {}
        }

        let users = UserRepository::new(&self.db);
        let profile = users
            .get_profile_by_name(&invite.profile_name)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        if profile.is_none() {
            // The profile was deleted after the invite was issued. The user
            // is still onboarded, just profile-less.
            warn!(
                invite_id = %invite.id,
                profile_name = %invite.profile_name,
                "Invite profile no longer exists; consuming without a profile"
            );
        }

        users
            .upsert_user(user_id, &email, name, profile.as_ref().map(|p| p.id.as_str()))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // A concurrent consume may have won the race; that is still success.
        let first_writer = invites
            .mark_used(&invite.id, user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        if first_writer {
            info!(invite_id = %invite.id, %user_id, "Invite consumed");
        }

        self.resolver.invalidate(user_id).await;

        Ok(invite.profile_name)
    }

    /// Revoke a token by id. Revoking a used token is a no-op success.
    pub async fn revoke(&self, token_id: &str) -> Result<(), AppError> {
        let invites = InviteRepository::new(&self.db);
        let found = invites
            .revoke(token_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        if !found {
            return Err(AppError::not_found("Invite not found"));
        }
        info!(invite_id = %token_id, "Invite revoked");
        Ok(())
    }

    /// List invites, pending-only by default
    pub async fn list(&self, include_used: bool) -> Result<Vec<InviteTokenPublic>, AppError> {
        let invites = InviteRepository::new(&self.db);
        let now = Utc::now();
        let tokens = invites
            .list(include_used)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(tokens
            .iter()
            .map(|token| InviteTokenPublic::from_token(token, now))
            .collect())
    }

    async fn lookup_pending(&self, token: &str, email: &str) -> Result<InviteToken, AppError> {
        let email = email.trim().to_lowercase();
        let invites = InviteRepository::new(&self.db);

        let invite = invites
            .find_by_token(token)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or(AppError::InviteInvalid)?;

        if invite.email != email || invite.status(Utc::now()) != InviteStatus::Pending {
            return Err(AppError::InviteInvalid);
        }
        Ok(invite)
    }
}

/// Generate a URL-safe invite token with 32 bytes of entropy
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
