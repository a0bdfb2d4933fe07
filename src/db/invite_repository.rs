//! Repository for invite tokens

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::InviteToken;

/// Repository for invite token storage
pub struct InviteRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> InviteRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, invite: &InviteToken) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO invite_tokens (
                id, token, email, profile_name, created_by,
                created_at, expires_at, used_at, used_by_user_id, is_revoked
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&invite.id)
        .bind(&invite.token)
        .bind(&invite.email)
        .bind(&invite.profile_name)
        .bind(&invite.created_by)
        .bind(&invite.created_at)
        .bind(&invite.expires_at)
        .bind(&invite.used_at)
        .bind(&invite.used_by_user_id)
        .bind(invite.is_revoked)
        .execute(self.pool)
        .await
        .context("Failed to insert invite token")?;
        Ok(())
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<InviteToken>> {
        sqlx::query_as::<_, InviteToken>("SELECT * FROM invite_tokens WHERE token = ?")
            .bind(token)
            .fetch_optional(self.pool)
            .await
            .context("Failed to fetch invite token")
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<InviteToken>> {
        sqlx::query_as::<_, InviteToken>("SELECT * FROM invite_tokens WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .context("Failed to fetch invite token by id")
    }

    /// Find a token for the email that is unused, unrevoked, and unexpired.
    /// At most one such token may exist at any time.
    pub async fn find_pending_by_email(&self, email: &str) -> Result<Option<InviteToken>> {
        sqlx::query_as::<_, InviteToken>(
            r#"
            SELECT * FROM invite_tokens
            WHERE email = ?
              AND used_at IS NULL
              AND is_revoked = 0
              AND datetime(expires_at) > datetime('now')
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await
        .context("Failed to fetch pending invite")
    }

    /// Stamp a token as consumed. Returns false when the token was already
    /// used, so callers can keep consumption single-writer.
    pub async fn mark_used(&self, id: &str, used_by_user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE invite_tokens
            SET used_at = ?, used_by_user_id = ?
            WHERE id = ? AND used_at IS NULL
            "#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(used_by_user_id.to_string())
        .bind(id)
        .execute(self.pool)
        .await
        .context("Failed to mark invite as used")?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the revoked flag unconditionally. Revoking an already-used or
    /// already-revoked token succeeds without complaint.
    pub async fn revoke(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE invite_tokens SET is_revoked = 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .context("Failed to revoke invite token")?;
        Ok(result.rows_affected() > 0)
    }

    /// List invites, pending-only unless `include_used` is set
    pub async fn list(&self, include_used: bool) -> Result<Vec<InviteToken>> {
        let query = if include_used {
            sqlx::query_as::<_, InviteToken>(
                "SELECT * FROM invite_tokens ORDER BY created_at DESC",
            )
        } else {
            sqlx::query_as::<_, InviteToken>(
                r#"
                SELECT * FROM invite_tokens
                WHERE used_at IS NULL
                  AND is_revoked = 0
                  AND datetime(expires_at) > datetime('now')
                ORDER BY created_at DESC
                "#,
            )
        };
        query
            .fetch_all(self.pool)
            .await
            .context("Failed to list invite tokens")
    }
}
