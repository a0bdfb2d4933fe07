//! Repository for business users, profiles, and permission grants

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{Profile, User};

/// Repository for user and permission lookups
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a business-user row by identity-provider user id
    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(self.pool)
            .await
            .context("Failed to fetch user")
    }

    /// Get a profile row by primary key
    pub async fn get_profile(&self, profile_id: &str) -> Result<Option<Profile>> {
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = ?")
            .bind(profile_id)
            .fetch_optional(self.pool)
            .await
            .context("Failed to fetch profile")
    }

    /// Get a profile row by unique name
    pub async fn get_profile_by_name(&self, name: &str) -> Result<Option<Profile>> {
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool)
            .await
            .context("Failed to fetch profile by name")
    }

    /// Permissions granted directly by a profile
    pub async fn get_profile_permissions(&self, profile_id: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT permission FROM profile_permissions WHERE profile_id = ? ORDER BY permission",
        )
        .bind(profile_id)
        .fetch_all(self.pool)
        .await
        .context("Failed to fetch profile permissions")?;
        Ok(rows.into_iter().map(|(p,)| p).collect())
    }

    /// Permissions from every permission set the user is directly granted,
    /// skipping expired grants.
    pub async fn get_permission_set_permissions(&self, user_id: Uuid) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT psp.permission
            FROM user_permission_sets ups
            INNER JOIN permission_set_permissions psp ON psp.set_id = ups.set_id
            WHERE ups.user_id = ?
              AND (ups.expires_at IS NULL OR datetime(ups.expires_at) > datetime('now'))
            ORDER BY psp.permission
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(self.pool)
        .await
        .context("Failed to fetch permission-set permissions")?;
        Ok(rows.into_iter().map(|(p,)| p).collect())
    }

    /// Insert or update the business-user row during invite consumption.
    ///
    /// A fresh row is created active; an existing row keeps its active flag
    /// and gains the invite's profile and display name.
    pub async fn upsert_user(
        &self,
        user_id: Uuid,
        email: &str,
        display_name: &str,
        profile_id: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name, profile_id, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, 1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                display_name = excluded.display_name,
                profile_id = excluded.profile_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id.to_string())
        .bind(email)
        .bind(display_name)
        .bind(profile_id)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .context("Failed to upsert user")?;
        Ok(())
    }
}
