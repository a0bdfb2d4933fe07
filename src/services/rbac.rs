//! RBAC resolver
//!
//! Computes the effective profile and deduplicated permission set for a
//! user, caching each outcome under a short TTL. Rejections (unknown or
//! deactivated users) are cached under the same TTL and never longer, so a
//! just-activated user is recognized within one TTL window, or instantly
//! after an explicit invalidation.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::db::user_repository::UserRepository;
use crate::db::DbPool;
use crate::models::{Permission, RbacContext, RbacRejection};
use crate::services::cache::{CacheStats, TtlCache};
use crate::utils::error::AppError;
use crate::utils::validation::validate_permission;

type CachedOutcome = Result<RbacContext, RbacRejection>;

/// Resolver for per-user RBAC contexts, with an in-memory TTL cache
#[derive(Clone)]
pub struct RbacResolver {
    db: DbPool,
    cache: Arc<TtlCache<Uuid, CachedOutcome>>,
}

impl RbacResolver {
    pub fn new(db: DbPool, config: &CacheConfig) -> Self {
        Self {
            db,
            cache: Arc::new(TtlCache::new(
                config.max_entries,
                Duration::from_secs(config.rbac_ttl_secs),
            )),
        }
    }

    /// Resolve the RBAC context for a user.
    ///
    /// Permissions are the union of the profile's permissions and every
    /// unexpired permission-set grant. A user without a profile resolves
    /// successfully with `profile: None`; only missing or deactivated users
    /// are rejected.
    pub async fn resolve(&self, user_id: Uuid) -> Result<RbacContext, AppError> {
        if let Some(outcome) = self.cache.get(&user_id).await {
            debug!(%user_id, "RBAC cache hit");
            return outcome.map_err(AppError::from);
        }

        debug!(%user_id, "RBAC cache miss");
        let outcome = self.compute(user_id).await?;
        self.cache.set(user_id, outcome.clone()).await;
        outcome.map_err(AppError::from)
    }

    async fn compute(&self, user_id: Uuid) -> Result<CachedOutcome, AppError> {
        let repo = UserRepository::new(&self.db);

        let user = repo
            .get_user(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let user = match user {
            Some(user) => user,
            None => return Ok(Err(RbacRejection::UserNotFound)),
        };
        if !user.is_active {
            return Ok(Err(RbacRejection::UserDeactivated));
        }

        let mut permissions: std::collections::HashSet<Permission> =
            std::collections::HashSet::new();
        // Stored policy must be plain three-segment strings; anything else
        // is skipped rather than given a chance to match at decision time.
        let mut add = |raw: String| {
            if validate_permission(&raw) {
                permissions.insert(Permission::from(raw));
            } else {
                warn!(permission = %raw, %user_id, "Skipping malformed stored permission");
            }
        };

        let profile = match user.profile_id.as_deref() {
            Some(profile_id) => {
                let profile = repo
                    .get_profile(profile_id)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                match profile {
                    Some(profile) => {
                        for permission in repo
                            .get_profile_permissions(profile_id)
                            .await
                            .map_err(|e| AppError::Database(e.to_string()))?
                        {
                            add(permission);
                        }
                        Some(profile.name)
                    }
                    None => {
                        // Dangling profile reference: treat as profile-less
                        warn!(%user_id, profile_id, "User references a missing profile");
                        None
                    }
                }
            }
            None => None,
        };

        for permission in repo
            .get_permission_set_permissions(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            add(permission);
        }

        Ok(Ok(RbacContext {
            user_id,
            profile,
            permissions,
            is_active: true,
        }))
    }

    /// Drop the cached outcome for a user.
    ///
    /// Called by every write path that changes what `resolve` would compute:
    /// logout, invite consumption, and the admin invalidation endpoint.
    pub async fn invalidate(&self, user_id: Uuid) {
        if self.cache.invalidate(&user_id).await {
            info!(%user_id, "RBAC cache invalidated");
        }
    }

    /// Drop every cached outcome
    pub async fn invalidate_all(&self) {
        self.cache.clear().await;
        info!("RBAC cache cleared");
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Spawn the periodic expired-entry eviction task
    pub fn spawn_eviction(&self, interval_secs: u64) -> JoinHandle<()> {
        let cache = self.cache.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            loop {
                interval.tick().await;
                cache.evict_expired().await;
            }
        })
    }
}
