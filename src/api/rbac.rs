//! RBAC administration endpoints
//!
//! The invalidation endpoint is the hook for every external write path that
//! changes what the resolver would compute: profile changes, permission-set
//! grants and revocations, deactivations. The admin console calls it right
//! after such a write so the change takes effect without waiting out the TTL.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::{services::cache::CacheStats, utils::AppError, AppState};

/// Request body for cache invalidation
#[derive(Debug, Deserialize)]
pub struct InvalidateRequest {
    pub user_id: Uuid,
}

/// POST /api/v1/rbac/invalidate
pub async fn invalidate_user(
    State(state): State<AppState>,
    Json(payload): Json<InvalidateRequest>,
) -> Result<StatusCode, AppError> {
    state.rbac.invalidate(payload.user_id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/rbac/cache/stats
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.rbac.cache_stats().await)
}
