//! Invite API endpoints
//!
//! Creation, listing, and revocation are admin routes behind the RBAC
//! pipeline. Validation is public (pre-signup users have no token yet);
//! consumption requires a verified identity but no business-user record.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    middleware::RbacContextExt,
    models::{
        invite::ConsumeInviteResponse, ConsumeInviteRequest, CreateInviteRequest,
        CreateInviteResponse, Identity, InviteTokenPublic, ValidateInviteRequest,
        ValidateInviteResponse,
    },
    utils::AppError,
    AppState,
};

/// Query parameters for invite listing
#[derive(Debug, Deserialize, Default)]
pub struct ListInvitesParams {
    #[serde(default)]
    pub include_used: bool,
}

/// POST /api/v1/invites
pub async fn create_invite(
    State(state): State<AppState>,
    RbacContextExt(context): RbacContextExt,
    Json(payload): Json<CreateInviteRequest>,
) -> Result<(StatusCode, Json<CreateInviteResponse>), AppError> {
    payload.validate()?;

    let response = state
        .invites
        .create(
            &payload.email,
            &payload.profile_name,
            payload.ttl_days,
            context.user_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/invites
pub async fn list_invites(
    State(state): State<AppState>,
    Query(params): Query<ListInvitesParams>,
) -> Result<Json<Vec<InviteTokenPublic>>, AppError> {
    let invites = state.invites.list(params.include_used).await?;
    Ok(Json(invites))
}

/// DELETE /api/v1/invites/{id}
pub async fn revoke_invite(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.invites.revoke(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/invites/validate
pub async fn validate_invite(
    State(state): State<AppState>,
    Json(payload): Json<ValidateInviteRequest>,
) -> Result<Json<ValidateInviteResponse>, AppError> {
    payload.validate().map_err(|_| AppError::InviteInvalid)?;
    let response = state.invites.validate(&payload.token, &payload.email).await?;
    Ok(Json(response))
}

/// POST /api/v1/invites/consume
pub async fn consume_invite(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<ConsumeInviteRequest>,
) -> Result<Json<ConsumeInviteResponse>, AppError> {
    payload.validate().map_err(|_| AppError::InviteInvalid)?;

    let profile_name = state
        .invites
        .consume(&payload.token, &payload.email, identity.id, &payload.name)
        .await?;

    Ok(Json(ConsumeInviteResponse {
        user_id: identity.id,
        profile_name,
    }))
}
