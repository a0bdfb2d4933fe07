//! Session introspection and logout
//!
//! The session check is deliberately public: it answers 200 with the
//! session's state (including denial codes and the `requiresLogout` hint)
//! instead of failing, so the console UI can probe without tripping its
//! error interceptors. Only a provider outage surfaces as an error.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    middleware::auth::verify_request_identity, models::Identity, utils::AppError, AppState,
};

/// Session check response
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(rename = "requiresLogout", skip_serializing_if = "std::ops::Not::not")]
    pub requires_logout: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl SessionResponse {
    fn anonymous(error: &AppError) -> Self {
        Self {
            authenticated: false,
            user: None,
            profile: None,
            permissions: None,
            code: Some(error.code().to_string()),
            requires_logout: error.requires_logout(),
        }
    }

    fn denied(identity: &Identity, error: &AppError) -> Self {
        Self {
            authenticated: true,
            user: Some(SessionUser {
                id: identity.id,
                email: identity.email.clone(),
                name: identity.name().to_string(),
            }),
            profile: None,
            permissions: None,
            code: Some(error.code().to_string()),
            requires_logout: error.requires_logout(),
        }
    }
}

/// GET /api/v1/session
pub async fn session_check(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<SessionResponse>, AppError> {
    let identity = match verify_request_identity(&state, request.headers()).await {
        Ok(identity) => identity,
        // Provider outage is the one failure worth surfacing as an error
        Err(e @ AppError::AuthServiceUnavailable(_)) => return Err(e),
        Err(e) => return Ok(Json(SessionResponse::anonymous(&e))),
    };

    match state.rbac.resolve(identity.id).await {
        Ok(context) => Ok(Json(SessionResponse {
            authenticated: true,
            user: Some(SessionUser {
                id: identity.id,
                email: identity.email.clone(),
                name: identity.name().to_string(),
            }),
            profile: context.profile.clone(),
            permissions: Some(context.permissions_sorted()),
            code: None,
            requires_logout: false,
        })),
        Err(e @ (AppError::UserNotFound | AppError::UserDeactivated)) => {
            Ok(Json(SessionResponse::denied(&identity, &e)))
        }
        Err(e) => Err(e),
    }
}

/// POST /api/v1/auth/logout
///
/// The identity provider owns the token's lifetime; what the gateway owns
/// is the cached RBAC context, which must not outlive the session.
pub async fn logout(State(state): State<AppState>, identity: Identity) -> StatusCode {
    state.rbac.invalidate(identity.id).await;
    StatusCode::NO_CONTENT
}
