//! Authentication middleware
//!
//! Extracts the bearer token, rejects the obviously malformed ones locally,
//! and verifies the rest against the identity provider. On success the
//! verified [`Identity`] is injected into request extensions; everything
//! downstream consumes that, never the raw token.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};

use crate::{models::Identity, utils::error::ErrorResponse, utils::AppError, AppState};

/// Extract bearer token from an Authorization header value
fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
}

/// Cheap local shape check before spending a provider round-trip.
///
/// The provider is the authority on validity; this only rejects strings that
/// are not even JWTs (wrong segment count, undecodable header).
fn is_well_formed_jwt(token: &str) -> bool {
    !token.is_empty() && jsonwebtoken::decode_header(token).is_ok()
}

/// Resolve the request's bearer token to a verified identity, or fail with
/// the matching taxonomy error. Shared by the enforcing middleware and the
/// public session-check handler.
pub async fn verify_request_identity(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Identity, AppError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::unauthenticated("Missing authentication token"))?;

    let token = extract_bearer_token(auth_header)
        .ok_or_else(|| AppError::unauthenticated("Malformed Authorization header"))?;

    if !is_well_formed_jwt(token) {
        return Err(AppError::unauthenticated("Malformed bearer token"));
    }

    state.identity.verify(token).await
}

/// Authentication middleware
///
/// Verification failures are terminal for the request; no retries. A
/// provider outage surfaces as 503, distinct from an invalid token, so
/// clients do not clear their session over a blip.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = verify_request_identity(&state, request.headers()).await?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Extractor for the verified identity from request extensions
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Identity>().cloned().ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(
                    ErrorResponse::new("unauthorized", "Authentication required")
                        .with_code("UNAUTHENTICATED"),
                ),
            )
        })
    }
}
