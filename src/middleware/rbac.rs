//! RBAC enforcement middleware
//!
//! The resolve-then-allow pipeline, run once per request: take the verified
//! identity, resolve its RBAC context (cache-aware), decide the route's
//! requirement, and hand handlers an already-validated context. Handlers
//! never re-fetch profiles or permissions themselves.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, Method, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};

use crate::{
    models::{Identity, RbacContext},
    services::access::{self, RouteRequirement},
    utils::error::ErrorResponse,
    utils::AppError,
    AppState,
};

/// Access requirement attached to a route
#[derive(Debug, Clone)]
pub enum RouteGuard {
    /// A fixed requirement, independent of the HTTP method
    Requirement(RouteRequirement),
    /// A `module:resource` permission base; the action segment is derived
    /// from the method (`GET`/`HEAD` read, everything else write)
    MethodPermission(String),
}

impl RouteGuard {
    pub fn profiles(names: &[&str]) -> Self {
        Self::Requirement(RouteRequirement::profiles(names))
    }

    pub fn permission(target: &str) -> Self {
        Self::Requirement(RouteRequirement::permission(target))
    }

    pub fn method_permission(base: &str) -> Self {
        Self::MethodPermission(base.to_string())
    }

    pub fn requirement_for(&self, method: &Method) -> RouteRequirement {
        match self {
            Self::Requirement(requirement) => requirement.clone(),
            Self::MethodPermission(base) => {
                let action = match *method {
                    Method::GET | Method::HEAD => "read",
                    _ => "write",
                };
                RouteRequirement::permission(&format!("{}:{}", base, action))
            }
        }
    }
}

/// Enforce a route guard: resolve the caller's RBAC context and decide.
///
/// On success the context lands in request extensions for the handler.
pub async fn require(
    State(state): State<AppState>,
    guard: RouteGuard,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .cloned()
        .ok_or_else(|| AppError::unauthenticated("Authentication required"))?;

    let context = state.rbac.resolve(identity.id).await?;
    let requirement = guard.requirement_for(request.method());
    access::decide(&context, &requirement)?;

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// Extension wrapper so handlers can take the resolved context as a
/// parameter after the guard has run
#[derive(Debug, Clone)]
pub struct RbacContextExt(pub RbacContext);

impl<S> FromRequestParts<S> for RbacContextExt
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RbacContext>()
            .cloned()
            .map(RbacContextExt)
            .ok_or_else(|| {
                (
                    StatusCode::FORBIDDEN,
                    Json(
                        ErrorResponse::new("forbidden", "Authorization context missing")
                            .with_code("FORBIDDEN"),
                    ),
                )
            })
    }
}
