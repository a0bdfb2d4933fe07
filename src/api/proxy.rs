//! Proxy mounts to the studio service
//!
//! A static table maps gateway prefixes to studio paths and the permission
//! base each one requires. By the time the handler runs, the RBAC pipeline
//! has already allowed the route; all that remains is building the envelope
//! and relaying.

use axum::{
    extract::{Path, Request},
    response::Response,
};

use crate::{
    middleware::RbacContextExt,
    models::{Identity, TrustedEnvelope},
    utils::AppError,
    AppState,
};

/// One proxied mount point
#[derive(Debug, Clone, Copy)]
pub struct ProxyMount {
    /// Prefix under the gateway API, without the `/api/v1` nest
    pub gateway_prefix: &'static str,
    /// Prefix on the studio service
    pub studio_prefix: &'static str,
    /// `module:resource` permission base; action derives from the method
    pub permission_base: &'static str,
}

/// The static mount table. Route declarations and access requirements live
/// together so neither can drift from the other.
pub const MOUNTS: &[ProxyMount] = &[
    ProxyMount {
        gateway_prefix: "/studio/chat",
        studio_prefix: "/api/chat",
        permission_base: "chat:messages",
    },
    ProxyMount {
        gateway_prefix: "/studio/proposals",
        studio_prefix: "/api/proposals",
        permission_base: "sales:proposals",
    },
    ProxyMount {
        gateway_prefix: "/studio/mockups",
        studio_prefix: "/api/mockups",
        permission_base: "sales:mockups",
    },
];

/// Forward one request through a mount
pub async fn forward(
    state: AppState,
    mount: &ProxyMount,
    identity: Identity,
    context: RbacContextExt,
    rest: Path<String>,
    request: Request,
) -> Result<Response, AppError> {
    let envelope = TrustedEnvelope::new(&identity, &context.0);
    let target_path = format!("{}/{}", mount.studio_prefix, rest.0);

    let (parts, body) = request.into_parts();
    let query = parts.uri.query().map(|q| q.to_string());

    state
        .studio
        .forward(
            &envelope,
            parts.method,
            &target_path,
            query.as_deref(),
            &parts.headers,
            body,
        )
        .await
}
