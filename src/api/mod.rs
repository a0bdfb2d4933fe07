//! API route definitions
//!
//! Every route carries its full middleware stack explicitly, outermost
//! first: rate limit, then authentication, then the RBAC guard. The limiter
//! always runs before any auth or proxy work.

pub mod health;
pub mod invites;
pub mod proxy;
pub mod rbac;
pub mod session;

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    routing::{any, delete, get, post, MethodRouter},
    Router,
};

use crate::{
    config::WindowLimit,
    middleware::{
        auth_middleware, rate_limit_middleware, rbac::require, RateLimiter, RouteGuard, RouteLimit,
    },
    models::Identity,
    AppState,
};

/// Build the full application router
pub fn router(state: AppState) -> Router {
    let limiter = RateLimiter::new();
    limiter.spawn_sweeper(state.config.rate_limit.sweep_interval_secs);

    Router::new()
        .nest("/api/v1", api_routes(&state, &limiter))
        .with_state(state)
}

/// Apply a fixed-window rate limit to a route
fn limited(
    routes: MethodRouter<AppState>,
    limiter: &RateLimiter,
    label: &'static str,
    limit: WindowLimit,
) -> MethodRouter<AppState> {
    routes.layer(axum::middleware::from_fn_with_state(
        RouteLimit::new(limiter.clone(), label, limit),
        rate_limit_middleware,
    ))
}

/// Require a verified identity on a route
fn authed(routes: MethodRouter<AppState>, state: &AppState) -> MethodRouter<AppState> {
    routes.layer(axum::middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ))
}

/// Require a passing RBAC decision on a route
fn guarded(
    routes: MethodRouter<AppState>,
    state: &AppState,
    guard: RouteGuard,
) -> MethodRouter<AppState> {
    routes.layer(axum::middleware::from_fn_with_state(
        state.clone(),
        move |state: State<AppState>, request: Request, next: Next| {
            require(state, guard.clone(), request, next)
        },
    ))
}

/// The full pipeline for protected routes: rate limit, then auth, then the
/// RBAC guard
fn protected(
    routes: MethodRouter<AppState>,
    state: &AppState,
    limiter: &RateLimiter,
    label: &'static str,
    limit: WindowLimit,
    guard: RouteGuard,
) -> MethodRouter<AppState> {
    limited(
        authed(guarded(routes, state, guard), state),
        limiter,
        label,
        limit,
    )
}

fn api_routes(state: &AppState, limiter: &RateLimiter) -> Router<AppState> {
    let cfg = state.config.rate_limit.clone();

    let mut router = Router::new()
        // Infrastructure
        .route("/health", get(health::health))
        // Public, rate-limited: session introspection and invite validation
        .route(
            "/session",
            limited(get(session::session_check), limiter, "session", cfg.session),
        )
        .route(
            "/invites/validate",
            limited(
                post(invites::validate_invite),
                limiter,
                "invite_validate",
                cfg.invite_validate,
            ),
        )
        // Identity required, but no business-user record yet
        .route(
            "/invites/consume",
            limited(
                authed(post(invites::consume_invite), state),
                limiter,
                "invite_consume",
                cfg.invite_validate,
            ),
        )
        .route(
            "/auth/logout",
            limited(
                authed(post(session::logout), state),
                limiter,
                "logout",
                cfg.api,
            ),
        )
        // Invite administration
        .route(
            "/invites",
            protected(
                post(invites::create_invite),
                state,
                limiter,
                "invite_create",
                cfg.invite_create,
                RouteGuard::method_permission("admin:invites"),
            )
            .merge(protected(
                get(invites::list_invites),
                state,
                limiter,
                "invite_admin",
                cfg.api,
                RouteGuard::method_permission("admin:invites"),
            )),
        )
        .route(
            "/invites/{id}",
            protected(
                delete(invites::revoke_invite),
                state,
                limiter,
                "invite_admin",
                cfg.api,
                RouteGuard::method_permission("admin:invites"),
            ),
        )
        // RBAC administration
        .route(
            "/rbac/invalidate",
            protected(
                post(rbac::invalidate_user),
                state,
                limiter,
                "rbac_admin",
                cfg.api,
                RouteGuard::profiles(&["admin"]),
            ),
        )
        .route(
            "/rbac/cache/stats",
            protected(
                get(rbac::cache_stats),
                state,
                limiter,
                "rbac_admin",
                cfg.api,
                RouteGuard::profiles(&["admin"]),
            ),
        );

    // Proxy mounts: verify -> resolve -> allow -> forward, in that order
    for mount in proxy::MOUNTS {
        let handler = any(
            move |state: State<AppState>,
                  identity: Identity,
                  context: crate::middleware::RbacContextExt,
                  rest: Path<String>,
                  request: Request| async move {
                proxy::forward(state.0, mount, identity, context, rest, request).await
            },
        );
        router = router.route(
            &format!("{}/{{*path}}", mount.gateway_prefix),
            protected(
                handler,
                state,
                limiter,
                mount.gateway_prefix,
                cfg.api,
                RouteGuard::method_permission(mount.permission_base),
            ),
        );
    }

    router
}
