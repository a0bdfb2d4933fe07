//! HTTP middleware

pub mod auth;
pub mod rate_limit;
pub mod rbac;

pub use auth::auth_middleware;
pub use rate_limit::{rate_limit_middleware, RateLimiter, RouteLimit};
pub use rbac::{require, RbacContextExt, RouteGuard};
