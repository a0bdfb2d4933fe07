//! Access decision engine
//!
//! Pure, synchronous allow/deny decisions over an already-resolved RBAC
//! context. No I/O happens here; the resolver supplies the context and the
//! route declares the requirement.

use crate::models::{Permission, RbacContext};
use crate::utils::error::AppError;

/// Super-admin escape hatch: holding this grants everything
const SUPER_ADMIN: &str = "*:*:*";

/// Requirement a route declares for access
#[derive(Debug, Clone)]
pub enum RouteRequirement {
    /// Caller's profile must be one of these names. No wildcards.
    Profiles(Vec<String>),
    /// Caller must hold a permission covering this target.
    Permission(Permission),
}

impl RouteRequirement {
    pub fn profiles(names: &[&str]) -> Self {
        Self::Profiles(names.iter().map(|n| n.to_string()).collect())
    }

    pub fn permission(target: &str) -> Self {
        Self::Permission(Permission::from(target))
    }
}

/// Whether the context holds a permission covering `target`: exact match,
/// the super-admin wildcard, or a segment-wise wildcard grant.
pub fn allows_permission(context: &RbacContext, target: &Permission) -> bool {
    if context.has_permission(target) {
        return true;
    }
    let super_admin = Permission::from(SUPER_ADMIN);
    if context.has_permission(&super_admin) {
        return true;
    }
    context.permissions.iter().any(|held| held.grants(target))
}

/// Decide a route requirement against a resolved context.
///
/// Profile requirements distinguish "no profile at all" from "wrong
/// profile" so the UI can route users to onboarding instead of a dead end.
pub fn decide(context: &RbacContext, requirement: &RouteRequirement) -> Result<(), AppError> {
    match requirement {
        RouteRequirement::Profiles(allowed) => match context.profile.as_deref() {
            None => Err(AppError::NoProfileAssigned),
            Some(profile) if allowed.iter().any(|a| a == profile) => Ok(()),
            Some(profile) => Err(AppError::forbidden(format!(
                "profile '{}' is not allowed on this route",
                profile
            ))),
        },
        RouteRequirement::Permission(target) => {
            if allows_permission(context, target) {
                Ok(())
            } else {
                Err(AppError::forbidden(format!(
                    "missing permission {}",
                    target
                )))
            }
        }
    }
}
