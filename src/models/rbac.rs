//! RBAC context and permission strings

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::error::AppError;

/// A three-segment `module:resource:action` permission string.
///
/// `*` is valid in any segment. Matching is segment-by-segment
/// equality-or-star; there is no substring or regex matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(String);

impl Permission {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn segments(&self) -> Option<[&str; 3]> {
        let mut parts = self.0.split(':');
        let a = parts.next()?;
        let b = parts.next()?;
        let c = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some([a, b, c])
    }

    /// Whether this (possibly wildcarded) granted permission covers `target`.
    ///
    /// Either side failing the three-segment shape never matches.
    pub fn grants(&self, target: &Permission) -> bool {
        match (self.segments(), target.segments()) {
            (Some(held), Some(wanted)) => held
                .iter()
                .zip(wanted.iter())
                .all(|(h, w)| h == w || *h == "*"),
            _ => false,
        }
    }
}

impl From<&str> for Permission {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Permission {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The resolved authorization context for one user.
///
/// Computed on demand by the RBAC resolver, cached with a short TTL, and the
/// sole input to every access decision and trusted-header envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RbacContext {
    pub user_id: Uuid,
    /// Effective profile name; `None` when no profile is assigned
    pub profile: Option<String>,
    pub permissions: HashSet<Permission>,
    pub is_active: bool,
}

impl RbacContext {
    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.permissions.contains(permission)
    }

    /// Permissions as a sorted list, for stable serialization
    pub fn permissions_sorted(&self) -> Vec<String> {
        let mut perms: Vec<String> = self
            .permissions
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();
        perms.sort();
        perms
    }
}

/// Hard denial from the RBAC resolver: the authenticated identity has no
/// usable business-user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RbacRejection {
    UserNotFound,
    UserDeactivated,
}

impl From<RbacRejection> for AppError {
    fn from(rejection: RbacRejection) -> Self {
        match rejection {
            RbacRejection::UserNotFound => AppError::UserNotFound,
            RbacRejection::UserDeactivated => AppError::UserDeactivated,
        }
    }
}
