//! Input validation utilities

use once_cell::sync::Lazy;
use regex::Regex;

/// Regex for validating profile names
static PROFILE_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").unwrap());

/// Regex for a single permission segment: a literal identifier or `*`
static SEGMENT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\*|[a-z][a-z0-9_-]*)$").unwrap());

/// Validate a profile name (e.g. `admin`, `sales_user`)
pub fn validate_profile_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= 64 && PROFILE_NAME_REGEX.is_match(name)
}

/// Validate a permission string: exactly three `module:resource:action`
/// segments, each an identifier or `*`. Wildcards are segment-level only;
/// stored policy never carries anything beyond this shape.
pub fn validate_permission(permission: &str) -> bool {
    if permission.is_empty() || permission.len() > 128 {
        return false;
    }
    let segments: Vec<&str> = permission.split(':').collect();
    segments.len() == 3 && segments.iter().all(|s| SEGMENT_REGEX.is_match(s))
}
