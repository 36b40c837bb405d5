//! Permission checks on the `scope` claim

use crate::jwt::Claims;

/// Whether `claims` grants `required`
///
/// The `scope` claim is split on whitespace and compared token by token, so
/// `read:messages` does not match `read:messages:all` or `xread:messages`.
/// A missing or non-string `scope` grants nothing.
pub fn has_permission(claims: &Claims, required: &str) -> bool {
    claims.scopes().contains(required)
}
