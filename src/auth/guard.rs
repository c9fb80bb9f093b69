//! Authorization: role requirements and the ownership predicate.
//!
//! Requirements are declared per operation in the handler that implements
//! it. There is no metadata registry or route-table lookup: a handler that
//! needs the admin role either extracts [`RequireAdmin`] or calls
//! [`RoleRequirement::check`] itself.

use crate::{
    AppState,
    auth::identity::Identity,
    errors::{Error, Result},
    types::{ADMIN_ROLE, UserId},
};
use axum::{extract::FromRequestParts, http::request::Parts};

/// A role a caller must hold for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleRequirement {
    required: &'static str,
}

impl RoleRequirement {
    pub const ADMIN: RoleRequirement = RoleRequirement { required: ADMIN_ROLE };

    pub const fn new(required: &'static str) -> Self {
        Self { required }
    }

    /// Check the caller's role; role comparison is exact.
    pub fn check(&self, identity: &Identity) -> Result<()> {
        if identity.role == self.required {
            Ok(())
        } else {
            Err(Error::Forbidden {
                message: format!("Operation requires the '{}' role", self.required),
            })
        }
    }
}

/// The shared ownership predicate: a caller may act on a resource when they
/// own it or when they are an admin.
pub fn can_act(identity: &Identity, owner_id: UserId) -> bool {
    identity.id == owner_id || identity.is_admin()
}

/// [`can_act`] as a guard, producing the 403 handlers return on failure.
pub fn ensure_can_act(identity: &Identity, owner_id: UserId, resource: &str) -> Result<()> {
    if can_act(identity, owner_id) {
        Ok(())
    } else {
        Err(Error::Forbidden {
            message: format!("Not allowed to modify this {resource}"),
        })
    }
}

/// Fused authenticate-then-authorize extractor for admin-only operations.
///
/// Extraction fails with 401 when the caller has no valid session and 403
/// when the session resolves to a non-admin user.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Identity);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let identity = Identity::from_request_parts(parts, state).await?;
        RoleRequirement::ADMIN.check(&identity)?;
        Ok(RequireAdmin(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn identity(id: UserId, role: &str) -> Identity {
        Identity {
            id,
            name: format!("user-{id}"),
            email: format!("user-{id}@example.com"),
            role: role.to_string(),
            token: format!("token-{id}"),
        }
    }

    #[test]
    fn test_can_act_truth_table() {
        let owner = identity(1, "user");
        let admin = identity(2, ADMIN_ROLE);
        let stranger = identity(3, "user");

        // Owner acting on own resource
        assert!(can_act(&owner, 1));
        // Admin acting on someone else's resource
        assert!(can_act(&admin, 1));
        // Admin acting on own resource
        assert!(can_act(&admin, 2));
        // Stranger acting on someone else's resource
        assert!(!can_act(&stranger, 1));
    }

    #[test]
    fn test_ensure_can_act_forbidden_status() {
        let stranger = identity(3, "user");
        let err = ensure_can_act(&stranger, 1, "event").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_admin_role_requirement() {
        let admin = identity(1, ADMIN_ROLE);
        let user = identity(2, "user");

        assert!(RoleRequirement::ADMIN.check(&admin).is_ok());
        let err = RoleRequirement::ADMIN.check(&user).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_role_comparison_is_exact() {
        // Case and whitespace both matter
        assert!(RoleRequirement::ADMIN.check(&identity(1, "Admin")).is_err());
        assert!(RoleRequirement::ADMIN.check(&identity(1, "admin ")).is_err());
        assert!(RoleRequirement::new("moderator").check(&identity(1, "moderator")).is_ok());
    }
}
