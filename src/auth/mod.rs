//! Authentication and authorization
//!
//! Provides:
//! - JWT token generation and validation
//! - Password hashing with Argon2
//! - User roles and the authenticated [`Actor`] passed to services

pub mod jwt;
pub mod password;
pub mod permissions;

use bson::oid::ObjectId;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenValidationResult};
pub use password::{hash_password, verify_password};
pub use permissions::Role;

use crate::types::TrackerError;

/// The authenticated caller of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: ObjectId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: ObjectId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn from_claims(claims: &Claims) -> Result<Self, TrackerError> {
        let user_id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| TrackerError::Unauthorized("Malformed token subject".into()))?;
        Ok(Self::new(user_id, claims.role))
    }

    pub fn is_admin(&self) -> bool {
        self.role >= Role::Admin
    }

    /// Owner-or-admin check used by every mutating operation
    pub fn can_act_on(&self, owner_id: &ObjectId) -> bool {
        self.user_id == *owner_id || self.is_admin()
    }

    pub fn require_admin(&self) -> Result<(), TrackerError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(TrackerError::Forbidden("Admin permission required".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_or_admin() {
        let owner = ObjectId::new();
        let other = ObjectId::new();

        assert!(Actor::new(owner, Role::User).can_act_on(&owner));
        assert!(!Actor::new(other, Role::User).can_act_on(&owner));
        assert!(Actor::new(other, Role::Admin).can_act_on(&owner));
    }

    #[test]
    fn test_from_claims_rejects_bad_subject() {
        let claims = Claims {
            sub: "not-an-id".into(),
            role: Role::User,
            iat: 0,
            exp: 0,
        };
        assert!(matches!(
            Actor::from_claims(&claims),
            Err(TrackerError::Unauthorized(_))
        ));
    }
}
