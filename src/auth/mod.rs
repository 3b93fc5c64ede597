//! Verified caller claims.
//!
//! The engine never parses raw credentials; callers are authenticated by the
//! identity provider and arrive here as a JWT whose claims (subject, role,
//! university, faculty) are validated once at the middleware boundary.

mod jwt;
mod middleware;

pub use jwt::{Claims, JwtValidator};
pub use middleware::{auth_middleware, AuthContextExt, AuthMiddlewareState};

use thiserror::Error;
use uuid::Uuid;

use crate::domain::{FacultyId, UniversityId};

/// Authentication failures at the API boundary
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token expired")]
    TokenExpired,

    #[error("caller lacks the required role")]
    Forbidden,
}

/// Caller role carried in the token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Platform operator
    Admin,
    /// University registrar staff
    University,
    /// Record owner
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::University => "university",
            Role::Student => "student",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "university" => Some(Role::University),
            "student" => Some(Role::Student),
            _ => None,
        }
    }
}

/// Verified claims attached to each authenticated request
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Authenticated subject (student or staff account id)
    pub subject: Uuid,
    pub role: Role,
    pub university_id: Option<UniversityId>,
    pub faculty_id: Option<FacultyId>,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// University scope for registrar operations; admins must name one
    /// explicitly, so this is the caller's own university only.
    pub fn university(&self) -> Result<UniversityId, AuthError> {
        self.university_id.ok_or(AuthError::Forbidden)
    }

    /// Require registrar (or admin) privileges
    pub fn require_registrar(&self) -> Result<(), AuthError> {
        match self.role {
            Role::Admin | Role::University => Ok(()),
            Role::Student => Err(AuthError::Forbidden),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_round_trip() {
        for role in [Role::Admin, Role::University, Role::Student] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("lecturer"), None);
    }

    #[test]
    fn students_are_not_registrars() {
        let context = AuthContext {
            subject: Uuid::new_v4(),
            role: Role::Student,
            university_id: None,
            faculty_id: None,
        };
        assert!(context.require_registrar().is_err());
        assert!(context.university().is_err());
    }
}
