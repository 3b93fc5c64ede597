//! JWT validation for caller claims.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuthContext, AuthError, Role};
use crate::domain::{FacultyId, UniversityId};

/// JWT claims carried by authenticated callers
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account id)
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Caller role: admin, university or student
    pub role: String,

    /// University the caller belongs to
    #[serde(default)]
    pub university: Option<String>,

    /// Faculty the caller belongs to
    #[serde(default)]
    pub faculty: Option<String>,
}

/// JWT validator and issuer
pub struct JwtValidator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
}

impl JwtValidator {
    pub fn new(secret: &[u8], issuer: &str, audience: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
        }
    }

    /// Issue a token (admin tooling and tests; production tokens come from
    /// the identity provider)
    pub fn issue(
        &self,
        subject: Uuid,
        role: Role,
        university_id: Option<UniversityId>,
        faculty_id: Option<FacultyId>,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            role: role.as_str().to_string(),
            university: university_id.map(|id| id.to_string()),
            faculty: faculty_id.map(|id| id.to_string()),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    /// Validate a token and extract the caller context
    pub fn validate(&self, token: &str) -> Result<AuthContext, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        let claims = data.claims;
        let subject = Uuid::parse_str(&claims.sub)
            .map_err(|_| AuthError::InvalidToken("malformed subject".to_string()))?;
        let role = Role::parse(&claims.role)
            .ok_or_else(|| AuthError::InvalidToken(format!("unknown role {:?}", claims.role)))?;

        let university_id = claims
            .university
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|_| AuthError::InvalidToken("malformed university id".to_string()))?
            .map(UniversityId::from_uuid);
        let faculty_id = claims
            .faculty
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|_| AuthError::InvalidToken("malformed faculty id".to_string()))?
            .map(FacultyId::from_uuid);

        Ok(AuthContext {
            subject,
            role,
            university_id,
            faculty_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> JwtValidator {
        JwtValidator::new(b"test-secret", "credentis", "credentis-api")
    }

    #[test]
    fn issued_tokens_validate_back_to_the_same_context() {
        let validator = validator();
        let subject = Uuid::new_v4();
        let university = UniversityId::new();

        let token = validator
            .issue(
                subject,
                Role::University,
                Some(university),
                None,
                Duration::minutes(10),
            )
            .unwrap();

        let context = validator.validate(&token).unwrap();
        assert_eq!(context.subject, subject);
        assert_eq!(context.role, Role::University);
        assert_eq!(context.university_id, Some(university));
        assert_eq!(context.faculty_id, None);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let validator = validator();
        let token = validator
            .issue(Uuid::new_v4(), Role::Student, None, None, Duration::minutes(-10))
            .unwrap();

        assert!(matches!(
            validator.validate(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let issuing = JwtValidator::new(b"test-secret", "someone-else", "credentis-api");
        let token = issuing
            .issue(Uuid::new_v4(), Role::Student, None, None, Duration::minutes(10))
            .unwrap();

        assert!(matches!(
            validator().validate(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let validator = validator();
        let token = validator
            .issue(Uuid::new_v4(), Role::Student, None, None, Duration::minutes(10))
            .unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        assert!(validator.validate(&tampered).is_err());
    }
}
