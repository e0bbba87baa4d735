// Session token service with HS256 algorithm

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

use crate::middleware::auth::{AuthenticatedUser, Role};
use crate::models::User;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token encoding error: {0}")]
    EncodingError(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            ErrorKind::InvalidToken | ErrorKind::InvalidSignature => JwtError::InvalidToken,
            _ => JwtError::EncodingError(err.to_string()),
        }
    }
}

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub iss: String,
    pub iat: u64,
    pub exp: u64,
}

/// Issues and validates session tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_secs: u64,
    issuer: String,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("encoding_key", &"<redacted>")
            .field("decoding_key", &"<redacted>")
            .field("expiry_secs", &self.expiry_secs)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl JwtService {
    pub fn new(secret: &str, expiry_secs: u64, issuer: &str) -> Self {
        JwtService {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_secs,
            issuer: issuer.to_string(),
        }
    }

    /// Build from centralized app configuration
    pub fn from_config() -> Self {
        let config = crate::app_config::config();
        Self::new(&config.jwt_secret, config.jwt_expiry, &config.jwt_issuer)
    }

    fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Issue a session token for a freshly authenticated user
    pub fn issue_token(&self, user: &User) -> Result<String, JwtError> {
        let now = Self::now_secs();
        let claims = SessionClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.clone(),
            iss: self.issuer.clone(),
            iat: now,
            exp: now + self.expiry_secs,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(JwtError::from)
    }

    /// Validate a session token and produce the request identity
    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);

        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation)?;
        let claims = data.claims;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| JwtError::InvalidToken)?;
        let role = Role::from_str(&claims.role).map_err(|_| JwtError::InvalidToken)?;

        Ok(AuthenticatedUser {
            user_id,
            email: claims.email,
            role,
            exp: claims.exp,
        })
    }

    pub fn expiry_secs(&self) -> u64 {
        self.expiry_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_service() -> JwtService {
        JwtService::new(
            "test-secret-at-least-32-bytes-long!!",
            3600,
            "encore.test",
        )
    }

    fn test_user(role: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "hash".to_string(),
            role: role.to_string(),
            avatar: None,
            daily_gen_count: 0,
            last_gen_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_issue_and_validate_round_trip() {
        let service = test_service();
        let user = test_user("user");

        let token = service.issue_token(&user).unwrap();
        let auth = service.validate_token(&token).unwrap();

        assert_eq!(auth.user_id, user.id);
        assert_eq!(auth.email, user.email);
        assert_eq!(auth.role, Role::User);
        assert!(auth.exp > JwtService::now_secs());
    }

    #[test]
    fn test_admin_role_survives_round_trip() {
        let service = test_service();
        let token = service.issue_token(&test_user("admin")).unwrap();
        let auth = service.validate_token(&token).unwrap();
        assert_eq!(auth.role, Role::Admin);
        assert!(auth.is_admin());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let service = test_service();
        assert!(matches!(
            service.validate_token("not.a.token"),
            Err(JwtError::InvalidToken) | Err(JwtError::EncodingError(_))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuing = test_service();
        let validating = JwtService::new(
            "another-secret-also-32-bytes-long!!!",
            3600,
            "encore.test",
        );

        let token = issuing.issue_token(&test_user("user")).unwrap();
        assert!(validating.validate_token(&token).is_err());
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let issuing = JwtService::new(
            "test-secret-at-least-32-bytes-long!!",
            3600,
            "someone-else",
        );
        let validating = test_service();

        let token = issuing.issue_token(&test_user("user")).unwrap();
        assert!(validating.validate_token(&token).is_err());
    }
}
