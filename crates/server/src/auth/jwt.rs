//! HS256 access tokens issued on register and login.

use std::collections::HashSet;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::db::users::{User, UserRole};

pub const ACCESS_TOKEN_TTL_HOURS: i64 = 24;
const ACCESS_AUDIENCE: &str = "access";

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("invalid token")]
    InvalidToken,
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccessTokenClaims {
    sub: Uuid,
    family_id: Uuid,
    role: UserRole,
    iat: i64,
    exp: i64,
    aud: String,
}

/// What a verified access token says about its bearer.
#[derive(Debug, Clone)]
pub struct AccessIdentity {
    pub user_id: Uuid,
    pub family_id: Uuid,
    pub role: UserRole,
    pub expires_at: DateTime<Utc>,
}

pub struct JwtService {
    secret: SecretString,
}

impl JwtService {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    pub fn encode_access_token(&self, user: &User) -> Result<(String, DateTime<Utc>), JwtError> {
        let now = Utc::now();
        let expires_at = now + ChronoDuration::hours(ACCESS_TOKEN_TTL_HOURS);

        let claims = AccessTokenClaims {
            sub: user.id,
            family_id: user.family_id,
            role: user.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            aud: ACCESS_AUDIENCE.to_string(),
        };

        let key = EncodingKey::from_secret(self.secret.expose_secret().as_bytes());
        let token = encode(&Header::new(Algorithm::HS256), &claims, &key)?;
        Ok((token, expires_at))
    }

    pub fn decode_access_token(&self, token: &str) -> Result<AccessIdentity, JwtError> {
        if token.trim().is_empty() {
            return Err(JwtError::InvalidToken);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_audience(&[ACCESS_AUDIENCE]);
        validation.required_spec_claims = HashSet::from([
            "sub".to_string(),
            "exp".to_string(),
            "aud".to_string(),
        ]);
        validation.leeway = 30;

        let key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());
        let claims = decode::<AccessTokenClaims>(token, &key, &validation)?.claims;

        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(JwtError::InvalidToken)?;

        Ok(AccessIdentity {
            user_id: claims.sub,
            family_id: claims.family_id,
            role: claims.role,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            family_id: Uuid::new_v4(),
            email: "sam@example.com".to_string(),
            display_name: "Sam".to_string(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_encode_and_decode() {
        let service = JwtService::new(SecretString::from("test-secret"));
        let user = user(UserRole::Admin);
        let (token, expires_at) = service.encode_access_token(&user).unwrap();

        let identity = service.decode_access_token(&token).unwrap();
        assert_eq!(identity.user_id, user.id);
        assert_eq!(identity.family_id, user.family_id);
        assert_eq!(identity.role, UserRole::Admin);
        assert_eq!(identity.expires_at.timestamp(), expires_at.timestamp());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtService::new(SecretString::from("one"));
        let verifier = JwtService::new(SecretString::from("two"));
        let (token, _) = issuer.encode_access_token(&user(UserRole::Parent)).unwrap();
        assert!(matches!(
            verifier.decode_access_token(&token),
            Err(JwtError::Jwt(_))
        ));
    }

    #[test]
    fn test_empty_token_rejected() {
        let service = JwtService::new(SecretString::from("test-secret"));
        assert!(matches!(
            service.decode_access_token("  "),
            Err(JwtError::InvalidToken)
        ));
    }
}
