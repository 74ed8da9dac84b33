//! Bearer token authentication for write endpoints
//!
//! Tokens are HS256 JWTs issued by the identity provider:
//!
//! ```text
//! { "sub": "alice", "role": "scorer", "exp": 1767225600 }
//! ```
//!
//! `role == "admin"` grants the administrator capability. Reads never
//! require a token.

use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::scoring::Actor;

pub const ADMIN_ROLE: &str = "admin";

/// JWT claims carried by scorer and administrator tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Actor id; matched against a match's assigned scorer
    pub sub: String,
    #[serde(default)]
    pub role: Option<String>,
    /// Expiration (Unix timestamp, seconds)
    pub exp: i64,
}

impl Claims {
    pub fn new(sub: impl Into<String>, role: Option<&str>, ttl_seconds: i64) -> Self {
        Self {
            sub: sub.into(),
            role: role.map(str::to_string),
            exp: chrono::Utc::now().timestamp() + ttl_seconds,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }

    pub fn into_actor(self) -> Actor {
        let is_admin = self.is_admin();
        Actor {
            id: self.sub,
            is_admin,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid signing secret: {0}")]
    InvalidSecret(String),

    #[error("invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("writes are disabled on this server")]
    WritesDisabled,
}

/// Signs and verifies actor tokens with a shared secret
pub struct TokenVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub const MIN_SECRET_LEN: usize = 32;

    pub fn new(secret: &str) -> Result<Self, AuthError> {
        if secret.len() < Self::MIN_SECRET_LEN {
            return Err(AuthError::InvalidSecret(format!(
                "must be at least {} characters",
                Self::MIN_SECRET_LEN
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        })
    }

    pub fn issue(&self, claims: &Claims) -> Result<String, AuthError> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)?)
    }

    /// Decode and check signature and expiry
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        Ok(decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims)
    }

    /// Resolve the caller from an `Authorization: Bearer <token>` header
    pub fn actor_from_headers(&self, headers: &HeaderMap) -> Result<Actor, AuthError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::MissingToken)?;
        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;

        Ok(self.verify(token)?.into_actor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret-key-that-is-at-least-32-characters-long";

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(matches!(TokenVerifier::new("short"), Err(AuthError::InvalidSecret(_))));
    }

    #[test]
    fn test_issue_and_verify() {
        let verifier = TokenVerifier::new(SECRET).unwrap();
        let token = verifier.issue(&Claims::new("alice", Some("scorer"), 3600)).unwrap();

        let actor = verifier.actor_from_headers(&bearer(&token)).unwrap();
        assert_eq!(actor, Actor::scorer("alice"));

        let token = verifier.issue(&Claims::new("root", Some(ADMIN_ROLE), 3600)).unwrap();
        assert!(verifier.actor_from_headers(&bearer(&token)).unwrap().is_admin);
    }

    #[test]
    fn test_expired_token_rejected() {
        let verifier = TokenVerifier::new(SECRET).unwrap();
        let token = verifier.issue(&Claims::new("alice", None, -3600)).unwrap();
        assert!(matches!(verifier.verify(&token), Err(AuthError::Token(_))));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let ours = TokenVerifier::new(SECRET).unwrap();
        let theirs = TokenVerifier::new("another-secret-key-that-is-also-32-chars-long").unwrap();
        let token = theirs.issue(&Claims::new("root", Some(ADMIN_ROLE), 3600)).unwrap();
        assert!(ours.verify(&token).is_err());
    }

    #[test]
    fn test_missing_header() {
        let verifier = TokenVerifier::new(SECRET).unwrap();
        assert!(matches!(
            verifier.actor_from_headers(&HeaderMap::new()),
            Err(AuthError::MissingToken)
        ));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(verifier.actor_from_headers(&headers), Err(AuthError::MissingToken)));
    }
}
