//! services/api/src/web/token.rs
//!
//! Issues and verifies the signed session tokens stored in the `token` cookie.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use medichain_core::Role;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Claims carried by a session token.
///
/// `role` is kept as whatever JSON the issuer wrote (or `None` when absent):
/// a correctly signed token with a missing or unknown role must still decode
/// so the validator can report it as an unresolved user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Value>,
    pub iat: i64,
    pub exp: i64,
}

/// Creates and verifies HS256 session tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// How long an issued token stays valid.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for `id` acting as `role`, expiring after the configured ttl.
    pub fn issue(&self, id: Uuid, role: Role) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = SessionClaims {
            id: id.to_string(),
            role: Some(Value::from(role.as_str())),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        self.sign(&claims)
    }

    pub(crate) fn sign(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        Ok(encode(&Header::default(), claims, &self.encoding_key)?)
    }

    /// Checks signature and expiry and returns the decoded claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }
}

impl SessionClaims {
    /// The role tag, if the claim is a string.
    pub fn role_tag(&self) -> Option<&str> {
        self.role.as_ref().and_then(Value::as_str)
    }
}
