//! Session token verification. The default verifier checks HS256 JWTs with the jsonwebtoken crate.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
}

/// The caller, as described by the claims of a verified token.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallerIdentity {
    pub claims: Map<String, Value>,
}

impl CallerIdentity {
    pub fn new(claims: Map<String, Value>) -> Self {
        CallerIdentity { claims }
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Claim lookup with a case-insensitive key, for columns whose case differs between schema and token.
    pub fn claim_ignore_case(&self, name: &str) -> Option<&Value> {
        self.claims
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }
}

pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<CallerIdentity, TokenError>;
}

pub struct JwtVerifier {
    secret: String,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 60;
        JwtVerifier {
            secret: secret.into(),
            validation,
        }
    }

    /// Sign `claims` with an `exp` of now + `ttl_secs`. Used by login flows and tests.
    pub fn issue(&self, claims: &Map<String, Value>, ttl_secs: i64) -> Result<String, TokenError> {
        let mut claims = claims.clone();
        let exp = chrono::Utc::now().timestamp() + ttl_secs;
        claims.insert("exp".into(), Value::from(exp));
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| TokenError::Invalid(e.to_string()))
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<CallerIdentity, TokenError> {
        let data = decode::<Map<String, Value>>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &self.validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        })?;
        Ok(CallerIdentity::new(data.claims))
    }
}
