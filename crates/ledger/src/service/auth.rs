use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use eyre::Error;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use log::warn;
use serde::{Deserialize, Serialize};
use storage::{error::StoreError, revocation::TokenRevocationStore};

use crate::error::{AuthFailure, Rejection};

/// External authority on bearer tokens.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// `Err` means the authority could not be asked, not that the token is bad.
    async fn token_is_valid(&self, token: &str) -> Result<bool, StoreError>;

    fn username_from_token(&self, token: &str) -> Option<String>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

/// HMAC-signed JWT validation sharing the secret with the issuing service.
pub struct JwtValidator {
    jwt_decode: DecodingKey,
    jwt_encode: EncodingKey,
    validation: Validation,
    header: Header,
}

impl JwtValidator {
    pub fn new(secret: &str) -> Self {
        JwtValidator {
            jwt_decode: DecodingKey::from_secret(secret.as_bytes()),
            jwt_encode: EncodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
            header: Header::default(),
        }
    }

    pub fn claims(&self, token: &str) -> Result<Claims, Error> {
        Ok(jsonwebtoken::decode::<Claims>(token, &self.jwt_decode, &self.validation)?.claims)
    }

    pub fn issue(&self, username: &str, ttl: chrono::Duration) -> Result<String, Error> {
        let claims = Claims {
            sub: username.to_string(),
            exp: (Utc::now() + ttl).timestamp(),
        };
        Ok(jsonwebtoken::encode(&self.header, &claims, &self.jwt_encode)?)
    }
}

#[async_trait]
impl TokenValidator for JwtValidator {
    async fn token_is_valid(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.claims(token).is_ok())
    }

    fn username_from_token(&self, token: &str) -> Option<String> {
        self.claims(token).ok().map(|claims| claims.sub)
    }
}

/// Bearer-token gate in front of both the write and the read paths.
#[derive(Clone)]
pub struct Authenticator {
    validator: Arc<dyn TokenValidator>,
    revocations: Arc<dyn TokenRevocationStore>,
}

impl Authenticator {
    pub fn new(
        validator: Arc<dyn TokenValidator>,
        revocations: Arc<dyn TokenRevocationStore>,
    ) -> Self {
        Authenticator {
            validator,
            revocations,
        }
    }

    /// Checks the token and returns the caller's username.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<String, AuthFailure> {
        let Some(token) = token else {
            return Err(Rejection::Unauthorized("missing bearer token".to_string()).into());
        };
        if !self.validator.token_is_valid(token).await? {
            return Err(Rejection::Unauthorized("invalid or expired token".to_string()).into());
        }
        if self.revocations.contains(token).await? {
            warn!("Revoked token presented");
            return Err(Rejection::Revoked.into());
        }
        Ok(self
            .validator
            .username_from_token(token)
            .unwrap_or_else(|| "unknown".to_string()))
    }
}
