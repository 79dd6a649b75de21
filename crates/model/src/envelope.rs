use serde::{Deserialize, Serialize};

use crate::delta::{CorrelationId, WorkloadDelta};

pub const AUTHORIZATION: &str = "Authorization";
pub const TRANSACTION_ID: &str = "Transaction-Id";
pub const BEARER: &str = "Bearer ";

/// Token part of an `Authorization` header value, if it carries a non-empty bearer token.
pub fn bearer_token(authorization: &str) -> Option<&str> {
    authorization
        .strip_prefix(BEARER)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// A serialized delta plus the headers that travel with it on either transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaEnvelope {
    pub correlation_id: Option<CorrelationId>,
    /// Raw `Authorization` header value.
    pub authorization: Option<String>,
    pub body: String,
}

impl DeltaEnvelope {
    pub fn seal(
        delta: &WorkloadDelta,
        correlation_id: CorrelationId,
        token: Option<&str>,
    ) -> Result<Self, serde_json::Error> {
        Ok(DeltaEnvelope {
            correlation_id: Some(correlation_id),
            authorization: token.map(|token| format!("{}{}", BEARER, token)),
            body: serde_json::to_string(delta)?,
        })
    }

    /// Token part of the `Authorization` header, if it carries a non-empty bearer token.
    pub fn bearer_token(&self) -> Option<&str> {
        self.authorization.as_deref().and_then(bearer_token)
    }

    pub fn open(&self) -> Result<WorkloadDelta, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{tests::delta, ActionType};

    #[test]
    fn test_seal_and_open() {
        let delta = delta(ActionType::Add, "2023-10-01", 2.5);
        let envelope = DeltaEnvelope::seal(&delta, "tx-1".into(), Some("abc")).unwrap();
        assert_eq!(envelope.authorization.as_deref(), Some("Bearer abc"));
        assert_eq!(envelope.bearer_token(), Some("abc"));
        assert_eq!(envelope.open().unwrap(), delta);
    }

    #[test]
    fn test_bearer_header() {
        assert_eq!(bearer_token("Bearer abc "), Some("abc"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_bearer_token() {
        let mut envelope = DeltaEnvelope {
            correlation_id: None,
            authorization: None,
            body: String::new(),
        };
        assert_eq!(envelope.bearer_token(), None);

        envelope.authorization = Some("Basic abc".to_string());
        assert_eq!(envelope.bearer_token(), None);

        envelope.authorization = Some("Bearer ".to_string());
        assert_eq!(envelope.bearer_token(), None);

        envelope.authorization = Some("Bearer xyz".to_string());
        assert_eq!(envelope.bearer_token(), Some("xyz"));
    }
}
