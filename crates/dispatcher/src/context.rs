use model::{delta::CorrelationId, envelope::bearer_token};

/// Identity of the request that triggered a workload change.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub token: Option<String>,
    pub transaction_id: CorrelationId,
}

impl RequestContext {
    pub fn new(token: Option<String>) -> Self {
        RequestContext {
            token: token.filter(|token| !token.is_empty()),
            transaction_id: CorrelationId::new(),
        }
    }

    /// Builds the context from a raw `Authorization` header.
    pub fn from_authorization(header: Option<&str>) -> Self {
        RequestContext::new(header.and_then(bearer_token).map(str::to_string))
    }

    pub fn with_transaction_id(mut self, id: CorrelationId) -> Self {
        self.transaction_id = id;
        self
    }
}
