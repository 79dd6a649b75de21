mod http;
mod queue;

pub use http::HttpTransport;
pub use queue::QueueTransport;

use async_trait::async_trait;
use model::envelope::DeltaEnvelope;
use storage::error::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Workload service responded with {0}")]
    Status(reqwest::StatusCode),
    #[error("Workload service timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Invalid workload service url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Failed to publish delta: {0}")]
    Publish(#[from] StoreError),
}

/// Carries a sealed delta to the workload service.
#[async_trait]
pub trait DeltaTransport: Send + Sync {
    async fn deliver(&self, envelope: &DeltaEnvelope) -> Result<(), TransportError>;
}
