use model::{dead_letter::DeadLetterReason, errors::DeltaError};
use storage::error::StoreError;
use thiserror::Error;

/// Failures of a ledger merge. All but `Unmergeable` may succeed on redelivery.
#[derive(Error, Debug)]
pub enum WorkloadError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Gave up merging workload for {trainer} after {attempts} conflicting writes")]
    TooManyConflicts { trainer: String, attempts: u32 },
    #[error("Delta cannot be merged: {0}")]
    Unmergeable(#[from] DeltaError),
}

/// Failures that will never succeed on redelivery.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Token revoked")]
    Revoked,
    #[error("Malformed payload: {0}")]
    Malformed(String),
    #[error("Invalid delta: {0}")]
    Invalid(#[from] DeltaError),
}

/// Why a bearer token was not accepted.
#[derive(Error, Debug)]
pub enum AuthFailure {
    #[error(transparent)]
    Rejected(#[from] Rejection),
    /// The validator or the revocation store could not be asked.
    #[error("Authentication unavailable: {0}")]
    Unavailable(#[from] StoreError),
}

impl Rejection {
    pub fn reason(&self) -> DeadLetterReason {
        match self {
            Rejection::Unauthorized(_) => DeadLetterReason::Unauthorized,
            Rejection::Revoked => DeadLetterReason::Revoked,
            Rejection::Malformed(_) => DeadLetterReason::Malformed,
            Rejection::Invalid(_) => DeadLetterReason::Invalid,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Rejection::Unauthorized(_) | Rejection::Revoked)
    }
}
