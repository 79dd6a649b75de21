use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Concurrent update of workload for {trainer} (expected version {version})")]
    Conflict { trainer: String, version: u64 },
    #[error("Storage unavailable")]
    Unavailable,
    #[error("Mongo error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
