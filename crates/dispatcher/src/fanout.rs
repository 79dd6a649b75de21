use model::delta::{CorrelationId, WorkloadDelta};

use crate::DispatchError;

/// Result of emitting a batch of deltas. Nothing is rolled back implicitly:
/// the caller either accepts partial completion or compensates.
#[derive(Debug, Default)]
pub struct FanoutReport {
    pub sent: Vec<(CorrelationId, WorkloadDelta)>,
    pub failed: Vec<(WorkloadDelta, DispatchError)>,
}

impl FanoutReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn into_result(self) -> Result<Vec<CorrelationId>, DispatchError> {
        if self.is_complete() {
            Ok(self.sent.into_iter().map(|(id, _)| id).collect())
        } else {
            Err(DispatchError::PartialFanout {
                sent: self.sent.len(),
                failed: self.failed.len(),
            })
        }
    }
}
