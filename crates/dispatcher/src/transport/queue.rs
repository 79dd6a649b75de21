use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use model::envelope::DeltaEnvelope;
use storage::queue::DeltaQueue;

use super::{DeltaTransport, TransportError};

/// Durable publish. Returns once the queue has stored the message, which says
/// nothing about whether the consumer has processed it.
#[derive(Clone)]
pub struct QueueTransport {
    queue: Arc<dyn DeltaQueue>,
}

impl QueueTransport {
    pub fn new(queue: Arc<dyn DeltaQueue>) -> Self {
        QueueTransport { queue }
    }
}

#[async_trait]
impl DeltaTransport for QueueTransport {
    async fn deliver(&self, envelope: &DeltaEnvelope) -> Result<(), TransportError> {
        self.queue.publish(envelope.clone()).await?;
        debug!("Published delta {:?}", envelope.correlation_id);
        Ok(())
    }
}
