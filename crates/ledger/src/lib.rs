use std::sync::Arc;

use service::{
    auth::{Authenticator, JwtValidator},
    consumer::WorkloadConsumer,
    workload::WorkloadLedger,
};
use storage::{
    dead_letter::DeadLetterSink, queue::DeltaQueue, revocation::TokenRevocationStore,
    workload::WorkloadRepository, Storage,
};

pub mod error;
pub mod service;

/// Everything the workload service needs, wired against one backend.
#[derive(Clone)]
pub struct Ledger {
    pub workload: WorkloadLedger,
    pub consumer: WorkloadConsumer,
    pub queue: Arc<dyn DeltaQueue>,
    pub dead_letters: Arc<dyn DeadLetterSink>,
    pub auth: Authenticator,
    pub jwt: Arc<JwtValidator>,
}

impl Ledger {
    pub fn new(storage: Storage, jwt_secret: &str, merge_retries: u32) -> Self {
        Ledger::with_stores(
            Arc::new(storage.workload),
            Arc::new(storage.queue),
            Arc::new(storage.dead_letters),
            Arc::new(storage.revocations),
            jwt_secret,
            merge_retries,
        )
    }

    pub fn with_stores(
        workload: Arc<dyn WorkloadRepository>,
        queue: Arc<dyn DeltaQueue>,
        dead_letters: Arc<dyn DeadLetterSink>,
        revocations: Arc<dyn TokenRevocationStore>,
        jwt_secret: &str,
        merge_retries: u32,
    ) -> Self {
        let jwt = Arc::new(JwtValidator::new(jwt_secret));
        let workload = WorkloadLedger::new(workload, merge_retries);
        let auth = Authenticator::new(jwt.clone(), revocations);
        let consumer = WorkloadConsumer::new(auth.clone(), dead_letters.clone(), workload.clone());
        Ledger {
            workload,
            consumer,
            queue,
            dead_letters,
            auth,
            jwt,
        }
    }
}
