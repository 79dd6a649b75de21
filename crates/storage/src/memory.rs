//! In-process implementations of the storage traits.

use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::Utc;
use model::{dead_letter::DeadLetter, envelope::DeltaEnvelope, workload::WorkloadSummary};
use parking_lot::Mutex;

use crate::{
    dead_letter::DeadLetterSink,
    error::StoreError,
    queue::{to_chrono, DeltaQueue, QueuedDelta},
    revocation::TokenRevocationStore,
    workload::WorkloadRepository,
};

#[derive(Default)]
pub struct MemoryWorkloadStore {
    summaries: Mutex<HashMap<String, WorkloadSummary>>,
    unavailable: AtomicBool,
}

impl MemoryWorkloadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with `StoreError::Unavailable` until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn get(&self, trainer: &str) -> Option<WorkloadSummary> {
        self.summaries.lock().get(trainer).cloned()
    }

    pub fn len(&self) -> usize {
        self.summaries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.lock().is_empty()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl WorkloadRepository for MemoryWorkloadStore {
    async fn find(&self, trainer: &str) -> Result<Option<WorkloadSummary>, StoreError> {
        self.check()?;
        Ok(self.get(trainer))
    }

    async fn save(&self, summary: &WorkloadSummary) -> Result<u64, StoreError> {
        self.check()?;
        let mut summaries = self.summaries.lock();
        let stored = summaries
            .get(&summary.trainer_username)
            .map(|stored| stored.version)
            .unwrap_or(0);
        if stored != summary.version {
            return Err(StoreError::Conflict {
                trainer: summary.trainer_username.clone(),
                version: summary.version,
            });
        }
        let mut next = summary.clone();
        next.version += 1;
        let version = next.version;
        summaries.insert(next.trainer_username.clone(), next);
        Ok(version)
    }
}

#[derive(Default)]
pub struct MemoryQueue {
    messages: Mutex<Vec<QueuedDelta>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

#[async_trait]
impl DeltaQueue for MemoryQueue {
    async fn publish(&self, envelope: DeltaEnvelope) -> Result<(), StoreError> {
        self.messages.lock().push(QueuedDelta::new(envelope));
        Ok(())
    }

    async fn receive(&self, visibility: Duration) -> Result<Option<QueuedDelta>, StoreError> {
        let now = Utc::now();
        let mut messages = self.messages.lock();
        let next = messages
            .iter_mut()
            .filter(|message| message.available_at <= now)
            .min_by_key(|message| message.created_at);
        Ok(next.map(|message| {
            message.attempts += 1;
            message.available_at = now + to_chrono(visibility);
            message.clone()
        }))
    }

    async fn ack(&self, id: ObjectId) -> Result<(), StoreError> {
        self.messages.lock().retain(|message| message.id != id);
        Ok(())
    }

    async fn nack(&self, id: ObjectId, delay: Duration) -> Result<(), StoreError> {
        let available_at = Utc::now() + to_chrono(delay);
        if let Some(message) = self
            .messages
            .lock()
            .iter_mut()
            .find(|message| message.id == id)
        {
            message.available_at = available_at;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryDeadLetters {
    letters: Mutex<Vec<DeadLetter>>,
}

impl MemoryDeadLetters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn letters(&self) -> Vec<DeadLetter> {
        self.letters.lock().clone()
    }
}

#[async_trait]
impl DeadLetterSink for MemoryDeadLetters {
    async fn push(&self, letter: DeadLetter) -> Result<(), StoreError> {
        self.letters.lock().push(letter);
        Ok(())
    }

    async fn list(&self, limit: i64) -> Result<Vec<DeadLetter>, StoreError> {
        let letters = self.letters.lock();
        Ok(letters
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryRevocations {
    tokens: Mutex<HashSet<String>>,
}

impl MemoryRevocations {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenRevocationStore for MemoryRevocations {
    async fn contains(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.tokens.lock().contains(token))
    }

    async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        self.tokens.lock().insert(token.to_string());
        Ok(())
    }
}
