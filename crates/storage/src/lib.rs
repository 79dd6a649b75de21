pub mod dead_letter;
pub mod error;
pub mod memory;
pub mod queue;
pub mod revocation;
pub mod session;
pub mod workload;

use dead_letter::DeadLetterStore;
use eyre::Result;
use queue::QueueStore;
use revocation::RevocationStore;
use session::Db;
use workload::WorkloadStore;

const DB_NAME: &str = "workload_db";

#[derive(Clone)]
pub struct Storage {
    pub db: Db,
    pub workload: WorkloadStore,
    pub queue: QueueStore,
    pub dead_letters: DeadLetterStore,
    pub revocations: RevocationStore,
}

impl Storage {
    pub async fn new(uri: &str) -> Result<Self> {
        let db = Db::new(uri, DB_NAME).await?;
        let workload = WorkloadStore::new(&db);
        let queue = QueueStore::new(&db).await?;
        let dead_letters = DeadLetterStore::new(&db);
        let revocations = RevocationStore::new(&db);

        Ok(Storage {
            db,
            workload,
            queue,
            dead_letters,
            revocations,
        })
    }
}
