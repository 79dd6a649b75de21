use chrono::{DateTime, Utc};
use model::{
    decimal::Decimal,
    delta::{ActionType, WorkloadDelta},
};

#[derive(Debug, Clone)]
pub struct Trainer {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
}

/// What the primary service knows about a training when it is stored or removed.
#[derive(Debug, Clone)]
pub struct TrainingSession {
    pub trainer: Trainer,
    pub start_at: DateTime<Utc>,
    pub duration: Decimal,
}

impl TrainingSession {
    /// The training date is taken in UTC so both services agree on the month.
    pub fn delta(&self, action_type: ActionType) -> WorkloadDelta {
        WorkloadDelta {
            trainer_username: self.trainer.username.clone(),
            trainer_first_name: self.trainer.first_name.clone(),
            trainer_last_name: self.trainer.last_name.clone(),
            is_active: self.trainer.is_active,
            training_date: self.start_at.date_naive(),
            training_duration: self.duration,
            action_type,
        }
    }
}
