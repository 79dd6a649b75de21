use std::fmt::Display;

use chrono::{Datelike as _, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::{Display as StrumDisplay, EnumString};
use uuid::Uuid;

use crate::{decimal::Decimal, errors::DeltaError};

/// What a delta does to the trainer's hours.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, StrumDisplay, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ActionType {
    Add,
    Delete,
}

impl ActionType {
    pub fn inverse(self) -> ActionType {
        match self {
            ActionType::Add => ActionType::Delete,
            ActionType::Delete => ActionType::Add,
        }
    }
}

/// Longest duration a single training may carry.
pub const MAX_TRAINING_HOURS: i64 = 24;

/// One training session's effect on a trainer's workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadDelta {
    pub trainer_username: String,
    pub trainer_first_name: String,
    pub trainer_last_name: String,
    pub is_active: bool,
    /// Calendar date in UTC.
    pub training_date: NaiveDate,
    #[serde(with = "crate::decimal::as_f64")]
    pub training_duration: Decimal,
    pub action_type: ActionType,
}

impl WorkloadDelta {
    pub fn validate(&self) -> Result<(), DeltaError> {
        if self.trainer_username.trim().is_empty() {
            return Err(DeltaError::MissingField("trainerUsername"));
        }
        if self.trainer_first_name.trim().is_empty() {
            return Err(DeltaError::MissingField("trainerFirstName"));
        }
        if self.trainer_last_name.trim().is_empty() {
            return Err(DeltaError::MissingField("trainerLastName"));
        }
        if !self.training_duration.is_positive() {
            return Err(DeltaError::NonPositiveDuration(self.training_duration));
        }
        let max = Decimal::int(MAX_TRAINING_HOURS);
        if self.training_duration > max {
            return Err(DeltaError::DurationTooLong {
                value: self.training_duration,
                max,
            });
        }
        Ok(())
    }

    pub fn month_key(&self) -> MonthKey {
        MonthKey::from(self.training_date)
    }

    /// The delta that undoes this one.
    pub fn inverse(&self) -> WorkloadDelta {
        WorkloadDelta {
            action_type: self.action_type.inverse(),
            ..self.clone()
        }
    }
}

/// Bucket coordinates: four digit year, zero padded month.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MonthKey {
    pub year: String,
    pub month: String,
}

impl From<NaiveDate> for MonthKey {
    fn from(date: NaiveDate) -> Self {
        MonthKey {
            year: format!("{:04}", date.year()),
            month: format!("{:02}", date.month()),
        }
    }
}

impl Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.year, self.month)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new() -> Self {
        CorrelationId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        CorrelationId::new()
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        CorrelationId(value)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        CorrelationId(value.to_string())
    }
}

impl Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
