use thiserror::Error;

use crate::decimal::Decimal;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeltaError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Training duration must be positive: {0}")]
    NonPositiveDuration(Decimal),
    #[error("Training duration exceeds {max} hours: {value}")]
    DurationTooLong { value: Decimal, max: Decimal },
    #[error("Hours for {year}-{month} out of range")]
    HoursOverflow { year: String, month: String },
}
