use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("alarm on {day} at {time} already exists")]
    DuplicateAlarm { day: String, time: String },
    #[error("invalid day: {0}")]
    InvalidDay(String),
    #[error("invalid time: {0}")]
    InvalidTime(String),
    #[error("invalid id: {0}")]
    InvalidId(String),
    #[error("event not found: {0}")]
    EventNotFound(String),
    #[error("alarm not found: {0}")]
    AlarmNotFound(String),
}
