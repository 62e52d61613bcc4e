use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("not found")]
    NotFound,
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("connection error: {0}")]
    Connection(String),
}

/// Failure reported by the notification scheduler for one request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("notification permission denied")]
    PermissionDenied,
    #[error("trigger rejected: {0}")]
    Rejected(String),
    #[error("scheduler unavailable: {0}")]
    Unavailable(String),
}
