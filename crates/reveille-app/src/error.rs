use reveille_core::error::DomainError;
use reveille_ports::error::{PortError, SchedulingError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("port error: {0}")]
    Port(#[from] PortError),
    #[error("scheduling error: {0}")]
    Scheduling(#[from] SchedulingError),
}
