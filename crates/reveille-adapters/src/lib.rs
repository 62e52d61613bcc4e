pub mod persistence;
pub mod scheduler;
