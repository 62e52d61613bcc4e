pub mod alarm;
pub mod error;
pub mod event;
pub mod events;
pub mod ids;
pub mod schedule;
pub mod store;

mod text;
