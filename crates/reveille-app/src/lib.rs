pub mod alarm_service;
pub mod error;
pub mod reconciler;
pub mod settings;

#[cfg(test)]
mod testing;
