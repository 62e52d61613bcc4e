mod local;

pub use local::LocalTriggerScheduler;
