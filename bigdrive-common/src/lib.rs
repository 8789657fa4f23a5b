pub mod prelude;

pub mod codec;
pub mod config;
pub mod error;
pub mod event_log;
pub mod hive;
pub mod ipc;
pub mod manager;
pub mod model;
pub mod project_dirs;
pub mod provider;
pub mod tracing_setup;
