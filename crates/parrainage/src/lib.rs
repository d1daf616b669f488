pub mod ceremony;
pub mod config;
pub mod error;
pub mod telemetry;
