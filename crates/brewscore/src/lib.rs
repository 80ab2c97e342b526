pub mod config;
pub mod error;
pub mod feedback;
pub mod telemetry;
