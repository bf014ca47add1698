pub mod capability;
pub mod controller;
pub mod error;
pub mod metrics;
pub mod release;
pub mod telemetry;
