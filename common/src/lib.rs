// Common library shared by the API server and the test crates

pub mod config;
pub mod db;
pub mod errors;
pub mod guard;
pub mod models;
pub mod monitor;
pub mod notify;
pub mod retry;
pub mod scheduler;
pub mod telemetry;
