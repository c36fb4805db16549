//! # Controller
//!
//! Core controller modules for the SQL instance controller.
//!
//! - `backoff`: Fibonacci backoff mechanism for retries
//! - `reconciler`: Provisioning state machine
//! - `server`: HTTP server for metrics and health checks

pub mod backoff;
pub mod reconciler;
pub mod server;
