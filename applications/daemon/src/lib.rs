//! Freqsync daemon library
//!
//! Configuration loading and error types for the `freqsync-daemon`
//! binary; the process wiring itself lives in `main.rs`.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;

pub use config::{AppConfig, WindowConfig};
pub use error::{DaemonError, Result};
