//! Freqsync Core
//!
//! Shared types, traits, and error handling for freqsync.
//!
//! This crate provides the foundational building blocks used by the watch
//! engine and the remote store clients:
//! - **Domain Types**: [`Frequency`], [`RemoteRecord`], [`RecordStatus`]
//! - **Core Traits**: [`RemoteStore`] — the seam between the engine and
//!   whatever key-value backend holds the mirrored records
//! - **Error Handling**: unified [`CoreError`] and [`Result`] types
//!
//! # Example
//!
//! ```rust
//! use freqsync_core::Frequency;
//!
//! let freq = Frequency::parse_exact("044,800").unwrap();
//! assert_eq!(freq.label(), "044.800");
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod frequency;
pub mod record;
pub mod store;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use frequency::Frequency;
pub use record::{RecordStatus, RemoteRecord};
pub use store::RemoteStore;
