//! Firebase Realtime Database client for freqsync
//!
//! Implements the [`freqsync_core::RemoteStore`] trait against the RTDB
//! REST surface: `POST` for push-with-generated-key, `PUT` for set,
//! `PATCH` for partial update, `DELETE` for node and subtree removal,
//! `GET` for reads. Authentication uses a database secret passed as the
//! `auth` query parameter on every call.

#![forbid(unsafe_code)]

mod client;
mod credentials;
mod error;

// Public exports
pub use client::FirebaseClient;
pub use credentials::{load_secret, FirebaseConfig};
pub use error::{FirebaseError, Result};
