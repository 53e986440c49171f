//! Publish Android app binaries to Google Play through transactional edits.
//!
//! A publishing run opens an edit, uploads binaries and their auxiliary
//! files, clears shadowed versions from lower tracks, assigns a new release
//! to the target track and commits. Nothing becomes visible on the store
//! until the commit succeeds.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod notes;
pub mod publish;

pub use error::PublishError;
