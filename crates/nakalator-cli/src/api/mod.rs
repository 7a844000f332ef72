//! API client module
//!
//! HTTP client for the Nakala JSON API: file uploads, data and collection
//! creation, and the read-back calls used to verify a run.

pub mod client;
pub mod endpoints;
pub mod payload;
pub mod types;

pub use client::ApiClient;
pub use types::*;
