//! Nakalator common library
//!
//! Shared pieces used by the Nakalator workspace members:
//!
//! - **Logging**: tracing subscriber setup ([`logging`])
//! - **Naming**: archival file ordering and identifier sanitizing ([`naming`])
//! - **Errors**: [`CommonError`] and its [`Result`] alias

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod naming;

pub use error::{CommonError, Result};
