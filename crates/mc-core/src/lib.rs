//! # mc-core
//!
//! Shared error type for the mvacut workspace.
//!
//! Every library crate reports failures through [`Error`], whose variants
//! follow the pipeline's failure taxonomy: configuration problems are caught
//! before any computation, data problems at first use, and arithmetic edge
//! cases are never errors.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;

pub use error::{Error, Result};

/// Workspace version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
