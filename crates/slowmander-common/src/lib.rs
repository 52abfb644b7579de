//! # Slowmander Common
//!
//! Shared identifiers, error types, and logging setup for Slowmander.
//!
//! This crate provides the foundational types used across every other crate
//! in the Slowmander workspace.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod logging;
pub mod macros;
pub mod types;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

pub use error::*;
pub use types::*;
