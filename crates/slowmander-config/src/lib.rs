//! # Slowmander Config
//!
//! Type-safe configuration management for Slowmander.
//!
//! This crate provides configuration loading, validation, and lock-free
//! caching, plus the concurrent per-guild settings store consulted by the
//! permission system.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod defaults;
pub mod guild;
pub mod loader;
pub mod schema;
pub mod validator;

pub use cache::*;
pub use guild::*;
pub use loader::*;
pub use schema::*;
pub use validator::*;
