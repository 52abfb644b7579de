//! # Slowmander Bot
//!
//! Discord bot built on the Slowmander command framework.
//!
//! This crate connects the command registry to Discord: gateway events are
//! routed into the registry, replies go out through message and interaction
//! sinks, and the platform collaborators are backed by the serenity cache.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod bot;
pub mod discord;
pub mod error;
pub mod overwrites;
pub mod router;
pub mod sinks;
pub mod slash;

pub use bot::*;
pub use error::*;
