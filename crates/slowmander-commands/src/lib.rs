//! # Slowmander Commands
//!
//! Permission-aware command framework for the Slowmander Discord bot.
//!
//! This crate provides the command tree and its registration rules, the
//! five-level permission model, typed argument parsing with entity
//! resolution, and the invocation context commands reply through. It does
//! not talk to Discord itself: the platform is reached through the traits in
//! [`directory`] and [`context::ReplySink`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod arguments;
pub mod command;
pub mod context;
pub mod directory;
pub mod error;
pub mod framework;
pub mod help;
pub mod mentions;
pub mod module;
pub mod permissions;
pub mod ping;
pub mod registry;
pub mod set;
pub mod usage;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use arguments::{
    tokenize, ArgValue, ArgumentChoice, ArgumentError, ArgumentInput, ArgumentKind,
    ArgumentParser, ArgumentSpec, Arguments,
};
pub use command::{
    handler, Command, CommandGroup, CommandInfo, CommandNode, CommandResult, Handler,
};
pub use context::{
    InvocationContext, Invoker, InvokingMember, Reply, ReplyError, ReplyHandle, ReplySink,
    SourceKind,
};
pub use directory::{
    DirectoryLookup, GuildRoleConfig, OwnerDirectory, PlatformCapabilityCheck, ResolvedChannel,
    ResolvedEmoji, ResolvedMember, ResolvedRole, ResolvedUser,
};
pub use error::RegistrationError;
pub use framework::{create_registry, Collaborators};
pub use module::{CommandDescriptor, Module};
pub use permissions::{PermissionLevel, PermissionResolver};
pub use registry::{CommandRegistry, DispatchOutcome, RegistryBuilder};
