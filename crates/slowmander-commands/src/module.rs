//! Declarative command descriptors and the modules that provide them.

use crate::arguments::ArgumentSpec;
use crate::command::Handler;
use crate::permissions::PermissionLevel;
use poise::serenity_prelude::Permissions;
use std::sync::Arc;

/// Whether a descriptor declares a leaf command or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    /// Leaf command.
    Command,
    /// Routing group.
    Group,
}

/// One row of a module's registration table.
#[derive(Clone)]
pub struct CommandDescriptor {
    pub(crate) kind: DescriptorKind,
    pub(crate) name: String,
    pub(crate) parent: Option<String>,
    pub(crate) aliases: Vec<String>,
    pub(crate) perm_level: PermissionLevel,
    pub(crate) required_permission: Option<Permissions>,
    pub(crate) description: String,
    pub(crate) long_description: String,
    pub(crate) usage: Option<String>,
    pub(crate) args: Vec<ArgumentSpec>,
    pub(crate) handler: Option<Handler>,
    pub(crate) guild_only: bool,
    pub(crate) slash: bool,
}

impl CommandDescriptor {
    fn new(kind: DescriptorKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            parent: None,
            aliases: Vec::new(),
            perm_level: PermissionLevel::Everyone,
            required_permission: None,
            description: String::new(),
            long_description: String::new(),
            usage: None,
            args: Vec::new(),
            handler: None,
            guild_only: false,
            slash: true,
        }
    }

    /// Declares a leaf command.
    pub fn command(name: impl Into<String>, handler: Handler) -> Self {
        Self {
            handler: Some(handler),
            ..Self::new(DescriptorKind::Command, name)
        }
    }

    /// Declares a group.
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(DescriptorKind::Group, name)
    }

    /// Places the node under the group at `path`, a space-separated chain
    /// of names.
    #[must_use]
    pub fn parent(mut self, path: impl Into<String>) -> Self {
        self.parent = Some(path.into());
        self
    }

    /// Adds aliases.
    #[must_use]
    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Sets the required level.
    #[must_use]
    pub const fn permission(mut self, level: PermissionLevel) -> Self {
        self.perm_level = level;
        self
    }

    /// Requires platform permissions in addition to the level.
    #[must_use]
    pub const fn requires(mut self, permissions: Permissions) -> Self {
        self.required_permission = Some(permissions);
        self
    }

    /// Sets the one-line description.
    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// Sets the extended help text.
    #[must_use]
    pub fn long_description(mut self, text: impl Into<String>) -> Self {
        self.long_description = text.into();
        self
    }

    /// Overrides the generated usage string.
    #[must_use]
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Appends an argument.
    #[must_use]
    pub fn arg(mut self, spec: ArgumentSpec) -> Self {
        self.args.push(spec);
        self
    }

    /// Sets the handler. Only valid for leaf commands.
    #[must_use]
    pub fn handler(mut self, handler: Handler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Ignores invocations outside guilds.
    #[must_use]
    pub const fn guild_only(mut self) -> Self {
        self.guild_only = true;
        self
    }

    /// Keeps the node out of slash-command deployment.
    #[must_use]
    pub const fn prefix_only(mut self) -> Self {
        self.slash = false;
        self
    }

    /// Declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared kind.
    pub const fn kind(&self) -> DescriptorKind {
        self.kind
    }
}

impl std::fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("perm_level", &self.perm_level)
            .finish_non_exhaustive()
    }
}

/// A feature area contributing commands.
///
/// Modules capture whatever state their handlers need and hand out a
/// registration table. Groups must precede their children in the table.
pub trait Module: Send + Sync {
    /// Module name for logging.
    fn name(&self) -> &'static str;

    /// Registration table for this module.
    fn commands(self: Arc<Self>) -> Vec<CommandDescriptor>;
}
