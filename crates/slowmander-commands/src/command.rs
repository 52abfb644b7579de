//! The command tree: leaf commands, routing groups, and the name-keyed scopes
//! that hold them.

use crate::arguments::{ArgumentSpec, Arguments};
use crate::context::InvocationContext;
use crate::error::RegistrationError;
use crate::permissions::PermissionLevel;
use futures::future::BoxFuture;
use poise::serenity_prelude::Permissions;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Result of running a command handler.
pub type CommandResult = anyhow::Result<()>;

/// A command handler.
pub type Handler = Arc<
    dyn Fn(Arc<InvocationContext>, Arguments) -> BoxFuture<'static, CommandResult> + Send + Sync,
>;

/// Wraps an async function or closure as a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Arc<InvocationContext>, Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    Arc::new(move |ctx, args| Box::pin(f(ctx, args)))
}

/// Metadata shared by commands and groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    /// Lowercase name, unique within its scope.
    pub name: String,
    /// Lowercase aliases, unique within the same scope.
    pub aliases: Vec<String>,
    /// Declared level. Groups derive theirs from their children instead.
    pub perm_level: PermissionLevel,
    /// Platform permissions the invoker must also hold.
    pub required_permission: Option<Permissions>,
    /// One-line description.
    pub description: String,
    /// Extended help text.
    pub long_description: String,
    /// Usage string shown after the full name.
    pub usage: String,
    /// Full name of the parent group.
    pub parent: Option<String>,
    /// Ancestor names and own name joined by spaces.
    pub full_name: String,
    /// Silently ignored outside guilds.
    pub guild_only: bool,
    /// Deployed as a slash command.
    pub slash: bool,
}

/// A leaf command with a handler.
#[derive(Clone)]
pub struct Command {
    /// Metadata.
    pub info: CommandInfo,
    /// Positional arguments in declaration order.
    pub args: Vec<ArgumentSpec>,
    /// Handler run on successful dispatch.
    pub handler: Handler,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("info", &self.info)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// Name-keyed collection of sibling nodes with an alias index.
#[derive(Debug, Clone, Default)]
pub struct CommandScope {
    nodes: BTreeMap<String, CommandNode>,
    aliases: HashMap<String, String>,
}

impl CommandScope {
    /// Looks up a node by name or alias, ignoring case.
    pub fn get(&self, token: &str) -> Option<&CommandNode> {
        let key = token.to_lowercase();
        self.nodes
            .get(&key)
            .or_else(|| self.aliases.get(&key).and_then(|name| self.nodes.get(name)))
    }

    /// Mutable lookup by name or alias, ignoring case.
    pub fn get_mut(&mut self, token: &str) -> Option<&mut CommandNode> {
        let key = token.to_lowercase();
        let name = if self.nodes.contains_key(&key) {
            key
        } else {
            self.aliases.get(&key)?.clone()
        };
        self.nodes.get_mut(&name)
    }

    fn is_taken(&self, key: &str) -> bool {
        self.nodes.contains_key(key) || self.aliases.contains_key(key)
    }

    /// Inserts a node under its name and aliases. `scope` names this scope in
    /// the error.
    pub fn insert(&mut self, node: CommandNode, scope: &str) -> Result<(), RegistrationError> {
        let info = node.info();
        for key in std::iter::once(&info.name).chain(info.aliases.iter()) {
            if self.is_taken(key) {
                return Err(RegistrationError::DuplicateName {
                    name: key.clone(),
                    scope: scope.to_string(),
                });
            }
        }
        let mut seen = std::collections::HashSet::new();
        for alias in &info.aliases {
            if alias == &info.name || !seen.insert(alias) {
                return Err(RegistrationError::DuplicateName {
                    name: alias.clone(),
                    scope: scope.to_string(),
                });
            }
        }

        let name = info.name.clone();
        for alias in &info.aliases {
            self.aliases.insert(alias.clone(), name.clone());
        }
        self.nodes.insert(name, node);
        Ok(())
    }

    /// Removes a node and its aliases by name.
    pub fn remove(&mut self, name: &str) -> Option<CommandNode> {
        let node = self.nodes.remove(&name.to_lowercase())?;
        self.aliases.retain(|_, target| target != &node.info().name);
        Some(node)
    }

    /// Nodes in name order.
    pub fn iter(&self) -> impl Iterator<Item = &CommandNode> {
        self.nodes.values()
    }

    /// Number of nodes, not counting aliases.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the scope holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A group routing to child commands and groups by name.
#[derive(Debug, Clone)]
pub struct CommandGroup {
    /// Metadata. `perm_level` here is not consulted.
    pub info: CommandInfo,
    children: CommandScope,
}

impl CommandGroup {
    /// Creates an empty group.
    pub fn new(info: CommandInfo) -> Self {
        Self {
            info,
            children: CommandScope::default(),
        }
    }

    /// Lowest level among direct children, so the group can be entered by
    /// anyone who can reach at least one child. An empty group is Owner-only.
    pub fn perm_level(&self) -> PermissionLevel {
        self.children
            .iter()
            .map(CommandNode::perm_level)
            .min()
            .unwrap_or(PermissionLevel::Owner)
    }

    /// Union of the children's platform permission requirements.
    pub fn required_permission(&self) -> Option<Permissions> {
        self.children
            .iter()
            .filter_map(CommandNode::required_permission)
            .reduce(|acc, p| acc | p)
    }

    /// Adds a child.
    pub fn add_sub_command(&mut self, node: CommandNode) -> Result<(), RegistrationError> {
        let scope = self.info.full_name.clone();
        self.children.insert(node, &scope)
    }

    /// Removes a child by name.
    pub fn remove_sub_command(&mut self, name: &str) -> Option<CommandNode> {
        self.children.remove(name)
    }

    /// Looks up a child by name or alias.
    pub fn sub_command(&self, token: &str) -> Option<&CommandNode> {
        self.children.get(token)
    }

    /// Direct children in name order.
    pub fn sub_commands(&self) -> impl Iterator<Item = &CommandNode> {
        self.children.iter()
    }

    pub(crate) fn children_mut(&mut self) -> &mut CommandScope {
        &mut self.children
    }
}

/// A node of the command tree.
#[derive(Debug, Clone)]
pub enum CommandNode {
    /// Invocable command.
    Leaf(Command),
    /// Routing group.
    Group(CommandGroup),
}

impl CommandNode {
    /// Shared metadata.
    pub const fn info(&self) -> &CommandInfo {
        match self {
            Self::Leaf(command) => &command.info,
            Self::Group(group) => &group.info,
        }
    }

    /// Own name.
    pub fn name(&self) -> &str {
        &self.info().name
    }

    /// Ancestor names and own name joined by spaces.
    pub fn full_name(&self) -> &str {
        &self.info().full_name
    }

    /// Aliases.
    pub fn aliases(&self) -> &[String] {
        &self.info().aliases
    }

    /// One-line description.
    pub fn description(&self) -> &str {
        &self.info().description
    }

    /// Usage string.
    pub fn usage(&self) -> &str {
        &self.info().usage
    }

    /// Effective level: declared for leaves, derived for groups.
    pub fn perm_level(&self) -> PermissionLevel {
        match self {
            Self::Leaf(command) => command.info.perm_level,
            Self::Group(group) => group.perm_level(),
        }
    }

    /// Effective platform permission requirement.
    pub fn required_permission(&self) -> Option<Permissions> {
        match self {
            Self::Leaf(command) => command.info.required_permission,
            Self::Group(group) => group.required_permission(),
        }
    }

    /// Whether the node is ignored outside guilds.
    pub const fn guild_only(&self) -> bool {
        self.info().guild_only
    }

    /// Whether this is a group.
    pub const fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    /// The leaf command, if this is one.
    pub const fn as_command(&self) -> Option<&Command> {
        match self {
            Self::Leaf(command) => Some(command),
            Self::Group(_) => None,
        }
    }

    /// The group, if this is one.
    pub const fn as_group(&self) -> Option<&CommandGroup> {
        match self {
            Self::Group(group) => Some(group),
            Self::Leaf(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, parent: Option<&str>, level: PermissionLevel) -> CommandInfo {
        CommandInfo {
            name: name.to_string(),
            aliases: Vec::new(),
            perm_level: level,
            required_permission: None,
            description: String::new(),
            long_description: String::new(),
            usage: String::new(),
            parent: parent.map(str::to_string),
            full_name: parent.map_or_else(|| name.to_string(), |p| format!("{p} {name}")),
            guild_only: false,
            slash: true,
        }
    }

    fn leaf(name: &str, level: PermissionLevel) -> CommandNode {
        CommandNode::Leaf(Command {
            info: info(name, Some("set"), level),
            args: Vec::new(),
            handler: handler(|_, _| async { Ok(()) }),
        })
    }

    #[test]
    fn test_group_level_tracks_children() {
        let mut group = CommandGroup::new(info("set", None, PermissionLevel::Everyone));
        assert_eq!(group.perm_level(), PermissionLevel::Owner);

        group.add_sub_command(leaf("prefix", PermissionLevel::Admin)).unwrap();
        assert_eq!(group.perm_level(), PermissionLevel::Admin);

        group.add_sub_command(leaf("color", PermissionLevel::Vip)).unwrap();
        assert_eq!(group.perm_level(), PermissionLevel::Vip);

        group.remove_sub_command("color").unwrap();
        assert_eq!(group.perm_level(), PermissionLevel::Admin);
    }

    #[test]
    fn test_group_permission_union() {
        let mut group = CommandGroup::new(info("mod", None, PermissionLevel::Everyone));
        assert_eq!(group.required_permission(), None);

        let mut kick = leaf("kick", PermissionLevel::Mod);
        if let CommandNode::Leaf(command) = &mut kick {
            command.info.required_permission = Some(Permissions::KICK_MEMBERS);
        }
        let mut ban = leaf("ban", PermissionLevel::Mod);
        if let CommandNode::Leaf(command) = &mut ban {
            command.info.required_permission = Some(Permissions::BAN_MEMBERS);
        }
        group.add_sub_command(kick).unwrap();
        group.add_sub_command(ban).unwrap();
        group.add_sub_command(leaf("warn", PermissionLevel::Mod)).unwrap();

        assert_eq!(
            group.required_permission(),
            Some(Permissions::KICK_MEMBERS | Permissions::BAN_MEMBERS)
        );
    }

    #[test]
    fn test_scope_aliases() {
        let mut scope = CommandScope::default();
        let mut node = leaf("prefix", PermissionLevel::Admin);
        if let CommandNode::Leaf(command) = &mut node {
            command.info.aliases = vec!["p".to_string()];
        }
        scope.insert(node, "set").unwrap();

        assert_eq!(scope.get("PREFIX").map(CommandNode::name), Some("prefix"));
        assert_eq!(scope.get("p").map(CommandNode::name), Some("prefix"));
        assert!(scope.get_mut("P").is_some());

        let clash = leaf("p", PermissionLevel::Everyone);
        assert!(matches!(
            scope.insert(clash, "set"),
            Err(RegistrationError::DuplicateName { .. })
        ));

        scope.remove("prefix").unwrap();
        assert!(scope.get("p").is_none());
        assert!(scope.is_empty());
    }
}
