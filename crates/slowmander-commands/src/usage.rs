//! Usage and help text rendering.

use crate::arguments::{ArgumentError, ArgumentSpec};
use crate::command::{CommandGroup, CommandNode};
use crate::permissions::{PermissionLevel, PermissionResolver};
use slowmander_common::utils::{truncate_content, MESSAGE_CONTENT_LIMIT};
use std::fmt::Write;

/// Usage placeholder for groups.
pub const GROUP_USAGE: &str = "<subcommand>";

/// Builds `<required> [optional] [rest...]` from argument specs.
pub fn auto_usage(args: &[ArgumentSpec]) -> String {
    args.iter()
        .map(|spec| {
            let dots = if spec.rest { "..." } else { "" };
            if spec.optional {
                format!("[{}{dots}]", spec.name)
            } else {
                format!("<{}{dots}>", spec.name)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders usage notices, group help and command lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageRenderer;

impl UsageRenderer {
    /// Full name followed by usage, in code markup.
    pub fn usage_line(node: &CommandNode) -> String {
        let usage = node.usage();
        if usage.is_empty() {
            format!("`{}`", node.full_name())
        } else {
            format!("`{} {}`", node.full_name(), usage)
        }
    }

    /// Notice shown when arguments could not be parsed.
    pub fn usage_notice(node: &CommandNode, error: &ArgumentError) -> String {
        let mut out = format!("{error}\nUsage: {}", Self::usage_line(node));
        if !node.description().is_empty() {
            let _ = write!(out, "\n{}", node.description());
        }
        truncate_content(&out, MESSAGE_CONTENT_LIMIT)
    }

    /// Help for a group, listing only children reachable at `level`.
    pub fn group_help(group: &CommandGroup, level: PermissionLevel) -> String {
        let mut out = format!("**{}**", group.info.full_name);
        if !group.info.description.is_empty() {
            let _ = write!(out, " - {}", group.info.description);
        }
        out.push_str("\nSubcommands:");
        for child in group
            .sub_commands()
            .filter(|child| PermissionResolver::gate(level, child))
        {
            let _ = write!(out, "\n{}", Self::entry(child));
        }
        truncate_content(&out, MESSAGE_CONTENT_LIMIT)
    }

    /// Detailed help for one node.
    pub fn command_help(node: &CommandNode, level: PermissionLevel) -> String {
        let CommandNode::Leaf(command) = node else {
            return node
                .as_group()
                .map(|group| Self::group_help(group, level))
                .unwrap_or_default();
        };

        let info = &command.info;
        let mut out = format!("**{}**", info.full_name);
        if !info.description.is_empty() {
            let _ = write!(out, "\n{}", info.description);
        }
        if !info.long_description.is_empty() {
            let _ = write!(out, "\n\n{}", info.long_description);
        }
        let _ = write!(out, "\nUsage: {}", Self::usage_line(node));
        if !info.aliases.is_empty() {
            let aliases: Vec<String> = info.aliases.iter().map(|a| format!("`{a}`")).collect();
            let _ = write!(out, "\nAliases: {}", aliases.join(", "));
        }
        let _ = write!(out, "\nPermission: {}", info.perm_level);
        if info.guild_only {
            out.push_str("\nServer only");
        }
        truncate_content(&out, MESSAGE_CONTENT_LIMIT)
    }

    /// List of top-level nodes reachable at `level`.
    pub fn command_list<'a>(
        nodes: impl IntoIterator<Item = &'a CommandNode>,
        level: PermissionLevel,
    ) -> String {
        let mut out = String::from("**Commands**");
        for node in nodes
            .into_iter()
            .filter(|node| PermissionResolver::gate(level, node))
        {
            let _ = write!(out, "\n{}", Self::entry(node));
        }
        truncate_content(&out, MESSAGE_CONTENT_LIMIT)
    }

    fn entry(node: &CommandNode) -> String {
        let line = Self::usage_line(node);
        if node.description().is_empty() {
            line
        } else {
            format!("{line} - {}", node.description())
        }
    }
}
