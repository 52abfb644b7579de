//! Command registration, resolution and dispatch.

use crate::arguments::{ArgumentInput, ArgumentKind, ArgumentParser};
use crate::command::{Command, CommandGroup, CommandInfo, CommandNode, CommandScope};
use crate::context::{InvocationContext, Reply};
use crate::error::RegistrationError;
use crate::module::{CommandDescriptor, DescriptorKind, Module};
use crate::permissions::{PermissionLevel, PermissionResolver};
use crate::usage::{auto_usage, UsageRenderer, GROUP_USAGE};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Deepest allowed nesting: group, sub-group, command.
pub const MAX_DEPTH: usize = 3;

/// Scope label for top-level names in errors.
const TOP_LEVEL: &str = "top level";

/// How a dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler ran and returned `Ok`.
    Completed,
    /// Guild-only outside a guild, level too low, or missing platform
    /// permissions. Nothing was sent.
    Denied,
    /// Arguments were missing or invalid and usage was shown.
    UsageShown,
    /// A group was invoked and its help was shown.
    GroupHelpShown,
    /// The handler failed or panicked and the generic notice was shown.
    Failed,
}

/// A node found by [`CommandRegistry::resolve`] and the tokens after it.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'r, 't> {
    /// Deepest node matched.
    pub node: &'r CommandNode,
    /// Tokens not consumed by resolution.
    pub remaining: &'t [String],
}

/// Collects modules and descriptors, then builds a [`CommandRegistry`].
pub struct RegistryBuilder {
    resolver: PermissionResolver,
    parser: ArgumentParser,
    error_message: String,
    descriptors: Vec<CommandDescriptor>,
}

impl RegistryBuilder {
    /// Creates a builder.
    pub fn new(resolver: PermissionResolver, parser: ArgumentParser) -> Self {
        Self {
            resolver,
            parser,
            error_message: "Error running command.".to_string(),
            descriptors: Vec::new(),
        }
    }

    /// Sets the notice shown when a handler fails.
    #[must_use]
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    /// Adds a module's registration table.
    #[must_use]
    pub fn module<M: Module + ?Sized>(mut self, module: Arc<M>) -> Self {
        let name = module.name();
        let descriptors = module.commands();
        debug!(module = name, count = descriptors.len(), "Collected module commands");
        self.descriptors.extend(descriptors);
        self
    }

    /// Adds descriptors directly.
    #[must_use]
    pub fn descriptors(mut self, descriptors: impl IntoIterator<Item = CommandDescriptor>) -> Self {
        self.descriptors.extend(descriptors);
        self
    }

    /// Registers every descriptor in order. Any failure aborts the build.
    pub fn build(self) -> Result<CommandRegistry, RegistrationError> {
        let mut registry = CommandRegistry {
            root: CommandScope::default(),
            resolver: self.resolver,
            parser: self.parser,
            error_message: self.error_message,
        };
        for descriptor in self.descriptors {
            if let Err(e) = registry.register(descriptor) {
                error!(error = %e, "Command registration failed");
                return Err(e);
            }
        }
        info!(commands = registry.all_commands().len(), "Command registry built");
        Ok(registry)
    }
}

/// The command tree plus the collaborators needed to dispatch into it.
///
/// Built once at startup and read-only afterwards.
pub struct CommandRegistry {
    root: CommandScope,
    resolver: PermissionResolver,
    parser: ArgumentParser,
    error_message: String,
}

impl CommandRegistry {
    /// Starts a builder.
    pub fn builder(resolver: PermissionResolver, parser: ArgumentParser) -> RegistryBuilder {
        RegistryBuilder::new(resolver, parser)
    }

    fn register(&mut self, descriptor: CommandDescriptor) -> Result<(), RegistrationError> {
        let name = normalize_name(&descriptor.name)?;
        let aliases = descriptor
            .aliases
            .iter()
            .map(|alias| normalize_name(alias))
            .collect::<Result<Vec<_>, _>>()?;

        match descriptor.kind {
            DescriptorKind::Group => {
                if !descriptor.args.is_empty() {
                    return Err(RegistrationError::GroupWithArguments { name });
                }
                if descriptor.handler.is_some() {
                    return Err(RegistrationError::GroupWithHandler { name });
                }
            }
            DescriptorKind::Command => {
                if descriptor.handler.is_none() {
                    return Err(RegistrationError::MissingHandler { name });
                }
                if descriptor.perm_level == PermissionLevel::Disabled {
                    return Err(RegistrationError::DisabledPermission { name });
                }
                validate_arguments(&name, &descriptor)?;
            }
        }

        let parent_path = match &descriptor.parent {
            Some(path) => path
                .split_whitespace()
                .map(str::to_lowercase)
                .collect::<Vec<_>>(),
            None => Vec::new(),
        };
        let depth = parent_path.len() + 1;
        let max_depth = match descriptor.kind {
            DescriptorKind::Command => MAX_DEPTH,
            DescriptorKind::Group => MAX_DEPTH - 1,
        };

        let (scope, parent_full, parent_guild_only) = if parent_path.is_empty() {
            (&mut self.root, None, false)
        } else {
            let declared = descriptor.parent.clone().unwrap_or_default();
            let group = find_group_mut(&mut self.root, &parent_path, &name, &declared)?;
            let parent_full = group.info.full_name.clone();
            let guild_only = group.info.guild_only;
            (group.children_mut(), Some(parent_full), guild_only)
        };

        let full_name = parent_full
            .as_ref()
            .map_or_else(|| name.clone(), |parent| format!("{parent} {name}"));
        if depth > max_depth {
            return Err(RegistrationError::NestingTooDeep { name: full_name });
        }

        let usage = match descriptor.kind {
            DescriptorKind::Group => GROUP_USAGE.to_string(),
            DescriptorKind::Command => descriptor
                .usage
                .clone()
                .unwrap_or_else(|| auto_usage(&descriptor.args)),
        };

        let info = CommandInfo {
            name,
            aliases,
            perm_level: descriptor.perm_level,
            required_permission: descriptor.required_permission,
            description: descriptor.description,
            long_description: descriptor.long_description,
            usage,
            parent: parent_full.clone(),
            full_name: full_name.clone(),
            guild_only: descriptor.guild_only || parent_guild_only,
            slash: descriptor.slash,
        };

        let node = match (descriptor.kind, descriptor.handler) {
            (DescriptorKind::Command, Some(handler)) => CommandNode::Leaf(Command {
                info,
                args: descriptor
                    .args
                    .into_iter()
                    .map(|mut spec| {
                        spec.name = spec.name.to_lowercase();
                        spec
                    })
                    .collect(),
                handler,
            }),
            _ => CommandNode::Group(CommandGroup::new(info)),
        };

        let scope_label = parent_full.as_deref().unwrap_or(TOP_LEVEL);
        scope.insert(node, scope_label)?;
        debug!(command = %full_name, "Registered command");
        Ok(())
    }

    /// Top-level nodes in name order.
    pub fn commands(&self) -> impl Iterator<Item = &CommandNode> {
        self.root.iter()
    }

    /// Every node in the tree, parents before children.
    pub fn all_commands(&self) -> Vec<&CommandNode> {
        fn walk<'a>(scope: impl Iterator<Item = &'a CommandNode>, out: &mut Vec<&'a CommandNode>) {
            for node in scope {
                out.push(node);
                if let CommandNode::Group(group) = node {
                    walk(group.sub_commands(), out);
                }
            }
        }
        let mut out = Vec::new();
        walk(self.root.iter(), &mut out);
        out
    }

    /// Resolves leading tokens to a node, walking into groups while the next
    /// token names a child. Returns `None` when the first token is not a
    /// command.
    pub fn resolve<'r, 't>(&'r self, tokens: &'t [String]) -> Option<Resolved<'r, 't>> {
        let (first, mut remaining) = tokens.split_first()?;
        let mut node = self.root.get(first)?;

        while let CommandNode::Group(group) = node {
            let Some((next, rest)) = remaining.split_first() else {
                break;
            };
            match group.sub_command(next) {
                Some(child) => {
                    node = child;
                    remaining = rest;
                }
                None => break,
            }
        }

        Some(Resolved { node, remaining })
    }

    /// Finds the node whose full name is exactly `path`.
    pub fn find(&self, path: &str) -> Option<&CommandNode> {
        let tokens: Vec<String> = path.split_whitespace().map(str::to_string).collect();
        self.resolve(&tokens)
            .filter(|resolved| resolved.remaining.is_empty())
            .map(|resolved| resolved.node)
    }

    /// Permission resolver used for gating.
    pub const fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// Argument parser used for dispatch.
    pub const fn parser(&self) -> &ArgumentParser {
        &self.parser
    }

    /// Resolves and dispatches. `None` when the tokens are not a command.
    pub async fn process(
        &self,
        ctx: Arc<InvocationContext>,
        tokens: &[String],
    ) -> Option<DispatchOutcome> {
        let resolved = self.resolve(tokens)?;
        Some(self.dispatch(ctx, resolved.node, resolved.remaining).await)
    }

    /// Dispatches positional tokens to `node`.
    pub async fn dispatch(
        &self,
        ctx: Arc<InvocationContext>,
        node: &CommandNode,
        tokens: &[String],
    ) -> DispatchOutcome {
        self.dispatch_with(ctx, node, ArgumentInput::Positional(tokens.to_vec()))
            .await
    }

    /// Dispatches to `node` with either input shape.
    ///
    /// Gates run in order: guild-only, permission level, platform
    /// permissions, argument parsing. Denials are silent; parse failures
    /// show usage. Handler errors and panics are logged and answered with
    /// the generic error notice.
    pub async fn dispatch_with(
        &self,
        ctx: Arc<InvocationContext>,
        node: &CommandNode,
        input: ArgumentInput,
    ) -> DispatchOutcome {
        let span = info_span!(
            "invocation",
            id = %Uuid::new_v4(),
            command = %node.full_name(),
            user_id = %ctx.user().id,
            channel_id = %ctx.channel_id(),
        );
        self.dispatch_inner(ctx, node, input).instrument(span).await
    }

    async fn dispatch_inner(
        &self,
        ctx: Arc<InvocationContext>,
        node: &CommandNode,
        input: ArgumentInput,
    ) -> DispatchOutcome {
        if node.guild_only() && ctx.guild_id().is_none() {
            debug!("Guild-only command invoked outside a guild");
            return DispatchOutcome::Denied;
        }

        let level = self
            .resolver
            .compute_level(ctx.invoker(), ctx.channel_id())
            .await;
        if !PermissionResolver::gate(level, node) {
            debug!(level = %level, required = %node.perm_level(), "Permission denied");
            return DispatchOutcome::Denied;
        }

        let command = match node {
            CommandNode::Group(group) => {
                self.send(&ctx, Reply::new(UsageRenderer::group_help(group, level)).ephemeral())
                    .await;
                return DispatchOutcome::GroupHelpShown;
            }
            CommandNode::Leaf(command) => command,
        };

        if let Some(required) = command.info.required_permission {
            if !self
                .resolver
                .has_platform_permissions(ctx.invoker(), ctx.channel_id(), required)
                .await
            {
                debug!(?required, "Missing platform permissions");
                return DispatchOutcome::Denied;
            }
        }

        let args = match self
            .parser
            .parse_input(&input, &command.args, ctx.guild_id())
            .await
        {
            Ok(args) => args,
            Err(e) => {
                debug!(error = %e, "Argument parsing failed");
                self.send(&ctx, Reply::new(UsageRenderer::usage_notice(node, &e)).ephemeral())
                    .await;
                return DispatchOutcome::UsageShown;
            }
        };

        let run = (command.handler)(Arc::clone(&ctx), args);
        match AssertUnwindSafe(run).catch_unwind().await {
            Ok(Ok(())) => {
                debug!("Command completed");
                DispatchOutcome::Completed
            }
            Ok(Err(e)) => {
                error!(error = ?e, "Command handler failed");
                self.send(&ctx, Reply::new(self.error_message.clone()).ephemeral())
                    .await;
                DispatchOutcome::Failed
            }
            Err(payload) => {
                error!(panic = %panic_message(payload.as_ref()), "Command handler panicked");
                self.send(&ctx, Reply::new(self.error_message.clone()).ephemeral())
                    .await;
                DispatchOutcome::Failed
            }
        }
    }

    async fn send(&self, ctx: &InvocationContext, reply: Reply) {
        if let Err(e) = ctx.reply(reply).await {
            warn!(error = %e, "Failed to send reply");
        }
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.root.len())
            .finish_non_exhaustive()
    }
}

fn normalize_name(raw: &str) -> Result<String, RegistrationError> {
    if raw.is_empty() || raw.chars().any(char::is_whitespace) {
        return Err(RegistrationError::InvalidName {
            name: raw.to_string(),
        });
    }
    Ok(raw.to_lowercase())
}

fn validate_arguments(name: &str, descriptor: &CommandDescriptor) -> Result<(), RegistrationError> {
    let mut seen = HashSet::new();
    let mut optional_seen = false;
    let last = descriptor.args.len().saturating_sub(1);
    for (index, spec) in descriptor.args.iter().enumerate() {
        let argument = spec.name.to_lowercase();
        if argument.is_empty() || argument.chars().any(char::is_whitespace) {
            return Err(RegistrationError::InvalidArgumentName {
                name: name.to_string(),
                argument,
            });
        }
        if !seen.insert(argument.clone()) {
            return Err(RegistrationError::DuplicateArgument {
                name: name.to_string(),
                argument,
            });
        }
        if spec.optional {
            optional_seen = true;
        } else if optional_seen {
            return Err(RegistrationError::RequiredAfterOptional {
                name: name.to_string(),
                argument,
            });
        }
        if spec.rest && (index != last || spec.kind != ArgumentKind::String) {
            return Err(RegistrationError::MisplacedRest {
                name: name.to_string(),
                argument,
            });
        }
        if (spec.min.is_some() || spec.max.is_some()) && !spec.kind.is_numeric() {
            return Err(RegistrationError::BoundsOnNonNumeric {
                name: name.to_string(),
                argument,
            });
        }
    }
    Ok(())
}

fn find_group_mut<'a>(
    scope: &'a mut CommandScope,
    path: &[String],
    name: &str,
    declared: &str,
) -> Result<&'a mut CommandGroup, RegistrationError> {
    let Some((first, rest)) = path.split_first() else {
        return Err(RegistrationError::UnknownParent {
            name: name.to_string(),
            parent: declared.to_string(),
        });
    };
    match scope.get_mut(first) {
        None => Err(RegistrationError::UnknownParent {
            name: name.to_string(),
            parent: declared.to_string(),
        }),
        Some(CommandNode::Leaf(_)) => Err(RegistrationError::ParentNotGroup {
            name: name.to_string(),
            parent: declared.to_string(),
        }),
        Some(CommandNode::Group(group)) => {
            if rest.is_empty() {
                Ok(group)
            } else {
                find_group_mut(group.children_mut(), rest, name, declared)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::{tokenize, ArgumentSpec};
    use crate::command::handler;
    use crate::context::SourceKind;
    use crate::testing::{context, invoker, Harness, SinkEvent};
    use poise::serenity_prelude::Permissions;
    use proptest::prelude::*;
    use slowmander_common::test_utils::discord_fixtures::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn noop() -> crate::command::Handler {
        handler(|_, _| async { Ok(()) })
    }

    fn toks(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    fn set_table(calls: Arc<AtomicUsize>) -> Vec<CommandDescriptor> {
        vec![
            CommandDescriptor::group("set").description("Configure the bot"),
            CommandDescriptor::command(
                "prefix",
                handler(move |ctx, args| {
                    let calls = Arc::clone(&calls);
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        let prefix = args.string("prefix").unwrap_or_default().to_string();
                        ctx.reply(format!("Prefix set to {prefix}")).await?;
                        Ok(())
                    }
                }),
            )
            .parent("set")
            .aliases(["p"])
            .permission(PermissionLevel::Admin)
            .arg(ArgumentSpec::string("prefix")),
            CommandDescriptor::command("color", noop())
                .parent("set")
                .permission(PermissionLevel::Vip)
                .arg(ArgumentSpec::string("color")),
        ]
    }

    fn registry(harness: &Harness, table: Vec<CommandDescriptor>) -> CommandRegistry {
        harness.builder().descriptors(table).build().unwrap()
    }

    fn build_err(table: Vec<CommandDescriptor>) -> RegistrationError {
        Harness::default().builder().descriptors(table).build().unwrap_err()
    }

    #[test]
    fn test_full_names_follow_parent_chain() {
        let harness = Harness::default();
        let registry = registry(
            &harness,
            vec![
                CommandDescriptor::group("config"),
                CommandDescriptor::group("roles").parent("config"),
                CommandDescriptor::command("add", noop()).parent("config roles"),
                CommandDescriptor::command("show", noop()).parent("config"),
                CommandDescriptor::command("ping", noop()),
            ],
        );

        let names: Vec<&str> = registry.all_commands().iter().map(|n| n.full_name()).collect();
        assert_eq!(
            names,
            vec!["config", "config roles", "config roles add", "config show", "ping"]
        );

        for node in registry.all_commands() {
            let expected = match &node.info().parent {
                Some(parent) => format!("{parent} {}", node.name()),
                None => node.name().to_string(),
            };
            assert_eq!(node.full_name(), expected);
        }
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(unique.len(), names.len());
        assert!(registry.find("config roles add").is_some());
        assert!(registry.find("config roles add extra").is_none());
    }

    #[test]
    fn test_resolve_set_prefix_scenario() {
        let harness = Harness::default();
        let registry = registry(&harness, set_table(Arc::default()));

        let tokens = toks(&["set", "prefix", "!!"]);
        let resolved = registry.resolve(&tokens).unwrap();
        assert_eq!(resolved.node.full_name(), "set prefix");
        assert_eq!(resolved.remaining, &toks(&["!!"])[..]);

        let bare = toks(&["set"]);
        let resolved = registry.resolve(&bare).unwrap();
        assert!(resolved.node.is_group());
        assert!(resolved.remaining.is_empty());

        let unmatched = toks(&["set", "nope", "x"]);
        let resolved = registry.resolve(&unmatched).unwrap();
        assert_eq!(resolved.node.full_name(), "set");
        assert_eq!(resolved.remaining, &toks(&["nope", "x"])[..]);

        assert!(registry.resolve(&toks(&["hello", "there"])).is_none());
        assert!(registry.resolve(&[]).is_none());
    }

    #[test]
    fn test_lookup_ignores_case_and_follows_aliases() {
        let harness = Harness::default();
        let registry = registry(&harness, set_table(Arc::default()));
        let tokens = toks(&["SET", "P", "x"]);
        let resolved = registry.resolve(&tokens).unwrap();
        assert_eq!(resolved.node.full_name(), "set prefix");
    }

    #[test]
    fn test_quoted_arguments_stay_whole() {
        let harness = Harness::default();
        let registry = registry(
            &harness,
            vec![CommandDescriptor::command("say", noop())
                .arg(ArgumentSpec::string("text"))
                .arg(ArgumentSpec::channel("where"))],
        );
        let tokens = tokenize(r#"say "hello world" general"#);
        let resolved = registry.resolve(&tokens).unwrap();
        assert_eq!(resolved.remaining, &toks(&["hello world", "general"])[..]);
    }

    #[test]
    fn test_group_level_is_min_of_children() {
        let harness = Harness::default();
        let registry = registry(&harness, set_table(Arc::default()));
        let set = registry.find("set").unwrap();
        assert_eq!(set.perm_level(), PermissionLevel::Vip);
        assert_eq!(set.usage(), GROUP_USAGE);
        assert_eq!(registry.find("set prefix").unwrap().usage(), "<prefix>");
    }

    #[tokio::test]
    async fn test_dispatch_admin_runs_everyone_is_silent() {
        let harness = Harness::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = registry(&harness, set_table(Arc::clone(&calls)));
        let (admin, _, _) = test_role_ids();
        let tokens = toks(&["set", "prefix", "!!"]);

        let (ctx, sink) = context(
            harness.guild_invoker(test_user_id(), vec![admin]),
            SourceKind::Message,
        );
        assert_eq!(registry.process(ctx, &tokens).await, Some(DispatchOutcome::Completed));
        assert_eq!(sink.contents(), vec!["Prefix set to !!"]);

        let (ctx, sink) = context(
            harness.guild_invoker(test_user_id(), vec![]),
            SourceKind::Message,
        );
        assert_eq!(registry.process(ctx, &tokens).await, Some(DispatchOutcome::Denied));
        assert!(sink.events().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bare_group_shows_filtered_help() {
        let harness = Harness::default();
        let registry = registry(&harness, set_table(Arc::default()));
        let (_, _, vip) = test_role_ids();

        let (ctx, sink) = context(
            harness.guild_invoker(test_user_id(), vec![vip]),
            SourceKind::Interaction,
        );
        let outcome = registry.process(ctx, &toks(&["set"])).await;
        assert_eq!(outcome, Some(DispatchOutcome::GroupHelpShown));

        let help = sink.contents().join("\n");
        assert!(help.contains("set color"));
        assert!(!help.contains("set prefix"));
    }

    #[tokio::test]
    async fn test_group_unreachable_by_everyone_is_silent() {
        let harness = Harness::default();
        let registry = registry(&harness, set_table(Arc::default()));
        let (ctx, sink) = context(invoker(test_user_id(), None), SourceKind::Message);
        let outcome = registry.process(ctx, &toks(&["set", "unknown"])).await;
        assert_eq!(outcome, Some(DispatchOutcome::Denied));
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_missing_argument_shows_usage() {
        let harness = Harness::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = registry(&harness, set_table(Arc::clone(&calls)));

        let (ctx, sink) = context(invoker(test_owner_id(), None), SourceKind::Message);
        let outcome = registry.process(ctx, &toks(&["set", "prefix"])).await;
        assert_eq!(outcome, Some(DispatchOutcome::UsageShown));
        assert!(sink.contents()[0].contains("`set prefix <prefix>`"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handler_error_and_panic_are_contained() {
        let harness = Harness::default();
        let registry = registry(
            &harness,
            vec![
                CommandDescriptor::command(
                    "fail",
                    handler(|_, _| async { Err(anyhow::anyhow!("database unavailable")) }),
                ),
                CommandDescriptor::command(
                    "boom",
                    handler(|_, _| async {
                        let state: Option<()> = None;
                        state.expect("handler exploded");
                        Ok(())
                    }),
                ),
            ],
        );

        for name in ["fail", "boom"] {
            let (ctx, sink) = context(invoker(test_user_id(), None), SourceKind::Interaction);
            let outcome = registry.process(ctx, &toks(&[name])).await;
            assert_eq!(outcome, Some(DispatchOutcome::Failed));
            assert_eq!(
                sink.events(),
                vec![SinkEvent::Initial(Reply::new("Error running command.").ephemeral())]
            );
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_affect_concurrent_dispatch() {
        let harness = Harness::default();
        let registry = Arc::new(registry(
            &harness,
            vec![
                CommandDescriptor::command(
                    "boom",
                    handler(|_, _| async {
                        tokio::task::yield_now().await;
                        let state: Option<()> = None;
                        state.expect("handler exploded");
                        Ok(())
                    }),
                ),
                CommandDescriptor::command(
                    "ok",
                    handler(|ctx: Arc<InvocationContext>, _| async move {
                        tokio::task::yield_now().await;
                        ctx.reply("fine").await?;
                        Ok(())
                    }),
                ),
            ],
        ));

        let spawn = |name: &'static str| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let (ctx, _) = context(invoker(test_user_id(), None), SourceKind::Message);
                registry.process(ctx, &toks(&[name])).await
            })
        };
        let (boom, ok) = tokio::join!(spawn("boom"), spawn("ok"));
        assert_eq!(boom.unwrap(), Some(DispatchOutcome::Failed));
        assert_eq!(ok.unwrap(), Some(DispatchOutcome::Completed));
    }

    #[tokio::test]
    async fn test_guild_only_outside_guild_is_silent() {
        let harness = Harness::default();
        let registry = registry(
            &harness,
            vec![CommandDescriptor::command("kick", noop()).guild_only()],
        );
        let (ctx, sink) = context(invoker(test_owner_id(), None), SourceKind::Message);
        assert_eq!(
            registry.process(ctx, &toks(&["kick"])).await,
            Some(DispatchOutcome::Denied)
        );
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_children_inherit_guild_only() {
        let harness = Harness::default();
        let registry = registry(
            &harness,
            vec![
                CommandDescriptor::group("set").guild_only(),
                CommandDescriptor::command("prefix", noop()).parent("set"),
            ],
        );
        assert!(registry.find("set prefix").unwrap().guild_only());
    }

    #[tokio::test]
    async fn test_platform_permission_requirement() {
        let mut harness = Harness::default();
        harness.capabilities = harness.capabilities.clone().granting(Permissions::KICK_MEMBERS);
        let registry = registry(
            &harness,
            vec![
                CommandDescriptor::command("kick", noop()).requires(Permissions::KICK_MEMBERS),
                CommandDescriptor::command("ban", noop()).requires(Permissions::BAN_MEMBERS),
            ],
        );

        let member = || harness.guild_invoker(test_user_id(), vec![]);
        let (ctx, _) = context(member(), SourceKind::Message);
        assert_eq!(registry.process(ctx, &toks(&["kick"])).await, Some(DispatchOutcome::Completed));

        let (ctx, sink) = context(member(), SourceKind::Message);
        assert_eq!(registry.process(ctx, &toks(&["ban"])).await, Some(DispatchOutcome::Denied));
        assert!(sink.events().is_empty());

        let (ctx, _) = context(invoker(test_user_id(), None), SourceKind::Message);
        assert_eq!(registry.process(ctx, &toks(&["kick"])).await, Some(DispatchOutcome::Denied));

        let (ctx, _) = context(invoker(test_owner_id(), None), SourceKind::Message);
        assert_eq!(registry.process(ctx, &toks(&["ban"])).await, Some(DispatchOutcome::Completed));
    }

    #[tokio::test]
    async fn test_disabled_member_cannot_run_everyone_commands() {
        let mut harness = Harness::default();
        harness.capabilities = crate::testing::FakeCapabilities::denying(test_channel_id());
        let registry = registry(&harness, vec![CommandDescriptor::command("ping", noop())]);

        let (ctx, sink) = context(
            harness.guild_invoker(test_user_id(), vec![]),
            SourceKind::Message,
        );
        assert_eq!(registry.process(ctx, &toks(&["ping"])).await, Some(DispatchOutcome::Denied));
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_named_input_dispatch() {
        let harness = Harness::default();
        let registry = registry(&harness, set_table(Arc::default()));
        let node = registry.find("set prefix").unwrap();
        let mut named = std::collections::HashMap::new();
        named.insert("prefix".to_string(), "?".to_string());

        let (ctx, sink) = context(invoker(test_owner_id(), None), SourceKind::Interaction);
        let outcome = registry
            .dispatch_with(ctx, node, ArgumentInput::Named(named))
            .await;
        assert_eq!(outcome, DispatchOutcome::Completed);
        assert_eq!(sink.contents(), vec!["Prefix set to ?"]);
    }

    #[test]
    fn test_registration_errors() {
        assert!(matches!(
            build_err(vec![CommandDescriptor::group("set").arg(ArgumentSpec::string("x"))]),
            RegistrationError::GroupWithArguments { .. }
        ));
        assert!(matches!(
            build_err(vec![CommandDescriptor::group("set").handler(noop())]),
            RegistrationError::GroupWithHandler { .. }
        ));
        assert!(matches!(
            build_err(vec![CommandDescriptor::command("prefix", noop()).parent("set")]),
            RegistrationError::UnknownParent { .. }
        ));
        assert!(matches!(
            build_err(vec![
                CommandDescriptor::command("ping", noop()),
                CommandDescriptor::command("pong", noop()).parent("ping"),
            ]),
            RegistrationError::ParentNotGroup { .. }
        ));
        assert!(matches!(
            build_err(vec![
                CommandDescriptor::command("ping", noop()),
                CommandDescriptor::command("PING", noop()),
            ]),
            RegistrationError::DuplicateName { .. }
        ));
        assert!(matches!(
            build_err(vec![
                CommandDescriptor::command("ping", noop()).aliases(["p"]),
                CommandDescriptor::command("pong", noop()).aliases(["p"]),
            ]),
            RegistrationError::DuplicateName { .. }
        ));
        assert!(matches!(
            build_err(vec![
                CommandDescriptor::group("a"),
                CommandDescriptor::group("b").parent("a"),
                CommandDescriptor::group("c").parent("a b"),
            ]),
            RegistrationError::NestingTooDeep { .. }
        ));
        assert!(matches!(
            build_err(vec![
                CommandDescriptor::command("x", noop()).permission(PermissionLevel::Disabled)
            ]),
            RegistrationError::DisabledPermission { .. }
        ));
        assert!(matches!(
            build_err(vec![CommandDescriptor::command("x", noop())
                .arg(ArgumentSpec::string("a").optional())
                .arg(ArgumentSpec::string("b"))]),
            RegistrationError::RequiredAfterOptional { .. }
        ));
        assert!(matches!(
            build_err(vec![CommandDescriptor::command("x", noop())
                .arg(ArgumentSpec::string("a"))
                .arg(ArgumentSpec::int("A"))]),
            RegistrationError::DuplicateArgument { .. }
        ));
        assert!(matches!(
            build_err(vec![
                CommandDescriptor::command("x", noop()).arg(ArgumentSpec::string("a").min(1.0))
            ]),
            RegistrationError::BoundsOnNonNumeric { .. }
        ));
        assert!(matches!(
            build_err(vec![CommandDescriptor::command("x", noop())
                .arg(ArgumentSpec::string("a").rest())
                .arg(ArgumentSpec::string("b"))]),
            RegistrationError::MisplacedRest { .. }
        ));
        assert!(matches!(
            build_err(vec![
                CommandDescriptor::command("x", noop()).arg(ArgumentSpec::int("n").rest())
            ]),
            RegistrationError::MisplacedRest { .. }
        ));
        assert!(matches!(
            build_err(vec![CommandDescriptor::command("two words", noop())]),
            RegistrationError::InvalidName { .. }
        ));
    }

    #[test]
    fn test_same_name_in_different_scopes_is_allowed() {
        let harness = Harness::default();
        let registry = registry(
            &harness,
            vec![
                CommandDescriptor::command("list", noop()),
                CommandDescriptor::group("roles"),
                CommandDescriptor::command("list", noop()).parent("roles"),
            ],
        );
        assert!(registry.find("list").is_some());
        assert!(registry.find("roles list").is_some());
    }

    proptest! {
        #[test]
        fn test_gate_matches_numeric_order(invoker in 0usize..6, required in 1usize..6) {
            let invoker = PermissionLevel::ALL[invoker];
            let required = PermissionLevel::ALL[required];
            let harness = Harness::default();
            let registry = registry(
                &harness,
                vec![CommandDescriptor::command("x", noop()).permission(required)],
            );
            let node = registry.find("x").unwrap();
            prop_assert_eq!(
                PermissionResolver::gate(invoker, node),
                invoker.value() >= required.value()
            );
            prop_assert!(PermissionResolver::gate(PermissionLevel::Owner, node));
            prop_assert!(!PermissionResolver::gate(PermissionLevel::Disabled, node));
        }
    }
}
