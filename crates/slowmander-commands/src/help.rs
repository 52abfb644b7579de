//! Help command listing what the invoker may run.

use crate::arguments::{tokenize, ArgumentSpec, Arguments};
use crate::command::{handler, CommandResult};
use crate::context::{InvocationContext, Reply};
use crate::module::{CommandDescriptor, Module};
use crate::permissions::PermissionResolver;
use crate::registry::CommandRegistry;
use crate::usage::UsageRenderer;
use anyhow::Context as _;
use once_cell::sync::OnceCell;
use std::sync::{Arc, Weak};

/// Provides `help [command]`.
///
/// The registry is attached after it is built, since the registry itself is
/// built from this module's table.
#[derive(Debug, Default)]
pub struct HelpModule {
    registry: OnceCell<Weak<CommandRegistry>>,
}

impl HelpModule {
    /// Creates an unattached module.
    pub fn new() -> Self {
        Self::default()
    }

    /// Points the module at the registry it describes. Later calls are
    /// ignored.
    pub fn attach(&self, registry: &Arc<CommandRegistry>) {
        let _ = self.registry.set(Arc::downgrade(registry));
    }

    async fn help(&self, ctx: Arc<InvocationContext>, args: Arguments) -> CommandResult {
        let registry = self
            .registry
            .get()
            .and_then(Weak::upgrade)
            .context("help is not attached to a registry")?;

        let level = registry
            .resolver()
            .compute_level(ctx.invoker(), ctx.channel_id())
            .await;

        let text = match args.string("command") {
            None => UsageRenderer::command_list(registry.commands(), level),
            Some(path) => {
                let tokens = tokenize(path);
                match registry.resolve(&tokens) {
                    Some(found)
                        if found.remaining.is_empty()
                            && PermissionResolver::gate(level, found.node) =>
                    {
                        UsageRenderer::command_help(found.node, level)
                    }
                    _ => format!("Unknown command `{path}`."),
                }
            }
        };

        ctx.reply(Reply::new(text).ephemeral()).await?;
        Ok(())
    }
}

impl Module for HelpModule {
    fn name(&self) -> &'static str {
        "help"
    }

    fn commands(self: Arc<Self>) -> Vec<CommandDescriptor> {
        vec![CommandDescriptor::command(
            "help",
            handler(move |ctx, args| {
                let this = Arc::clone(&self);
                async move { this.help(ctx, args).await }
            }),
        )
        .aliases(["commands"])
        .description("List commands or show help for one")
        .arg(
            ArgumentSpec::string("command")
                .describe("Command to describe")
                .rest()
                .optional(),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::handler;
    use crate::context::SourceKind;
    use crate::permissions::PermissionLevel;
    use crate::registry::DispatchOutcome;
    use crate::testing::{context, invoker, Harness};
    use slowmander_common::test_utils::discord_fixtures::*;

    fn registry(harness: &Harness) -> Arc<CommandRegistry> {
        let help = Arc::new(HelpModule::new());
        let registry = harness
            .builder()
            .module(Arc::clone(&help))
            .descriptors([
                CommandDescriptor::command("ping", handler(|_, _| async { Ok(()) }))
                    .description("Pong"),
                CommandDescriptor::command("shutdown", handler(|_, _| async { Ok(()) }))
                    .permission(PermissionLevel::Owner),
                CommandDescriptor::group("set").description("Change settings"),
                CommandDescriptor::command("prefix", handler(|_, _| async { Ok(()) }))
                    .parent("set")
                    .description("Change prefix"),
            ])
            .build()
            .unwrap();
        let registry = Arc::new(registry);
        help.attach(&registry);
        registry
    }

    fn tokens(raw: &str) -> Vec<String> {
        tokenize(raw)
    }

    #[tokio::test]
    async fn test_list_is_filtered_by_level() {
        let harness = Harness::default();
        let registry = registry(&harness);

        let (ctx, sink) = context(invoker(test_user_id(), None), SourceKind::Message);
        assert_eq!(
            registry.process(ctx, &tokens("help")).await,
            Some(DispatchOutcome::Completed)
        );
        let text = sink.contents().join("\n");
        assert!(text.contains("`ping` - Pong"));
        assert!(!text.contains("shutdown"));

        let (ctx, sink) = context(invoker(test_owner_id(), None), SourceKind::Message);
        registry.process(ctx, &tokens("help")).await;
        assert!(sink.contents().join("\n").contains("shutdown"));
    }

    #[tokio::test]
    async fn test_help_for_one_command() {
        let harness = Harness::default();
        let registry = registry(&harness);

        let (ctx, sink) = context(invoker(test_user_id(), None), SourceKind::Message);
        registry.process(ctx, &tokens("commands ping")).await;
        assert!(sink.contents()[0].starts_with("**ping**"));

        // Unreachable commands look the same as unknown ones.
        let (ctx, sink) = context(invoker(test_user_id(), None), SourceKind::Message);
        registry.process(ctx, &tokens("help shutdown")).await;
        assert_eq!(sink.contents(), vec!["Unknown command `shutdown`."]);
    }

    #[tokio::test]
    async fn test_help_follows_unquoted_subcommand_path() {
        let harness = Harness::default();
        let registry = registry(&harness);

        let (ctx, sink) = context(invoker(test_user_id(), None), SourceKind::Message);
        registry.process(ctx, &tokens("help set prefix")).await;
        assert!(sink.contents()[0].starts_with("**set prefix**"));

        let (ctx, sink) = context(invoker(test_user_id(), None), SourceKind::Message);
        registry.process(ctx, &tokens("help set")).await;
        assert!(sink.contents()[0].starts_with("**set**"));

        let (ctx, sink) = context(invoker(test_user_id(), None), SourceKind::Message);
        registry.process(ctx, &tokens("help set nothing")).await;
        assert_eq!(sink.contents(), vec!["Unknown command `set nothing`."]);
    }

    #[tokio::test]
    async fn test_unattached_help_fails_gracefully() {
        let harness = Harness::default();
        let registry = harness
            .builder()
            .module(Arc::new(HelpModule::new()))
            .build()
            .unwrap();

        let (ctx, sink) = context(invoker(test_user_id(), None), SourceKind::Message);
        assert_eq!(
            registry.process(ctx, &tokens("help")).await,
            Some(DispatchOutcome::Failed)
        );
        assert_eq!(sink.contents(), vec!["Error running command."]);
    }
}
