//! Registry setup and built-in module registration.

use crate::arguments::ArgumentParser;
use crate::directory::{DirectoryLookup, OwnerDirectory, PlatformCapabilityCheck};
use crate::error::RegistrationError;
use crate::help::HelpModule;
use crate::module::Module;
use crate::permissions::PermissionResolver;
use crate::ping::PingModule;
use crate::registry::CommandRegistry;
use crate::set::SetModule;
use slowmander_config::GuildSettingsStore;
use std::sync::Arc;
use tracing::info;

/// Platform-facing collaborators the registry consults at dispatch time.
#[derive(Clone)]
pub struct Collaborators {
    /// Bot owner lookup.
    pub owners: Arc<dyn OwnerDirectory>,
    /// Per-guild prefix and roles; also the role config for levels.
    pub settings: Arc<GuildSettingsStore>,
    /// Entity lookup for argument coercion.
    pub directory: Arc<dyn DirectoryLookup>,
    /// Channel capability and platform permission checks.
    pub capabilities: Arc<dyn PlatformCapabilityCheck>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Builds the registry with `help`, `ping` and `set` plus `modules`.
///
/// Fails when any registration is invalid; the caller should treat that as
/// fatal at startup.
pub fn create_registry(
    collaborators: &Collaborators,
    error_message: impl Into<String>,
    modules: impl IntoIterator<Item = Arc<dyn Module>>,
) -> Result<Arc<CommandRegistry>, RegistrationError> {
    let resolver = PermissionResolver::new(
        Arc::clone(&collaborators.owners),
        collaborators.settings.clone(),
        Arc::clone(&collaborators.capabilities),
    );
    let parser = ArgumentParser::new(Arc::clone(&collaborators.directory));

    let help = Arc::new(HelpModule::new());
    let mut builder = CommandRegistry::builder(resolver, parser)
        .error_message(error_message)
        .module(Arc::clone(&help))
        .module(Arc::new(PingModule))
        .module(Arc::new(SetModule::new(Arc::clone(&collaborators.settings))));
    for module in modules {
        builder = builder.module(module);
    }

    let registry = Arc::new(builder.build()?);
    help.attach(&registry);
    info!(commands = registry.all_commands().len(), "Command registry ready");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::{tokenize, ArgumentSpec};
    use crate::command::handler;
    use crate::context::SourceKind;
    use crate::module::CommandDescriptor;
    use crate::registry::DispatchOutcome;
    use crate::testing::{context, invoker, Harness};
    use slowmander_common::test_utils::discord_fixtures::*;

    struct Extra;

    impl Module for Extra {
        fn name(&self) -> &'static str {
            "extra"
        }

        fn commands(self: Arc<Self>) -> Vec<CommandDescriptor> {
            vec![CommandDescriptor::command("echo", handler(|ctx, args| async move {
                let text = args.string("text").unwrap_or_default().to_string();
                ctx.reply(text).await?;
                Ok(())
            }))
            .arg(ArgumentSpec::string("text").optional())]
        }
    }

    fn collaborators(harness: &Harness) -> Collaborators {
        Collaborators {
            owners: Arc::new(harness.owners.clone()),
            settings: Arc::clone(&harness.settings),
            directory: Arc::new(harness.directory.clone()),
            capabilities: Arc::new(harness.capabilities.clone()),
        }
    }

    #[test]
    fn test_builtins_are_registered() {
        let harness = Harness::default();
        let registry = create_registry(&collaborators(&harness), "oops", Vec::new()).unwrap();
        for path in ["help", "commands", "ping", "set", "set prefix", "set viprole"] {
            assert!(registry.find(path).is_some(), "{path} should be registered");
        }
    }

    #[tokio::test]
    async fn test_extra_modules_and_attached_help() {
        let harness = Harness::default();
        let extra: Arc<dyn Module> = Arc::new(Extra);
        let registry = create_registry(&collaborators(&harness), "oops", [extra]).unwrap();

        let (ctx, sink) = context(invoker(test_user_id(), None), SourceKind::Message);
        let outcome = registry.process(ctx, &tokenize(r#"echo "hi there""#)).await;
        assert_eq!(outcome, Some(DispatchOutcome::Completed));
        assert_eq!(sink.contents(), vec!["hi there"]);

        let (ctx, sink) = context(invoker(test_user_id(), None), SourceKind::Message);
        registry.process(ctx, &tokenize("help")).await;
        let text = sink.contents().join("\n");
        assert!(text.contains("echo"));
        assert!(!text.contains("`set"));
    }

    #[test]
    fn test_conflicting_module_fails() {
        struct Clash;
        impl Module for Clash {
            fn name(&self) -> &'static str {
                "clash"
            }
            fn commands(self: Arc<Self>) -> Vec<CommandDescriptor> {
                vec![CommandDescriptor::command("PING", handler(|_, _| async { Ok(()) }))]
            }
        }

        let harness = Harness::default();
        let clash: Arc<dyn Module> = Arc::new(Clash);
        let err = create_registry(&collaborators(&harness), "oops", [clash]).unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateName { .. }));
    }
}
