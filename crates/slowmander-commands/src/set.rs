//! `set` group: per-guild prefix and permission roles.

use crate::arguments::{ArgumentSpec, Arguments};
use crate::command::{handler, CommandResult};
use crate::context::InvocationContext;
use crate::module::{CommandDescriptor, Module};
use crate::permissions::PermissionLevel;
use anyhow::Context as _;
use slowmander_common::utils::escape_markdown;
use slowmander_config::{ConfigValidator, GuildSettingsStore};
use std::sync::Arc;
use tracing::info;

/// Which level a role command configures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoleSlot {
    Admin,
    Mod,
    Vip,
}

impl RoleSlot {
    const fn label(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Mod => "Mod",
            Self::Vip => "VIP",
        }
    }
}

/// Provides `set prefix`, `set adminrole`, `set modrole` and `set viprole`.
#[derive(Debug)]
pub struct SetModule {
    settings: Arc<GuildSettingsStore>,
}

impl SetModule {
    /// Creates the module writing to `settings`.
    pub fn new(settings: Arc<GuildSettingsStore>) -> Self {
        Self { settings }
    }

    async fn prefix(&self, ctx: Arc<InvocationContext>, args: Arguments) -> CommandResult {
        let guild = ctx.guild_id().context("set prefix requires a guild")?;
        let prefix = args.string("prefix").context("prefix argument missing")?;

        if let Err(reason) = ConfigValidator::validate_prefix(prefix) {
            ctx.reply(reason).await?;
            return Ok(());
        }

        self.settings.set_prefix(guild, prefix);
        info!(guild_id = %guild, prefix, "Guild prefix changed");
        ctx.reply(format!("Prefix set to **{}**.", escape_markdown(prefix)))
            .await?;
        Ok(())
    }

    async fn role(
        &self,
        ctx: Arc<InvocationContext>,
        args: Arguments,
        slot: RoleSlot,
    ) -> CommandResult {
        let guild = ctx.guild_id().context("role commands require a guild")?;
        let role = args.role("role").context("role argument missing")?;

        match slot {
            RoleSlot::Admin => self.settings.set_admin_role(guild, role.id),
            RoleSlot::Mod => self.settings.set_mod_role(guild, role.id),
            RoleSlot::Vip => self.settings.set_vip_role(guild, role.id),
        }
        info!(
            guild_id = %guild,
            role_id = %role.id,
            level = slot.label(),
            "Permission role changed"
        );
        ctx.reply(format!("{} role set to {}.", slot.label(), role.mention()))
            .await?;
        Ok(())
    }

    fn role_command(self: &Arc<Self>, name: &str, slot: RoleSlot) -> CommandDescriptor {
        let this = Arc::clone(self);
        CommandDescriptor::command(
            name,
            handler(move |ctx, args| {
                let this = Arc::clone(&this);
                async move { this.role(ctx, args, slot).await }
            }),
        )
        .parent("set")
        .permission(PermissionLevel::Admin)
        .description(format!("Set the role granting the {} level", slot.label()))
        .arg(ArgumentSpec::role("role").describe("Role to use"))
    }
}

impl Module for SetModule {
    fn name(&self) -> &'static str {
        "set"
    }

    fn commands(self: Arc<Self>) -> Vec<CommandDescriptor> {
        let this = Arc::clone(&self);
        vec![
            CommandDescriptor::group("set")
                .guild_only()
                .description("Configure the bot for this server"),
            CommandDescriptor::command(
                "prefix",
                handler(move |ctx, args| {
                    let this = Arc::clone(&this);
                    async move { this.prefix(ctx, args).await }
                }),
            )
            .parent("set")
            .permission(PermissionLevel::Admin)
            .description("Change the command prefix")
            .arg(ArgumentSpec::string("prefix").describe("New prefix")),
            self.role_command("adminrole", RoleSlot::Admin),
            self.role_command("modrole", RoleSlot::Mod),
            self.role_command("viprole", RoleSlot::Vip),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::tokenize;
    use crate::context::SourceKind;
    use crate::permissions::PermissionResolver;
    use crate::registry::{CommandRegistry, DispatchOutcome};
    use crate::testing::{context, invoker, Harness};
    use slowmander_common::test_utils::discord_fixtures::*;
    use slowmander_common::RoleId;

    fn registry(harness: &Harness) -> CommandRegistry {
        harness
            .builder()
            .module(Arc::new(SetModule::new(Arc::clone(&harness.settings))))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_admin_sets_prefix() {
        let harness = Harness::default();
        let registry = registry(&harness);
        let (admin, _, _) = test_role_ids();

        let (ctx, sink) = context(
            harness.guild_invoker(test_user_id(), vec![admin]),
            SourceKind::Message,
        );
        let outcome = registry.process(ctx, &tokenize("set prefix ??")).await;
        assert_eq!(outcome, Some(DispatchOutcome::Completed));
        assert_eq!(harness.settings.prefix(Some(test_guild_id())), "??");
        assert_eq!(sink.contents(), vec!["Prefix set to **??**."]);
    }

    #[tokio::test]
    async fn test_rejects_invalid_prefix() {
        let harness = Harness::default();
        let registry = registry(&harness);

        let (ctx, sink) = context(
            harness.guild_invoker(test_owner_id(), vec![]),
            SourceKind::Message,
        );
        registry.process(ctx, &tokenize(r#"set prefix "a b""#)).await;
        assert_eq!(harness.settings.prefix(Some(test_guild_id())), "!");
        assert!(sink.contents()[0].contains("whitespace"));
    }

    #[tokio::test]
    async fn test_role_change_is_visible_to_next_check() {
        let harness = Harness::default();
        let registry = registry(&harness);
        let (admin, moderator, _) = test_role_ids();
        let new_vip = RoleId(300_000_000_000_000_002);

        let (ctx, sink) = context(
            harness.guild_invoker(test_user_id(), vec![admin]),
            SourceKind::Message,
        );
        let outcome = registry
            .process(ctx, &tokenize(&format!("set viprole <@&{new_vip}>")))
            .await;
        assert_eq!(outcome, Some(DispatchOutcome::Completed));
        assert_eq!(sink.contents(), vec![format!("VIP role set to <@&{new_vip}>.")]);

        // Mod and VIP now share a role; the first match wins.
        let who = harness.guild_invoker(test_user_id(), vec![moderator]);
        let level = harness.resolver().compute_level(&who, test_channel_id()).await;
        assert_eq!(level, PermissionLevel::Mod);
        assert_eq!(harness.settings.get(test_guild_id()).vip_role, Some(new_vip));
    }

    #[tokio::test]
    async fn test_set_is_ignored_outside_guilds() {
        let harness = Harness::default();
        let registry = registry(&harness);
        let (ctx, sink) = context(invoker(test_owner_id(), None), SourceKind::Message);
        let outcome = registry.process(ctx, &tokenize("set prefix ?")).await;
        assert_eq!(outcome, Some(DispatchOutcome::Denied));
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_set_group_requires_admin() {
        let harness = Harness::default();
        let registry = registry(&harness);
        let set = registry.find("set").unwrap();
        assert_eq!(set.perm_level(), PermissionLevel::Admin);
        assert!(!PermissionResolver::gate(PermissionLevel::Mod, set));
    }
}
