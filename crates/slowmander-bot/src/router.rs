//! Routes gateway events into the command registry.
//!
//! Every invocation is dispatched on its own task so a slow or failing
//! handler never holds up the gateway.

use crate::discord::is_guild_owner;
use crate::sinks::{InteractionReplySink, MessageReplySink};
use poise::serenity_prelude as serenity;
use slowmander_commands::{
    tokenize, ArgumentInput, CommandRegistry, InvocationContext, Invoker, InvokingMember,
    ResolvedUser,
};
use slowmander_common::{ChannelId, GuildId, RoleId, UserId};
use slowmander_config::{ConfigCache, GuildSettingsStore};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Text after `prefix`, tokenized. `None` when the message is not a command.
pub fn message_tokens(content: &str, prefix: &str) -> Option<Vec<String>> {
    let rest = content.strip_prefix(prefix)?;
    let tokens = tokenize(rest);
    (!tokens.is_empty()).then_some(tokens)
}

/// Renders one interaction option value the way a user would type it.
pub fn render_option(value: &serenity::CommandDataOptionValue) -> Option<String> {
    use serenity::CommandDataOptionValue as Value;
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Integer(number) => Some(number.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Boolean(flag) => Some(flag.to_string()),
        Value::User(id) => Some(id.get().to_string()),
        Value::Channel(id) => Some(id.get().to_string()),
        Value::Role(id) => Some(id.get().to_string()),
        Value::Mentionable(id) => Some(id.get().to_string()),
        _ => None,
    }
}

fn collect_options(
    options: &[serenity::CommandDataOption],
    path: &mut Vec<String>,
    named: &mut HashMap<String, String>,
) {
    for option in options {
        match &option.value {
            serenity::CommandDataOptionValue::SubCommandGroup(children)
            | serenity::CommandDataOptionValue::SubCommand(children) => {
                path.push(option.name.clone());
                collect_options(children, path, named);
            }
            value => {
                if let Some(rendered) = render_option(value) {
                    named.insert(option.name.clone(), rendered);
                }
            }
        }
    }
}

/// Command path and named argument values of a slash command.
pub fn interaction_input(data: &serenity::CommandData) -> (Vec<String>, HashMap<String, String>) {
    let mut path = vec![data.name.clone()];
    let mut named = HashMap::new();
    collect_options(&data.options, &mut path, &mut named);
    (path, named)
}

fn resolved_user(user: &serenity::User) -> ResolvedUser {
    ResolvedUser {
        id: UserId(user.id.get()),
        name: user.name.clone(),
        bot: user.bot,
    }
}

fn role_ids(roles: &[serenity::RoleId]) -> Vec<RoleId> {
    roles.iter().map(|role| RoleId(role.get())).collect()
}

/// Shared state the gateway handlers route with.
#[derive(Clone)]
pub struct Router {
    registry: Arc<CommandRegistry>,
    settings: Arc<GuildSettingsStore>,
    config: Arc<ConfigCache>,
}

impl Router {
    /// Creates a router over a built registry.
    pub const fn new(
        registry: Arc<CommandRegistry>,
        settings: Arc<GuildSettingsStore>,
        config: Arc<ConfigCache>,
    ) -> Self {
        Self {
            registry,
            settings,
            config,
        }
    }

    /// Registry commands are dispatched through.
    pub const fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Live configuration.
    pub const fn config(&self) -> &Arc<ConfigCache> {
        &self.config
    }

    /// Handles a plain message: prefix check, resolution, dispatch.
    pub fn on_message(&self, ctx: &serenity::Context, message: &serenity::Message) {
        if message.author.bot {
            return;
        }

        let guild = message.guild_id.map(|id| GuildId(id.get()));
        let prefix = self.settings.prefix(guild);
        let Some(tokens) = message_tokens(&message.content, &prefix) else {
            return;
        };
        if self.registry.resolve(&tokens).is_none() {
            trace!(command = %tokens[0], "Not a command");
            return;
        }

        let user = resolved_user(&message.author);
        let member = guild.map(|guild_id| {
            let partial = message.member.as_deref();
            InvokingMember {
                guild_id,
                roles: partial.map(|m| role_ids(&m.roles)).unwrap_or_default(),
                is_guild_owner: is_guild_owner(&ctx.cache, guild_id, user.id),
                nickname: partial.and_then(|m| m.nick.clone()),
            }
        });

        let thinking = self.config.get().commands.thinking_message.clone();
        let sink = Arc::new(MessageReplySink::new(Arc::clone(&ctx.http), message, thinking));
        let context = Arc::new(InvocationContext::new(
            Invoker { user, member },
            ChannelId(message.channel_id.get()),
            sink,
        ));

        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            let outcome = registry.process(context, &tokens).await;
            debug!(?outcome, "Message command finished");
        });
    }

    /// Handles a slash command interaction.
    pub fn on_command(&self, ctx: &serenity::Context, interaction: &serenity::CommandInteraction) {
        let (path, named) = interaction_input(&interaction.data);

        let user = resolved_user(&interaction.user);
        let member = interaction.guild_id.map(|id| {
            let guild_id = GuildId(id.get());
            let full = interaction.member.as_deref();
            InvokingMember {
                guild_id,
                roles: full.map(|m| role_ids(&m.roles)).unwrap_or_default(),
                is_guild_owner: is_guild_owner(&ctx.cache, guild_id, user.id),
                nickname: full.and_then(|m| m.nick.clone()),
            }
        });

        let sink = Arc::new(InteractionReplySink::new(Arc::clone(&ctx.http), interaction.clone()));
        let context = Arc::new(InvocationContext::new(
            Invoker { user, member },
            ChannelId(interaction.channel_id.get()),
            sink,
        ));

        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            let Some(resolved) = registry.resolve(&path) else {
                debug!(path = %path.join(" "), "Slash command is not registered");
                return;
            };
            if !resolved.remaining.is_empty() {
                debug!(path = %path.join(" "), "Slash command path is deeper than the registry");
                return;
            }
            let outcome = registry
                .dispatch_with(context, resolved.node, ArgumentInput::Named(named))
                .await;
            debug!(?outcome, "Slash command finished");
        });
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
