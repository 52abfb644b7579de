//! Core bot logic using the Poise framework.
//!
//! Poise owns the gateway loop and startup; command routing goes through the
//! Slowmander registry from a custom event handler.

use crate::discord;
use crate::error::{BotError, BotResult};
use crate::router::Router;
use crate::slash;
use once_cell::sync::OnceCell;
use poise::serenity_prelude as serenity;
use slowmander_commands::{create_registry, Module};
use slowmander_config::{Config, ConfigCache, GuildSettingsStore};
use std::sync::Arc;
use tracing::{debug, info};

/// Config file used when none is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Environment variable naming the config file.
pub const ENV_CONFIG_PATH: &str = "SLOWMANDER_CONFIG";

/// Gateway intents: guild and direct messages with their content, plus guild
/// metadata for the cache.
pub fn intents() -> serenity::GatewayIntents {
    serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT
}

/// Main bot structure.
pub struct Slowmander {
    config: Arc<ConfigCache>,
    settings: Arc<GuildSettingsStore>,
    modules: Vec<Arc<dyn Module>>,
}

impl Slowmander {
    /// Creates a bot seeded with the guild settings from `config`.
    pub fn new(config: Config) -> Self {
        let settings = GuildSettingsStore::from_seeds(
            config.commands.default_prefix.clone(),
            &config.guilds,
        );
        Self {
            config: Arc::new(ConfigCache::new(config)),
            settings: Arc::new(settings),
            modules: Vec::new(),
        }
    }

    /// Registers an additional command module next to the built-in ones.
    #[must_use]
    pub fn with_module(mut self, module: Arc<dyn Module>) -> Self {
        self.modules.push(module);
        self
    }

    /// Per-guild settings shared with the `set` commands.
    pub const fn settings(&self) -> &Arc<GuildSettingsStore> {
        &self.settings
    }

    /// Live configuration.
    pub const fn config(&self) -> &Arc<ConfigCache> {
        &self.config
    }

    /// Connects and serves until the gateway shuts down.
    ///
    /// The command registry is built before connecting; an invalid command
    /// table returns [`BotError::Registration`] without ever going online.
    pub async fn start(self) -> BotResult<()> {
        let config = self.config.get();
        let router_slot: Arc<OnceCell<Router>> = Arc::new(OnceCell::new());
        let setup_slot = Arc::clone(&router_slot);

        let framework = poise::Framework::builder()
            .options(poise::FrameworkOptions {
                event_handler: |ctx, event, _framework, router| {
                    Box::pin(handle_event(ctx, event, router))
                },
                ..Default::default()
            })
            .setup(move |ctx, ready, _framework| {
                Box::pin(async move {
                    info!(
                        user = %ready.user.name,
                        guilds = ready.guilds.len(),
                        "Connected to Discord"
                    );
                    let router = setup_slot
                        .get()
                        .cloned()
                        .ok_or_else(|| {
                            BotError::Framework("Router was not initialised".to_string())
                        })?;
                    slash::deploy(ctx, router.registry(), &router.config().get().discord).await?;
                    Ok(router)
                })
            })
            .build();

        let mut client = serenity::ClientBuilder::new(&config.discord.token, intents())
            .framework(framework)
            .await?;

        let collaborators =
            discord::collaborators(&client.cache, &client.http, &self.config, &self.settings);
        let registry = create_registry(
            &collaborators,
            config.commands.error_message.clone(),
            self.modules,
        )?;
        let router = Router::new(registry, Arc::clone(&self.settings), Arc::clone(&self.config));
        if router_slot.set(router).is_err() {
            return Err(BotError::Framework("Router initialised twice".to_string()));
        }

        info!("Starting gateway connection");
        client.start().await?;
        Ok(())
    }
}

impl std::fmt::Debug for Slowmander {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slowmander")
            .field("modules", &self.modules.len())
            .finish_non_exhaustive()
    }
}

async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    router: &Router,
) -> BotResult<()> {
    match event {
        serenity::FullEvent::Message { new_message } => router.on_message(ctx, new_message),
        serenity::FullEvent::InteractionCreate { interaction } => {
            if let serenity::Interaction::Command(command) = interaction {
                router.on_command(ctx, command);
            }
        }
        serenity::FullEvent::GuildCreate { guild, .. } => {
            debug!(guild_id = %guild.id, name = %guild.name, "Guild available");
        }
        _ => {}
    }
    Ok(())
}
