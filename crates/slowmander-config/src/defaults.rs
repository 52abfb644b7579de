//! Default values for every configuration section.

use crate::schema::{CommandsConfig, Config, DiscordConfig};
use slowmander_common::logging::LoggingConfig;

/// Prefix used when neither the guild nor the config file sets one.
pub const DEFAULT_PREFIX: &str = "!";

/// Placeholder text for deferred message-backed commands.
pub const DEFAULT_THINKING_MESSAGE: &str = "Slowmander is thinking...";

/// Generic notice for failed command handlers.
pub const DEFAULT_ERROR_MESSAGE: &str = "❌ Error running command.";

impl Default for Config {
    fn default() -> Self {
        Self {
            discord: DiscordConfig::default(),
            commands: CommandsConfig::default(),
            logging: LoggingConfig::default(),
            guilds: Vec::new(),
        }
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            owner_ids: Vec::new(),
            register_slash_commands: true,
            dev_guild_id: None,
        }
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            default_prefix: DEFAULT_PREFIX.to_string(),
            thinking_message: DEFAULT_THINKING_MESSAGE.to_string(),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
        }
    }
}
