//! Configuration schema definitions using serde.

use serde::{Deserialize, Serialize};
use slowmander_common::logging::LoggingConfig;
use slowmander_common::{GuildId, Result, RoleId, UserId};

/// Main configuration structure for Slowmander.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Discord connection and ownership.
    pub discord: DiscordConfig,
    /// Command framework behaviour.
    pub commands: CommandsConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Guild settings applied at startup.
    pub guilds: Vec<GuildSeed>,
}

/// Discord bot configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Discord bot token.
    pub token: String,
    /// Users with the Owner permission level everywhere.
    pub owner_ids: Vec<UserId>,
    /// Whether to deploy slash commands on startup.
    pub register_slash_commands: bool,
    /// Deploy slash commands to this guild only, for fast iteration.
    pub dev_guild_id: Option<GuildId>,
}

/// Command framework configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// Prefix for guilds without their own and for direct messages.
    pub default_prefix: String,
    /// Placeholder sent when a message-backed command defers.
    pub thinking_message: String,
    /// Notice shown when a command handler fails.
    pub error_message: String,
}

/// Initial settings for one guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSeed {
    /// Guild the settings apply to.
    pub guild_id: GuildId,
    /// Guild-specific command prefix.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Role granting the Admin level.
    #[serde(default)]
    pub admin_role: Option<RoleId>,
    /// Role granting the Mod level.
    #[serde(default)]
    pub mod_role: Option<RoleId>,
    /// Role granting the VIP level.
    #[serde(default)]
    pub vip_role: Option<RoleId>,
}

impl Config {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        crate::validator::ConfigValidator::validate(self)
    }

    /// Returns `true` if `user` is listed as a bot owner.
    pub fn is_owner(&self, user: UserId) -> bool {
        self.discord.owner_ids.contains(&user)
    }
}
