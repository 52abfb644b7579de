//! Startup validation of a loaded configuration.

use crate::schema::Config;
use slowmander_common::{ensure_valid, Result, SlowmanderError};
use std::collections::HashSet;

/// Longest prefix a guild or the default config may use.
pub const MAX_PREFIX_LEN: usize = 16;

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates a configuration. Every failure is a validation error naming
    /// the offending field.
    pub fn validate(config: &Config) -> Result<()> {
        ensure_valid!(
            !config.discord.token.trim().is_empty(),
            "discord.token",
            "Discord token cannot be empty"
        );
        Self::validate_prefix(&config.commands.default_prefix)
            .map_err(|message| SlowmanderError::invalid("commands.default_prefix", message))?;
        ensure_valid!(
            config.discord.owner_ids.iter().all(|id| id.get() != 0),
            "discord.owner_ids",
            "Owner ids must be non-zero"
        );
        ensure_valid!(
            !config.commands.thinking_message.trim().is_empty(),
            "commands.thinking_message",
            "Thinking message cannot be empty"
        );
        ensure_valid!(
            !config.commands.error_message.trim().is_empty(),
            "commands.error_message",
            "Error message cannot be empty"
        );

        let mut seen = HashSet::new();
        for seed in &config.guilds {
            ensure_valid!(
                seen.insert(seed.guild_id),
                "guilds",
                "Guild {} is configured more than once",
                seed.guild_id
            );
            if let Some(prefix) = &seed.prefix {
                Self::validate_prefix(prefix).map_err(|message| {
                    SlowmanderError::invalid(format!("guilds.{}.prefix", seed.guild_id), message)
                })?;
            }
        }

        Ok(())
    }

    /// Checks that a prefix is non-empty, short, and free of whitespace.
    pub fn validate_prefix(prefix: &str) -> std::result::Result<(), String> {
        if prefix.is_empty() {
            return Err("Prefix cannot be empty".to_string());
        }
        if prefix.chars().any(char::is_whitespace) {
            return Err(format!("Prefix '{prefix}' cannot contain whitespace"));
        }
        if prefix.chars().count() > MAX_PREFIX_LEN {
            return Err(format!("Prefix cannot be longer than {MAX_PREFIX_LEN} characters"));
        }
        Ok(())
    }
}
