//! Application-wide error types using thiserror.

use poise::serenity_prelude as serenity;
use slowmander_commands::{RegistrationError, ReplyError};
use slowmander_common::SlowmanderError;

/// Main application error type.
#[derive(thiserror::Error, Debug)]
pub enum BotError {
    /// Configuration or logging setup error.
    #[error("Configuration error: {0}")]
    Config(#[from] SlowmanderError),

    /// A module registered an invalid command table.
    #[error("Command registration failed: {0}")]
    Registration(#[from] RegistrationError),

    /// Discord/Serenity error.
    #[error("Discord error: {0}")]
    Discord(#[from] serenity::Error),

    /// A reply could not be delivered.
    #[error("Reply error: {0}")]
    Reply(#[from] ReplyError),

    /// Poise framework error.
    #[error("Framework error: {0}")]
    Framework(String),
}

impl BotError {
    /// Process exit code for this error.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 78,
            Self::Registration(_) => 70,
            _ => 1,
        }
    }
}

/// Result type for the bot application.
pub type BotResult<T> = Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let config = BotError::from(SlowmanderError::config("missing token"));
        assert_eq!(config.exit_code(), 78);

        let registration = BotError::from(RegistrationError::InvalidName {
            name: "a b".to_string(),
        });
        assert_eq!(registration.exit_code(), 70);
        assert!(registration.to_string().contains("Command registration failed"));

        assert_eq!(BotError::Framework("boom".to_string()).exit_code(), 1);
    }
}
