//! Platform identifier newtypes.
//!
//! Every Discord entity is addressed by a 64-bit snowflake. Wrapping each kind
//! in its own type keeps a role id from being passed where a user id belongs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Milliseconds between the Unix epoch and the first second of 2015, the
/// origin of Discord snowflake timestamps.
pub const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// Returns `true` when `raw` is a well-formed snowflake.
///
/// A snowflake is valid when it parses as a `u64` and its timestamp bits are
/// non-zero.
pub fn is_snowflake(raw: &str) -> bool {
    parse_snowflake(raw).is_some()
}

/// Parses a raw snowflake string, rejecting values without timestamp bits.
pub fn parse_snowflake(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value = raw.parse::<u64>().ok()?;
    (value >> 22 > 0).then_some(value)
}

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Returns the raw snowflake value.
            pub const fn get(self) -> u64 {
                self.0
            }

            /// Milliseconds since the Unix epoch at which this id was minted.
            pub const fn created_at_ms(self) -> u64 {
                (self.0 >> 22) + DISCORD_EPOCH_MS
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = crate::SlowmanderError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_snowflake(s).map(Self).ok_or_else(|| {
                    crate::SlowmanderError::invalid(
                        stringify!($name),
                        format!("'{s}' is not a valid snowflake"),
                    )
                })
            }
        }
    };
}

snowflake_id!(
    /// A Discord user ID.
    UserId
);
snowflake_id!(
    /// A Discord channel ID.
    ChannelId
);
snowflake_id!(
    /// A Discord guild ID.
    GuildId
);
snowflake_id!(
    /// A Discord role ID.
    RoleId
);
snowflake_id!(
    /// A custom emoji ID.
    EmojiId
);
snowflake_id!(
    /// A Discord message ID.
    MessageId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_snowflake() {
        assert_eq!(parse_snowflake("175928847299117063"), Some(175_928_847_299_117_063));
        assert_eq!(parse_snowflake("12"), None);
        assert_eq!(parse_snowflake(""), None);
        assert_eq!(parse_snowflake("-175928847299117063"), None);
        assert_eq!(parse_snowflake("17592884729911706a"), None);
    }

    #[test]
    fn test_created_at() {
        let id = UserId(175_928_847_299_117_063);
        assert_eq!(id.created_at_ms(), 1_462_015_105_796);
    }

    #[test]
    fn test_from_str() {
        let id: RoleId = "175928847299117063".parse().unwrap();
        assert_eq!(id, RoleId(175_928_847_299_117_063));
        assert!("everyone".parse::<RoleId>().is_err());
    }
}
