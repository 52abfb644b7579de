//! Fixtures shared by the unit and integration tests of every Slowmander
//! crate. Compiled for tests and under the `testing` feature.

use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

static LOGGING: Once = Once::new();

/// Routes `tracing` output through the test harness's captured writer.
///
/// Honors `RUST_LOG`, defaulting to `debug`. Later calls do nothing.
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let _ = fmt().with_test_writer().with_env_filter(filter).try_init();
    });
}

/// Fixed ids for one guild, its channel, an ordinary member, an owner, and
/// the guild's admin, mod and VIP roles.
pub mod discord_fixtures {
    use crate::{ChannelId, GuildId, RoleId, UserId};

    /// Guild the fixtures live in.
    pub const fn test_guild_id() -> GuildId {
        GuildId(472_222_827_421_106_201)
    }

    /// Text channel in [`test_guild_id`].
    pub const fn test_channel_id() -> ChannelId {
        ChannelId(123_456_789_012_345_678)
    }

    /// A member holding no configured role.
    pub const fn test_user_id() -> UserId {
        UserId(987_654_321_098_765_432)
    }

    /// A bot owner, distinct from [`test_user_id`].
    pub const fn test_owner_id() -> UserId {
        UserId(175_928_847_299_117_063)
    }

    /// Admin, mod and VIP role ids, in that order.
    pub const fn test_role_ids() -> (RoleId, RoleId, RoleId) {
        (
            RoleId(300_000_000_000_000_001),
            RoleId(300_000_000_000_000_002),
            RoleId(300_000_000_000_000_003),
        )
    }
}

/// Proptest strategies for ids and command input.
pub mod property_testing {
    use crate::{ChannelId, UserId};
    use proptest::prelude::*;

    /// Any id whose timestamp bits are set.
    fn snowflake() -> impl Strategy<Value = u64> {
        (1u64 << 22)..=u64::MAX
    }

    /// Valid channel ids.
    pub fn channel_id_strategy() -> impl Strategy<Value = ChannelId> {
        snowflake().prop_map(ChannelId)
    }

    /// Valid user ids.
    pub fn user_id_strategy() -> impl Strategy<Value = UserId> {
        snowflake().prop_map(UserId)
    }

    /// Single command tokens: no whitespace, no quotes.
    pub fn token_strategy() -> impl Strategy<Value = String> {
        r"[a-zA-Z0-9_!?.,#@-]{1,16}".prop_map(|s| s.to_string())
    }
}
