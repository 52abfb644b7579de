//! Per-guild settings: command prefix and the roles mapped to permission levels.

use crate::schema::GuildSeed;
use dashmap::DashMap;
use slowmander_common::{GuildId, RoleId};
use tracing::debug;

/// Settings stored for one guild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildSettings {
    /// Guild-specific prefix, falling back to the default when unset.
    pub prefix: Option<String>,
    /// Role granting the Admin level.
    pub admin_role: Option<RoleId>,
    /// Role granting the Mod level.
    pub mod_role: Option<RoleId>,
    /// Role granting the VIP level.
    pub vip_role: Option<RoleId>,
}

impl From<&GuildSeed> for GuildSettings {
    fn from(seed: &GuildSeed) -> Self {
        Self {
            prefix: seed.prefix.clone(),
            admin_role: seed.admin_role,
            mod_role: seed.mod_role,
            vip_role: seed.vip_role,
        }
    }
}

/// Concurrent in-memory store of guild settings.
#[derive(Debug)]
pub struct GuildSettingsStore {
    default_prefix: String,
    guilds: DashMap<GuildId, GuildSettings>,
}

impl GuildSettingsStore {
    /// Creates an empty store.
    pub fn new(default_prefix: impl Into<String>) -> Self {
        Self {
            default_prefix: default_prefix.into(),
            guilds: DashMap::new(),
        }
    }

    /// Creates a store pre-populated from configuration seeds.
    pub fn from_seeds(default_prefix: impl Into<String>, seeds: &[GuildSeed]) -> Self {
        let store = Self::new(default_prefix);
        for seed in seeds {
            store.guilds.insert(seed.guild_id, GuildSettings::from(seed));
        }
        store
    }

    /// Prefix used where no guild-specific one applies.
    pub fn default_prefix(&self) -> &str {
        &self.default_prefix
    }

    /// Settings for `guild`, or defaults when none are stored.
    pub fn get(&self, guild: GuildId) -> GuildSettings {
        self.guilds
            .get(&guild)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Effective prefix for a guild, or the default prefix outside guilds.
    pub fn prefix(&self, guild: Option<GuildId>) -> String {
        guild
            .and_then(|g| self.guilds.get(&g).and_then(|s| s.prefix.clone()))
            .unwrap_or_else(|| self.default_prefix.clone())
    }

    /// Sets the guild prefix.
    pub fn set_prefix(&self, guild: GuildId, prefix: impl Into<String>) {
        let prefix = prefix.into();
        debug!(guild_id = %guild, prefix = %prefix, "Updating guild prefix");
        self.guilds.entry(guild).or_default().prefix = Some(prefix);
    }

    /// Sets the role granting the Admin level.
    pub fn set_admin_role(&self, guild: GuildId, role: RoleId) {
        debug!(guild_id = %guild, role_id = %role, "Updating admin role");
        self.guilds.entry(guild).or_default().admin_role = Some(role);
    }

    /// Sets the role granting the Mod level.
    pub fn set_mod_role(&self, guild: GuildId, role: RoleId) {
        debug!(guild_id = %guild, role_id = %role, "Updating mod role");
        self.guilds.entry(guild).or_default().mod_role = Some(role);
    }

    /// Sets the role granting the VIP level.
    pub fn set_vip_role(&self, guild: GuildId, role: RoleId) {
        debug!(guild_id = %guild, role_id = %role, "Updating VIP role");
        self.guilds.entry(guild).or_default().vip_role = Some(role);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUILD: GuildId = GuildId(472_222_827_421_106_201);

    #[test]
    fn test_prefix_falls_back_to_default() {
        let store = GuildSettingsStore::new("!");
        assert_eq!(store.prefix(None), "!");
        assert_eq!(store.prefix(Some(GUILD)), "!");

        store.set_prefix(GUILD, "?");
        assert_eq!(store.prefix(Some(GUILD)), "?");
        assert_eq!(store.prefix(Some(GuildId(1 << 23))), "!");
        assert_eq!(store.prefix(None), "!");
    }

    #[test]
    fn test_role_setters_keep_other_fields() {
        let store = GuildSettingsStore::new("!");
        store.set_prefix(GUILD, "?");
        store.set_admin_role(GUILD, RoleId(1));
        store.set_mod_role(GUILD, RoleId(2));
        store.set_vip_role(GUILD, RoleId(3));

        let settings = store.get(GUILD);
        assert_eq!(settings.prefix.as_deref(), Some("?"));
        assert_eq!(settings.admin_role, Some(RoleId(1)));
        assert_eq!(settings.mod_role, Some(RoleId(2)));
        assert_eq!(settings.vip_role, Some(RoleId(3)));
    }

    #[test]
    fn test_from_seeds() {
        let seeds = vec![GuildSeed {
            guild_id: GUILD,
            prefix: None,
            admin_role: Some(RoleId(9)),
            mod_role: None,
            vip_role: None,
        }];
        let store = GuildSettingsStore::from_seeds("!", &seeds);
        assert_eq!(store.get(GUILD).admin_role, Some(RoleId(9)));
        assert_eq!(store.prefix(Some(GUILD)), "!");
        assert_eq!(store.get(GuildId(1 << 23)), GuildSettings::default());
    }
}
