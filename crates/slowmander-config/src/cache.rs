//! Live configuration shared by the router, the reply sinks and the owner
//! lookup.
//!
//! Readers take a snapshot; a replacement is seen by every later read while
//! snapshots already taken stay valid.

use crate::schema::Config;
use arc_swap::ArcSwap;
use slowmander_common::UserId;
use std::sync::Arc;
use tracing::debug;

/// The active configuration behind a lock-free pointer swap.
pub struct ConfigCache {
    current: ArcSwap<Config>,
}

impl ConfigCache {
    /// Starts with `config` as the active configuration.
    pub fn new(config: Config) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
        }
    }

    /// Snapshot of the active configuration.
    pub fn get(&self) -> Arc<Config> {
        self.current.load_full()
    }

    /// Installs `config` and returns the configuration it replaced.
    pub fn update(&self, config: Config) -> Arc<Config> {
        let previous = self.current.swap(Arc::new(config));
        debug!(
            owners = self.current.load().discord.owner_ids.len(),
            "Configuration replaced"
        );
        previous
    }

    /// Whether `user` is a bot owner under the active configuration.
    pub fn is_owner(&self, user: UserId) -> bool {
        self.current.load().is_owner(user)
    }
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl std::fmt::Debug for ConfigCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let config = self.current.load();
        f.debug_struct("ConfigCache")
            .field("owners", &config.discord.owner_ids.len())
            .field("guilds", &config.guilds.len())
            .finish_non_exhaustive()
    }
}
