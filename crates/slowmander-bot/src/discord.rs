//! Discord-backed implementations of the command framework's collaborators.
//!
//! Lookups read the serenity cache first and fall back to HTTP for ids the
//! cache does not hold. Cache references are never held across an await.

use crate::overwrites::{ChannelOverwrite, OverwriteTarget, PermissionSnapshot};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use serenity::Permissions;
use slowmander_commands::mentions::{
    name_matches, parse_channel, parse_emoji, parse_role, parse_user,
};
use slowmander_commands::{
    Collaborators, DirectoryLookup, InvokingMember, OwnerDirectory, PlatformCapabilityCheck,
    ResolvedChannel, ResolvedEmoji, ResolvedMember, ResolvedRole, ResolvedUser,
};
use slowmander_common::{ChannelId, EmojiId, GuildId, RoleId, UserId};
use slowmander_config::{ConfigCache, GuildSettingsStore};
use std::sync::Arc;
use tracing::debug;

/// Permission every member needs to invoke commands in a channel.
pub const COMMAND_CAPABILITY: Permissions = Permissions::USE_APPLICATION_COMMANDS;

pub(crate) fn to_user(id: UserId) -> serenity::UserId {
    serenity::UserId::new(id.get())
}

pub(crate) fn to_guild(id: GuildId) -> serenity::GuildId {
    serenity::GuildId::new(id.get())
}

pub(crate) fn to_channel(id: ChannelId) -> serenity::ChannelId {
    serenity::ChannelId::new(id.get())
}

fn user_of(user: &serenity::User) -> ResolvedUser {
    ResolvedUser {
        id: UserId(user.id.get()),
        name: user.name.clone(),
        bot: user.bot,
    }
}

fn member_of(member: &serenity::Member) -> ResolvedMember {
    ResolvedMember {
        user: user_of(&member.user),
        guild_id: GuildId(member.guild_id.get()),
        nickname: member.nick.clone(),
        roles: member.roles.iter().map(|role| RoleId(role.get())).collect(),
    }
}

fn channel_of(channel: &serenity::GuildChannel) -> ResolvedChannel {
    ResolvedChannel {
        id: ChannelId(channel.id.get()),
        name: channel.name.clone(),
        guild_id: Some(GuildId(channel.guild_id.get())),
    }
}

fn role_of(role: &serenity::Role) -> ResolvedRole {
    ResolvedRole {
        id: RoleId(role.id.get()),
        name: role.name.clone(),
        guild_id: GuildId(role.guild_id.get()),
    }
}

fn emoji_of(emoji: &serenity::Emoji) -> ResolvedEmoji {
    ResolvedEmoji {
        id: EmojiId(emoji.id.get()),
        name: emoji.name.clone(),
        animated: emoji.animated,
    }
}

fn overwrite_of(overwrite: &serenity::PermissionOverwrite) -> Option<ChannelOverwrite> {
    let target = match overwrite.kind {
        serenity::PermissionOverwriteType::Member(id) => OverwriteTarget::Member(UserId(id.get())),
        serenity::PermissionOverwriteType::Role(id) => OverwriteTarget::Role(RoleId(id.get())),
        _ => return None,
    };
    Some(ChannelOverwrite {
        target,
        allow: overwrite.allow,
        deny: overwrite.deny,
    })
}

/// Whether `user` owns `guild`, according to the cache.
pub fn is_guild_owner(cache: &serenity::Cache, guild: GuildId, user: UserId) -> bool {
    cache
        .guild(to_guild(guild))
        .is_some_and(|guild| guild.owner_id == to_user(user))
}

/// Builds a permission snapshot of `channel` from the cache. Threads use the
/// overwrites of their parent channel.
pub fn permission_snapshot(
    cache: &serenity::Cache,
    guild: GuildId,
    channel: ChannelId,
) -> Option<PermissionSnapshot> {
    let guild = cache.guild(to_guild(guild))?;
    let channel_id = to_channel(channel);
    let channel = guild
        .channels
        .get(&channel_id)
        .or_else(|| guild.threads.iter().find(|thread| thread.id == channel_id))?;
    let source = channel
        .thread_metadata
        .as_ref()
        .and(channel.parent_id)
        .and_then(|parent| guild.channels.get(&parent))
        .unwrap_or(channel);

    let everyone_id = serenity::RoleId::new(guild.id.get());
    Some(PermissionSnapshot {
        guild_id: GuildId(guild.id.get()),
        owner_id: UserId(guild.owner_id.get()),
        everyone: guild
            .roles
            .get(&everyone_id)
            .map_or_else(Permissions::empty, |role| role.permissions),
        roles: guild
            .roles
            .iter()
            .map(|(id, role)| (RoleId(id.get()), role.permissions))
            .collect(),
        overwrites: source
            .permission_overwrites
            .iter()
            .filter_map(overwrite_of)
            .collect(),
    })
}

/// Owner lookup against the live configuration.
#[derive(Debug, Clone)]
pub struct ConfigOwners {
    config: Arc<ConfigCache>,
}

impl ConfigOwners {
    /// Reads owners from `config` on every check.
    pub const fn new(config: Arc<ConfigCache>) -> Self {
        Self { config }
    }
}

impl OwnerDirectory for ConfigOwners {
    fn is_owner(&self, user: UserId) -> bool {
        self.config.is_owner(user)
    }
}

/// Entity lookup through the serenity cache and HTTP client.
#[derive(Clone)]
pub struct DiscordDirectory {
    cache: Arc<serenity::Cache>,
    http: Arc<serenity::Http>,
}

impl DiscordDirectory {
    /// Creates a directory over a connected client's cache and HTTP client.
    pub const fn new(cache: Arc<serenity::Cache>, http: Arc<serenity::Http>) -> Self {
        Self { cache, http }
    }

    fn cached_user(&self, id: UserId) -> Option<ResolvedUser> {
        self.cache.user(to_user(id)).map(|user| user_of(&user))
    }

    fn cached_member(&self, guild: GuildId, id: UserId) -> Option<ResolvedMember> {
        let guild = self.cache.guild(to_guild(guild))?;
        let member = guild.members.get(&to_user(id)).map(member_of);
        member
    }

    fn find_member(&self, guild: GuildId, token: &str) -> Option<ResolvedMember> {
        let guild = self.cache.guild(to_guild(guild))?;
        let member = guild
            .members
            .values()
            .find(|member| {
                name_matches(&member.user.name, token)
                    || member.nick.as_deref().is_some_and(|nick| name_matches(nick, token))
            })
            .map(member_of);
        member
    }

    fn cached_channel(&self, guild: GuildId, id: ChannelId) -> Option<ResolvedChannel> {
        let guild = self.cache.guild(to_guild(guild))?;
        let channel = guild.channels.get(&to_channel(id)).map(channel_of);
        channel
    }

    fn find_channel(&self, guild: GuildId, token: &str) -> Option<ResolvedChannel> {
        let name = token.trim_start_matches('#');
        let guild = self.cache.guild(to_guild(guild))?;
        let channel = guild
            .channels
            .values()
            .find(|channel| name_matches(&channel.name, name))
            .map(channel_of);
        channel
    }

    fn find_role(&self, guild: GuildId, token: &str) -> Option<ResolvedRole> {
        let guild = self.cache.guild(to_guild(guild))?;
        let role = match parse_role(token) {
            Some(id) => guild.roles.get(&serenity::RoleId::new(id.get())).map(role_of),
            None => guild
                .roles
                .values()
                .find(|role| name_matches(&role.name, token))
                .map(role_of),
        };
        role
    }

    fn find_emoji(
        &self,
        guild: GuildId,
        id: Option<EmojiId>,
        token: &str,
    ) -> Option<ResolvedEmoji> {
        let guild = self.cache.guild(to_guild(guild))?;
        let emoji = match id {
            Some(id) => guild.emojis.get(&serenity::EmojiId::new(id.get())).map(emoji_of),
            None => {
                let name = token.trim_matches(':');
                guild
                    .emojis
                    .values()
                    .find(|emoji| emoji.name.eq_ignore_ascii_case(name))
                    .map(emoji_of)
            }
        };
        emoji
    }
}

impl std::fmt::Debug for DiscordDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordDirectory").finish_non_exhaustive()
    }
}

#[async_trait]
impl DirectoryLookup for DiscordDirectory {
    async fn resolve_user(&self, token: &str, scope: Option<GuildId>) -> Option<ResolvedUser> {
        let Some(id) = parse_user(token) else {
            return self.find_member(scope?, token).map(|member| member.user);
        };
        if let Some(user) = self.cached_user(id) {
            return Some(user);
        }
        match self.http.get_user(to_user(id)).await {
            Ok(user) => Some(user_of(&user)),
            Err(e) => {
                debug!(user_id = %id, error = %e, "User lookup failed");
                None
            }
        }
    }

    async fn resolve_member(&self, token: &str, scope: Option<GuildId>) -> Option<ResolvedMember> {
        let guild = scope?;
        let Some(id) = parse_user(token) else {
            return self.find_member(guild, token);
        };
        if let Some(member) = self.cached_member(guild, id) {
            return Some(member);
        }
        match self.http.get_member(to_guild(guild), to_user(id)).await {
            Ok(member) => Some(member_of(&member)),
            Err(e) => {
                debug!(guild_id = %guild, user_id = %id, error = %e, "Member lookup failed");
                None
            }
        }
    }

    async fn resolve_channel(
        &self,
        token: &str,
        scope: Option<GuildId>,
    ) -> Option<ResolvedChannel> {
        let Some(id) = parse_channel(token) else {
            return self.find_channel(scope?, token);
        };
        if let Some(channel) = scope.and_then(|guild| self.cached_channel(guild, id)) {
            return Some(channel);
        }
        match self.http.get_channel(to_channel(id)).await {
            Ok(serenity::Channel::Guild(channel)) => Some(channel_of(&channel)),
            Ok(serenity::Channel::Private(channel)) => Some(ResolvedChannel {
                id: ChannelId(channel.id.get()),
                name: String::new(),
                guild_id: None,
            }),
            Ok(_) => None,
            Err(e) => {
                debug!(channel_id = %id, error = %e, "Channel lookup failed");
                None
            }
        }
    }

    async fn resolve_role(&self, token: &str, scope: Option<GuildId>) -> Option<ResolvedRole> {
        self.find_role(scope?, token)
    }

    async fn resolve_emoji(&self, token: &str, scope: Option<GuildId>) -> Option<ResolvedEmoji> {
        let parsed = parse_emoji(token);
        if let Some(emoji) = parsed.as_ref().filter(|emoji| !emoji.name.is_empty()) {
            return Some(ResolvedEmoji {
                id: emoji.id,
                name: emoji.name.clone(),
                animated: emoji.animated,
            });
        }
        self.find_emoji(scope?, parsed.map(|emoji| emoji.id), token)
    }
}

/// Capability checks from cached guild channel permissions.
#[derive(Clone)]
pub struct DiscordCapabilities {
    cache: Arc<serenity::Cache>,
}

impl DiscordCapabilities {
    /// Creates checks over a connected client's cache.
    pub const fn new(cache: Arc<serenity::Cache>) -> Self {
        Self { cache }
    }

    fn permissions(
        &self,
        user: UserId,
        member: &InvokingMember,
        channel: ChannelId,
    ) -> Option<Permissions> {
        permission_snapshot(&self.cache, member.guild_id, channel)
            .map(|snapshot| snapshot.member_permissions(user, &member.roles))
    }
}

impl std::fmt::Debug for DiscordCapabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordCapabilities").finish_non_exhaustive()
    }
}

#[async_trait]
impl PlatformCapabilityCheck for DiscordCapabilities {
    async fn member_can_use_commands_in_channel(
        &self,
        user: UserId,
        member: &InvokingMember,
        channel: ChannelId,
    ) -> bool {
        // An uncached guild is left to the platform's own enforcement.
        self.permissions(user, member, channel)
            .map_or(true, |permissions| permissions.contains(COMMAND_CAPABILITY))
    }

    async fn member_has_permissions(
        &self,
        user: UserId,
        member: &InvokingMember,
        channel: ChannelId,
        required: Permissions,
    ) -> bool {
        let granted = self.permissions(user, member, channel);
        if granted.is_none() {
            debug!(
                guild_id = %member.guild_id,
                channel_id = %channel,
                "No cached permissions for channel"
            );
        }
        granted.is_some_and(|permissions| permissions.contains(required))
    }
}

/// Wires Discord-backed collaborators for a connected client.
pub fn collaborators(
    cache: &Arc<serenity::Cache>,
    http: &Arc<serenity::Http>,
    config: &Arc<ConfigCache>,
    settings: &Arc<GuildSettingsStore>,
) -> Collaborators {
    Collaborators {
        owners: Arc::new(ConfigOwners::new(Arc::clone(config))),
        settings: Arc::clone(settings),
        directory: Arc::new(DiscordDirectory::new(Arc::clone(cache), Arc::clone(http))),
        capabilities: Arc::new(DiscordCapabilities::new(Arc::clone(cache))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slowmander_common::test_utils::discord_fixtures::*;
    use slowmander_config::Config;

    #[test]
    fn test_config_owners_follow_live_config() {
        let cache = Arc::new(ConfigCache::new(Config::default()));
        let owners = ConfigOwners::new(Arc::clone(&cache));
        assert!(!owners.is_owner(test_owner_id()));

        let mut updated = Config::default();
        updated.discord.owner_ids = vec![test_owner_id()];
        cache.update(updated);
        assert!(owners.is_owner(test_owner_id()));
        assert!(!owners.is_owner(test_user_id()));
    }

    #[test]
    fn test_id_conversion_round_trips() {
        assert_eq!(to_user(test_user_id()).get(), test_user_id().get());
        assert_eq!(to_guild(test_guild_id()).get(), test_guild_id().get());
        assert_eq!(to_channel(test_channel_id()).get(), test_channel_id().get());
    }

    #[test]
    fn test_uncached_guild_has_no_snapshot() {
        let cache = serenity::Cache::new();
        assert!(permission_snapshot(&cache, test_guild_id(), test_channel_id()).is_none());
        assert!(!is_guild_owner(&cache, test_guild_id(), test_owner_id()));
    }
}
