//! Collaborator interfaces consumed by the command core, and the platform
//! entities they resolve.

use crate::context::InvokingMember;
use async_trait::async_trait;
use poise::serenity_prelude::Permissions;
use slowmander_common::{ChannelId, EmojiId, GuildId, RoleId, UserId};
use slowmander_config::GuildSettingsStore;

/// Answers whether a user is a bot owner.
#[cfg_attr(test, mockall::automock)]
pub trait OwnerDirectory: Send + Sync {
    /// Returns `true` if `user` is a bot owner.
    fn is_owner(&self, user: UserId) -> bool;
}

/// Per-guild mapping of roles to permission levels.
#[async_trait]
pub trait GuildRoleConfig: Send + Sync {
    /// Role granting the Admin level in `guild`.
    async fn admin_role(&self, guild: GuildId) -> Option<RoleId>;
    /// Role granting the Mod level in `guild`.
    async fn mod_role(&self, guild: GuildId) -> Option<RoleId>;
    /// Role granting the VIP level in `guild`.
    async fn vip_role(&self, guild: GuildId) -> Option<RoleId>;
}

/// Resolves raw argument tokens into platform entities.
///
/// Tokens may be a mention, a raw id, or a name prefix. `scope` is the guild
/// the invocation happened in, if any.
#[async_trait]
pub trait DirectoryLookup: Send + Sync {
    /// Resolves a user.
    async fn resolve_user(&self, token: &str, scope: Option<GuildId>) -> Option<ResolvedUser>;
    /// Resolves a guild member. Always absent outside a guild.
    async fn resolve_member(&self, token: &str, scope: Option<GuildId>) -> Option<ResolvedMember>;
    /// Resolves a channel.
    async fn resolve_channel(&self, token: &str, scope: Option<GuildId>) -> Option<ResolvedChannel>;
    /// Resolves a role.
    async fn resolve_role(&self, token: &str, scope: Option<GuildId>) -> Option<ResolvedRole>;
    /// Resolves a custom emoji.
    async fn resolve_emoji(&self, token: &str, scope: Option<GuildId>) -> Option<ResolvedEmoji>;
}

/// Platform capability queries for guild members.
#[async_trait]
pub trait PlatformCapabilityCheck: Send + Sync {
    /// Whether the member may invoke commands at all in `channel`.
    async fn member_can_use_commands_in_channel(
        &self,
        user: UserId,
        member: &InvokingMember,
        channel: ChannelId,
    ) -> bool;

    /// Whether the member holds every permission in `required` in `channel`.
    async fn member_has_permissions(
        &self,
        user: UserId,
        member: &InvokingMember,
        channel: ChannelId,
        required: Permissions,
    ) -> bool;
}

#[async_trait]
impl GuildRoleConfig for GuildSettingsStore {
    async fn admin_role(&self, guild: GuildId) -> Option<RoleId> {
        self.get(guild).admin_role
    }

    async fn mod_role(&self, guild: GuildId) -> Option<RoleId> {
        self.get(guild).mod_role
    }

    async fn vip_role(&self, guild: GuildId) -> Option<RoleId> {
        self.get(guild).vip_role
    }
}

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUser {
    /// User id.
    pub id: UserId,
    /// Account name.
    pub name: String,
    /// Whether the account is a bot.
    pub bot: bool,
}

impl ResolvedUser {
    /// Creates a non-bot user.
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bot: false,
        }
    }

    /// Mention markup for this user.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// A user in the context of one guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMember {
    /// The underlying user.
    pub user: ResolvedUser,
    /// Guild the membership belongs to.
    pub guild_id: GuildId,
    /// Guild nickname, if set.
    pub nickname: Option<String>,
    /// Roles held in the guild.
    pub roles: Vec<RoleId>,
}

impl ResolvedMember {
    /// Nickname if set, otherwise the account name.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.user.name)
    }
}

/// A channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChannel {
    /// Channel id.
    pub id: ChannelId,
    /// Channel name. Empty for direct messages.
    pub name: String,
    /// Owning guild, absent for direct messages.
    pub guild_id: Option<GuildId>,
}

impl ResolvedChannel {
    /// Mention markup for this channel.
    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}

/// A guild role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRole {
    /// Role id.
    pub id: RoleId,
    /// Role name.
    pub name: String,
    /// Guild the role belongs to.
    pub guild_id: GuildId,
}

impl ResolvedRole {
    /// Mention markup for this role.
    pub fn mention(&self) -> String {
        format!("<@&{}>", self.id)
    }
}

/// A custom emoji.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEmoji {
    /// Emoji id.
    pub id: EmojiId,
    /// Emoji name.
    pub name: String,
    /// Whether the emoji is animated.
    pub animated: bool,
}

impl ResolvedEmoji {
    /// Markup rendering this emoji inline.
    pub fn markup(&self) -> String {
        let prefix = if self.animated { "a" } else { "" };
        format!("<{prefix}:{}:{}>", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slowmander_common::test_utils::discord_fixtures::*;

    #[tokio::test]
    async fn test_settings_store_is_role_config() {
        let store = GuildSettingsStore::new("!");
        let (admin, _, _) = test_role_ids();
        assert_eq!(store.admin_role(test_guild_id()).await, None);

        store.set_admin_role(test_guild_id(), admin);
        // Reads observe the write immediately.
        assert_eq!(store.admin_role(test_guild_id()).await, Some(admin));
        assert_eq!(store.mod_role(test_guild_id()).await, None);
    }

    #[test]
    fn test_markup() {
        let user = ResolvedUser::new(test_user_id(), "someone");
        assert_eq!(user.mention(), format!("<@{}>", test_user_id()));

        let emoji = ResolvedEmoji {
            id: EmojiId(10),
            name: "wave".to_string(),
            animated: true,
        };
        assert_eq!(emoji.markup(), "<a:wave:10>");

        let member = ResolvedMember {
            user,
            guild_id: test_guild_id(),
            nickname: None,
            roles: vec![],
        };
        assert_eq!(member.display_name(), "someone");
    }
}
