//! Permission levels and the resolver that computes an invoker's level.

use crate::command::CommandNode;
use crate::context::{Invoker, InvokingMember};
use crate::directory::{GuildRoleConfig, OwnerDirectory, PlatformCapabilityCheck};
use poise::serenity_prelude::Permissions;
use slowmander_common::{ChannelId, RoleId};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Permission levels, ordered from least to most privileged.
///
/// Variants are declared in ascending order so the derived ordering matches
/// the numeric value returned by [`PermissionLevel::value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i8)]
pub enum PermissionLevel {
    /// Cannot run anything. Only ever computed for invokers, never assigned
    /// to a command.
    Disabled = -1,
    /// Any user.
    Everyone = 0,
    /// Holders of the guild's VIP role.
    Vip = 1,
    /// Holders of the guild's mod role.
    Mod = 2,
    /// Holders of the guild's admin role, and the guild owner once one is set.
    Admin = 3,
    /// Bot owners.
    Owner = 4,
}

impl PermissionLevel {
    /// All levels in ascending order.
    pub const ALL: [Self; 6] = [
        Self::Disabled,
        Self::Everyone,
        Self::Vip,
        Self::Mod,
        Self::Admin,
        Self::Owner,
    ];

    /// Numeric value of the level.
    pub const fn value(self) -> i8 {
        self as i8
    }

    /// Get the permission level name as a string
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "Disabled",
            Self::Everyone => "Everyone",
            Self::Vip => "VIP",
            Self::Mod => "Mod",
            Self::Admin => "Admin",
            Self::Owner => "Owner",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computes invoker permission levels from injected collaborators.
#[derive(Clone)]
pub struct PermissionResolver {
    owners: Arc<dyn OwnerDirectory>,
    roles: Arc<dyn GuildRoleConfig>,
    capabilities: Arc<dyn PlatformCapabilityCheck>,
}

impl PermissionResolver {
    /// Creates a resolver.
    pub fn new(
        owners: Arc<dyn OwnerDirectory>,
        roles: Arc<dyn GuildRoleConfig>,
        capabilities: Arc<dyn PlatformCapabilityCheck>,
    ) -> Self {
        Self {
            owners,
            roles,
            capabilities,
        }
    }

    /// Computes the level of `invoker` in `channel`.
    ///
    /// Owners short-circuit everything else. Outside a guild nobody rises
    /// above Everyone. Inside a guild a member who cannot use commands in the
    /// channel is Disabled, and otherwise the first of the admin, mod and VIP
    /// roles the member holds decides. The guild owner counts as holding the
    /// admin role once one is configured.
    pub async fn compute_level(&self, invoker: &Invoker, channel: ChannelId) -> PermissionLevel {
        let user = invoker.user.id;

        if self.owners.is_owner(user) {
            debug!(user_id = %user, "Invoker is a bot owner");
            return PermissionLevel::Owner;
        }

        let Some(member) = &invoker.member else {
            return PermissionLevel::Everyone;
        };

        if !self
            .capabilities
            .member_can_use_commands_in_channel(user, member, channel)
            .await
        {
            debug!(user_id = %user, channel_id = %channel, "Member cannot use commands here");
            return PermissionLevel::Disabled;
        }

        let guild = member.guild_id;
        let admin = self.roles.admin_role(guild).await;
        if admin.is_some() && (member.is_guild_owner || holds(member, admin)) {
            return PermissionLevel::Admin;
        }
        if holds(member, self.roles.mod_role(guild).await) {
            return PermissionLevel::Mod;
        }
        if holds(member, self.roles.vip_role(guild).await) {
            return PermissionLevel::Vip;
        }

        PermissionLevel::Everyone
    }

    /// Returns `true` when `level` may enter `node`.
    pub fn gate(level: PermissionLevel, node: &CommandNode) -> bool {
        level >= node.perm_level()
    }

    /// Checks the platform permissions a command declares. Owners always
    /// pass; outside a guild the check always fails.
    pub async fn has_platform_permissions(
        &self,
        invoker: &Invoker,
        channel: ChannelId,
        required: Permissions,
    ) -> bool {
        if self.owners.is_owner(invoker.user.id) {
            return true;
        }
        match &invoker.member {
            Some(member) => {
                self.capabilities
                    .member_has_permissions(invoker.user.id, member, channel, required)
                    .await
            }
            None => false,
        }
    }
}

impl fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionResolver").finish_non_exhaustive()
    }
}

fn holds(member: &InvokingMember, role: Option<RoleId>) -> bool {
    role.is_some_and(|role| member.roles.contains(&role))
}
