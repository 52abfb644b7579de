//! Channel permission computation from a guild snapshot.
//!
//! Mirrors the platform's rules: the guild owner and administrators hold
//! everything; otherwise role permissions are combined, then the channel's
//! `@everyone`, role and member overwrites are applied in that order.

use poise::serenity_prelude::Permissions;
use slowmander_common::{GuildId, RoleId, UserId};
use std::collections::HashMap;

/// Who a channel overwrite applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteTarget {
    /// Holders of a role. The guild id is the `@everyone` role.
    Role(RoleId),
    /// One member.
    Member(UserId),
}

/// One channel permission overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelOverwrite {
    /// Target of the overwrite.
    pub target: OverwriteTarget,
    /// Explicitly granted permissions.
    pub allow: Permissions,
    /// Explicitly denied permissions.
    pub deny: Permissions,
}

/// Everything needed to compute a member's permissions in one channel.
#[derive(Debug, Clone)]
pub struct PermissionSnapshot {
    /// Guild the channel belongs to.
    pub guild_id: GuildId,
    /// Guild owner.
    pub owner_id: UserId,
    /// Permissions of the `@everyone` role.
    pub everyone: Permissions,
    /// Permissions of every other role.
    pub roles: HashMap<RoleId, Permissions>,
    /// Overwrites of the channel (the parent channel for threads).
    pub overwrites: Vec<ChannelOverwrite>,
}

impl PermissionSnapshot {
    /// Effective permissions of `user` holding `roles` in the channel.
    pub fn member_permissions(&self, user: UserId, roles: &[RoleId]) -> Permissions {
        if user == self.owner_id {
            return Permissions::all();
        }

        let mut permissions = roles
            .iter()
            .filter_map(|role| self.roles.get(role))
            .fold(self.everyone, |acc, role| acc | *role);
        if permissions.contains(Permissions::ADMINISTRATOR) {
            return Permissions::all();
        }

        let everyone = RoleId(self.guild_id.get());
        if let Some(overwrite) = self
            .overwrites
            .iter()
            .find(|o| o.target == OverwriteTarget::Role(everyone))
        {
            permissions = apply(permissions, overwrite.allow, overwrite.deny);
        }

        let (allow, deny) = self
            .overwrites
            .iter()
            .filter(|o| match o.target {
                OverwriteTarget::Role(role) => role != everyone && roles.contains(&role),
                _ => false,
            })
            .fold((Permissions::empty(), Permissions::empty()), |(allow, deny), o| {
                (allow | o.allow, deny | o.deny)
            });
        permissions = apply(permissions, allow, deny);

        if let Some(overwrite) = self
            .overwrites
            .iter()
            .find(|o| o.target == OverwriteTarget::Member(user))
        {
            permissions = apply(permissions, overwrite.allow, overwrite.deny);
        }

        permissions
    }
}

fn apply(permissions: Permissions, allow: Permissions, deny: Permissions) -> Permissions {
    (permissions & !deny) | allow
}
