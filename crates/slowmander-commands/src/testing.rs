//! In-memory collaborators for tests.

use crate::arguments::ArgumentParser;
use crate::context::{
    InvocationContext, Invoker, InvokingMember, Reply, ReplyError, ReplyHandle, ReplySink,
    SourceKind,
};
use crate::directory::{
    DirectoryLookup, OwnerDirectory, PlatformCapabilityCheck, ResolvedChannel, ResolvedEmoji,
    ResolvedMember, ResolvedRole, ResolvedUser,
};
use crate::mentions::{name_matches, parse_channel, parse_emoji, parse_role, parse_user};
use crate::permissions::PermissionResolver;
use crate::registry::RegistryBuilder;
use async_trait::async_trait;
use parking_lot::Mutex;
use poise::serenity_prelude::Permissions;
use slowmander_common::test_utils::discord_fixtures::*;
use slowmander_common::{ChannelId, EmojiId, GuildId, MessageId, RoleId, UserId};
use slowmander_config::GuildSettingsStore;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Fixed set of owners.
#[derive(Debug, Clone, Default)]
pub struct StaticOwners(pub HashSet<UserId>);

impl StaticOwners {
    /// Owners from a list.
    pub fn new(owners: impl IntoIterator<Item = UserId>) -> Self {
        Self(owners.into_iter().collect())
    }
}

impl OwnerDirectory for StaticOwners {
    fn is_owner(&self, user: UserId) -> bool {
        self.0.contains(&user)
    }
}

/// Capability check allowing commands everywhere except denied channels,
/// and granting a fixed permission set.
#[derive(Debug, Clone)]
pub struct FakeCapabilities {
    denied: HashSet<ChannelId>,
    granted: Permissions,
}

impl FakeCapabilities {
    /// Commands allowed everywhere, no extra permissions.
    pub fn allowing() -> Self {
        Self {
            denied: HashSet::new(),
            granted: Permissions::empty(),
        }
    }

    /// Commands denied in `channel`.
    pub fn denying(channel: ChannelId) -> Self {
        let mut fake = Self::allowing();
        fake.denied.insert(channel);
        fake
    }

    /// Grants `permissions` to every member.
    #[must_use]
    pub fn granting(mut self, permissions: Permissions) -> Self {
        self.granted |= permissions;
        self
    }
}

#[async_trait]
impl PlatformCapabilityCheck for FakeCapabilities {
    async fn member_can_use_commands_in_channel(
        &self,
        _user: UserId,
        _member: &InvokingMember,
        channel: ChannelId,
    ) -> bool {
        !self.denied.contains(&channel)
    }

    async fn member_has_permissions(
        &self,
        _user: UserId,
        _member: &InvokingMember,
        channel: ChannelId,
        required: Permissions,
    ) -> bool {
        !self.denied.contains(&channel) && self.granted.contains(required)
    }
}

/// Directory backed by plain lists.
#[derive(Debug, Clone, Default)]
pub struct FakeDirectory {
    /// Known users.
    pub users: Vec<ResolvedUser>,
    /// Known guild members.
    pub members: Vec<ResolvedMember>,
    /// Known channels.
    pub channels: Vec<ResolvedChannel>,
    /// Known roles.
    pub roles: Vec<ResolvedRole>,
    /// Known emojis.
    pub emojis: Vec<ResolvedEmoji>,
}

impl FakeDirectory {
    /// Directory holding the shared fixtures: the test user and owner, the
    /// test guild's `general` channel, its admin, mod and VIP roles, and a
    /// `wave` emoji.
    pub fn populated() -> Self {
        let guild = test_guild_id();
        let (admin, moderator, vip) = test_role_ids();
        let tester = ResolvedUser::new(test_user_id(), "tester");
        let owner = ResolvedUser::new(test_owner_id(), "owner");
        let role = |id, name: &str| ResolvedRole {
            id,
            name: name.to_string(),
            guild_id: guild,
        };

        Self {
            members: vec![ResolvedMember {
                user: tester.clone(),
                guild_id: guild,
                nickname: Some("testy".to_string()),
                roles: vec![vip],
            }],
            users: vec![tester, owner],
            channels: vec![ResolvedChannel {
                id: test_channel_id(),
                name: "general".to_string(),
                guild_id: Some(guild),
            }],
            roles: vec![role(admin, "Admin"), role(moderator, "Moderator"), role(vip, "VIP")],
            emojis: vec![ResolvedEmoji {
                id: EmojiId(400_000_000_000_000_001),
                name: "wave".to_string(),
                animated: false,
            }],
        }
    }
}

#[async_trait]
impl DirectoryLookup for FakeDirectory {
    async fn resolve_user(&self, token: &str, _scope: Option<GuildId>) -> Option<ResolvedUser> {
        let found = match parse_user(token) {
            Some(id) => self.users.iter().find(|u| u.id == id),
            None => self.users.iter().find(|u| name_matches(&u.name, token)),
        };
        found.cloned()
    }

    async fn resolve_member(&self, token: &str, scope: Option<GuildId>) -> Option<ResolvedMember> {
        let guild = scope?;
        let mut members = self.members.iter().filter(|m| m.guild_id == guild);
        let found = match parse_user(token) {
            Some(id) => members.find(|m| m.user.id == id),
            None => members.find(|m| {
                name_matches(m.display_name(), token) || name_matches(&m.user.name, token)
            }),
        };
        found.cloned()
    }

    async fn resolve_channel(
        &self,
        token: &str,
        scope: Option<GuildId>,
    ) -> Option<ResolvedChannel> {
        let found = match parse_channel(token) {
            Some(id) => self.channels.iter().find(|c| c.id == id),
            None => self
                .channels
                .iter()
                .filter(|c| scope.is_none() || c.guild_id == scope)
                .find(|c| name_matches(&c.name, token)),
        };
        found.cloned()
    }

    async fn resolve_role(&self, token: &str, scope: Option<GuildId>) -> Option<ResolvedRole> {
        let guild = scope?;
        let mut roles = self.roles.iter().filter(|r| r.guild_id == guild);
        let found = match parse_role(token) {
            Some(id) => roles.find(|r| r.id == id),
            None => roles.find(|r| name_matches(&r.name, token)),
        };
        found.cloned()
    }

    async fn resolve_emoji(&self, token: &str, _scope: Option<GuildId>) -> Option<ResolvedEmoji> {
        let found = match parse_emoji(token) {
            Some(emoji) => self.emojis.iter().find(|e| e.id == emoji.id),
            None => {
                let name = token.trim_matches(':');
                self.emojis.iter().find(|e| e.name.eq_ignore_ascii_case(name))
            }
        };
        found.cloned()
    }
}

/// Something a [`RecordingSink`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// First reply.
    Initial(Reply),
    /// Later reply.
    FollowUp(Reply),
    /// Edit of an earlier reply.
    Edit(ReplyHandle, String),
    /// Deferred acknowledgment.
    Defer {
        /// Whether the acknowledgment was ephemeral.
        ephemeral: bool,
    },
}

/// Reply sink that records every call.
#[derive(Debug)]
pub struct RecordingSink {
    kind: SourceKind,
    events: Mutex<Vec<SinkEvent>>,
    next_id: AtomicU64,
    fail_next: AtomicBool,
}

impl RecordingSink {
    /// Creates a sink for the given source kind.
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            events: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(500_000_000_000_000_000),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Recorded calls, oldest first.
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    /// Text of every recorded initial reply, follow-up and edit.
    pub fn contents(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Initial(reply) | SinkEvent::FollowUp(reply) => {
                    Some(reply.content.clone())
                }
                SinkEvent::Edit(_, content) => Some(content.clone()),
                SinkEvent::Defer { .. } => None,
            })
            .collect()
    }

    /// Makes the next call fail without recording anything.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn record(&self, event: SinkEvent) -> Result<(), ReplyError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ReplyError::delivery(
                "simulated failure",
                std::io::Error::new(std::io::ErrorKind::Other, "sink offline"),
            ));
        }
        self.events.lock().push(event);
        Ok(())
    }

    fn message_handle(&self) -> ReplyHandle {
        ReplyHandle::Message(MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn initial_handle(&self) -> ReplyHandle {
        match self.kind {
            SourceKind::Interaction => ReplyHandle::Original,
            SourceKind::Message => self.message_handle(),
        }
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn send_initial(&self, reply: &Reply) -> Result<ReplyHandle, ReplyError> {
        self.record(SinkEvent::Initial(reply.clone()))?;
        Ok(self.initial_handle())
    }

    async fn send_follow_up(&self, reply: &Reply) -> Result<ReplyHandle, ReplyError> {
        self.record(SinkEvent::FollowUp(reply.clone()))?;
        Ok(self.message_handle())
    }

    async fn edit(&self, handle: &ReplyHandle, content: &str) -> Result<(), ReplyError> {
        self.record(SinkEvent::Edit(*handle, content.to_string()))
    }

    async fn defer(&self, ephemeral: bool) -> Result<ReplyHandle, ReplyError> {
        self.record(SinkEvent::Defer { ephemeral })?;
        Ok(self.initial_handle())
    }
}

/// Invoker with the given user id, named after the fixtures.
pub fn invoker(user: UserId, member: Option<InvokingMember>) -> Invoker {
    let name = if user == test_owner_id() { "owner" } else { "tester" };
    Invoker {
        user: ResolvedUser::new(user, name),
        member,
    }
}

/// Plain guild membership with the given roles.
pub fn member(guild: GuildId, roles: Vec<RoleId>) -> InvokingMember {
    InvokingMember {
        guild_id: guild,
        roles,
        is_guild_owner: false,
        nickname: None,
    }
}

/// Context in the fixture channel plus the sink recording its replies.
pub fn context(invoker: Invoker, kind: SourceKind) -> (Arc<InvocationContext>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new(kind));
    let ctx = Arc::new(InvocationContext::new(invoker, test_channel_id(), sink.clone()));
    (ctx, sink)
}

/// Collaborators wired the way the fixtures expect: the fixture owner is a
/// bot owner, the fixture guild maps the fixture roles to admin, mod and VIP,
/// and commands are allowed everywhere.
#[derive(Debug, Clone)]
pub struct Harness {
    /// Owner directory.
    pub owners: StaticOwners,
    /// Guild settings, also the role config.
    pub settings: Arc<GuildSettingsStore>,
    /// Capability check.
    pub capabilities: FakeCapabilities,
    /// Entity directory.
    pub directory: FakeDirectory,
}

impl Default for Harness {
    fn default() -> Self {
        let (admin, moderator, vip) = test_role_ids();
        let settings = GuildSettingsStore::new("!");
        settings.set_admin_role(test_guild_id(), admin);
        settings.set_mod_role(test_guild_id(), moderator);
        settings.set_vip_role(test_guild_id(), vip);
        Self {
            owners: StaticOwners::new([test_owner_id()]),
            settings: Arc::new(settings),
            capabilities: FakeCapabilities::allowing(),
            directory: FakeDirectory::populated(),
        }
    }
}

impl Harness {
    /// Resolver over the harness collaborators.
    pub fn resolver(&self) -> PermissionResolver {
        PermissionResolver::new(
            Arc::new(self.owners.clone()),
            self.settings.clone(),
            Arc::new(self.capabilities.clone()),
        )
    }

    /// Parser over the harness directory.
    pub fn parser(&self) -> ArgumentParser {
        ArgumentParser::new(Arc::new(self.directory.clone()))
    }

    /// Registry builder over the harness collaborators.
    pub fn builder(&self) -> RegistryBuilder {
        RegistryBuilder::new(self.resolver(), self.parser()).error_message("Error running command.")
    }

    /// Invoker in the fixture guild holding `roles`.
    pub fn guild_invoker(&self, user: UserId, roles: Vec<RoleId>) -> Invoker {
        invoker(user, Some(member(test_guild_id(), roles)))
    }
}
