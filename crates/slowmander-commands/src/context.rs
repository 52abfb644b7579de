//! Invocation context: who invoked a command, where, and how to answer.
//!
//! Both event sources (plain messages and structured interactions) are
//! answered through a [`ReplySink`]. The context tracks whether anything has
//! been sent yet so that the first reply, later follow-ups, edits and defers
//! behave the same on either source.

use crate::directory::ResolvedUser;
use async_trait::async_trait;
use slowmander_common::{ChannelId, GuildId, MessageId, RoleId};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Guild membership of the invoking user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokingMember {
    /// Guild the command was invoked in.
    pub guild_id: GuildId,
    /// Roles the member holds.
    pub roles: Vec<RoleId>,
    /// Whether the member owns the guild.
    pub is_guild_owner: bool,
    /// Guild nickname, if set.
    pub nickname: Option<String>,
}

/// The user who invoked a command, plus their membership inside a guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoker {
    /// Invoking user.
    pub user: ResolvedUser,
    /// Present only when invoked inside a guild.
    pub member: Option<InvokingMember>,
}

/// Which event source backs a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A plain text message.
    Message,
    /// A structured interaction.
    Interaction,
}

/// Outgoing reply content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Message body.
    pub content: String,
    /// Visible only to the invoker. Ignored on the message path.
    pub ephemeral: bool,
    /// Ping the quoted author. Ignored on the interaction path.
    pub ping: bool,
}

impl Reply {
    /// Creates a plain reply.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
            ping: false,
        }
    }

    /// Makes the reply ephemeral.
    #[must_use]
    pub const fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    /// Makes the reply ping the quoted author.
    #[must_use]
    pub const fn ping(mut self) -> Self {
        self.ping = true;
        self
    }
}

impl From<&str> for Reply {
    fn from(content: &str) -> Self {
        Self::new(content)
    }
}

impl From<String> for Reply {
    fn from(content: String) -> Self {
        Self::new(content)
    }
}

/// Identifies something previously sent so it can be edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyHandle {
    /// The interaction's initial response.
    Original,
    /// A concrete message.
    Message(MessageId),
}

/// Reply delivery failures.
#[derive(Debug, Error)]
pub enum ReplyError {
    /// The platform rejected or failed the request.
    #[error("Failed to deliver reply: {message}")]
    Delivery {
        /// Error message.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ReplyError {
    /// Creates a delivery error with a source.
    pub fn delivery(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Delivery {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Platform-specific reply surface.
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Event source this sink answers.
    fn kind(&self) -> SourceKind;

    /// Sends the first reply.
    async fn send_initial(&self, reply: &Reply) -> Result<ReplyHandle, ReplyError>;

    /// Sends a reply after the first one.
    async fn send_follow_up(&self, reply: &Reply) -> Result<ReplyHandle, ReplyError>;

    /// Replaces the content of something previously sent.
    async fn edit(&self, handle: &ReplyHandle, content: &str) -> Result<(), ReplyError>;

    /// Acknowledges without content. Message sinks send a placeholder.
    async fn defer(&self, ephemeral: bool) -> Result<ReplyHandle, ReplyError>;
}

#[derive(Debug, Default)]
struct ReplyState {
    replied: bool,
    deferred: bool,
    /// Handle of the initial reply or the deferred acknowledgment.
    first: Option<ReplyHandle>,
}

/// Everything a handler needs to know about one invocation.
pub struct InvocationContext {
    invoker: Invoker,
    channel_id: ChannelId,
    sink: Arc<dyn ReplySink>,
    state: Mutex<ReplyState>,
}

impl InvocationContext {
    /// Creates a context answering through `sink`.
    pub fn new(invoker: Invoker, channel_id: ChannelId, sink: Arc<dyn ReplySink>) -> Self {
        Self {
            invoker,
            channel_id,
            sink,
            state: Mutex::new(ReplyState::default()),
        }
    }

    /// Invoking user and membership.
    pub const fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    /// Invoking user.
    pub const fn user(&self) -> &ResolvedUser {
        &self.invoker.user
    }

    /// Membership of the invoking user, inside a guild.
    pub const fn member(&self) -> Option<&InvokingMember> {
        self.invoker.member.as_ref()
    }

    /// Guild the command was invoked in.
    pub fn guild_id(&self) -> Option<GuildId> {
        self.invoker.member.as_ref().map(|m| m.guild_id)
    }

    /// Channel the command was invoked in.
    pub const fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Event source backing this context.
    pub fn source(&self) -> SourceKind {
        self.sink.kind()
    }

    /// Whether anything has been sent on this context.
    pub async fn has_replied(&self) -> bool {
        self.state.lock().await.replied
    }

    /// Sends a reply. The first reply is the initial response; after a defer
    /// it fills in the deferred acknowledgment instead; every later reply is
    /// a follow-up.
    pub async fn reply(&self, reply: impl Into<Reply>) -> Result<ReplyHandle, ReplyError> {
        let reply = reply.into();
        let mut state = self.state.lock().await;

        let handle = if state.deferred {
            let handle = state.first.unwrap_or(ReplyHandle::Original);
            self.sink.edit(&handle, &reply.content).await?;
            state.deferred = false;
            handle
        } else if state.replied {
            self.sink.send_follow_up(&reply).await?
        } else {
            self.sink.send_initial(&reply).await?
        };

        state.replied = true;
        state.first.get_or_insert(handle);
        Ok(handle)
    }

    /// Like [`reply`](Self::reply) but pings the quoted author on the
    /// message path.
    pub async fn reply_ping(&self, content: impl Into<String>) -> Result<ReplyHandle, ReplyError> {
        self.reply(Reply::new(content).ping()).await
    }

    /// Acknowledges now and answers later. No-op once anything was sent.
    pub async fn defer(&self) -> Result<(), ReplyError> {
        self.defer_with(false).await
    }

    /// Like [`defer`](Self::defer) with an ephemeral acknowledgment.
    pub async fn defer_ephemeral(&self) -> Result<(), ReplyError> {
        self.defer_with(true).await
    }

    async fn defer_with(&self, ephemeral: bool) -> Result<(), ReplyError> {
        let mut state = self.state.lock().await;
        if state.replied {
            return Ok(());
        }
        let handle = self.sink.defer(ephemeral).await?;
        state.replied = true;
        state.deferred = true;
        state.first = Some(handle);
        Ok(())
    }

    /// Edits the initial reply or the deferred acknowledgment. Follow-ups
    /// are never edited. No-op if nothing was sent.
    pub async fn edit(&self, content: impl Into<String>) -> Result<(), ReplyError> {
        let content = content.into();
        let mut state = self.state.lock().await;
        let Some(handle) = state.first else {
            return Ok(());
        };
        self.sink.edit(&handle, &content).await?;
        state.deferred = false;
        Ok(())
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("invoker", &self.invoker)
            .field("channel_id", &self.channel_id)
            .field("source", &self.sink.kind())
            .finish_non_exhaustive()
    }
}
