//! Reply sinks backed by Discord messages and slash-command interactions.

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use poise::serenity_prelude as serenity;
use slowmander_commands::{Reply, ReplyError, ReplyHandle, ReplySink, SourceKind};
use slowmander_common::utils::{truncate_content, MESSAGE_CONTENT_LIMIT};
use slowmander_common::MessageId;
use std::sync::Arc;

fn content(raw: &str) -> String {
    truncate_content(raw, MESSAGE_CONTENT_LIMIT)
}

fn handle_of(message: &serenity::Message) -> ReplyHandle {
    ReplyHandle::Message(MessageId(message.id.get()))
}

/// Answers a prefix command by replying to the invoking message.
///
/// The first reply quotes the invoking message without pinging its author
/// unless asked to; follow-ups quote that first reply.
pub struct MessageReplySink {
    http: Arc<serenity::Http>,
    channel_id: serenity::ChannelId,
    message_id: serenity::MessageId,
    thinking: String,
    first: OnceCell<serenity::MessageId>,
}

impl MessageReplySink {
    /// Creates a sink answering `message`. `thinking` is sent on defer.
    pub fn new(
        http: Arc<serenity::Http>,
        message: &serenity::Message,
        thinking: impl Into<String>,
    ) -> Self {
        Self::answering(http, message.channel_id, message.id, thinking)
    }

    fn answering(
        http: Arc<serenity::Http>,
        channel_id: serenity::ChannelId,
        message_id: serenity::MessageId,
        thinking: impl Into<String>,
    ) -> Self {
        Self {
            http,
            channel_id,
            message_id,
            thinking: thinking.into(),
            first: OnceCell::new(),
        }
    }

    /// Message a follow-up quotes: the first reply once one was sent.
    fn follow_up_target(&self) -> serenity::MessageId {
        self.first.get().copied().unwrap_or(self.message_id)
    }

    fn remember_first(&self, handle: ReplyHandle) {
        if let ReplyHandle::Message(id) = handle {
            let _ = self.first.set(serenity::MessageId::new(id.get()));
        }
    }

    async fn send(
        &self,
        text: &str,
        quote: serenity::MessageId,
        ping: bool,
    ) -> Result<ReplyHandle, ReplyError> {
        let mentions = serenity::CreateAllowedMentions::new()
            .all_users(true)
            .replied_user(ping);
        let builder = serenity::CreateMessage::new()
            .content(content(text))
            .allowed_mentions(mentions)
            .reference_message((self.channel_id, quote));
        let sent = self
            .channel_id
            .send_message(&*self.http, builder)
            .await
            .map_err(|e| ReplyError::delivery("Failed to send message", e))?;
        Ok(handle_of(&sent))
    }
}

#[async_trait]
impl ReplySink for MessageReplySink {
    fn kind(&self) -> SourceKind {
        SourceKind::Message
    }

    async fn send_initial(&self, reply: &Reply) -> Result<ReplyHandle, ReplyError> {
        let handle = self.send(&reply.content, self.message_id, reply.ping).await?;
        self.remember_first(handle);
        Ok(handle)
    }

    async fn send_follow_up(&self, reply: &Reply) -> Result<ReplyHandle, ReplyError> {
        self.send(&reply.content, self.follow_up_target(), false).await
    }

    async fn edit(&self, handle: &ReplyHandle, text: &str) -> Result<(), ReplyError> {
        let ReplyHandle::Message(id) = handle else {
            return Err(ReplyError::Delivery {
                message: "Message replies have no interaction response to edit".to_string(),
                source: None,
            });
        };
        self.channel_id
            .edit_message(
                &*self.http,
                serenity::MessageId::new(id.get()),
                serenity::EditMessage::new().content(content(text)),
            )
            .await
            .map_err(|e| ReplyError::delivery("Failed to edit message", e))?;
        Ok(())
    }

    async fn defer(&self, _ephemeral: bool) -> Result<ReplyHandle, ReplyError> {
        let handle = self.send(&self.thinking, self.message_id, false).await?;
        self.remember_first(handle);
        Ok(handle)
    }
}

/// Answers a slash command through its interaction token.
pub struct InteractionReplySink {
    http: Arc<serenity::Http>,
    interaction: serenity::CommandInteraction,
}

impl InteractionReplySink {
    /// Creates a sink answering `interaction`.
    pub const fn new(http: Arc<serenity::Http>, interaction: serenity::CommandInteraction) -> Self {
        Self { http, interaction }
    }
}

#[async_trait]
impl ReplySink for InteractionReplySink {
    fn kind(&self) -> SourceKind {
        SourceKind::Interaction
    }

    async fn send_initial(&self, reply: &Reply) -> Result<ReplyHandle, ReplyError> {
        let message = serenity::CreateInteractionResponseMessage::new()
            .content(content(&reply.content))
            .ephemeral(reply.ephemeral);
        self.interaction
            .create_response(&*self.http, serenity::CreateInteractionResponse::Message(message))
            .await
            .map_err(|e| ReplyError::delivery("Failed to respond to interaction", e))?;
        Ok(ReplyHandle::Original)
    }

    async fn send_follow_up(&self, reply: &Reply) -> Result<ReplyHandle, ReplyError> {
        let followup = serenity::CreateInteractionResponseFollowup::new()
            .content(content(&reply.content))
            .ephemeral(reply.ephemeral);
        let sent = self
            .interaction
            .create_followup(&*self.http, followup)
            .await
            .map_err(|e| ReplyError::delivery("Failed to send follow-up", e))?;
        Ok(handle_of(&sent))
    }

    async fn edit(&self, handle: &ReplyHandle, text: &str) -> Result<(), ReplyError> {
        match handle {
            ReplyHandle::Original => {
                self.interaction
                    .edit_response(
                        &*self.http,
                        serenity::EditInteractionResponse::new().content(content(text)),
                    )
                    .await
                    .map_err(|e| ReplyError::delivery("Failed to edit interaction response", e))?;
            }
            ReplyHandle::Message(id) => {
                self.interaction
                    .edit_followup(
                        &*self.http,
                        serenity::MessageId::new(id.get()),
                        serenity::CreateInteractionResponseFollowup::new().content(content(text)),
                    )
                    .await
                    .map_err(|e| ReplyError::delivery("Failed to edit follow-up", e))?;
            }
        }
        Ok(())
    }

    async fn defer(&self, ephemeral: bool) -> Result<ReplyHandle, ReplyError> {
        let message = serenity::CreateInteractionResponseMessage::new().ephemeral(ephemeral);
        self.interaction
            .create_response(&*self.http, serenity::CreateInteractionResponse::Defer(message))
            .await
            .map_err(|e| ReplyError::delivery("Failed to defer interaction", e))?;
        Ok(ReplyHandle::Original)
    }
}
