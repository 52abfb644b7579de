//! Ping command measuring reply round-trip time.

use crate::command::{handler, CommandResult};
use crate::context::{InvocationContext, Reply};
use crate::module::{CommandDescriptor, Module};
use std::sync::Arc;
use std::time::Instant;

/// Provides `ping`.
#[derive(Debug, Default)]
pub struct PingModule;

impl PingModule {
    async fn ping(ctx: Arc<InvocationContext>) -> CommandResult {
        let started = Instant::now();
        ctx.reply(Reply::new("Pong!").ephemeral()).await?;
        let elapsed = started.elapsed().as_millis();
        ctx.edit(format!("Pong! `{elapsed}ms`")).await?;
        Ok(())
    }
}

impl Module for PingModule {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn commands(self: Arc<Self>) -> Vec<CommandDescriptor> {
        vec![CommandDescriptor::command(
            "ping",
            handler(|ctx, _| Self::ping(ctx)),
        )
        .description("Check that the bot is responding")]
    }
}
