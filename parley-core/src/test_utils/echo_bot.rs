//! EchoBot — replies with the inbound text prefixed by `ECHO:`.

use crate::bot::Bot;
use crate::context::TurnContext;
use crate::error::TurnError;
use async_trait::async_trait;

/// A bot that echoes message text back as `ECHO:<text>`.
/// Non-message activities are ignored.
pub struct EchoBot;

#[async_trait]
impl Bot for EchoBot {
    async fn on_turn(&self, ctx: &TurnContext) -> Result<(), TurnError> {
        if ctx.activity().kind == crate::activity::ActivityKind::Message {
            let reply = format!("ECHO:{}", ctx.activity().text());
            ctx.send_text(reply).await?;
        }
        Ok(())
    }
}
