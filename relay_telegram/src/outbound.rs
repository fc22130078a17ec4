use async_trait::async_trait;
use relay_conversation::Outbound;
use teloxide::RequestError;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, MessageId, ReplyParameters};
use tokio::time::sleep;
use tracing::warn;

/// Sends replies, typing indicators and log records through the Bot API.
#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn message_request(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i32>,
    ) -> <Bot as Requester>::SendMessage {
        let request = self.bot.send_message(ChatId(chat_id), text.to_string());
        match reply_to {
            Some(id) => request.reply_parameters(ReplyParameters::new(MessageId(id))),
            None => request,
        }
    }

    /// Send a message, waiting out one flood-control response before retrying.
    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i32>,
    ) -> Result<(), RequestError> {
        match self.message_request(chat_id, text, reply_to).await {
            Ok(_) => Ok(()),
            Err(RequestError::RetryAfter(wait)) => {
                warn!(
                    "Flood control on chat {chat_id}, retrying in {}s",
                    wait.duration().as_secs()
                );
                sleep(wait.duration()).await;
                self.message_request(chat_id, text, reply_to)
                    .await
                    .map(|_| ())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Outbound for TelegramOutbound {
    async fn send_typing(&self, chat_id: i64) -> anyhow::Result<()> {
        self.bot
            .send_chat_action(ChatId(chat_id), ChatAction::Typing)
            .await?;
        Ok(())
    }

    async fn send_reply(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i32>,
    ) -> anyhow::Result<()> {
        self.send(chat_id, text, reply_to).await?;
        Ok(())
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        self.send(chat_id, text, None).await?;
        Ok(())
    }
}
