use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
}

/// The message an inbound message answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyContext {
    pub message_id: i32,
    /// Author of the replied-to message, when the transport knows it.
    pub author_id: Option<u64>,
}

/// A text message delivered by the chat transport.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub message_id: i32,
    pub kind: ChatKind,
    pub chat_title: Option<String>,
    pub sender_id: u64,
    pub sender_name: String,
    pub sender_is_bot: bool,
    pub text: String,
    pub reply_to: Option<ReplyContext>,
}

impl InboundMessage {
    /// Whether the message answers someone other than `self_id` inside a group.
    #[must_use]
    pub fn replies_to_other_in_group(&self, self_id: Option<u64>) -> bool {
        if self.kind == ChatKind::Private {
            return false;
        }
        match (self.reply_to, self_id) {
            (Some(reply), Some(me)) => reply.author_id != Some(me),
            _ => false,
        }
    }
}

/// Outbound side of the chat transport.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn send_typing(&self, chat_id: i64) -> anyhow::Result<()>;

    async fn send_reply(&self, chat_id: i64, text: &str, reply_to: Option<i32>)
    -> anyhow::Result<()>;

    async fn send_text(&self, chat_id: i64, text: &str) -> anyhow::Result<()>;
}
