use crate::{Command, Result, TelegramBot};
use relay_conversation::{ChatKind, ClearOutcome, HandleOutcome, InboundMessage, ReplyContext};
use teloxide::prelude::*;
use teloxide::types::{Message, User};
use tracing::{debug, info};

/// Display name used to attribute a message: first name, then username, then "User".
#[must_use]
pub fn sender_display_name(user: &User) -> String {
    if !user.first_name.trim().is_empty() {
        return user.first_name.clone();
    }
    user.username
        .clone()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "User".to_string())
}

/// Convert a Telegram text message into a transport-neutral inbound message.
#[must_use]
pub fn inbound_from(msg: &Message) -> Option<InboundMessage> {
    let text = msg.text()?;
    let from = msg.from.as_ref()?;

    Some(InboundMessage {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        kind: if msg.chat.is_private() {
            ChatKind::Private
        } else {
            ChatKind::Group
        },
        chat_title: msg.chat.title().map(str::to_string),
        sender_id: from.id.0,
        sender_name: sender_display_name(from),
        sender_is_bot: from.is_bot,
        text: text.to_string(),
        reply_to: msg.reply_to_message().map(|replied| ReplyContext {
            message_id: replied.id.0,
            author_id: replied.from.as_ref().map(|u| u.id.0),
        }),
    })
}

/// Handle bot commands
pub async fn handle_command(bot: TelegramBot, msg: Message, cmd: Command) -> Result<()> {
    let chat_id = msg.chat.id.0;
    let caller = msg.from.as_ref().map_or(0, |u| u.id.0);

    let reply = match cmd {
        Command::Start => {
            info!("[{chat_id}] Command: /start");
            let kind = if msg.chat.is_private() {
                ChatKind::Private
            } else {
                ChatKind::Group
            };
            bot.handler.start(chat_id, kind).to_string()
        }
        Command::Clear => {
            info!("[{chat_id}] Command: /clear from {caller}");
            match bot.handler.clear(chat_id, caller) {
                ClearOutcome::Cleared => Command::cleared_text().to_string(),
                ClearOutcome::Refused => Command::refused_text().to_string(),
            }
        }
        Command::Help => {
            info!("[{chat_id}] Command: /help");
            Command::help_text().to_string()
        }
    };

    bot.bot
        .send_message(msg.chat.id, reply)
        .reply_parameters(teloxide::types::ReplyParameters::new(msg.id))
        .await?;

    Ok(())
}

/// Handle any message (commands or regular text)
pub async fn handle_message(bot: TelegramBot, msg: Message) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    if let Some(cmd) = Command::parse_from_text(text, bot.username()) {
        return handle_command(bot, msg, cmd).await;
    }

    let Some(inbound) = inbound_from(&msg) else {
        return Ok(());
    };

    // Exchanges run detached so a second message for a busy chat reaches the
    // busy guard (and is dropped) instead of waiting behind the first.
    tokio::spawn(async move {
        match bot.handler.handle(&inbound).await {
            HandleOutcome::Replied(reply) => info!("[{}] Response: {reply}", inbound.chat_id),
            HandleOutcome::Dropped => info!(
                "[{}] Dropped message {} while busy",
                inbound.chat_id, inbound.message_id
            ),
            HandleOutcome::Skipped => debug!("[{}] Skipped message", inbound.chat_id),
            HandleOutcome::Failed(reason) => {
                debug!("[{}] Exchange failed: {reason}", inbound.chat_id);
            }
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Message {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn group_reply_carries_author_and_title() {
        let msg = parse(json!({
            "message_id": 77,
            "date": 1_700_000_000,
            "chat": { "id": -1_001_234_567_890_i64, "type": "supergroup", "title": "Friends" },
            "from": { "id": 11, "is_bot": false, "first_name": "Alice" },
            "text": "lol",
            "reply_to_message": {
                "message_id": 70,
                "date": 1_699_999_990,
                "chat": { "id": -1_001_234_567_890_i64, "type": "supergroup", "title": "Friends" },
                "from": { "id": 22, "is_bot": false, "first_name": "Bob" },
                "text": "joke"
            }
        }));

        let inbound = inbound_from(&msg).unwrap();
        assert_eq!(inbound.kind, ChatKind::Group);
        assert_eq!(inbound.chat_title.as_deref(), Some("Friends"));
        assert_eq!(inbound.sender_name, "Alice");
        assert_eq!(
            inbound.reply_to,
            Some(ReplyContext {
                message_id: 70,
                author_id: Some(22),
            })
        );
        assert!(inbound.replies_to_other_in_group(Some(99)));
    }

    #[test]
    fn private_message_without_first_name_uses_username() {
        let msg = parse(json!({
            "message_id": 5,
            "date": 1_700_000_000,
            "chat": { "id": 11, "type": "private", "first_name": "" },
            "from": { "id": 11, "is_bot": false, "first_name": "", "username": "alice99" },
            "text": "hi"
        }));

        let inbound = inbound_from(&msg).unwrap();
        assert_eq!(inbound.kind, ChatKind::Private);
        assert_eq!(inbound.sender_name, "alice99");
        assert!(inbound.chat_title.is_none());
        assert!(inbound.reply_to.is_none());
    }
}
