//! Terminal conversation driving the same handler the Telegram relay uses.
//!
//! The console acts as a private chat owned by the local operator, so
//! `/clear` is always allowed.

use async_trait::async_trait;
use relay_config::Config;
use relay_conversation::{ChatKind, ClearOutcome, HandleOutcome, InboundMessage, Outbound};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

const CONSOLE_CHAT_ID: i64 = 0;

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone)]
pub struct ChatInput {
    /// Optional config file path
    pub config: Option<PathBuf>,
    /// Name attributed to each message
    pub name: String,
    /// Skip the humanizing delay
    pub no_delay: bool,
}

struct ConsoleOutbound;

#[async_trait]
impl Outbound for ConsoleOutbound {
    async fn send_typing(&self, _chat_id: i64) -> anyhow::Result<()> {
        debug!("typing...");
        Ok(())
    }

    async fn send_reply(
        &self,
        _chat_id: i64,
        text: &str,
        _reply_to: Option<i32>,
    ) -> anyhow::Result<()> {
        println!("{text}\n");
        Ok(())
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        eprintln!("[log -> {chat_id}]\n{text}\n");
        Ok(())
    }
}

/// Strategy for executing the Chat command.
#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load(input.config.as_deref())?;
        config.validate(false)?;

        let handler = super::build_handler(&config, Arc::new(ConsoleOutbound), !input.no_delay)?;
        let operator = config.telegram.owner_id.unwrap_or(0);

        println!("chatrelay console. /start, /clear, or 'exit' to quit.\n");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut message_id = 0;
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let text = line.trim();
            match text {
                "" => {}
                "exit" | "quit" => break,
                "/start" => println!("{}\n", handler.start(CONSOLE_CHAT_ID, ChatKind::Private)),
                "/clear" => match handler.clear(CONSOLE_CHAT_ID, operator) {
                    ClearOutcome::Cleared => println!("History cleared!\n"),
                    ClearOutcome::Refused => println!("Refused.\n"),
                },
                _ => {
                    message_id += 1;
                    let inbound = InboundMessage {
                        chat_id: CONSOLE_CHAT_ID,
                        message_id,
                        kind: ChatKind::Private,
                        chat_title: None,
                        sender_id: operator,
                        sender_name: input.name.clone(),
                        sender_is_bot: false,
                        text: text.to_string(),
                        reply_to: None,
                    };
                    if let HandleOutcome::Failed(reason) = handler.handle(&inbound).await {
                        println!("(no reply: {reason})\n");
                    }
                }
            }
        }

        info!(
            "Conversation ended: {} messages in history",
            handler.store().len(CONSOLE_CHAT_ID)
        );
        Ok(())
    }
}
