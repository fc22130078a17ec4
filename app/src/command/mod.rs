//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy type with its own input, dispatched
//! statically from `main`.

use relay_config::Config;
use relay_conversation::{BusyGuard, ConversationStore, HandlerConfig, MessageHandler, Outbound};
use relay_core::{CompletionDispatcher, HumanPacer, NoDelay, Pacer};
use std::sync::Arc;
use tracing::info;

mod chat;
mod init;
mod telegram;
mod version;

pub use chat::{ChatInput, ChatStrategy};
pub use init::InitStrategy;
pub use telegram::{TelegramInput, TelegramStrategy};
pub use version::VersionStrategy;

/// Wire the conversation engine from configuration.
///
/// The store and busy guard are created here and handed to the handler; no
/// other component holds conversation state.
fn build_handler(
    config: &Config,
    outbound: Arc<dyn Outbound>,
    humanize: bool,
) -> anyhow::Result<MessageHandler> {
    let pool =
        relay_providers::build_pool(&config.upstream.api_keys, &config.upstream.base_url)?;
    info!(
        "Credential pool ready: {} key(s), model {}",
        pool.len(),
        config.upstream.model
    );

    let pacer: Arc<dyn Pacer> = if humanize {
        Arc::new(HumanPacer::new(
            config.dispatch.min_delay(),
            config.dispatch.max_delay(),
        ))
    } else {
        Arc::new(NoDelay)
    };
    let dispatcher = CompletionDispatcher::new(pool, pacer, config.upstream.model.clone());

    let store = ConversationStore::new(config.conversation.resolve_system_prompt());

    let mut handler_config = HandlerConfig {
        greeting_private: config.conversation.greeting_private.clone(),
        greeting_group: config.conversation.greeting_group.clone(),
        ..HandlerConfig::default()
    }
    .with_history_keep(config.conversation.history_keep);
    if let Some(owner) = config.telegram.owner_id {
        handler_config = handler_config.with_owner(owner);
    }
    if let Some(log_chat) = config.telegram.log_chat_id {
        handler_config = handler_config.with_log_chat(log_chat);
    }

    Ok(MessageHandler::new(
        Arc::new(store),
        BusyGuard::new(),
        Arc::new(dispatcher),
        outbound,
        handler_config,
    ))
}

/// Core trait defining the contract for all command strategies.
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}
