//! Message handler driving one exchange per inbound message.
//!
//! The `MessageHandler` is the entry point the transport calls for every text
//! message and command. It owns no global state: the store, busy guard,
//! dispatcher and outbound side are injected.

use relay_core::{ChatMessage, CompletionDispatcher, Result};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info, warn};

use crate::{
    BusyGuard, ChatKind, ConversationStore, DEFAULT_HISTORY_KEEP, DiagnosticReport,
    InboundMessage, Outbound,
};

/// Configuration for message handling.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Only this user may clear histories, when set
    pub owner_id: Option<u64>,
    /// Chat that receives failure reports
    pub log_chat_id: Option<i64>,
    /// User/assistant messages kept after each exchange
    pub history_keep: usize,
    pub greeting_private: String,
    pub greeting_group: String,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            owner_id: None,
            log_chat_id: None,
            history_keep: DEFAULT_HISTORY_KEEP,
            greeting_private: "Hey! What's up?".to_string(),
            greeting_group: "Kya baat hai bolo yaar?".to_string(),
        }
    }
}

impl HandlerConfig {
    #[must_use]
    pub const fn with_owner(mut self, owner_id: u64) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    #[must_use]
    pub const fn with_log_chat(mut self, chat_id: i64) -> Self {
        self.log_chat_id = Some(chat_id);
        self
    }

    #[must_use]
    pub const fn with_history_keep(mut self, keep: usize) -> Self {
        self.history_keep = keep;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Filtered out before touching any state.
    Skipped,
    /// The chat was busy; the message is ignored for good.
    Dropped,
    Replied(String),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared,
    Refused,
}

#[derive(Clone)]
pub struct MessageHandler {
    store: Arc<ConversationStore>,
    guard: BusyGuard,
    dispatcher: Arc<CompletionDispatcher>,
    outbound: Arc<dyn Outbound>,
    config: HandlerConfig,
    self_id: Arc<OnceLock<u64>>,
}

impl MessageHandler {
    pub fn new(
        store: Arc<ConversationStore>,
        guard: BusyGuard,
        dispatcher: Arc<CompletionDispatcher>,
        outbound: Arc<dyn Outbound>,
        config: HandlerConfig,
    ) -> Self {
        Self {
            store,
            guard,
            dispatcher,
            outbound,
            config,
            self_id: Arc::new(OnceLock::new()),
        }
    }

    /// Record the relay's own user id once the transport knows it.
    pub fn set_self_id(&self, id: u64) {
        if self.self_id.set(id).is_err() && self.self_id.get() != Some(&id) {
            warn!("Own user id already set, ignoring {id}");
        }
    }

    #[must_use]
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    #[must_use]
    pub const fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Reset the chat's history and return the greeting for its kind.
    pub fn start(&self, chat_id: i64, kind: ChatKind) -> &str {
        self.store.reset(chat_id);
        info!("Conversation {chat_id} started");
        match kind {
            ChatKind::Private => &self.config.greeting_private,
            ChatKind::Group => &self.config.greeting_group,
        }
    }

    /// Reset the chat's history unless an owner is configured and `caller_id` is someone else.
    pub fn clear(&self, chat_id: i64, caller_id: u64) -> ClearOutcome {
        if self.config.owner_id.is_some_and(|owner| owner != caller_id) {
            warn!("Refusing clear of {chat_id} from non-owner {caller_id}");
            return ClearOutcome::Refused;
        }
        self.store.reset(chat_id);
        info!("Conversation {chat_id} cleared by {caller_id}");
        ClearOutcome::Cleared
    }

    pub async fn handle(&self, message: &InboundMessage) -> HandleOutcome {
        if message.sender_is_bot
            || message.replies_to_other_in_group(self.self_id.get().copied())
        {
            debug!(
                "Skipping message {} in {}",
                message.message_id, message.chat_id
            );
            return HandleOutcome::Skipped;
        }

        let permit = match self.guard.try_acquire(message.chat_id) {
            Ok(permit) => permit,
            Err(e) => {
                warn!("{e}; dropping message {}", message.message_id);
                return HandleOutcome::Dropped;
            }
        };

        info!("[{}] {}: {}", message.chat_id, message.sender_name, message.text);
        let result = self.exchange(message).await;
        drop(permit);

        match result {
            Ok(reply) => {
                if let Err(e) = self
                    .outbound
                    .send_reply(message.chat_id, &reply, Some(message.message_id))
                    .await
                {
                    warn!("Failed to deliver reply to {}: {e}", message.chat_id);
                }
                HandleOutcome::Replied(reply)
            }
            Err(e) => {
                error!("Exchange in {} failed: {e}", message.chat_id);
                self.report(&DiagnosticReport::new(message, &e)).await;
                HandleOutcome::Failed(e.to_string())
            }
        }
    }

    async fn exchange(&self, message: &InboundMessage) -> Result<String> {
        let chat_id = message.chat_id;
        self.store.get_or_create(chat_id);
        self.store.append(
            chat_id,
            ChatMessage::user(format!("{}: {}", message.sender_name, message.text)),
        )?;

        if let Err(e) = self.outbound.send_typing(chat_id).await {
            debug!("Typing indicator for {chat_id} failed: {e}");
        }

        let history = self.store.get_or_create(chat_id);
        let reply = self.dispatcher.complete(&history).await?;

        self.store
            .append(chat_id, ChatMessage::assistant(reply.clone()))?;
        self.store.trim(chat_id, self.config.history_keep);
        Ok(reply)
    }

    async fn report(&self, report: &DiagnosticReport) {
        let Some(log_chat) = self.config.log_chat_id else {
            return;
        };
        if let Err(e) = self.outbound.send_text(log_chat, &report.render()).await {
            warn!("Failed to deliver failure report to {log_chat}: {e}");
        }
    }
}
