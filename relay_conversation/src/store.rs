//! In-memory conversation histories keyed by chat id.

use dashmap::DashMap;
use relay_core::{ChatMessage, Error, Result, Role};

/// Number of user/assistant messages kept after a trim.
pub const DEFAULT_HISTORY_KEEP: usize = 10;

/// Conversation histories. Index 0 of every history is the system prompt.
#[derive(Debug)]
pub struct ConversationStore {
    system_prompt: String,
    conversations: DashMap<i64, Vec<ChatMessage>>,
}

impl ConversationStore {
    #[must_use]
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            conversations: DashMap::new(),
        }
    }

    #[must_use]
    pub fn system_message(&self) -> ChatMessage {
        ChatMessage::system(self.system_prompt.clone())
    }

    /// Existing history for `id`, or a fresh `[system]` one.
    pub fn get_or_create(&self, id: i64) -> Vec<ChatMessage> {
        self.conversations
            .entry(id)
            .or_insert_with(|| vec![self.system_message()])
            .value()
            .clone()
    }

    /// Replace the history for `id` with `[system]`.
    pub fn reset(&self, id: i64) -> Vec<ChatMessage> {
        let fresh = vec![self.system_message()];
        self.conversations.insert(id, fresh.clone());
        fresh
    }

    pub fn append(&self, id: i64, message: ChatMessage) -> Result<()> {
        if message.role == Role::System {
            return Err(Error::InvalidRole);
        }
        self.conversations
            .entry(id)
            .or_insert_with(|| vec![self.system_message()])
            .push(message);
        Ok(())
    }

    /// Keep the system prompt plus the last `keep` messages once the history
    /// grows past `keep + 1`.
    pub fn trim(&self, id: i64, keep: usize) {
        let Some(mut history) = self.conversations.get_mut(&id) else {
            return;
        };
        if history.len() <= keep + 1 {
            return;
        }
        let tail_start = history.len() - keep;
        let mut trimmed = Vec::with_capacity(keep + 1);
        trimmed.push(self.system_message());
        trimmed.extend(
            history
                .drain(tail_start.max(1)..)
                .filter(|m| m.role != Role::System),
        );
        *history = trimmed;
    }

    #[must_use]
    pub fn snapshot(&self, id: i64) -> Option<Vec<ChatMessage>> {
        self.conversations.get(&id).map(|h| h.value().clone())
    }

    #[must_use]
    pub fn len(&self, id: i64) -> usize {
        self.conversations.get(&id).map_or(0, |h| h.len())
    }

    #[must_use]
    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }
}
