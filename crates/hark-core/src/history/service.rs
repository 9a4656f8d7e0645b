//! Conversation business operations and retention.
//!
//! Indices exposed to callers are 1-based positions in the newest-first list.

use super::store::ConversationStore;
use super::{Conversation, HistoryDocument};
use crate::error::{Result, StateError};
use uuid::Uuid;

#[derive(Debug)]
pub struct ConversationService {
    store: ConversationStore,
    /// Id of the conversation new exchanges go to. It may not exist in the
    /// document yet: a started conversation is only persisted with its first
    /// exchange.
    active: Option<String>,
    max_conversations: Option<usize>,
}

impl ConversationService {
    /// `max_conversations` of `None` disables retention.
    pub fn new(store: ConversationStore, max_conversations: Option<usize>) -> Self {
        Self {
            store,
            active: None,
            max_conversations,
        }
    }

    pub fn set_max_conversations(&mut self, max_conversations: Option<usize>) {
        self.max_conversations = max_conversations;
    }

    /// Begin a new active conversation. Nothing is written until the first
    /// exchange is recorded.
    pub fn start_new(&mut self) -> String {
        let id = Uuid::new_v4().to_string();
        self.active = Some(id.clone());
        id
    }

    pub fn get_active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// The active conversation as it currently stands in memory.
    ///
    /// A started-but-empty conversation is returned with no messages.
    pub fn active_conversation(&mut self) -> Option<Conversation> {
        let id = self.active.clone()?;
        let doc = self.store.load();
        Some(
            doc.find(&id)
                .cloned()
                .unwrap_or_else(|| Conversation::new(id)),
        )
    }

    /// Record a completed exchange in the active conversation (created if
    /// absent), apply retention, then persist.
    ///
    /// The exchange stays recorded in memory even when persisting fails; the
    /// error is returned for the caller to report.
    pub fn append_exchange(&mut self, user_text: &str, assistant_text: &str) -> Result<()> {
        let id = match &self.active {
            Some(id) => id.clone(),
            None => self.start_new(),
        };

        let mut doc = self.store.load();
        match doc.find_mut(&id) {
            Some(conversation) => conversation.push_exchange(user_text, assistant_text),
            None => {
                let mut conversation = Conversation::new(id);
                conversation.push_exchange(user_text, assistant_text);
                doc.conversations.insert(0, conversation);
            }
        }

        self.apply_retention(&mut doc);
        self.store.save(&doc)
    }

    fn apply_retention(&self, doc: &mut HistoryDocument) {
        let Some(max) = self.max_conversations else {
            return;
        };
        let removed = doc.enforce_retention(max);
        if removed > 0 {
            log::info!(
                "retention: dropped {} oldest conversation(s), {} kept",
                removed,
                doc.conversations.len()
            );
        }
    }

    /// All conversations, newest-first, exactly as stored.
    pub fn list(&mut self) -> Vec<Conversation> {
        self.store.load().conversations
    }

    /// Conversation at 1-based `index`.
    pub fn get(&mut self, index: usize) -> Result<Conversation> {
        let mut conversations = self.store.load().conversations;
        let position = checked_position(index, conversations.len())?;
        Ok(conversations.swap_remove(position))
    }

    /// Make the conversation at `index` active, so later exchanges append to it.
    pub fn resume(&mut self, index: usize) -> Result<Conversation> {
        let conversation = self.get(index)?;
        self.active = Some(conversation.id.clone());
        Ok(conversation)
    }

    /// Remove the conversation at `index` and persist.
    pub fn delete(&mut self, index: usize) -> Result<Conversation> {
        let mut doc = self.store.load();
        let position = checked_position(index, doc.conversations.len())?;
        let removed = doc.conversations.remove(position);
        if self.active.as_deref() == Some(removed.id.as_str()) {
            self.active = None;
        }
        self.store.save(&doc)?;
        Ok(removed)
    }

    /// Remove every conversation and persist.
    pub fn clear_all(&mut self) -> Result<()> {
        let mut doc = self.store.load();
        doc.conversations.clear();
        self.active = None;
        self.store.save(&doc)
    }

    /// Re-read history from disk on next access.
    pub fn invalidate(&mut self) {
        self.store.invalidate();
    }
}

fn checked_position(index: usize, len: usize) -> Result<usize> {
    if index == 0 || index > len {
        return Err(StateError::IndexOutOfRange { index, len });
    }
    Ok(index - 1)
}
