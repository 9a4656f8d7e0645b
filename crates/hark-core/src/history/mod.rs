//! Conversation history: data model, schema migration, storage and the
//! business operations a chat/history UI drives.
//!
//! On disk the history is a single JSON document, conversations ordered
//! newest-first. Messages inside a conversation are chronological and only
//! ever appended in user/assistant pairs.

pub mod migrate;
pub mod service;
pub mod store;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current on-disk schema version.
pub const HISTORY_VERSION: u32 = 2;

/// Legacy flat schema version (prompt/response entries).
pub const LEGACY_HISTORY_VERSION: u32 = 1;

/// Characters of the first user message kept in a summary.
pub const SUMMARY_MAX_CHARS: usize = 50;

const SUMMARY_ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Only produced for outbound payloads; a stored document holding one is
    /// rejected on load
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    /// An empty conversation stamped with the current time.
    pub fn new(id: impl Into<String>) -> Self {
        let now = now_timestamp();
        Self {
            id: id.into(),
            created_at: now.clone(),
            updated_at: now,
            summary: String::new(),
            messages: Vec::new(),
        }
    }

    /// Append one user/assistant pair and refresh derived fields.
    pub fn push_exchange(&mut self, user_text: &str, assistant_text: &str) {
        if self.messages.is_empty() {
            self.summary = summarize(user_text);
        }
        self.messages.push(Message::user(user_text));
        self.messages.push(Message::assistant(assistant_text));
        self.updated_at = now_timestamp();
    }

    /// Number of user messages (turns) in the conversation.
    pub fn turn_count(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::User).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryDocument {
    pub version: u32,
    #[serde(default)]
    pub conversations: Vec<Conversation>,
}

impl Default for HistoryDocument {
    fn default() -> Self {
        Self {
            version: HISTORY_VERSION,
            conversations: Vec::new(),
        }
    }
}

impl HistoryDocument {
    pub fn find(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    /// Stored conversations only ever hold user/assistant pairs.
    pub fn has_system_messages(&self) -> bool {
        self.conversations
            .iter()
            .flat_map(|c| &c.messages)
            .any(|m| m.role == Role::System)
    }

    /// Drop conversations from the tail (oldest) until at most `max` remain.
    ///
    /// Returns the number removed.
    pub fn enforce_retention(&mut self, max: usize) -> usize {
        let excess = self.conversations.len().saturating_sub(max);
        self.conversations.truncate(self.conversations.len() - excess);
        excess
    }
}

/// One record of the legacy v1 schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyEntry {
    pub timestamp: String,
    pub prompt: String,
    pub response: String,
}

/// Summary for a conversation: the first user message, cut to
/// [`SUMMARY_MAX_CHARS`] characters plus an ellipsis when longer.
pub fn summarize(first_user_message: &str) -> String {
    if first_user_message.chars().count() <= SUMMARY_MAX_CHARS {
        return first_user_message.to_string();
    }
    let mut summary: String = first_user_message
        .chars()
        .take(SUMMARY_MAX_CHARS)
        .collect();
    summary.push_str(SUMMARY_ELLIPSIS);
    summary
}

/// Current UTC time as an ISO8601 timestamp.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_short_is_unchanged() {
        assert_eq!(summarize("How do I save a file?"), "How do I save a file?");
        let exactly_fifty = "x".repeat(50);
        assert_eq!(summarize(&exactly_fifty), exactly_fifty);
    }

    #[test]
    fn test_summary_long_is_truncated() {
        let long = "a".repeat(80);
        let summary = summarize(&long);
        assert_eq!(summary.chars().count(), 53);
        assert!(summary.ends_with("..."));
        assert!(summary.starts_with(&"a".repeat(50)));
    }

    #[test]
    fn test_summary_counts_characters_not_bytes() {
        let long = "é".repeat(60);
        let summary = summarize(&long);
        assert_eq!(summary.chars().count(), 53);
    }

    #[test]
    fn test_push_exchange_sets_summary_once() {
        let mut conv = Conversation::new("c1");
        conv.push_exchange("first question", "first answer");
        conv.push_exchange("second question", "second answer");

        assert_eq!(conv.summary, "first question");
        assert_eq!(conv.messages.len(), 4);
        assert_eq!(conv.messages[0], Message::user("first question"));
        assert_eq!(conv.messages[3], Message::assistant("second answer"));
        assert_eq!(conv.turn_count(), 2);
    }

    #[test]
    fn test_enforce_retention_drops_tail() {
        let mut doc = HistoryDocument::default();
        for i in 0..5 {
            doc.conversations.push(Conversation::new(format!("c{}", i)));
        }
        assert_eq!(doc.enforce_retention(3), 2);
        let ids: Vec<_> = doc.conversations.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["c0", "c1", "c2"]);
        assert_eq!(doc.enforce_retention(3), 0);
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Message::assistant("Use :w")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"Use :w"}"#);
    }
}
