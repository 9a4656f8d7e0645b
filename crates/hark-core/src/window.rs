//! Outbound message window.
//!
//! Selects the most recent turns of a conversation for a query payload. Pure;
//! the system preamble is prepended by the caller.

use crate::history::{Message, Role};

/// Keep the messages covering the last `max_turns` user messages, oldest first.
///
/// The window starts at a user message, so no reply is ever separated from
/// its question. `None` or `Some(0)` keeps the whole conversation.
pub fn build_window(messages: &[Message], max_turns: Option<usize>) -> Vec<Message> {
    let Some(max_turns) = max_turns.filter(|t| *t > 0) else {
        return messages.to_vec();
    };

    let mut seen = 0usize;
    let mut start = 0usize;
    for (i, message) in messages.iter().enumerate().rev() {
        if message.role == Role::User {
            seen += 1;
            start = i;
            if seen == max_turns {
                break;
            }
        }
    }
    log::debug!(
        "window: {} of {} messages ({} turns max)",
        messages.len() - start,
        messages.len(),
        max_turns
    );
    messages[start..].to_vec()
}
