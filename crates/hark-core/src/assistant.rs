//! Query orchestration around the persistent state.
//!
//! Transport and environment detection are collaborators behind
//! [`QueryService`] and [`PromptBuilder`]. [`Assistant::ask`] shapes the payload,
//! sends it, and records the exchange only once a reply has arrived.

use crate::config::ConfigKey;
use crate::config::resolver::ConfigResolver;
use crate::error::StateError;
use crate::history::Message;
use crate::history::service::ConversationService;
use crate::window::build_window;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query failed: {0}")]
    Transport(String),
    #[error("query cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum AskError {
    #[error(transparent)]
    Query(#[from] QueryError),
    /// The reply arrived and is recorded in memory, but could not be persisted.
    #[error("reply received but history not saved: {source}")]
    Record {
        answer: String,
        #[source]
        source: StateError,
    },
}

/// Remote completion call.
pub trait QueryService {
    fn send(&mut self, messages: &[Message]) -> Result<String, QueryError>;
}

/// Environment/preamble assembly.
pub trait PromptBuilder {
    fn system_prompt(&self) -> String;
}

impl PromptBuilder for String {
    fn system_prompt(&self) -> String {
        self.clone()
    }
}

/// Full outbound payload: system message (when non-empty), then the pruned
/// window over `history` plus the new `question`.
pub fn compose_payload(
    system_prompt: &str,
    preprompt: Option<&str>,
    history: &[Message],
    question: &str,
    max_turns: Option<usize>,
) -> Vec<Message> {
    let system: Vec<&str> = [Some(system_prompt), preprompt]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let mut conversation = history.to_vec();
    conversation.push(Message::user(question));

    let mut payload = Vec::with_capacity(conversation.len() + 1);
    if !system.is_empty() {
        payload.push(Message::system(system.join("\n\n")));
    }
    payload.extend(build_window(&conversation, max_turns));
    payload
}

/// Payload for `question` against the active conversation (if any), with the
/// preprompt and turn limit resolved from `config`.
pub fn outbound_payload<P: PromptBuilder + ?Sized>(
    conversations: &mut ConversationService,
    config: &mut ConfigResolver,
    prompt: &P,
    question: &str,
) -> Vec<Message> {
    let history = conversations
        .active_conversation()
        .map(|c| c.messages)
        .unwrap_or_default();
    let preprompt = config.get_current(ConfigKey::Preprompt);
    compose_payload(
        &prompt.system_prompt(),
        preprompt.as_deref(),
        &history,
        question,
        config.max_conversation_turns(),
    )
}

/// Record a completed exchange under the configured retention limit.
pub fn record_exchange(
    conversations: &mut ConversationService,
    config: &mut ConfigResolver,
    user_text: &str,
    assistant_text: &str,
) -> Result<(), StateError> {
    conversations.set_max_conversations(config.max_conversations());
    conversations.append_exchange(user_text, assistant_text)
}

pub struct Assistant<Q, P> {
    conversations: ConversationService,
    config: ConfigResolver,
    query: Q,
    prompt: P,
}

impl<Q: QueryService, P: PromptBuilder> Assistant<Q, P> {
    pub fn new(
        conversations: ConversationService,
        config: ConfigResolver,
        query: Q,
        prompt: P,
    ) -> Self {
        Self {
            conversations,
            config,
            query,
            prompt,
        }
    }

    pub fn conversations(&mut self) -> &mut ConversationService {
        &mut self.conversations
    }

    pub fn config(&mut self) -> &mut ConfigResolver {
        &mut self.config
    }

    /// Payload that [`ask`](Self::ask) would send for `question`.
    pub fn outbound_messages(&mut self, question: &str) -> Vec<Message> {
        outbound_payload(
            &mut self.conversations,
            &mut self.config,
            &self.prompt,
            question,
        )
    }

    /// Send `question` and record the exchange once the reply arrives.
    ///
    /// A failed or cancelled query records nothing.
    pub fn ask(&mut self, question: &str) -> Result<String, AskError> {
        let payload = self.outbound_messages(question);
        let answer = self.query.send(&payload)?;

        match record_exchange(&mut self.conversations, &mut self.config, question, &answer) {
            Ok(()) => Ok(answer),
            Err(source) => Err(AskError::Record { answer, source }),
        }
    }
}
