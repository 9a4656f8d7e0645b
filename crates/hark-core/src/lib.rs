//! hark-core: persistent state for the hark editor assistant
//!
//! Provides the conversation history store (with schema migration and
//! retention), layered configuration resolution, and the outbound message
//! window.
//!
//! # Quick Start
//!
//! ```no_run
//! use hark_core::{ConfigKey, ConfigResolver, ConfigStore, ConversationService,
//!     ConversationStore, HarkPaths};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let paths = HarkPaths::discover(None)?;
//!     let mut history = ConversationService::new(ConversationStore::from_paths(&paths), Some(100));
//!     let mut config = ConfigResolver::new(ConfigStore::new(paths));
//!
//!     history.append_exchange("How do I save a file?", "Use :w")?;
//!     println!("{} conversations", history.list().len());
//!     println!("api key set: {}", config.get_current(ConfigKey::ApiKey).is_some());
//!     Ok(())
//! }
//! ```

pub mod assistant;
pub mod config;
pub mod error;
pub mod history;
pub mod paths;
pub mod safe_io;
pub mod vcs;
pub mod window;

// Re-export commonly used types
pub use assistant::{
    AskError, Assistant, PromptBuilder, QueryError, QueryService, compose_payload,
    outbound_payload, record_exchange,
};
pub use config::resolver::ConfigResolver;
pub use config::store::ConfigStore;
pub use config::{ConfigDocument, ConfigKey, ConfigPatch, Scope};
pub use error::StateError;
pub use history::service::ConversationService;
pub use history::store::ConversationStore;
pub use history::{Conversation, HistoryDocument, Message, Role};
pub use paths::HarkPaths;
pub use window::build_window;
