//! Configuration types for hark.
//!
//! One [`ConfigDocument`] is persisted per [`Scope`]. [`store::ConfigStore`]
//! reads and merges them; [`resolver::ConfigResolver`] answers "what is the
//! current value of this setting" across overrides, scopes and fallback files.

pub mod resolver;
pub mod store;

use crate::error::StateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Config Macros
// ============================================================================

/// Apply `Option`-field overrides from a source struct to a target struct.
///
/// For each field name, if `$src.field` is `Some(v)`, sets `$dst.field = v`
/// (cloning as needed).
macro_rules! apply_option_overrides {
    ($src:expr, $dst:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(ref v) = $src.$field {
                $dst.$field = v.clone();
            }
        )+
    };
}

/// Like `apply_option_overrides!`, for target fields that are themselves `Option`.
macro_rules! apply_optional_field_overrides {
    ($src:expr, $dst:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(v) = $src.$field {
                $dst.$field = Some(v);
            }
        )+
    };
}

// ============================================================================
// Scope
// ============================================================================

/// A named configuration namespace with its own persisted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Global,
    Project,
}

impl Scope {
    pub const ALL: [Scope; 2] = [Scope::Global, Scope::Project];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Project => "project",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(Scope::Global),
            "project" => Ok(Scope::Project),
            other => Err(StateError::InvalidScope(other.to_string())),
        }
    }
}

// ============================================================================
// Logical keys
// ============================================================================

/// Logical settings the resolver understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ApiKey,
    Preprompt,
    Debug,
    MaxConversations,
    MaxConversationTurns,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 5] = [
        ConfigKey::ApiKey,
        ConfigKey::Preprompt,
        ConfigKey::Debug,
        ConfigKey::MaxConversations,
        ConfigKey::MaxConversationTurns,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::ApiKey => "api_key",
            ConfigKey::Preprompt => "preprompt",
            ConfigKey::Debug => "debug",
            ConfigKey::MaxConversations => "max_conversations",
            ConfigKey::MaxConversationTurns => "max_conversation_turns",
        }
    }

    /// Environment variable consulted before any file, for keys that have one.
    pub fn env_override(&self) -> Option<&'static str> {
        match self {
            ConfigKey::ApiKey => Some(ENV_API_KEY),
            _ => None,
        }
    }

    /// Whether the key may be sourced from external fallback files.
    pub fn has_fallback_files(&self) -> bool {
        matches!(self, ConfigKey::ApiKey)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| StateError::UnknownKey(s.to_string()))
    }
}

/// Environment variable overriding the API key.
pub const ENV_API_KEY: &str = "HARK_API_KEY";

// ============================================================================
// Defaults
// ============================================================================

pub struct ConfigDefaults;

impl ConfigDefaults {
    pub const VERSION: u32 = 1;
    pub const DEBUG: bool = false;
    /// Retention limit when none is configured
    pub const MAX_CONVERSATIONS: usize = 100;
}

fn default_version() -> u32 {
    ConfigDefaults::VERSION
}

// ============================================================================
// Documents
// ============================================================================

/// Persisted configuration for one scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub preprompt: String,
    /// Only meaningful in the global document
    #[serde(default)]
    pub selected_scope: Scope,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub last_modified: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_conversations: Option<usize>,
    /// Turns kept in the outbound window; unset or <= 0 keeps everything
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_conversation_turns: Option<i64>,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            version: ConfigDefaults::VERSION,
            preprompt: String::new(),
            selected_scope: Scope::Global,
            api_key: String::new(),
            debug: ConfigDefaults::DEBUG,
            last_modified: String::new(),
            max_conversations: None,
            max_conversation_turns: None,
        }
    }
}

impl ConfigDocument {
    /// String view of a setting as stored in this document.
    ///
    /// Unset optional settings return `None`; empty strings are returned as-is
    /// and treated as absent by the resolver.
    pub fn get_field(&self, key: ConfigKey) -> Option<String> {
        match key {
            ConfigKey::ApiKey => Some(self.api_key.clone()),
            ConfigKey::Preprompt => Some(self.preprompt.clone()),
            ConfigKey::Debug => Some(self.debug.to_string()),
            ConfigKey::MaxConversations => self.max_conversations.map(|v| v.to_string()),
            ConfigKey::MaxConversationTurns => self.max_conversation_turns.map(|v| v.to_string()),
        }
    }
}

/// Partial update merged over a loaded [`ConfigDocument`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigPatch {
    pub preprompt: Option<String>,
    pub selected_scope: Option<Scope>,
    pub api_key: Option<String>,
    pub debug: Option<bool>,
    pub max_conversations: Option<usize>,
    pub max_conversation_turns: Option<i64>,
}

impl ConfigPatch {
    /// Parse a string value for `key` into a single-field patch.
    pub fn from_key_value(key: ConfigKey, value: &str) -> Result<Self, StateError> {
        let invalid = |reason: String| StateError::InvalidValue {
            key: key.as_str(),
            value: value.to_string(),
            reason,
        };
        let mut patch = ConfigPatch::default();
        match key {
            ConfigKey::ApiKey => patch.api_key = Some(value.to_string()),
            ConfigKey::Preprompt => patch.preprompt = Some(value.to_string()),
            ConfigKey::Debug => {
                patch.debug = Some(
                    value
                        .parse::<bool>()
                        .map_err(|_| invalid("expected true or false".to_string()))?,
                )
            }
            ConfigKey::MaxConversations => {
                patch.max_conversations = Some(
                    value
                        .parse::<usize>()
                        .map_err(|e| invalid(e.to_string()))?,
                )
            }
            ConfigKey::MaxConversationTurns => {
                patch.max_conversation_turns =
                    Some(value.parse::<i64>().map_err(|e| invalid(e.to_string()))?)
            }
        }
        Ok(patch)
    }

    pub fn apply_to(&self, doc: &mut ConfigDocument) {
        apply_option_overrides!(self, doc, preprompt, selected_scope, api_key, debug);
        apply_optional_field_overrides!(self, doc, max_conversations, max_conversation_turns);
    }
}
