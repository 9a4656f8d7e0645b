//! Multi-source configuration resolution.
//!
//! A setting resolves through a fixed precedence chain, first non-empty hit
//! wins:
//! 1. Environment override (`HARK_API_KEY`, credentials only)
//! 2. ConfigDocument of the currently selected scope
//! 3. Fallback files for that scope (project-local, then user home)
//!
//! The selected scope itself lives in the global document.

use super::store::ConfigStore;
use super::{ConfigKey, ConfigPatch, Scope};
use crate::error::{Result, StateError};
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug)]
pub struct ConfigResolver {
    store: ConfigStore,
}

/// Treat empty (or whitespace-only) values as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// First line of a credential file, trimmed.
fn read_fallback_file(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => non_empty(content.lines().next().map(|l| l.trim().to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            log::warn!("ignoring unreadable fallback file {}: {}", path.display(), e);
            None
        }
    }
}

impl ConfigResolver {
    pub fn new(store: ConfigStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Resolve `key` to its current value, or `None` when no source yields one.
    pub fn get_current(&mut self, key: ConfigKey) -> Option<String> {
        if let Some(var) = key.env_override()
            && let Some(value) = non_empty(env::var(var).ok())
        {
            log::debug!("{} resolved from ${}", key, var);
            return Some(value);
        }

        let scope = self.get_selected_scope();
        if let Some(value) = non_empty(self.store.load(scope).get_field(key)) {
            log::debug!("{} resolved from {} config", key, scope);
            return Some(value);
        }

        if key.has_fallback_files() {
            for path in self.store.paths().api_key_fallback_files(scope) {
                if let Some(value) = read_fallback_file(&path) {
                    log::debug!("{} resolved from {}", key, path.display());
                    return Some(value);
                }
            }
        }

        None
    }

    /// Like [`get_current`](Self::get_current), but reports absence as
    /// [`StateError::NotFound`].
    pub fn require_current(&mut self, key: ConfigKey) -> Result<String> {
        self.get_current(key)
            .ok_or(StateError::NotFound { key: key.as_str() })
    }

    /// Write `value` for `key` into the selected scope's document.
    pub fn set_current(&mut self, key: ConfigKey, value: &str) -> Result<()> {
        let patch = ConfigPatch::from_key_value(key, value)?;
        let scope = self.get_selected_scope();
        self.store.save(scope, &patch)?;
        Ok(())
    }

    /// The active scope, as recorded in the global document.
    pub fn get_selected_scope(&mut self) -> Scope {
        self.store.load(Scope::Global).selected_scope
    }

    pub fn set_selected_scope(&mut self, scope: Scope) -> Result<()> {
        self.store.save(
            Scope::Global,
            &ConfigPatch {
                selected_scope: Some(scope),
                ..Default::default()
            },
        )?;
        Ok(())
    }

    /// Parse-and-set convenience for settings UIs that hold a raw name.
    pub fn set_selected_scope_named(&mut self, name: &str) -> Result<()> {
        let scope = name.parse::<Scope>()?;
        self.set_selected_scope(scope)
    }

    /// Retention limit for stored conversations; `None` disables retention.
    pub fn max_conversations(&mut self) -> Option<usize> {
        let limit = self
            .get_current(ConfigKey::MaxConversations)
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(super::ConfigDefaults::MAX_CONVERSATIONS);
        (limit > 0).then_some(limit)
    }

    /// Pruning window for outbound queries; `None` keeps the whole conversation.
    pub fn max_conversation_turns(&mut self) -> Option<usize> {
        self.get_current(ConfigKey::MaxConversationTurns)
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|turns| *turns > 0)
    }

    pub fn debug_enabled(&mut self) -> bool {
        self.get_current(ConfigKey::Debug)
            .is_some_and(|v| v == "true")
    }

    /// Drop cached documents so external edits become visible.
    pub fn invalidate(&mut self) {
        self.store.invalidate();
    }
}
