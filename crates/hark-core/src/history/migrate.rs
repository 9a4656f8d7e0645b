//! History schema migration.
//!
//! [`migrate()`] is a pure function from on-disk bytes (or their absence) to a
//! current-version [`HistoryDocument`]. [`SchemaMigrator`] adds the file side of
//! a legacy upgrade: the original bytes are copied to `<path>.v1.backup` before
//! the canonical path is ever rewritten.

use super::{
    Conversation, HISTORY_VERSION, HistoryDocument, LEGACY_HISTORY_VERSION, LegacyEntry,
    Message, summarize,
};
use crate::error::{Result, StateError};
use crate::safe_io;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// What [`migrate()`] found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No file; a fresh empty document.
    Fresh,
    /// Already the current version, returned as-is.
    Current,
    /// Converted from the legacy schema.
    Migrated { entries: usize },
    /// Not valid JSON, a malformed document, or a version this build does not
    /// understand. The document is empty; the bytes must be preserved.
    Unreadable { reason: String },
}

#[derive(Debug, Clone)]
pub struct Migration {
    pub document: HistoryDocument,
    pub outcome: MigrationOutcome,
}

#[derive(Deserialize)]
struct LegacyDocument {
    #[serde(default)]
    entries: Vec<LegacyEntry>,
}

fn unreadable(reason: impl Into<String>) -> Migration {
    Migration {
        document: HistoryDocument::default(),
        outcome: MigrationOutcome::Unreadable {
            reason: reason.into(),
        },
    }
}

/// Convert raw history bytes into a current-version document.
///
/// Never fails: anything that cannot be understood degrades to an empty
/// document with [`MigrationOutcome::Unreadable`].
pub fn migrate(raw: Option<&[u8]>) -> Migration {
    let Some(raw) = raw else {
        return Migration {
            document: HistoryDocument::default(),
            outcome: MigrationOutcome::Fresh,
        };
    };

    let value: Value = match serde_json::from_slice(raw) {
        Ok(value) => value,
        Err(e) => return unreadable(format!("invalid JSON: {}", e)),
    };

    let version = value.get("version").and_then(Value::as_u64);
    let has_entries = value.get("entries").is_some_and(Value::is_array);

    match version {
        Some(v) if v == u64::from(HISTORY_VERSION) => {
            match serde_json::from_value::<HistoryDocument>(value) {
                Ok(document) if document.has_system_messages() => {
                    unreadable("system message in a stored conversation")
                }
                Ok(document) => Migration {
                    document,
                    outcome: MigrationOutcome::Current,
                },
                Err(e) => unreadable(format!("malformed v{} document: {}", HISTORY_VERSION, e)),
            }
        }
        Some(v) if v == u64::from(LEGACY_HISTORY_VERSION) => migrate_legacy(value),
        None if has_entries => migrate_legacy(value),
        Some(v) => unreadable(format!("unsupported history version {}", v)),
        None => unreadable("missing version field"),
    }
}

fn migrate_legacy(value: Value) -> Migration {
    let legacy = match serde_json::from_value::<LegacyDocument>(value) {
        Ok(legacy) => legacy,
        Err(e) => return unreadable(format!("malformed v1 document: {}", e)),
    };
    let entries = legacy.entries.len();
    // v1 entries are already newest-first; keep their order.
    let conversations = legacy.entries.into_iter().map(legacy_to_conversation).collect();
    Migration {
        document: HistoryDocument {
            version: HISTORY_VERSION,
            conversations,
        },
        outcome: MigrationOutcome::Migrated { entries },
    }
}

fn legacy_to_conversation(entry: LegacyEntry) -> Conversation {
    Conversation {
        id: Uuid::new_v4().to_string(),
        created_at: entry.timestamp.clone(),
        updated_at: entry.timestamp,
        summary: summarize(&entry.prompt),
        messages: vec![
            Message::user(entry.prompt),
            Message::assistant(entry.response),
        ],
    }
}

/// History loaded from disk, with anything still owed to the filesystem.
#[derive(Debug, Clone)]
pub struct LoadedHistory {
    pub document: HistoryDocument,
    pub outcome: MigrationOutcome,
    /// Legacy bytes whose `.v1.backup` could not be written yet.
    pub pending_backup: Option<Vec<u8>>,
    /// Original bytes of an unreadable file, preserved before first overwrite.
    pub unreadable: Option<Vec<u8>>,
}

/// Runs [`migrate()`] against a history file and performs the one-time
/// backup-and-rewrite of legacy files.
#[derive(Debug, Clone)]
pub struct SchemaMigrator {
    path: PathBuf,
    backup_path: PathBuf,
}

impl SchemaMigrator {
    pub fn new(path: PathBuf, backup_path: PathBuf) -> Self {
        Self { path, backup_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Read, migrate and (for legacy files) upgrade the history file.
    ///
    /// The canonical path is only rewritten after the backup is safely on
    /// disk. Read errors and unreadable content degrade to an empty document
    /// and leave the file untouched.
    pub fn load(&self) -> LoadedHistory {
        let raw = match safe_io::read_if_exists(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!(
                    "history at {} unreadable, using empty history: {}",
                    self.path.display(),
                    e
                );
                return LoadedHistory {
                    document: HistoryDocument::default(),
                    outcome: MigrationOutcome::Unreadable {
                        reason: e.to_string(),
                    },
                    pending_backup: None,
                    unreadable: None,
                };
            }
        };

        let Migration { document, outcome } = migrate(raw.as_deref());
        let mut loaded = LoadedHistory {
            document,
            outcome,
            pending_backup: None,
            unreadable: None,
        };

        match &loaded.outcome {
            MigrationOutcome::Migrated { entries } => {
                let raw = raw.unwrap_or_default();
                match self.backup(&raw) {
                    Ok(backup) => {
                        if let Err(e) = self.rewrite(&loaded.document) {
                            log::warn!("migrated history not written back yet: {}", e);
                        } else {
                            log::info!(
                                "migrated {} legacy history entries (backup at {})",
                                entries,
                                backup.display()
                            );
                        }
                    }
                    Err(e) => {
                        log::warn!("{}; keeping legacy file in place", e);
                        loaded.pending_backup = Some(raw);
                    }
                }
            }
            MigrationOutcome::Unreadable { reason } => {
                log::warn!(
                    "history at {} not loaded ({}); file left untouched",
                    self.path.display(),
                    reason
                );
                loaded.unreadable = raw;
            }
            MigrationOutcome::Fresh | MigrationOutcome::Current => {}
        }

        loaded
    }

    /// Preserve the exact legacy bytes beside the history file.
    ///
    /// Returns where the copy lives: the backup path, or a numbered sibling
    /// when an older, different backup already occupies it.
    pub fn backup(&self, legacy: &[u8]) -> Result<PathBuf> {
        safe_io::preserve_copy(&self.backup_path, legacy).map_err(|source| {
            StateError::Migration {
                backup: self.backup_path.clone(),
                source,
            }
        })
    }

    fn rewrite(&self, document: &HistoryDocument) -> Result<()> {
        let bytes = safe_io::to_json_bytes(document)
            .map_err(|e| StateError::serialize(&self.path, e))?;
        safe_io::atomic_write(&self.path, &bytes)
            .map_err(|e| StateError::io("writing migrated history", &self.path, e))
    }
}
