//! Cached, file-backed repository for the history document.

use super::HistoryDocument;
use super::migrate::{LoadedHistory, SchemaMigrator};
use crate::config::store::CORRUPT_BACKUP_SUFFIX;
use crate::error::{Result, StateError};
use crate::paths::HarkPaths;
use crate::safe_io::{self, sibling_with_suffix};
use std::path::{Path, PathBuf};

/// Owns the history file. The cache lives on the instance; writes that bypass
/// it (another process, a test editing the file) need [`invalidate`].
///
/// [`invalidate`]: ConversationStore::invalidate
#[derive(Debug)]
pub struct ConversationStore {
    migrator: SchemaMigrator,
    cache: Option<LoadedHistory>,
}

impl ConversationStore {
    pub fn new(path: PathBuf, backup_path: PathBuf) -> Self {
        Self {
            migrator: SchemaMigrator::new(path, backup_path),
            cache: None,
        }
    }

    pub fn from_paths(paths: &HarkPaths) -> Self {
        Self::new(paths.history_path(), paths.history_v1_backup_path())
    }

    pub fn path(&self) -> &Path {
        self.migrator.path()
    }

    fn loaded(&mut self) -> &mut LoadedHistory {
        self.cache.get_or_insert_with(|| self.migrator.load())
    }

    /// Current history document, reading (and migrating) the file on a cache miss.
    pub fn load(&mut self) -> HistoryDocument {
        if self.cache.is_some() {
            log::debug!("history cache hit");
        }
        self.loaded().document.clone()
    }

    /// Replace the whole history document on disk.
    ///
    /// The cache takes `doc` first, so the in-memory state reflects the
    /// mutation even when the write fails. Owed backups (a legacy file whose
    /// backup failed, or an unreadable file) are written before the canonical
    /// path is touched; if they cannot be, the canonical file is left as is.
    pub fn save(&mut self, doc: &HistoryDocument) -> Result<()> {
        let path = self.migrator.path().to_path_buf();
        let migrator = self.migrator.clone();
        let loaded = self.loaded();
        loaded.document = doc.clone();

        if let Some(legacy) = loaded.pending_backup.as_deref() {
            let backup = migrator.backup(legacy)?;
            log::info!("legacy history backed up to {}", backup.display());
            loaded.pending_backup = None;
        }

        if let Some(original) = loaded.unreadable.as_deref() {
            let backup = sibling_with_suffix(&path, CORRUPT_BACKUP_SUFFIX);
            let kept = safe_io::preserve_copy(&backup, original)
                .map_err(|e| StateError::io("preserving unreadable history", &backup, e))?;
            log::warn!("preserved unreadable history as {}", kept.display());
            loaded.unreadable = None;
        }

        let bytes = safe_io::to_json_bytes(doc).map_err(|e| StateError::serialize(&path, e))?;
        safe_io::atomic_write(&path, &bytes)
            .map_err(|e| StateError::io("writing history", &path, e))?;
        log::debug!(
            "saved {} conversations to {}",
            doc.conversations.len(),
            path.display()
        );
        Ok(())
    }

    /// Drop the cache so the next [`load`](Self::load) re-reads disk.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }
}
