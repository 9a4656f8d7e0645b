//! Scoped ConfigDocument persistence.
//!
//! Each scope maps to one JSON file. Loads are cached per scope on the store
//! instance; writes that bypass the instance require [`ConfigStore::invalidate`].

use super::{ConfigDocument, ConfigPatch, Scope};
use crate::error::{Result, StateError};
use crate::paths::HarkPaths;
use crate::safe_io::{self, sibling_with_suffix};
use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Suffix for the preserved copy of a document that failed to load.
pub const CORRUPT_BACKUP_SUFFIX: &str = ".corrupt.backup";

#[derive(Debug, Clone)]
struct CachedDocument {
    doc: ConfigDocument,
    /// Original bytes of a file that could not be parsed; preserved before
    /// the first overwrite.
    unreadable: Option<Vec<u8>>,
}

#[derive(Debug)]
pub struct ConfigStore {
    paths: HarkPaths,
    cache: HashMap<Scope, CachedDocument>,
}

impl ConfigStore {
    pub fn new(paths: HarkPaths) -> Self {
        Self {
            paths,
            cache: HashMap::new(),
        }
    }

    pub fn paths(&self) -> &HarkPaths {
        &self.paths
    }

    pub fn get_global_path(&self) -> PathBuf {
        self.paths.global_config_path()
    }

    pub fn get_project_path(&self) -> PathBuf {
        self.paths.project_config_path()
    }

    /// Load the document for `scope`.
    ///
    /// A missing, unreadable or corrupt file yields structural defaults; the
    /// file itself is left untouched.
    pub fn load(&mut self, scope: Scope) -> ConfigDocument {
        if let Some(cached) = self.cache.get(&scope) {
            log::debug!("config cache hit for {} scope", scope);
            return cached.doc.clone();
        }
        let cached = self.read_from_disk(scope);
        let doc = cached.doc.clone();
        self.cache.insert(scope, cached);
        doc
    }

    fn read_from_disk(&self, scope: Scope) -> CachedDocument {
        let path = self.paths.config_path(scope);
        let bytes = match safe_io::read_if_exists(&path) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                return CachedDocument {
                    doc: ConfigDocument::default(),
                    unreadable: None,
                };
            }
            Err(e) => {
                log::warn!(
                    "{} config at {} unreadable, using defaults: {}",
                    scope,
                    path.display(),
                    e
                );
                return CachedDocument {
                    doc: ConfigDocument::default(),
                    unreadable: None,
                };
            }
        };
        match parse_document(&path, &bytes) {
            Ok(doc) => CachedDocument {
                doc,
                unreadable: None,
            },
            Err(e) => {
                log::warn!(
                    "{} config is corrupt, using defaults (file left untouched): {}",
                    scope,
                    e
                );
                CachedDocument {
                    doc: ConfigDocument::default(),
                    unreadable: Some(bytes),
                }
            }
        }
    }

    /// Merge `patch` over the loaded document for `scope` and write it back.
    ///
    /// Returns the merged document. Parent directories are created as needed.
    pub fn save(&mut self, scope: Scope, patch: &ConfigPatch) -> Result<ConfigDocument> {
        let mut cached = match self.cache.remove(&scope) {
            Some(cached) => cached,
            None => self.read_from_disk(scope),
        };
        let result = self.write_merged(scope, &mut cached, patch);
        self.cache.insert(scope, cached);
        result
    }

    fn write_merged(
        &self,
        scope: Scope,
        cached: &mut CachedDocument,
        patch: &ConfigPatch,
    ) -> Result<ConfigDocument> {
        let path = self.paths.config_path(scope);
        let mut merged = cached.doc.clone();
        patch.apply_to(&mut merged);
        merged.last_modified = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        if let Some(original) = cached.unreadable.as_deref() {
            let backup = sibling_with_suffix(&path, CORRUPT_BACKUP_SUFFIX);
            let kept = safe_io::preserve_copy(&backup, original)
                .map_err(|e| StateError::io("preserving corrupt config", &backup, e))?;
            log::warn!("preserved corrupt config as {}", kept.display());
        }

        let bytes =
            safe_io::to_json_bytes(&merged).map_err(|e| StateError::serialize(&path, e))?;
        safe_io::atomic_write(&path, &bytes)
            .map_err(|e| StateError::io("writing config", &path, e))?;
        log::debug!("saved {} config to {}", scope, path.display());

        cached.doc = merged.clone();
        cached.unreadable = None;
        Ok(merged)
    }

    /// Drop cached documents and the cached project root.
    pub fn invalidate(&mut self) {
        self.cache.clear();
        self.paths.clear_project_root_cache();
    }
}

fn parse_document(path: &Path, bytes: &[u8]) -> Result<ConfigDocument> {
    serde_json::from_slice(bytes).map_err(|source| StateError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
