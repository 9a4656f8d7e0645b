//! Safe file I/O utilities: atomic writes and one-time backups.
//!
//! - [`atomic_write()`] - Write bytes atomically (temp file + rename)
//! - [`to_json_bytes()`] - The canonical JSON encoding of a document
//! - [`preserve_copy()`] - Keep original bytes beside a file, never clobbering
//!
//! Every persisted document in hark is written as a whole file. A crash in the
//! middle of a write leaves either the previous content or the new content on
//! disk, never a mix.

use serde::Serialize;
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Append `suffix` to the full file name of `path`.
///
/// `history.json` + `.v1.backup` gives `history.json.v1.backup`.
pub fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Atomically write bytes to a file.
///
/// Parent directories are created as needed. The content goes to a `.tmp`
/// sibling first, is synced, then renamed over the target.
pub fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = sibling_with_suffix(path, ".tmp");

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)?;

    {
        let mut writer = BufWriter::new(&mut file);
        writer.write_all(contents)?;
        writer.flush()?;
    }

    file.sync_all()?;

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    Ok(())
}

/// Pretty JSON with a trailing newline, as every hark document is stored.
///
/// Serialization is deterministic for a given value, so writing back an
/// unchanged document reproduces the same bytes.
pub fn to_json_bytes<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Numbered slots tried after the base backup name (`<backup>.1` ..).
pub const MAX_BACKUP_SLOTS: usize = 99;

/// Make sure an exact copy of `contents` exists at `backup` or a numbered
/// sibling of it, and return where it lives.
///
/// Existing files are never overwritten. A slot already holding the same bytes
/// is reused; a slot holding different bytes is skipped.
pub fn preserve_copy(backup: &Path, contents: &[u8]) -> io::Result<PathBuf> {
    if let Some(parent) = backup.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let slots = std::iter::once(backup.to_path_buf()).chain(
        (1..=MAX_BACKUP_SLOTS).map(|n| sibling_with_suffix(backup, &format!(".{}", n))),
    );
    for slot in slots {
        match OpenOptions::new().write(true).create_new(true).open(&slot) {
            Ok(mut file) => {
                if let Err(e) = file.write_all(contents).and_then(|()| file.sync_all()) {
                    let _ = fs::remove_file(&slot);
                    return Err(e);
                }
                return Ok(slot);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if fs::read(&slot)? == contents {
                    return Ok(slot);
                }
            }
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free backup slot beside {}", backup.display()),
    ))
}

/// Read a file, mapping "does not exist" to `Ok(None)`.
pub fn read_if_exists(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
