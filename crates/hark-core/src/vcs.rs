//! VCS root detection.
//!
//! Walks up from a starting directory looking for version control markers.
//! Used to locate the project scope's configuration directory.

use std::path::{Path, PathBuf};

/// VCS markers to look for when walking up the directory tree.
/// Each entry is (marker_name, is_directory). Checked in order; first match wins.
const VCS_MARKERS: &[(&str, bool)] = &[
    (".git", true),       // also matches .git file (worktrees, submodules)
    (".hg", true),        // mercurial
    (".svn", true),       // subversion
    (".bzr", true),       // bazaar
    (".pijul", true),     // pijul
    (".jj", true),        // jujutsu
    (".fslckout", false), // fossil (file)
    ("_FOSSIL_", false),  // fossil (alt)
];

/// Maximum number of directories examined, `start` included.
pub const MAX_SEARCH_DEPTH: usize = 32;

fn has_marker(dir: &Path) -> bool {
    VCS_MARKERS.iter().any(|&(marker, expect_dir)| {
        let candidate = dir.join(marker);
        if marker == ".git" {
            candidate.exists()
        } else if expect_dir {
            candidate.is_dir()
        } else {
            candidate.is_file()
        }
    })
}

/// Detect VCS root by walking up from `start` looking for markers.
///
/// Returns the nearest directory containing a marker, or `None` if none is
/// found within `max_depth` directories or before the filesystem root.
pub fn detect_vcs_root(start: &Path, max_depth: usize) -> Option<PathBuf> {
    let start = start.canonicalize().ok()?;
    start
        .ancestors()
        .take(max_depth)
        .find(|dir| has_marker(dir))
        .map(Path::to_path_buf)
}

/// Project root for `cwd`: the nearest VCS root, or `cwd` itself.
pub fn detect_project_root(cwd: &Path) -> PathBuf {
    detect_vcs_root(cwd, MAX_SEARCH_DEPTH).unwrap_or_else(|| cwd.to_path_buf())
}
