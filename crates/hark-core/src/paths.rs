//! File locations for hark's persisted state.
//!
//! Path methods are pure computations, except for the project root, which is
//! detected once from the working directory and cached on the instance.

use crate::config::Scope;
use crate::safe_io::sibling_with_suffix;
use crate::vcs::detect_project_root;
use dirs_next::home_dir;
use std::cell::RefCell;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// Environment variable overriding the hark home directory.
pub const ENV_HARK_HOME: &str = "HARK_HOME";

/// Directory (relative to the project root) holding project-scope files.
pub const PROJECT_DIR_NAME: &str = ".hark";

/// Credential fallback file name in the user's home directory.
pub const HOME_API_KEY_FILE: &str = ".hark_api_key";

#[derive(Debug)]
pub struct HarkPaths {
    hark_dir: PathBuf,
    /// `None` when the platform reports no home directory
    user_home: Option<PathBuf>,
    cwd: PathBuf,
    project_root: RefCell<Option<PathBuf>>,
}

impl HarkPaths {
    /// Build paths from explicit directories (used by tests and embedders).
    pub fn new(hark_dir: PathBuf, user_home: PathBuf, cwd: PathBuf) -> Self {
        Self::with_optional_home(hark_dir, Some(user_home), cwd)
    }

    fn with_optional_home(hark_dir: PathBuf, user_home: Option<PathBuf>, cwd: PathBuf) -> Self {
        Self {
            hark_dir,
            user_home,
            cwd,
            project_root: RefCell::new(None),
        }
    }

    /// Resolve paths for the running process.
    ///
    /// Precedence for the hark directory:
    /// 1. `home_override` parameter (from --home CLI flag)
    /// 2. `HARK_HOME` environment variable
    /// 3. `~/.hark` default
    ///
    /// The user's home directory is only required for the default; without
    /// one, the home credential fallback file is simply skipped.
    pub fn discover(home_override: Option<PathBuf>) -> io::Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::resolve(home_override, std::env::var(ENV_HARK_HOME).ok(), home_dir(), cwd)
    }

    fn resolve(
        home_override: Option<PathBuf>,
        env_home: Option<String>,
        user_home: Option<PathBuf>,
        cwd: PathBuf,
    ) -> io::Result<Self> {
        let hark_dir = if let Some(path) = home_override {
            path
        } else if let Some(hark_home) = env_home
            && !hark_home.is_empty()
        {
            PathBuf::from(hark_home)
        } else {
            user_home
                .as_ref()
                .map(|home| home.join(".hark"))
                .ok_or_else(|| io::Error::new(ErrorKind::NotFound, "Home directory not found"))?
        };
        Ok(Self::with_optional_home(hark_dir, user_home, cwd))
    }

    pub fn hark_dir(&self) -> &Path {
        &self.hark_dir
    }

    /// Global ConfigDocument location.
    pub fn global_config_path(&self) -> PathBuf {
        self.hark_dir.join("config.json")
    }

    /// Project ConfigDocument location (under the cached project root).
    pub fn project_config_path(&self) -> PathBuf {
        self.project_dir().join("config.json")
    }

    pub fn config_path(&self, scope: Scope) -> PathBuf {
        match scope {
            Scope::Global => self.global_config_path(),
            Scope::Project => self.project_config_path(),
        }
    }

    /// Canonical history document.
    pub fn history_path(&self) -> PathBuf {
        self.hark_dir.join("history.json")
    }

    /// One-time copy of a legacy v1 history file.
    pub fn history_v1_backup_path(&self) -> PathBuf {
        sibling_with_suffix(&self.history_path(), ".v1.backup")
    }

    /// Credential fallback files for a scope, in lookup order.
    pub fn api_key_fallback_files(&self, scope: Scope) -> Vec<PathBuf> {
        let mut files = Vec::with_capacity(2);
        if scope == Scope::Project {
            files.push(self.project_dir().join("api_key"));
        }
        files.extend(self.user_home.as_ref().map(|home| home.join(HOME_API_KEY_FILE)));
        files
    }

    fn project_dir(&self) -> PathBuf {
        self.project_root().join(PROJECT_DIR_NAME)
    }

    /// Project root, detected on first use and cached for this instance.
    pub fn project_root(&self) -> PathBuf {
        if let Some(root) = self.project_root.borrow().as_ref() {
            return root.clone();
        }
        let root = detect_project_root(&self.cwd);
        log::debug!("project root resolved to {}", root.display());
        *self.project_root.borrow_mut() = Some(root.clone());
        root
    }

    /// Forget the cached project root so the next lookup searches again.
    pub fn clear_project_root_cache(&self) {
        self.project_root.borrow_mut().take();
    }
}
