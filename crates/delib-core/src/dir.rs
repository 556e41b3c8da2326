//! Project root discovery
//!
//! A delib project is any directory holding a `delib.toml`. Commands run
//! from a subdirectory find it by walking up a bounded number of levels.

use std::path::{Path, PathBuf};

/// Directory containing `delib.toml`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRoot {
    path: PathBuf,
}

impl ProjectRoot {
    /// Config file name that marks a project root
    pub const CONFIG_FILE: &str = "delib.toml";

    /// How many parent directories [`ProjectRoot::discover`] searches by default
    pub const SEARCH_LEVELS: usize = 6;

    pub fn at<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Search `start` and up to `levels` of its parents for `delib.toml`
    pub fn discover(start: &Path, levels: usize) -> Option<Self> {
        start
            .ancestors()
            .take(levels + 1)
            .find(|dir| dir.join(Self::CONFIG_FILE).is_file())
            .map(Self::at)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config_path(&self) -> PathBuf {
        self.path.join(Self::CONFIG_FILE)
    }

    /// Resolve a configured path against the root. Absolute paths pass
    /// through unchanged.
    pub fn join<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.path.join(path)
    }
}

impl AsRef<Path> for ProjectRoot {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}
