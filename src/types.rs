// src/types.rs

use std::fmt;
use std::path::{Path, PathBuf};

/// Absolute directory of one buck-managed project.
///
/// This is the unit of identity for pooling: every invocation is queued
/// against exactly one root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectRoot(PathBuf);

impl ProjectRoot {
    /// Wrap an already-resolved directory.
    ///
    /// Relative paths are made absolute against the current directory so two
    /// spellings of the same root do not end up in different pools.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_absolute() {
            Self(path)
        } else {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
            Self(cwd.join(path))
        }
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn join(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.0.join(rel)
    }
}

impl AsRef<Path> for ProjectRoot {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ProjectRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Whether an invocation may run alongside others for the same root.
///
/// - `ReadOnly`: query/audit/status calls; parallel up to pool capacity.
/// - `Mutating`: build/install/test calls; serialized per root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    ReadOnly,
    Mutating,
}
