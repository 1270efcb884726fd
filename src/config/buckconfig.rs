// src/config/buckconfig.rs

//! Reader for a project's `.buckconfig`.
//!
//! The file is INI-like:
//!
//! ```ini
//! target = //app:main
//!
//! [alias]
//!   app = //app:main
//!
//! [cache]
//!   mode = dir
//! ```
//!
//! Keys that appear before the first `[section]` header are stored under the
//! synthetic [`GLOBAL_SECTION`] so they remain addressable.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use crate::errors::{BuckError, Result};
use crate::fs::{FileSystem, RealFileSystem};

/// File name that marks a project root.
pub const BUCKCONFIG_FILE: &str = ".buckconfig";

/// Section that holds keys declared before any header.
pub const GLOBAL_SECTION: &str = "global";

static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\s*([^\]]+?)\s*\]$").expect("section regex is valid"));

static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^=]+?)\s*=\s*(.*)$").expect("entry regex is valid"));

/// Parsed `.buckconfig` contents: section -> key -> value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuckConfig {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl BuckConfig {
    /// Parse config text. Unrecognised lines are skipped.
    ///
    /// A trailing `\` continues the value onto the next line.
    pub fn parse(text: &str) -> Self {
        let mut sections: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        sections.insert(GLOBAL_SECTION.to_string(), BTreeMap::new());

        let mut current = GLOBAL_SECTION.to_string();
        let mut lines = text.lines();

        while let Some(raw) = lines.next() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(caps) = SECTION_RE.captures(line) {
                current = caps[1].to_string();
                sections.entry(current.clone()).or_default();
                continue;
            }

            let Some(caps) = ENTRY_RE.captures(line) else {
                debug!(line = %line, "skipping unrecognised .buckconfig line");
                continue;
            };

            let key = caps[1].trim().to_string();
            let mut value = caps[2].trim().to_string();
            while value.ends_with('\\') {
                value.pop();
                match lines.next() {
                    Some(next) => {
                        value = value.trim_end().to_string();
                        value.push(' ');
                        value.push_str(next.trim());
                    }
                    None => break,
                }
            }

            sections
                .entry(current.clone())
                .or_default()
                .insert(key, value.trim().to_string());
        }

        Self { sections }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    pub fn section(&self, section: &str) -> Option<&BTreeMap<String, String>> {
        self.sections.get(section)
    }
}

/// Locates and reads `.buckconfig` files.
///
/// No caching: every call re-reads from disk.
#[derive(Debug, Clone)]
pub struct ConfigReader {
    fs: Arc<dyn FileSystem>,
}

impl Default for ConfigReader {
    fn default() -> Self {
        Self::new(Arc::new(RealFileSystem))
    }
}

impl ConfigReader {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Nearest directory at or above `start` that contains `.buckconfig`.
    pub fn find_config_dir(&self, start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .find(|dir| self.fs.is_file(&dir.join(BUCKCONFIG_FILE)))
            .map(Path::to_path_buf)
    }

    /// Read and parse the config governing `root`.
    pub fn load(&self, root: &Path) -> Result<BuckConfig> {
        let dir = self
            .find_config_dir(root)
            .ok_or_else(|| BuckError::ConfigNotFound(root.to_path_buf()))?;
        let path = dir.join(BUCKCONFIG_FILE);
        debug!(path = %path.display(), "reading .buckconfig");
        let text = self.fs.read_to_string(&path)?;
        Ok(BuckConfig::parse(&text))
    }

    /// Look up `section.key`.
    ///
    /// Fails only when no config file exists; a missing section or key is
    /// `Ok(None)`.
    pub fn get_config_value(&self, root: &Path, section: &str, key: &str) -> Result<Option<String>> {
        let config = self.load(root)?;
        Ok(config.get(section, key).map(str::to_string))
    }
}
