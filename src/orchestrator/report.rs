// src/orchestrator/report.rs

//! Build reports and the temp file buck writes them to.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tempfile::TempPath;
use tracing::{debug, warn};

use crate::errors::{BuckError, Result};

/// Parsed `--build-report` output.
///
/// ```json
/// {
///   "success": false,
///   "results": {
///     "//app:app": { "success": "SUCCESS", "type": "BUILT_LOCALLY", "output": "buck-out/gen/app" },
///     "//lib:lib": { "success": "FAIL" }
///   },
///   "failures": { "//lib:lib": "compile error ..." }
/// }
/// ```
///
/// Decoding is lenient: any JSON object is accepted. Known fields of an
/// unexpected shape, and fields this crate does not model, are kept in
/// `extra`. Use [`BuildReport::is_success`] rather than `success` directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct BuildReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub results: BTreeMap<String, TargetResult>,

    /// Target name to failure description (usually a string).
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub failures: Map<String, Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Per-target entry in a build report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct TargetResult {
    /// `"SUCCESS"` / `"FAIL"` from buck, `true` / `false` from some tools.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub success: Value,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TargetResult {
    pub fn succeeded(&self) -> bool {
        status_flag(&self.success).unwrap_or(false)
    }
}

impl From<Value> for TargetResult {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(mut fields) => Self {
                success: fields.remove("success").unwrap_or(Value::Null),
                kind: take_string(&mut fields, "type"),
                output: take_string(&mut fields, "output"),
                extra: fields,
            },
            // Bare status, e.g. `"//a:a": "SUCCESS"`.
            status => Self {
                success: status,
                ..Default::default()
            },
        }
    }
}

impl From<Map<String, Value>> for BuildReport {
    fn from(mut fields: Map<String, Value>) -> Self {
        let success = match fields.remove("success") {
            Some(Value::Bool(flag)) => Some(flag),
            Some(other) => {
                fields.insert("success".to_string(), other);
                None
            }
            None => None,
        };
        let results = match fields.remove("results") {
            Some(Value::Object(entries)) => entries
                .into_iter()
                .map(|(target, entry)| (target, TargetResult::from(entry)))
                .collect(),
            Some(other) => {
                fields.insert("results".to_string(), other);
                BTreeMap::new()
            }
            None => BTreeMap::new(),
        };
        let failures = match fields.remove("failures") {
            Some(Value::Object(entries)) => entries,
            Some(other) => {
                fields.insert("failures".to_string(), other);
                Map::new()
            }
            None => Map::new(),
        };
        Self {
            success,
            results,
            failures,
            extra: fields,
        }
    }
}

/// Remove `key` if it holds a string; anything else stays in `fields`.
fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key)? {
        Value::String(s) => Some(s),
        other => {
            fields.insert(key.to_string(), other);
            None
        }
    }
}

fn status_flag(status: &Value) -> Option<bool> {
    match status {
        Value::Bool(flag) => Some(*flag),
        Value::String(s) => Some(s.eq_ignore_ascii_case("SUCCESS")),
        _ => None,
    }
}

impl BuildReport {
    /// Decode a report. Fails only when `raw` is not a JSON object.
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|source| BuckError::ReportParse {
            raw: raw.to_string(),
            source,
        })
    }

    /// The top-level `success` flag when present. Otherwise derived: no
    /// listed failures and every result succeeded.
    pub fn is_success(&self) -> bool {
        self.success.unwrap_or_else(|| {
            self.failures.is_empty() && self.results.values().all(TargetResult::succeeded)
        })
    }

    /// Targets whose result is not a success, plus any listed in `failures`.
    pub fn failed_targets(&self) -> Vec<&str> {
        let mut failed: Vec<&str> = self
            .results
            .iter()
            .filter(|(_, r)| !r.succeeded())
            .map(|(name, _)| name.as_str())
            .collect();
        for name in self.failures.keys() {
            if !failed.contains(&name.as_str()) {
                failed.push(name.as_str());
            }
        }
        failed
    }
}

/// Temp file that buck writes the report into.
///
/// Deleted by [`ReportFile::remove`], or on drop if the owning call bails
/// out early.
#[derive(Debug)]
pub struct ReportFile {
    path: TempPath,
}

impl ReportFile {
    pub fn create() -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix("buck-build-report-")
            .suffix(".json")
            .tempfile()?;
        let path = file.into_temp_path();
        debug!(path = %path.display(), "allocated build report file");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if buck left a non-empty report behind.
    pub fn has_content(&self) -> bool {
        fs::metadata(&self.path)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }

    pub fn read(&self) -> Result<BuildReport> {
        let raw = fs::read_to_string(&self.path)?;
        BuildReport::parse(&raw)
    }

    pub fn remove(self) {
        let shown = self.path.display().to_string();
        match self.path.close() {
            Ok(()) => debug!(path = %shown, "removed build report file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %shown, error = %e, "failed to remove build report file"),
        }
    }
}
