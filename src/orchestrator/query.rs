// src/orchestrator/query.rs

//! Parsing of read-only command output into typed shapes.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{BuckError, Result};

/// Attribute requested when looking up a rule type.
pub const RULE_TYPE_ATTRIBUTE: &str = "buck.type";

/// Parse JSON output from a read-only call, keeping the raw text on failure.
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|source| BuckError::QueryParse {
        raw: raw.to_string(),
        source,
    })
}

/// Make sure every requested argument has an entry.
///
/// buck leaves out arguments that match nothing.
pub fn fill_missing_args(
    mut results: BTreeMap<String, Vec<String>>,
    args: &[String],
) -> BTreeMap<String, Vec<String>> {
    for arg in args {
        results.entry(arg.clone()).or_default();
    }
    results
}

/// Newline-separated output as a list; blank output is an empty list.
pub fn split_lines(stdout: &str) -> Vec<String> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.lines().map(str::to_string).collect()
}

/// `foo:bar` -> `//foo:bar`, and `#flavor` suffixes are dropped.
pub fn normalize_target(name: &str) -> String {
    let unflavored = name.split('#').next().unwrap_or(name);
    if unflavored.contains(':') && !unflavored.starts_with("//") {
        format!("//{}", unflavored)
    } else {
        unflavored.to_string()
    }
}

/// Attributes returned for one target by `--output-attributes buck.type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RuleAttributes {
    #[serde(rename = "buck.type")]
    pub rule_type: String,
}

/// Pick the rule type out of a `buck.type` query result.
///
/// `resolved` must keep the order buck printed the targets in. A target
/// ending in `:` names every rule in a build file, so any number of matches is
/// fine and the first one buck reported is used. Anything else must resolve to
/// exactly one target.
pub fn select_rule_type(target: &str, resolved: &Map<String, Value>) -> Result<String> {
    let wildcard = target.ends_with(':');
    let first = resolved.iter().next();

    match first {
        Some((_, attrs)) if wildcard || resolved.len() == 1 => {
            let attrs = RuleAttributes::deserialize(attrs).map_err(|source| {
                BuckError::QueryParse {
                    raw: attrs.to_string(),
                    source,
                }
            })?;
            Ok(attrs.rule_type)
        }
        _ => Err(BuckError::AmbiguousOrMissingTarget {
            target: target.to_string(),
            resolved: resolved.keys().cloned().collect(),
        }),
    }
}

/// `server status --json --http-port` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ServerStatus {
    /// `-1` when no HTTP server is running.
    #[serde(rename = "http.port")]
    pub http_port: i32,
}

/// One entry of `targets --json --show-output`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetOutput {
    #[serde(default, rename = "buck.outputPath")]
    pub output_path: Option<String>,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}
