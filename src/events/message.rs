// src/events/message.rs

//! Build lifecycle events published by the buck daemon.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{BuckError, Result};

/// Event kinds decoded into dedicated variants. Anything else becomes
/// [`EngineEvent::Unknown`].
const KNOWN_KINDS: &[&str] = &[
    "BuildStarted",
    "BuildProgressUpdated",
    "BuildFinished",
    "ConsoleEvent",
    "ParseStarted",
    "ParseFinished",
    "InstallFinished",
    "RunStarted",
    "RunComplete",
    "ResultsAvailable",
];

/// One message on the event stream, discriminated by its `type` field.
///
/// Engine messages carry many more fields (timestamps, thread ids, build
/// ids); only the ones listed here are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// Emitted locally as the first item of every subscription.
    #[serde(skip_deserializing)]
    SocketConnected,

    BuildStarted,

    BuildProgressUpdated {
        /// Fraction complete, 0.0 to 1.0.
        #[serde(rename = "progressValue")]
        progress_value: f64,
    },

    BuildFinished {
        #[serde(rename = "exitCode")]
        exit_code: i32,
    },

    ConsoleEvent {
        message: String,
        level: ConsoleLevel,
    },

    ParseStarted,

    ParseFinished,

    InstallFinished {
        success: bool,
        #[serde(default)]
        pid: Option<u32>,
    },

    RunStarted,

    RunComplete,

    ResultsAvailable {
        results: Value,
    },

    /// A `type` this crate does not know; the full message is kept.
    #[serde(skip_deserializing)]
    Unknown { kind: String, payload: Value },
}

/// Severity of a console event: `{"name": "WARNING", "value": 900}` or a
/// bare name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConsoleLevel {
    Structured {
        name: String,
        #[serde(default)]
        value: Option<i64>,
    },
    Name(String),
}

impl ConsoleLevel {
    pub fn name(&self) -> &str {
        match self {
            ConsoleLevel::Structured { name, .. } => name,
            ConsoleLevel::Name(name) => name,
        }
    }
}

impl EngineEvent {
    /// Decode one wire message.
    pub fn decode(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| BuckError::EventStream(format!("malformed event {raw:?}: {e}")))?;

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| BuckError::EventStream(format!("event without type: {raw:?}")))?;

        if !KNOWN_KINDS.contains(&kind.as_str()) {
            return Ok(EngineEvent::Unknown {
                kind,
                payload: value,
            });
        }

        serde_json::from_value(value)
            .map_err(|e| BuckError::EventStream(format!("invalid {kind} event: {e}")))
    }

    /// The wire `type` of this event.
    pub fn kind(&self) -> &str {
        match self {
            EngineEvent::SocketConnected => "SocketConnected",
            EngineEvent::BuildStarted => "BuildStarted",
            EngineEvent::BuildProgressUpdated { .. } => "BuildProgressUpdated",
            EngineEvent::BuildFinished { .. } => "BuildFinished",
            EngineEvent::ConsoleEvent { .. } => "ConsoleEvent",
            EngineEvent::ParseStarted => "ParseStarted",
            EngineEvent::ParseFinished => "ParseFinished",
            EngineEvent::InstallFinished { .. } => "InstallFinished",
            EngineEvent::RunStarted => "RunStarted",
            EngineEvent::RunComplete => "RunComplete",
            EngineEvent::ResultsAvailable { .. } => "ResultsAvailable",
            EngineEvent::Unknown { kind, .. } => kind,
        }
    }
}
