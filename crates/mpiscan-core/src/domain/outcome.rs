//! Per-version outcomes and the result set handed to rendering.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Output captured from a run.
///
/// Serialized untagged: text is a JSON string, structured output is a JSON
/// object. This is the `out` field of the persisted result format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RunOutput {
    Text(String),
    Structured(Map<String, Value>),
}

impl RunOutput {
    /// Promote text that parses as a JSON object to structured output.
    /// Anything else stays as it was.
    pub fn normalize(self) -> Self {
        match self {
            RunOutput::Text(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => RunOutput::Structured(map),
                _ => RunOutput::Text(text),
            },
            structured => structured,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RunOutput::Text(text) => Some(text),
            RunOutput::Structured(_) => None,
        }
    }

    pub fn as_structured(&self) -> Option<&Map<String, Value>> {
        match self {
            RunOutput::Structured(map) => Some(map),
            RunOutput::Text(_) => None,
        }
    }
}

/// Outcome of compiling and running against one implementation version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionOutcome {
    /// Implementation version, e.g. `4.1.5`.
    pub version: String,

    /// Captured output; absent when compilation or execution failed.
    #[serde(default)]
    pub out: Option<RunOutput>,

    /// Exit status of the last attempted step (0 = success).
    pub ret: i32,
}

impl VersionOutcome {
    pub fn new(version: impl Into<String>, out: Option<String>, ret: i32) -> Self {
        Self {
            version: version.into(),
            out: out.map(RunOutput::Text),
            ret,
        }
    }

    /// Whether there is anything to render for this version.
    pub fn has_output(&self) -> bool {
        match &self.out {
            None => false,
            Some(RunOutput::Text(text)) => !text.is_empty(),
            Some(RunOutput::Structured(map)) => !map.is_empty(),
        }
    }
}

/// Implementation name to ordered per-version outcomes.
///
/// Implementations keep insertion order: the `-m` order after a scan, the
/// file's key order after loading a saved report.
pub type ResultSet = IndexMap<String, Vec<VersionOutcome>>;
