//! JSON conversion for object payloads

use super::LogObject;
use anyhow::{anyhow, Context, Result};
use serde_json::Value;

/// Turns object payloads into JSON text and re-renders JSON text
pub trait JsonConverter: Send + Sync {
    /// Convert an object payload to JSON text
    fn to_json(&self, object: &LogObject) -> Result<String>;

    /// Re-render JSON text for reading
    fn pretty(&self, json: &str) -> Result<String>;
}

/// [`JsonConverter`] backed by `serde_json`
#[derive(Debug, Clone, Copy, Default)]
pub struct SerdeJsonConverter {
    pretty_output: bool,
}

impl SerdeJsonConverter {
    /// Converter producing single-line JSON
    pub fn compact() -> Self {
        Self {
            pretty_output: false,
        }
    }

    /// Converter producing indented JSON from `to_json` as well
    pub fn pretty_printing() -> Self {
        Self {
            pretty_output: true,
        }
    }
}

impl JsonConverter for SerdeJsonConverter {
    fn to_json(&self, object: &LogObject) -> Result<String> {
        let value = object
            .value()
            .ok_or_else(|| anyhow!("Object is not serializable: {}", object.text()))?;

        if self.pretty_output {
            serde_json::to_string_pretty(value).context("Failed to serialize object to JSON")
        } else {
            serde_json::to_string(value).context("Failed to serialize object to JSON")
        }
    }

    fn pretty(&self, json: &str) -> Result<String> {
        let value: Value = serde_json::from_str(json).context("Content is not valid JSON")?;
        serde_json::to_string_pretty(&value).context("Failed to render JSON")
    }
}
