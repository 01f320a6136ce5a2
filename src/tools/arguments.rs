//! Typed access to tool call arguments.

use crate::error::TurnloopError;

/// Wrapper around tool call arguments providing typed extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolArguments {
    value: serde_json::Value,
}

impl ToolArguments {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value }
    }

    /// Normalize arguments as they arrive from a model.
    ///
    /// Endpoints may hand over the JSON-encoded argument string rather than
    /// the decoded object; `null` and blank strings mean "no arguments".
    pub fn from_call(value: &serde_json::Value) -> Result<Self, TurnloopError> {
        let value = match value {
            serde_json::Value::Null => serde_json::json!({}),
            serde_json::Value::String(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::from_str::<serde_json::Value>(trimmed).map_err(|e| {
                        TurnloopError::InvalidArgument(format!("arguments are not valid JSON: {e}"))
                    })?
                }
            }
            other => other.clone(),
        };
        Ok(Self { value })
    }

    /// Get the raw JSON value.
    pub fn raw(&self) -> &serde_json::Value {
        &self.value
    }

    /// Get a string argument by key.
    pub fn get_str(&self, key: &str) -> Result<&str, TurnloopError> {
        self.value
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| TurnloopError::InvalidArgument(format!("Missing string argument: {key}")))
    }

    /// Get an optional string argument.
    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    /// Get an integer argument.
    pub fn get_i64(&self, key: &str) -> Result<i64, TurnloopError> {
        self.value
            .get(key)
            .and_then(|v| v.as_i64())
            .ok_or_else(|| TurnloopError::InvalidArgument(format!("Missing integer argument: {key}")))
    }

    /// Get a boolean argument.
    pub fn get_bool(&self, key: &str) -> Result<bool, TurnloopError> {
        self.value
            .get(key)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| TurnloopError::InvalidArgument(format!("Missing boolean argument: {key}")))
    }

    /// Deserialize the entire arguments into a typed struct.
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Result<T, TurnloopError> {
        serde_json::from_value(self.value.clone()).map_err(|e| {
            TurnloopError::InvalidArgument(format!("Failed to deserialize arguments: {e}"))
        })
    }
}
