//! Tool-related types.

use super::ToolError;
use crate::model::{ToolDescriptor, ToolInvocationResult};
use serde_json::{Map, Value};

/// Tool arguments in the shape providers accept: a JSON object or nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolArguments(pub Option<Map<String, Value>>);

impl TryFrom<Value> for ToolArguments {
    type Error = ToolError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(Self(None)),
            Value::Object(map) => Ok(Self(Some(map))),
            other => Err(ToolError::InvalidInput(format!(
                "arguments must be a JSON object, got {other}"
            ))),
        }
    }
}

/// A discovered tool with the index of the provider that owns it.
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    pub provider: usize,
}

impl From<ToolError> for ToolInvocationResult {
    fn from(err: ToolError) -> Self {
        Self::error(err.to_string())
    }
}
