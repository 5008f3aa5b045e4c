use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Option<Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: Option<Value>,
    pub error: Option<String>,
}

impl ToolResult {
    /// Text handed back to the model for this result.
    pub fn render(&self) -> String {
        if self.success {
            match &self.output {
                Some(Value::String(text)) => text.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            }
        } else {
            format!(
                "Error: {}",
                self.error.clone().unwrap_or_else(|| "unknown error".to_string())
            )
        }
    }
}

pub type ToolHandler = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

pub struct ToolEntry {
    pub handler: ToolHandler,
    pub schema: ToolSchema,
}

#[derive(Debug, Error, PartialEq)]
pub enum ToolError {
    #[error("invalid tool name")]
    InvalidName,
    #[error("schema name {schema} does not match tool {tool}")]
    SchemaMismatch { tool: String, schema: String },
    #[error("tool already registered: {0}")]
    AlreadyRegistered(String),
    #[error("tool registry lock poisoned")]
    Lock,
}
