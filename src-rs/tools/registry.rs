use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use super::types::{ToolEntry, ToolError, ToolHandler, ToolResult, ToolSchema};

#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, ToolEntry>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: &str, handler: ToolHandler, mut schema: ToolSchema) -> Result<(), ToolError> {
        if name.is_empty() {
            return Err(ToolError::InvalidName);
        }
        if schema.name.is_empty() {
            schema.name = name.to_string();
        }
        if schema.name != name {
            return Err(ToolError::SchemaMismatch {
                tool: name.to_string(),
                schema: schema.name,
            });
        }

        let mut map = self.tools.write().map_err(|_| ToolError::Lock)?;
        if map.contains_key(name) {
            return Err(ToolError::AlreadyRegistered(name.to_string()));
        }
        map.insert(
            name.to_string(),
            ToolEntry {
                handler,
                schema,
            },
        );
        Ok(())
    }

    pub fn execute(&self, name: &str, args: Value) -> ToolResult {
        // Clone the handler out so a slow tool does not hold the lock.
        let handler = match self.tools.read() {
            Ok(map) => map.get(name).map(|entry| entry.handler.clone()),
            Err(_) => return ToolResult::failed("lock error"),
        };
        let handler = match handler {
            Some(handler) => handler,
            None => return ToolResult::failed(&format!("tool not found: {}", name)),
        };

        match handler(args) {
            Ok(output) => ToolResult {
                success: true,
                output: Some(output),
                error: None,
            },
            Err(err) => ToolResult::failed(&err),
        }
    }

    /// Schemas ordered by tool name.
    pub fn get_schemas(&self) -> Vec<ToolSchema> {
        let map = match self.tools.read() {
            Ok(lock) => lock,
            Err(_) => return vec![],
        };
        let mut schemas: Vec<ToolSchema> = map.values().map(|entry| entry.schema.clone()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    pub fn count(&self) -> usize {
        self.tools.read().map(|map| map.len()).unwrap_or(0)
    }
}

impl ToolResult {
    fn failed(message: &str) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(message.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;

    fn echo() -> ToolHandler {
        Arc::new(|args: Value| Ok(args["query"].clone()))
    }

    fn schema(name: &str) -> ToolSchema {
        ToolSchema {
            name: name.to_string(),
            description: "echo".to_string(),
            parameters: None,
        }
    }

    #[test]
    fn registers_and_executes() {
        let registry = ToolRegistry::new();
        registry.register("echo", echo(), schema("")).unwrap();

        assert_eq!(registry.count(), 1);
        assert_eq!(registry.get_schemas()[0].name, "echo");

        let result = registry.execute("echo", json!({"query": "hello"}));
        assert!(result.success);
        assert_eq!(result.render(), "hello");
    }

    #[test]
    fn rejects_duplicates_and_mismatches() {
        let registry = ToolRegistry::new();
        registry.register("echo", echo(), schema("echo")).unwrap();
        assert_eq!(
            registry.register("echo", echo(), schema("echo")),
            Err(ToolError::AlreadyRegistered("echo".to_string()))
        );
        assert!(matches!(
            registry.register("other", echo(), schema("echo")),
            Err(ToolError::SchemaMismatch { .. })
        ));
        assert_eq!(registry.register("", echo(), schema("")), Err(ToolError::InvalidName));
    }

    #[test]
    fn unknown_tool_and_handler_errors_render_as_errors() {
        let registry = ToolRegistry::new();
        let missing = registry.execute("nope", json!({}));
        assert!(!missing.success);
        assert_eq!(missing.render(), "Error: tool not found: nope");

        let failing: ToolHandler = Arc::new(|_| Err("boom".to_string()));
        registry.register("fail", failing, schema("fail")).unwrap();
        assert_eq!(registry.execute("fail", json!({})).render(), "Error: boom");
    }
}
