pub mod registry;
pub mod types;
pub mod wikipedia;

pub use registry::ToolRegistry;
pub use types::{ToolEntry, ToolError, ToolHandler, ToolResult, ToolSchema};
pub use wikipedia::WikipediaTool;
