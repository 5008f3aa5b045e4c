pub mod agent;
pub mod config;
pub mod error;
pub mod helpers;
pub mod result;

#[cfg(test)]
mod testing;

#[path = "llm/lib.rs"]
pub mod llm;
#[path = "tools/lib.rs"]
pub mod tools;
#[path = "graph/lib.rs"]
pub mod graph;
#[path = "task/lib.rs"]
pub mod task;
#[path = "push/lib.rs"]
pub mod push;
#[path = "api/lib.rs"]
pub mod api;

pub use agent::Agent;
pub use config::{AgentConfig, AppConfig, ServerConfig};
pub use error::AgentError;
pub use result::AgentResult;
