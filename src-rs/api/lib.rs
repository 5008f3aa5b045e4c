pub use crate::agent::Agent;
pub use crate::config::{AgentConfig, ServerConfig};
pub use crate::push::PushNotificationSenderAuth;
pub use crate::result::AgentResult;
pub use crate::task::{A2AError, Task, TaskManager, TaskStore};

pub mod card;
pub mod handlers;
pub mod server;
pub mod types;

pub use card::AgentCard;
pub use server::{router, AgentServer, AppState};
pub use types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
