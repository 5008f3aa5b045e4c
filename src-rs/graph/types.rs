use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::Message;

/// Checkpointed state of one conversation thread.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphState {
    pub messages: Vec<Message>,
    /// Output of the structured-response step for the current turn.
    pub structured_response: Option<Value>,
}

impl GraphState {
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}
