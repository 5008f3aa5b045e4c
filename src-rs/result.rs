use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Outcome of one agent turn, as handed to the task layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResult {
    pub is_task_complete: bool,
    pub require_user_input: bool,
    pub content: String,
}

impl AgentResult {
    pub fn working(content: &str) -> Self {
        Self {
            is_task_complete: false,
            require_user_input: false,
            content: content.to_string(),
        }
    }

    /// The degraded result used when a turn produced no usable structured response.
    pub fn failed(content: &str) -> Self {
        Self {
            is_task_complete: false,
            require_user_input: true,
            content: content.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    #[default]
    InputRequired,
    Completed,
    Error,
}

/// Respond to the user in this format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFormat {
    #[serde(default)]
    pub status: ResponseStatus,
    pub message: String,
}

impl ResponseFormat {
    pub const INSTRUCTION: &'static str = "Respond to the user in this format.";

    /// JSON schema handed to the model for the structured-response step.
    pub fn schema() -> Value {
        json!({
            "type": "object",
            "description": Self::INSTRUCTION,
            "properties": {
                "status": {
                    "type": "string",
                    "enum": ["input_required", "completed", "error"]
                },
                "message": {"type": "string"}
            },
            "required": ["status", "message"]
        })
    }

    /// Decodes a stored structured response; `None` when it is not one.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

impl From<ResponseFormat> for AgentResult {
    fn from(response: ResponseFormat) -> Self {
        let (is_task_complete, require_user_input) = match response.status {
            ResponseStatus::InputRequired | ResponseStatus::Error => (false, true),
            ResponseStatus::Completed => (true, false),
        };
        Self {
            is_task_complete,
            require_user_input,
            content: response.message,
        }
    }
}
