use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug)]
pub struct CLIConfig {
    pub base_url: String,
    pub session_id: String,
    pub history_length: usize,
    pub debug: bool,
}

#[derive(Clone, Debug)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct PartView {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessageView {
    pub role: String,
    pub parts: Vec<PartView>,
}

#[derive(Debug, Deserialize)]
pub struct StatusView {
    pub state: String,
    #[serde(default)]
    pub message: Option<MessageView>,
}

#[derive(Debug, Deserialize)]
pub struct ArtifactView {
    pub parts: Vec<PartView>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    pub status: StatusView,
    #[serde(default)]
    pub artifacts: Option<Vec<ArtifactView>>,
    #[serde(default)]
    pub history: Option<Vec<MessageView>>,
}

impl TaskView {
    /// Agent text for this turn: the artifact when done, else the status message.
    pub fn reply_text(&self) -> Option<String> {
        let parts = match (&self.artifacts, &self.status.message) {
            (Some(artifacts), _) if !artifacts.is_empty() => &artifacts[artifacts.len() - 1].parts,
            (_, Some(message)) => &message.parts,
            _ => return None,
        };
        let text: Vec<&str> = parts
            .iter()
            .filter(|part| part.kind == "text")
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text.join("\n"))
        }
    }

    /// The task stays open while the agent waits for the user.
    pub fn awaiting_input(&self) -> bool {
        self.status.state == "input-required"
    }
}

#[derive(Debug, Deserialize)]
pub struct SkillView {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCardView {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
    #[serde(default)]
    pub default_output_modes: Vec<String>,
    #[serde(default)]
    pub skills: Vec<SkillView>,
}
