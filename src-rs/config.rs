use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

pub const DEFAULT_SERVER_CONFIG: &str = "config/server.toml";
pub const DEFAULT_AGENT_CONFIG: &str = "config/agent.toml";

/// Both configuration documents, loaded once at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub agent: AgentConfig,
}

impl AppConfig {
    pub fn load(server_path: impl AsRef<Path>, agent_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            server: ServerConfig::load(server_path)?,
            agent: AgentConfig::load(agent_path)?,
        })
    }
}

/// The server / agent card document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub agent_card: AgentCardSettings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerSettings {
    pub default_host: String,
    pub default_port: u16,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentCardSettings {
    pub name: String,
    pub description: String,
    pub version: String,
    pub capabilities: CapabilitiesSettings,
    pub skills: Vec<SkillSettings>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitiesSettings {
    pub streaming: bool,
    pub push_notifications: bool,
    #[serde(default)]
    pub state_transition_history: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillSettings {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub examples: Vec<String>,
    #[serde(default)]
    pub input_modes: Option<Vec<String>>,
    #[serde(default)]
    pub output_modes: Option<Vec<String>>,
}

/// The agent behavior document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentConfig {
    pub agent: AgentSettings,
    pub model: ModelSettings,
    pub streaming: StreamingSettings,
    #[serde(default)]
    pub tools: ToolSettings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentSettings {
    pub name: String,
    pub system_instruction: String,
    pub supported_content_types: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelSettings {
    pub name: String,
    pub temperature: f64,
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Upper bound on model calls within one turn.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamingSettings {
    /// `[0]` while a tool call is pending, `[1]` once its result is in.
    pub working_messages: [String; 2],
    pub error_message: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default)]
    pub wikipedia: WikipediaSettings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WikipediaSettings {
    #[serde(default = "default_wikipedia_lang")]
    pub lang: String,
    #[serde(default = "default_top_k_results")]
    pub top_k_results: usize,
    #[serde(default = "default_doc_content_chars_max")]
    pub doc_content_chars_max: usize,
}

impl Default for WikipediaSettings {
    fn default() -> Self {
        Self {
            lang: default_wikipedia_lang(),
            top_k_results: default_top_k_results(),
            doc_content_chars_max: default_doc_content_chars_max(),
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}

fn default_max_iterations() -> usize {
    25
}

fn default_wikipedia_lang() -> String {
    "en".to_string()
}

fn default_top_k_results() -> usize {
    3
}

fn default_doc_content_chars_max() -> usize {
    4000
}

impl ServerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let cfg: Self = read_toml(path.as_ref())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let cfg: Self = parse_toml(raw, Path::new("<inline>"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        require_non_empty("server.default_host", &self.server.default_host)?;
        require_non_empty("agent_card.name", &self.agent_card.name)?;
        require_non_empty("agent_card.version", &self.agent_card.version)?;
        for (idx, skill) in self.agent_card.skills.iter().enumerate() {
            require_non_empty(&format!("agent_card.skills[{}].id", idx), &skill.id)?;
            require_non_empty(&format!("agent_card.skills[{}].name", idx), &skill.name)?;
        }
        Ok(())
    }
}

impl AgentConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let cfg: Self = read_toml(path.as_ref())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let cfg: Self = parse_toml(raw, Path::new("<inline>"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        require_non_empty("agent.name", &self.agent.name)?;
        require_non_empty("agent.system_instruction", &self.agent.system_instruction)?;
        if self.agent.supported_content_types.is_empty() {
            return Err(AgentError::Config(
                "agent.supported_content_types must not be empty".to_string(),
            ));
        }
        require_non_empty("model.name", &self.model.name)?;
        require_non_empty("model.provider", &self.model.provider)?;
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(AgentError::Config(format!(
                "model.temperature must be within 0.0..=2.0, got {}",
                self.model.temperature
            )));
        }
        if self.model.max_iterations == 0 {
            return Err(AgentError::Config("model.max_iterations must be positive".to_string()));
        }
        if self.tools.wikipedia.top_k_results == 0 {
            return Err(AgentError::Config(
                "tools.wikipedia.top_k_results must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).map_err(|source| AgentError::ConfigIo {
        path: path.to_path_buf(),
        source,
    })?;
    parse_toml(&raw, path)
}

fn parse_toml<T: DeserializeOwned>(raw: &str, path: &Path) -> Result<T> {
    toml::from_str(raw).map_err(|source| AgentError::ConfigParse {
        path: PathBuf::from(path),
        source,
    })
}

fn require_non_empty(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AgentError::Config(format!("{} must not be empty", key)));
    }
    Ok(())
}
