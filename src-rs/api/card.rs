use serde::{Deserialize, Serialize};

use crate::config::{CapabilitiesSettings, ServerConfig, SkillSettings};
use crate::helpers::public_url;

/// Public self-description served at `/.well-known/agent.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
    pub capabilities: AgentCapabilities,
    pub default_input_modes: Vec<String>,
    pub default_output_modes: Vec<String>,
    pub skills: Vec<AgentSkill>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    pub streaming: bool,
    pub push_notifications: bool,
    pub state_transition_history: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub examples: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_modes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_modes: Option<Vec<String>>,
}

impl From<&CapabilitiesSettings> for AgentCapabilities {
    fn from(settings: &CapabilitiesSettings) -> Self {
        Self {
            streaming: settings.streaming,
            push_notifications: settings.push_notifications,
            state_transition_history: settings.state_transition_history,
        }
    }
}

impl From<&SkillSettings> for AgentSkill {
    fn from(skill: &SkillSettings) -> Self {
        Self {
            id: skill.id.clone(),
            name: skill.name.clone(),
            description: skill.description.clone(),
            tags: skill.tags.clone(),
            examples: skill.examples.clone(),
            input_modes: skill.input_modes.clone(),
            output_modes: skill.output_modes.clone(),
        }
    }
}

impl AgentCard {
    pub fn from_config(config: &ServerConfig, host: &str, port: u16, content_types: &[String]) -> Self {
        let card = &config.agent_card;
        Self {
            name: card.name.clone(),
            description: card.description.clone(),
            url: public_url(host, port),
            version: card.version.clone(),
            capabilities: (&card.capabilities).into(),
            default_input_modes: content_types.to_vec(),
            default_output_modes: content_types.to_vec(),
            skills: card.skills.iter().map(AgentSkill::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{agent_config, SERVER_TOML};

    #[test]
    fn card_comes_from_server_config() {
        let server = ServerConfig::from_toml_str(SERVER_TOML).unwrap();
        let types = agent_config().agent.supported_content_types;
        let card = AgentCard::from_config(&server, "localhost", 10000, &types);

        assert_eq!(card.name, "Wikipedia Agent");
        assert_eq!(card.url, "http://localhost:10000/");
        assert_eq!(card.default_input_modes, types);
        assert_eq!(card.default_output_modes, types);
        assert!(card.capabilities.streaming);
        assert!(card.capabilities.push_notifications);
        assert_eq!(card.skills[0].id, "wikipedia_search");

        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["capabilities"]["pushNotifications"], true);
        assert!(value["defaultInputModes"].is_array());
        assert!(value["skills"][0].get("inputModes").is_none());
    }
}
