use std::env;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{AgentConfig, ModelSettings};
use crate::error::{AgentError, Result};
use crate::llm::{GeminiAdapter, GeminiConfig, LLMRouter};
use crate::tools::{ToolRegistry, WikipediaTool};

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

fn load_keys_from_env(primary: &str, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Ok(raw) = env::var(primary) {
        keys.extend(
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string),
        );
    }
    for idx in 2..=10 {
        let key = format!("{}_{}", prefix, idx);
        if let Ok(value) = env::var(&key) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                keys.push(trimmed.to_string());
            }
        }
    }
    keys
}

pub fn load_google_keys() -> Vec<String> {
    load_keys_from_env(API_KEY_VAR, API_KEY_VAR)
}

/// The credential check done before anything else at startup.
pub fn require_api_keys() -> Result<Vec<String>> {
    let keys = load_google_keys();
    if keys.is_empty() {
        return Err(AgentError::MissingApiKey(format!(
            "{} environment variable not set.",
            API_KEY_VAR
        )));
    }
    Ok(keys)
}

pub fn build_llm_router(model: &ModelSettings, api_keys: Vec<String>) -> Result<LLMRouter> {
    let mut router = LLMRouter::new(&model.provider);
    if model.provider != "gemini" {
        return Err(AgentError::Config(format!(
            "unsupported model provider: {}",
            model.provider
        )));
    }
    let adapter = GeminiAdapter::new(GeminiConfig {
        api_keys,
        base_url: String::new(),
        model: model.name.clone(),
        temperature: model.temperature,
        timeout: Duration::from_secs(120),
    })?;
    router.register_provider("gemini", Arc::new(adapter));
    Ok(router)
}

pub fn build_tools(config: &AgentConfig) -> Result<ToolRegistry> {
    let registry = ToolRegistry::new();
    let name = crate::tools::wikipedia::TOOL_NAME;
    let wikipedia = WikipediaTool::new(&config.tools.wikipedia)
        .map_err(|err| tool_setup_error(name, err))?;
    registry
        .register(name, wikipedia.into_handler(), WikipediaTool::schema())
        .map_err(|err| tool_setup_error(name, err))?;
    Ok(registry)
}

fn tool_setup_error(tool: &str, reason: impl std::fmt::Display) -> AgentError {
    AgentError::Config(format!("failed to set up tool {}: {}", tool, reason))
}

/// `http://{host}:{port}/`, the URL advertised on the agent card.
pub fn public_url(host: &str, port: u16) -> String {
    format!("http://{}:{}/", host, port)
}
