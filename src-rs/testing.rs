//! Fixtures shared by unit tests: shipped config documents and a scripted model.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use crate::agent::Agent;
use crate::config::AgentConfig;
use crate::graph::{ReactGraph, ReactGraphConfig, SessionStore};
use crate::llm::{CompletionRequest, LLMResponse, LLMRouter, ProviderAdapter, ProviderError, ToolCall};
use crate::result::ResponseFormat;
use crate::tools::{ToolHandler, ToolRegistry, ToolSchema};

pub const SERVER_TOML: &str = include_str!("../config/server.toml");
pub const AGENT_TOML: &str = include_str!("../config/agent.toml");

/// Replays canned responses in order and records every request.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<LLMResponse>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<LLMResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn text(content: &str) -> LLMResponse {
        LLMResponse {
            content: content.to_string(),
            tool_calls: Vec::new(),
            raw: None,
        }
    }

    pub fn tool_call(name: &str, args: Value) -> LLMResponse {
        LLMResponse {
            content: String::new(),
            tool_calls: vec![ToolCall {
                id: "call_0".to_string(),
                name: name.to_string(),
                args,
            }],
            raw: None,
        }
    }

    pub fn structured(status: &str, message: &str) -> LLMResponse {
        Self::text(&json!({"status": status, "message": message}).to_string())
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl ProviderAdapter for ScriptedProvider {
    fn complete(&self, request: CompletionRequest) -> Result<LLMResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProviderError::new("script_exhausted", "no scripted response left", false))
    }
}

pub fn agent_config() -> AgentConfig {
    AgentConfig::from_toml_str(AGENT_TOML).unwrap()
}

fn fake_wikipedia() -> (ToolHandler, ToolSchema) {
    let handler: ToolHandler = Arc::new(|args: Value| {
        let query = args["query"].as_str().unwrap_or_default();
        Ok(Value::String(format!("summary of {}", query)))
    });
    let schema = ToolSchema {
        name: "wikipedia".to_string(),
        description: "fake wikipedia".to_string(),
        parameters: None,
    };
    (handler, schema)
}

fn scripted_parts(responses: Vec<LLMResponse>) -> (LLMRouter, ToolRegistry, Arc<ScriptedProvider>) {
    let provider = Arc::new(ScriptedProvider::new(responses));
    let mut router = LLMRouter::new("gemini");
    router.register_provider("gemini", provider.clone());

    let tools = ToolRegistry::new();
    let (handler, schema) = fake_wikipedia();
    tools.register("wikipedia", handler, schema).unwrap();
    (router, tools, provider)
}

pub fn scripted_graph(responses: Vec<LLMResponse>) -> (ReactGraph, Arc<ScriptedProvider>) {
    let cfg = agent_config();
    let (router, tools, provider) = scripted_parts(responses);
    let graph = ReactGraph::new(
        router,
        tools,
        Arc::new(SessionStore::new()),
        ReactGraphConfig {
            system_prompt: cfg.agent.system_instruction.clone(),
            provider: cfg.model.provider.clone(),
            model: cfg.model.name.clone(),
            temperature: cfg.model.temperature,
            max_iterations: cfg.model.max_iterations,
            response_schema: ResponseFormat::schema(),
        },
    );
    (graph, provider)
}

pub fn scripted_agent(responses: Vec<LLMResponse>) -> (Agent, Arc<ScriptedProvider>) {
    let cfg = agent_config();
    let (router, tools, provider) = scripted_parts(responses);
    let agent = Agent::from_config(&cfg, router, tools, Arc::new(SessionStore::new()));
    (agent, provider)
}
