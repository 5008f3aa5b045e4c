use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::rotation::Rotator;
use super::types::{CompletionRequest, LLMResponse, Message, ProviderAdapter, ProviderError, Role, ToolCall};
use crate::tools::ToolSchema;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiConfig {
    pub api_keys: Vec<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub timeout: Duration,
}

pub struct GeminiAdapter {
    cfg: GeminiConfig,
    rotator: Rotator,
    client: Client,
}

impl GeminiAdapter {
    pub fn new(mut cfg: GeminiConfig) -> Result<Self, ProviderError> {
        if cfg.base_url.is_empty() {
            cfg.base_url = DEFAULT_BASE_URL.to_string();
        }
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|err| ProviderError::new("client_error", &err.to_string(), false))?;
        Ok(Self {
            rotator: Rotator::new(cfg.api_keys.clone()),
            cfg,
            client,
        })
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn complete(&self, request: CompletionRequest) -> Result<LLMResponse, ProviderError> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.cfg.model.clone());
        let temperature = request.temperature.unwrap_or(self.cfg.temperature);
        let payload = build_payload(
            &request.messages,
            request.tools.as_deref(),
            request.response_schema.as_ref(),
            temperature,
        );

        if self.rotator.is_empty() {
            return Err(ProviderError::new("auth_error", "no Gemini API keys", false));
        }
        let tries = self.rotator.len();
        let mut last_err = None;
        for attempt in 0..tries {
            let key = match self.rotator.next() {
                Some(key) => key,
                None => break,
            };
            match send_request(&self.client, &self.cfg.base_url, &model, key, &payload) {
                Ok(resp) => return Ok(resp),
                Err(err) if err.retryable => {
                    warn!(attempt, code = %err.code, "gemini request failed, rotating key");
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err.unwrap_or_else(|| ProviderError::new("api_error", "request failed", true)))
    }
}

pub(crate) fn build_payload(
    messages: &[Message],
    tools: Option<&[ToolSchema]>,
    response_schema: Option<&Value>,
    temperature: f64,
) -> Value {
    let mut contents: Vec<Value> = Vec::new();
    let mut system_parts = Vec::new();

    for msg in messages {
        match msg.role {
            Role::System => system_parts.push(json!({"text": msg.content})),
            Role::User => contents.push(json!({
                "role": "user",
                "parts": [{"text": msg.content}]
            })),
            Role::Assistant => {
                let mut parts = Vec::new();
                if !msg.content.is_empty() {
                    parts.push(json!({"text": msg.content}));
                }
                for call in &msg.tool_calls {
                    parts.push(json!({
                        "functionCall": {"name": call.name, "args": call.args}
                    }));
                }
                // Gemini rejects empty text parts.
                if !parts.is_empty() {
                    contents.push(json!({"role": "model", "parts": parts}));
                }
            }
            Role::Tool => {
                let part = json!({
                    "functionResponse": {
                        "name": msg.tool_name.clone().unwrap_or_default(),
                        "response": {"content": msg.content}
                    }
                });
                // Gemini wants all responses to one model turn in a single content.
                let merged = contents.last_mut().and_then(|last| {
                    let is_function_turn = last["parts"]
                        .as_array()
                        .map(|parts| parts.iter().all(|p| p.get("functionResponse").is_some()))
                        .unwrap_or(false);
                    if is_function_turn {
                        last["parts"].as_array_mut()
                    } else {
                        None
                    }
                });
                match merged {
                    Some(parts) => parts.push(part),
                    None => contents.push(json!({"role": "user", "parts": [part]})),
                }
            }
        }
    }

    let mut generation_config = json!({"temperature": temperature});
    if let Some(schema) = response_schema {
        generation_config["responseMimeType"] = json!("application/json");
        generation_config["responseSchema"] = schema.clone();
    }

    let mut payload = json!({
        "contents": contents,
        "generationConfig": generation_config,
    });

    if !system_parts.is_empty() {
        payload["systemInstruction"] = json!({"parts": system_parts});
    }

    if let Some(tools) = tools.filter(|tools| !tools.is_empty()) {
        let declarations: Vec<Value> = tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters.clone().unwrap_or(json!({})),
                })
            })
            .collect();
        payload["tools"] = json!([
            {
                "functionDeclarations": declarations
            }
        ]);
    }

    payload
}

fn send_request(
    client: &Client,
    base_url: &str,
    model: &str,
    api_key: &str,
    payload: &Value,
) -> Result<LLMResponse, ProviderError> {
    let endpoint = format!(
        "{}/v1beta/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        model
    );
    debug!(%endpoint, "sending gemini request");
    let resp = client
        .post(endpoint)
        .header("Content-Type", "application/json")
        .header("x-goog-api-key", api_key)
        .json(payload)
        .send()
        .map_err(|err| ProviderError::new("network_error", &err.to_string(), true))?;

    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    if let Some(err) = classify_status(status.as_u16(), &body) {
        return Err(err);
    }

    let raw: Value = serde_json::from_str(&body)
        .map_err(|_| ProviderError::new("parse_error", "invalid json", false))?;
    into_response(raw)
}

/// A reply with neither text nor function calls is an error, never an empty turn.
pub(crate) fn into_response(raw: Value) -> Result<LLMResponse, ProviderError> {
    if let Some(reason) = raw.pointer("/promptFeedback/blockReason").and_then(|v| v.as_str()) {
        return Err(ProviderError::new(
            "blocked",
            &format!("prompt blocked: {}", reason),
            false,
        ));
    }
    let (content, tool_calls) = parse_response(&raw);
    if content.trim().is_empty() && tool_calls.is_empty() {
        let finish = raw
            .pointer("/candidates/0/finishReason")
            .and_then(|v| v.as_str())
            .unwrap_or("none");
        return Err(ProviderError::new(
            "empty_response",
            &format!("reply has no content (finishReason: {})", finish),
            false,
        ));
    }
    Ok(LLMResponse {
        content,
        tool_calls,
        raw: Some(raw),
    })
}

fn classify_status(status: u16, body: &str) -> Option<ProviderError> {
    if status < 400 {
        return None;
    }
    let lowered = body.to_lowercase();
    let err = if status == 401 || status == 403 {
        ProviderError::new("auth_error", body, true)
    } else if status == 429 || lowered.contains("quota") || lowered.contains("resource_exhausted") {
        ProviderError::new("rate_limit", body, true)
    } else if status >= 500 {
        ProviderError::new("server_error", body, true)
    } else {
        ProviderError::new("api_error", body, false)
    };
    Some(err)
}

pub(crate) fn parse_response(raw: &Value) -> (String, Vec<ToolCall>) {
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    let parts = raw
        .pointer("/candidates/0/content/parts")
        .and_then(|v| v.as_array());
    let parts = match parts {
        Some(parts) => parts,
        None => return (text, tool_calls),
    };

    for part in parts {
        if let Some(chunk) = part.get("text").and_then(|v| v.as_str()) {
            text.push_str(chunk);
        }
        if let Some(fc) = part.get("functionCall") {
            let name = fc.get("name").and_then(|v| v.as_str()).unwrap_or("");
            let args = fc.get("args").cloned().unwrap_or(json!({}));
            tool_calls.push(ToolCall {
                id: format!("call_{}", tool_calls.len()),
                name: name.to_string(),
                args,
            });
        }
    }

    (text, tool_calls)
}
