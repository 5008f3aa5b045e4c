use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::models::{AgentCardView, RpcRequest, RpcResponse, TaskView};

pub struct HTTPClient {
    pub base_url: String,
    client: Client,
    next_id: AtomicU64,
}

impl HTTPClient {
    pub fn new(base_url: &str) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|err| err.to_string())?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn send_task(
        &self,
        task_id: &str,
        session_id: &str,
        text: &str,
        history_length: usize,
    ) -> Result<TaskView, String> {
        let params = json!({
            "id": task_id,
            "sessionId": session_id,
            "acceptedOutputModes": ["text", "text/plain"],
            "historyLength": history_length,
            "message": {"role": "user", "parts": [{"type": "text", "text": text}]},
        });
        self.call("tasks/send", params)
    }

    pub fn get_task(&self, task_id: &str, history_length: usize) -> Result<TaskView, String> {
        self.call("tasks/get", json!({"id": task_id, "historyLength": history_length}))
    }

    pub fn agent_card(&self) -> Result<AgentCardView, String> {
        self.get_json(&format!("{}/.well-known/agent.json", self.base_url))
    }

    pub fn list_tasks(&self, limit: usize) -> Result<Vec<TaskView>, String> {
        let value: Value = self.get_json(&format!("{}/tasks?limit={}", self.base_url, limit))?;
        let tasks = value
            .get("tasks")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        Ok(tasks
            .into_iter()
            .filter_map(|item| serde_json::from_value::<TaskView>(item).ok())
            .collect())
    }

    fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, String> {
        let req = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let resp = self
            .client
            .post(format!("{}/", self.base_url))
            .json(&req)
            .send()
            .map_err(|err| err.to_string())?;
        let status = resp.status();
        let body = resp.text().map_err(|err| err.to_string())?;
        let parsed: RpcResponse = serde_json::from_str(&body)
            .map_err(|_| format!("http {}: {}", status.as_u16(), body))?;
        if let Some(err) = parsed.error {
            return Err(format!("rpc {}: {}", err.code, err.message));
        }
        let result = parsed.result.ok_or_else(|| "empty result".to_string())?;
        serde_json::from_value(result).map_err(|err| err.to_string())
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, String> {
        let resp = self.client.get(url).send().map_err(|err| err.to_string())?;
        if resp.status().is_success() {
            resp.json::<T>().map_err(|err| err.to_string())
        } else {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            Err(format!("http {}: {}", status.as_u16(), body))
        }
    }
}
