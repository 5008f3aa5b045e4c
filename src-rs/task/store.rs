use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::types::{Artifact, PushNotificationConfig, Task, TaskSendParams, TaskState, TaskStatus};

struct TaskRecord {
    task: Task,
    created_at: DateTime<Utc>,
}

/// In-memory task and push-notification registry.
#[derive(Default)]
pub struct TaskStore {
    tasks: RwLock<HashMap<String, TaskRecord>>,
    push_configs: RwLock<HashMap<String, PushNotificationConfig>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the task on first sight, otherwise appends the message to its history.
    pub fn upsert(&self, params: &TaskSendParams) -> Task {
        let mut map = match self.tasks.write() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        };
        let record = map.entry(params.id.clone()).or_insert_with(|| TaskRecord {
            task: Task {
                id: params.id.clone(),
                session_id: Some(params.session_id.clone()),
                status: TaskStatus::new(TaskState::Submitted, None),
                artifacts: None,
                history: Some(Vec::new()),
                metadata: params.metadata.clone(),
            },
            created_at: Utc::now(),
        });
        record
            .task
            .history
            .get_or_insert_with(Vec::new)
            .push(params.message.clone());
        record.task.clone()
    }

    /// Sets the status, records its message in history and appends artifacts.
    pub fn update_status(
        &self,
        id: &str,
        status: TaskStatus,
        artifacts: Option<Vec<Artifact>>,
    ) -> Option<Task> {
        let mut map = self.tasks.write().ok()?;
        let record = map.get_mut(id)?;
        if let Some(message) = &status.message {
            record
                .task
                .history
                .get_or_insert_with(Vec::new)
                .push(message.clone());
        }
        record.task.status = status;
        if let Some(artifacts) = artifacts {
            record
                .task
                .artifacts
                .get_or_insert_with(Vec::new)
                .extend(artifacts);
        }
        Some(record.task.clone())
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        let map = self.tasks.read().ok()?;
        map.get(id).map(|record| record.task.clone())
    }

    /// Most recently created first.
    pub fn list(&self, limit: usize) -> Vec<Task> {
        let map = match self.tasks.read() {
            Ok(lock) => lock,
            Err(_) => return vec![],
        };
        let mut records: Vec<&TaskRecord> = map.values().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
            .into_iter()
            .take(limit)
            .map(|record| record.task.clone())
            .collect()
    }

    pub fn set_push_config(&self, id: &str, config: PushNotificationConfig) {
        if let Ok(mut map) = self.push_configs.write() {
            map.insert(id.to_string(), config);
        }
    }

    pub fn get_push_config(&self, id: &str) -> Option<PushNotificationConfig> {
        let map = self.push_configs.read().ok()?;
        map.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::task::types::Message;

    fn send_params(id: &str, text: &str) -> TaskSendParams {
        serde_json::from_value(json!({
            "id": id,
            "sessionId": "s1",
            "message": {"role": "user", "parts": [{"type": "text", "text": text}]}
        }))
        .unwrap()
    }

    #[test]
    fn upsert_creates_then_appends() {
        let store = TaskStore::new();
        let task = store.upsert(&send_params("t1", "first"));
        assert_eq!(task.status.state, TaskState::Submitted);
        assert_eq!(task.session_id.as_deref(), Some("s1"));
        assert_eq!(task.history.unwrap().len(), 1);

        let task = store.upsert(&send_params("t1", "second"));
        let history = task.history.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].first_text(), Some("second"));
    }

    #[test]
    fn update_status_records_message_and_artifacts() {
        let store = TaskStore::new();
        store.upsert(&send_params("t1", "q"));

        let status = TaskStatus::new(TaskState::Completed, Some(Message::agent_text("done")));
        let task = store
            .update_status("t1", status, Some(vec![Artifact::text("answer")]))
            .unwrap();
        assert_eq!(task.status.state, TaskState::Completed);
        assert_eq!(task.history.unwrap().len(), 2);
        assert_eq!(task.artifacts.unwrap().len(), 1);

        assert!(store
            .update_status("missing", TaskStatus::new(TaskState::Working, None), None)
            .is_none());
    }

    #[test]
    fn list_is_limited() {
        let store = TaskStore::new();
        for idx in 0..5 {
            store.upsert(&send_params(&format!("t{}", idx), "q"));
        }
        assert_eq!(store.list(3).len(), 3);
        assert_eq!(store.list(10).len(), 5);
    }

    #[test]
    fn push_configs_are_per_task() {
        let store = TaskStore::new();
        store.set_push_config(
            "t1",
            PushNotificationConfig {
                url: "http://example.com/hook".to_string(),
                token: None,
                authentication: None,
            },
        );
        assert!(store.get_push_config("t1").is_some());
        assert!(store.get_push_config("t2").is_none());
    }
}
