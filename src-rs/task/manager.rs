use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::error::A2AError;
use super::store::TaskStore;
use super::types::{
    Artifact, Message, Task, TaskArtifactUpdateEvent, TaskEvent, TaskIdParams,
    TaskPushNotificationConfig, TaskQueryParams, TaskSendParams, TaskState, TaskStatus,
    TaskStatusUpdateEvent,
};
use crate::agent::Agent;
use crate::push::PushNotificationSenderAuth;
use crate::result::AgentResult;

const STREAM_BUFFER: usize = 32;

pub type StreamItem = Result<TaskEvent, A2AError>;

/// Drives agent turns for A2A tasks and fans streamed updates out to subscribers.
pub struct TaskManager {
    agent: Arc<Agent>,
    store: TaskStore,
    notifier: Arc<PushNotificationSenderAuth>,
    push_enabled: bool,
    subscribers: Mutex<HashMap<String, Vec<mpsc::Sender<StreamItem>>>>,
}

impl TaskManager {
    pub fn new(agent: Arc<Agent>, notifier: Arc<PushNotificationSenderAuth>, push_enabled: bool) -> Self {
        Self {
            agent,
            store: TaskStore::new(),
            notifier,
            push_enabled,
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Most recent tasks first.
    pub fn list(&self, limit: usize) -> Vec<Task> {
        self.store.list(limit)
    }

    pub async fn on_get_task(&self, params: TaskQueryParams) -> Result<Task, A2AError> {
        info!(task_id = %params.id, "getting task");
        let task = self.store.get(&params.id).ok_or(A2AError::TaskNotFound)?;
        Ok(task.with_history_length(params.history_length))
    }

    pub async fn on_cancel_task(&self, params: TaskIdParams) -> Result<Task, A2AError> {
        info!(task_id = %params.id, "cancelling task");
        self.store.get(&params.id).ok_or(A2AError::TaskNotFound)?;
        Err(A2AError::TaskNotCancelable)
    }

    pub async fn on_send_task(&self, params: TaskSendParams) -> Result<Task, A2AError> {
        let query = self.validate_request(&params)?;
        self.setup_push(&params).await?;
        self.store.upsert(&params);
        let working = self.update(&params.id, TaskStatus::new(TaskState::Working, None), None)?;
        self.notify(&working).await;

        let agent = self.agent.clone();
        let session_id = params.session_id.clone();
        let outcome = tokio::task::spawn_blocking(move || agent.invoke(&query, &session_id))
            .await
            .map_err(|err| A2AError::Internal(format!("agent task failed: {err}")))?;
        let result = match outcome {
            Ok(result) => result,
            Err(err) => {
                error!(task_id = %params.id, error = %err, "agent invocation failed");
                self.fail(&params.id, &err.to_string()).await;
                return Err(A2AError::Internal(format!(
                    "An error occurred while invoking the agent: {err}"
                )));
            }
        };

        let (status, artifact, _) = status_for(&result);
        let task = self.update(&params.id, status, artifact.map(|a| vec![a]))?;
        info!(task_id = %task.id, state = ?task.status.state, "task turn finished");
        self.notify(&task).await;
        Ok(task.with_history_length(params.history_length))
    }

    /// Starts a streamed turn; the receiver ends after the final status event.
    pub async fn on_send_task_subscribe(
        self: Arc<Self>,
        params: TaskSendParams,
    ) -> Result<mpsc::Receiver<StreamItem>, A2AError> {
        let query = self.validate_request(&params)?;
        self.setup_push(&params).await?;
        self.store.upsert(&params);
        let rx = self.subscribe(&params.id);

        let manager = self.clone();
        tokio::spawn(async move {
            manager
                .run_streaming_agent(params.id, params.session_id, query)
                .await;
        });
        Ok(rx)
    }

    /// Joins the event stream of a task that is still running.
    pub async fn on_resubscribe(&self, params: TaskIdParams) -> Result<mpsc::Receiver<StreamItem>, A2AError> {
        let mut subscribers = self.lock_subscribers();
        let senders = subscribers.get_mut(&params.id).ok_or(A2AError::TaskNotFound)?;
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        senders.push(tx);
        info!(task_id = %params.id, "resubscribed to task");
        Ok(rx)
    }

    pub async fn on_set_push_notification(
        &self,
        params: TaskPushNotificationConfig,
    ) -> Result<TaskPushNotificationConfig, A2AError> {
        if !self.push_enabled {
            return Err(A2AError::PushNotificationNotSupported);
        }
        self.store.get(&params.id).ok_or(A2AError::TaskNotFound)?;
        let url = &params.push_notification_config.url;
        if !self.notifier.verify_push_notification_url(url).await {
            return Err(A2AError::InvalidParams("Push notification URL is invalid".to_string()));
        }
        self.store
            .set_push_config(&params.id, params.push_notification_config.clone());
        Ok(params)
    }

    pub async fn on_get_push_notification(
        &self,
        params: TaskIdParams,
    ) -> Result<TaskPushNotificationConfig, A2AError> {
        if !self.push_enabled {
            return Err(A2AError::PushNotificationNotSupported);
        }
        self.store.get(&params.id).ok_or(A2AError::TaskNotFound)?;
        let config = self
            .store
            .get_push_config(&params.id)
            .ok_or_else(|| A2AError::Internal("Push notification info not found".to_string()))?;
        Ok(TaskPushNotificationConfig {
            id: params.id,
            push_notification_config: config,
        })
    }

    fn validate_request(&self, params: &TaskSendParams) -> Result<String, A2AError> {
        if !modalities_compatible(
            params.accepted_output_modes.as_deref(),
            &self.agent.supported_content_types,
        ) {
            warn!(
                accepted = ?params.accepted_output_modes,
                supported = ?self.agent.supported_content_types,
                "unsupported output mode"
            );
            return Err(A2AError::ContentTypeNotSupported);
        }
        if let Some(push) = &params.push_notification {
            if push.url.trim().is_empty() {
                return Err(A2AError::InvalidParams("Push notification URL is missing".to_string()));
            }
        }
        params
            .message
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| A2AError::InvalidParams("Only text parts are supported".to_string()))
    }

    async fn setup_push(&self, params: &TaskSendParams) -> Result<(), A2AError> {
        let Some(push) = &params.push_notification else {
            return Ok(());
        };
        if !self.push_enabled {
            return Err(A2AError::PushNotificationNotSupported);
        }
        if !self.notifier.verify_push_notification_url(&push.url).await {
            return Err(A2AError::InvalidParams("Push notification URL is invalid".to_string()));
        }
        self.store.set_push_config(&params.id, push.clone());
        Ok(())
    }

    async fn run_streaming_agent(&self, task_id: String, session_id: String, query: String) {
        let (tx, mut rx) = mpsc::channel(STREAM_BUFFER);
        let agent = self.agent.clone();
        let producer = tokio::task::spawn_blocking(move || {
            for item in agent.stream(&query, &session_id) {
                if tx.blocking_send(item).is_err() {
                    break;
                }
            }
        });

        while let Some(item) = rx.recv().await {
            let result = match item {
                Ok(result) => result,
                Err(err) => {
                    error!(%task_id, error = %err, "agent stream failed");
                    self.fail(&task_id, &err.to_string()).await;
                    self.publish(
                        &task_id,
                        Err(A2AError::Internal(format!(
                            "An error occurred while streaming the response: {err}"
                        ))),
                    )
                    .await;
                    break;
                }
            };

            let (status, artifact, is_final) = status_for(&result);
            let task = match self.update(&task_id, status.clone(), artifact.clone().map(|a| vec![a])) {
                Ok(task) => task,
                Err(err) => {
                    self.publish(&task_id, Err(err)).await;
                    break;
                }
            };
            self.notify(&task).await;

            if let Some(artifact) = artifact {
                let event = TaskArtifactUpdateEvent {
                    id: task_id.clone(),
                    artifact,
                    metadata: None,
                };
                self.publish(&task_id, Ok(TaskEvent::Artifact(event))).await;
            }
            let event = TaskEvent::Status(TaskStatusUpdateEvent {
                id: task_id.clone(),
                status,
                final_: is_final,
                metadata: None,
            });
            let done = event.is_final();
            self.publish(&task_id, Ok(event)).await;
            if done {
                info!(%task_id, state = ?task.status.state, "streamed task turn finished");
                break;
            }
        }

        drop(rx);
        if let Err(err) = producer.await {
            warn!(%task_id, error = %err, "agent stream producer failed");
        }
        self.lock_subscribers().remove(&task_id);
    }

    fn subscribe(&self, task_id: &str) -> mpsc::Receiver<StreamItem> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        self.lock_subscribers()
            .entry(task_id.to_string())
            .or_default()
            .push(tx);
        rx
    }

    async fn publish(&self, task_id: &str, item: StreamItem) {
        let senders = self
            .lock_subscribers()
            .get(task_id)
            .cloned()
            .unwrap_or_default();
        for sender in senders {
            // A closed receiver just means that client went away.
            let _ = sender.send(item.clone()).await;
        }
        if let Some(senders) = self.lock_subscribers().get_mut(task_id) {
            senders.retain(|sender| !sender.is_closed());
        }
    }

    fn lock_subscribers(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<mpsc::Sender<StreamItem>>>> {
        match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn update(&self, id: &str, status: TaskStatus, artifacts: Option<Vec<Artifact>>) -> Result<Task, A2AError> {
        self.store
            .update_status(id, status, artifacts)
            .ok_or(A2AError::TaskNotFound)
    }

    async fn fail(&self, id: &str, reason: &str) {
        let status = TaskStatus::new(TaskState::Failed, Some(Message::agent_text(reason)));
        if let Ok(task) = self.update(id, status, None) {
            self.notify(&task).await;
        }
    }

    async fn notify(&self, task: &Task) {
        let Some(config) = self.store.get_push_config(&task.id) else {
            return;
        };
        match serde_json::to_value(task) {
            Ok(data) => self.notifier.send_push_notification(&config.url, &data).await,
            Err(err) => warn!(task_id = %task.id, error = %err, "cannot encode push notification"),
        }
    }
}

/// Task status (plus artifact on completion) for one agent result; the flag marks the last update.
fn status_for(result: &AgentResult) -> (TaskStatus, Option<Artifact>, bool) {
    if result.is_task_complete {
        let status = TaskStatus::new(TaskState::Completed, None);
        (status, Some(Artifact::text(&result.content)), true)
    } else if result.require_user_input {
        let message = Message::agent_text(&result.content);
        (TaskStatus::new(TaskState::InputRequired, Some(message)), None, true)
    } else {
        let message = Message::agent_text(&result.content);
        (TaskStatus::new(TaskState::Working, Some(message)), None, false)
    }
}

fn modalities_compatible(accepted: Option<&[String]>, supported: &[String]) -> bool {
    match accepted {
        Some(accepted) if !accepted.is_empty() && !supported.is_empty() => {
            accepted.iter().any(|mode| supported.contains(mode))
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::LLMResponse;
    use crate::testing::{agent_config, scripted_agent, ScriptedProvider};

    fn manager(responses: Vec<LLMResponse>, push_enabled: bool) -> Arc<TaskManager> {
        let (agent, _) = scripted_agent(responses);
        let notifier = Arc::new(PushNotificationSenderAuth::new().unwrap());
        Arc::new(TaskManager::new(Arc::new(agent), notifier, push_enabled))
    }

    fn send_params(value: serde_json::Value) -> TaskSendParams {
        serde_json::from_value(value).unwrap()
    }

    fn text_request(id: &str) -> TaskSendParams {
        send_params(json!({
            "id": id,
            "sessionId": "s1",
            "message": {"role": "user", "parts": [{"type": "text", "text": "Tell me about Adam Mickiewicz"}]},
            "acceptedOutputModes": ["text"]
        }))
    }

    async fn drain(mut rx: mpsc::Receiver<StreamItem>) -> Vec<StreamItem> {
        let mut items = Vec::new();
        while let Some(item) = rx.recv().await {
            items.push(item);
        }
        items
    }

    #[test]
    fn modalities() {
        let supported = vec!["text".to_string(), "text/plain".to_string()];
        assert!(modalities_compatible(None, &supported));
        assert!(modalities_compatible(Some(&[][..]), &supported));
        assert!(modalities_compatible(Some(&["text/plain".to_string()][..]), &supported));
        assert!(!modalities_compatible(Some(&["image/png".to_string()][..]), &supported));
    }

    #[tokio::test]
    async fn send_task_completes_with_artifact() {
        let manager = manager(
            vec![
                ScriptedProvider::text("A Polish poet."),
                ScriptedProvider::structured("completed", "A Polish poet."),
            ],
            true,
        );
        let task = manager.on_send_task(text_request("t1")).await.unwrap();

        assert_eq!(task.status.state, TaskState::Completed);
        assert_eq!(task.session_id.as_deref(), Some("s1"));
        assert_eq!(task.artifacts.unwrap()[0].parts[0], crate::task::types::Part::text("A Polish poet."));
        assert_eq!(task.history, Some(Vec::new()));
    }

    #[tokio::test]
    async fn send_task_asks_for_input() {
        let manager = manager(
            vec![
                ScriptedProvider::text("Which Adam?"),
                ScriptedProvider::structured("input_required", "Which Adam?"),
            ],
            true,
        );
        let mut params = text_request("t1");
        params.history_length = Some(10);
        let task = manager.on_send_task(params).await.unwrap();

        assert_eq!(task.status.state, TaskState::InputRequired);
        assert_eq!(task.status.message.as_ref().unwrap().first_text(), Some("Which Adam?"));
        assert!(task.artifacts.is_none());
        // user message + agent question
        assert_eq!(task.history.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn agent_failure_marks_task_failed() {
        let manager = manager(Vec::new(), true);
        let err = manager.on_send_task(text_request("t1")).await.unwrap_err();
        assert!(matches!(err, A2AError::Internal(_)));
        assert_eq!(manager.store.get("t1").unwrap().status.state, TaskState::Failed);
    }

    #[tokio::test]
    async fn rejects_incompatible_output_modes_and_non_text_parts() {
        let manager = manager(Vec::new(), true);
        let mut params = text_request("t1");
        params.accepted_output_modes = Some(vec!["image/png".to_string()]);
        assert_eq!(
            manager.on_send_task(params).await.unwrap_err(),
            A2AError::ContentTypeNotSupported
        );

        let params = send_params(json!({
            "id": "t2",
            "message": {"role": "user", "parts": [{"type": "data", "data": {"q": 1}}]}
        }));
        assert!(matches!(
            manager.on_send_task(params).await.unwrap_err(),
            A2AError::InvalidParams(_)
        ));
        assert!(manager.store.get("t1").is_none());
    }

    #[tokio::test]
    async fn push_config_without_url_is_invalid() {
        let manager = manager(Vec::new(), true);
        let mut params = text_request("t1");
        params.push_notification = Some(crate::task::types::PushNotificationConfig {
            url: " ".to_string(),
            token: None,
            authentication: None,
        });
        assert_eq!(
            manager.on_send_task(params).await.unwrap_err(),
            A2AError::InvalidParams("Push notification URL is missing".to_string())
        );
    }

    #[tokio::test]
    async fn get_and_cancel() {
        let manager = manager(
            vec![
                ScriptedProvider::text("done"),
                ScriptedProvider::structured("completed", "done"),
            ],
            true,
        );
        manager.on_send_task(text_request("t1")).await.unwrap();

        let task = manager
            .on_get_task(TaskQueryParams {
                id: "t1".to_string(),
                history_length: Some(1),
                metadata: None,
            })
            .await
            .unwrap();
        assert_eq!(task.history.unwrap().len(), 1);

        let cancel = |id: &str| TaskIdParams {
            id: id.to_string(),
            metadata: None,
        };
        assert_eq!(
            manager.on_cancel_task(cancel("t1")).await.unwrap_err(),
            A2AError::TaskNotCancelable
        );
        assert_eq!(
            manager.on_cancel_task(cancel("nope")).await.unwrap_err(),
            A2AError::TaskNotFound
        );
        assert_eq!(
            manager.on_resubscribe(cancel("t1")).await.unwrap_err(),
            A2AError::TaskNotFound
        );
    }

    #[tokio::test]
    async fn streaming_emits_working_updates_then_artifact_and_final_status() {
        let manager = manager(
            vec![
                ScriptedProvider::tool_call("wikipedia", json!({"query": "Adam Mickiewicz"})),
                ScriptedProvider::text("A Polish poet."),
                ScriptedProvider::structured("completed", "A Polish poet."),
            ],
            true,
        );
        let rx = manager
            .clone()
            .on_send_task_subscribe(text_request("t1"))
            .await
            .unwrap();
        let events: Vec<TaskEvent> = drain(rx).await.into_iter().map(Result::unwrap).collect();

        let working = agent_config().streaming.working_messages;
        assert_eq!(events.len(), 4);
        match &events[0] {
            TaskEvent::Status(event) => {
                assert_eq!(event.status.state, TaskState::Working);
                assert_eq!(event.status.message.as_ref().unwrap().first_text(), Some(working[0].as_str()));
                assert!(!event.final_);
            }
            other => panic!("unexpected event {other:?}"),
        }
        match &events[1] {
            TaskEvent::Status(event) => {
                assert_eq!(event.status.message.as_ref().unwrap().first_text(), Some(working[1].as_str()));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert!(matches!(&events[2], TaskEvent::Artifact(event) if event.id == "t1"));
        assert!(events[3].is_final());

        let task = manager.store.get("t1").unwrap();
        assert_eq!(task.status.state, TaskState::Completed);
        assert_eq!(task.artifacts.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn streaming_failure_emits_internal_error() {
        let manager = manager(Vec::new(), true);
        let rx = manager
            .clone()
            .on_send_task_subscribe(text_request("t1"))
            .await
            .unwrap();
        let items = drain(rx).await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(A2AError::Internal(_))));
        assert_eq!(manager.store.get("t1").unwrap().status.state, TaskState::Failed);
    }

    #[tokio::test]
    async fn push_endpoints_respect_capability() {
        let manager = manager(Vec::new(), false);
        let params = TaskIdParams {
            id: "t1".to_string(),
            metadata: None,
        };
        assert_eq!(
            manager.on_get_push_notification(params).await.unwrap_err(),
            A2AError::PushNotificationNotSupported
        );
    }
}
