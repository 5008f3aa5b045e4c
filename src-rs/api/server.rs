use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use super::card::AgentCard;
use super::handlers::{handle_agent_card, handle_health, handle_jwks, handle_rpc, handle_tasks};
use crate::error::{AgentError, Result};
use crate::push::PushNotificationSenderAuth;
use crate::task::TaskManager;

/// Shared handles for every request handler.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<TaskManager>,
    pub card: Arc<AgentCard>,
    pub auth: Arc<PushNotificationSenderAuth>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(handle_rpc))
        .route("/.well-known/agent.json", get(handle_agent_card))
        .route("/.well-known/jwks.json", get(handle_jwks))
        .route("/health", get(handle_health))
        .route("/tasks", get(handle_tasks))
        .with_state(state)
}

pub struct AgentServer {
    pub host: String,
    pub port: u16,
    state: AppState,
}

impl AgentServer {
    pub fn new(host: &str, port: u16, state: AppState) -> Self {
        Self {
            host: host.to_string(),
            port,
            state,
        }
    }

    pub async fn start(&self) -> Result<()> {
        let addr = tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|err| AgentError::Server(format!("cannot resolve {}: {}", self.host, err)))?
            .next()
            .ok_or_else(|| AgentError::Server(format!("no address for {}", self.host)))?;

        info!("Starting server on {}:{}", self.host, self.port);
        axum::Server::try_bind(&addr)
            .map_err(|err| AgentError::Server(err.to_string()))?
            .serve(router(self.state.clone()).into_make_service())
            .await
            .map_err(|err| AgentError::Server(err.to_string()))
    }
}
