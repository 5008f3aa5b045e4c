use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use super::card::AgentCard;
use super::server::AppState;
use super::types::{JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
use crate::push::JwksResponse;
use crate::task::{A2AError, StreamItem};

pub const METHOD_SEND: &str = "tasks/send";
pub const METHOD_SEND_SUBSCRIBE: &str = "tasks/sendSubscribe";
pub const METHOD_GET: &str = "tasks/get";
pub const METHOD_CANCEL: &str = "tasks/cancel";
pub const METHOD_RESUBSCRIBE: &str = "tasks/resubscribe";
pub const METHOD_SET_PUSH: &str = "tasks/pushNotification/set";
pub const METHOD_GET_PUSH: &str = "tasks/pushNotification/get";

#[derive(Debug, Deserialize, Default)]
pub struct TasksQuery {
    pub limit: Option<usize>,
}

enum Reply {
    Json(Value),
    Stream(mpsc::Receiver<StreamItem>),
}

pub async fn handle_health() -> Json<Value> {
    Json(json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}))
}

pub async fn handle_agent_card(State(state): State<AppState>) -> Json<AgentCard> {
    Json(state.card.as_ref().clone())
}

pub async fn handle_jwks(State(state): State<AppState>) -> Json<JwksResponse> {
    Json(state.auth.jwks())
}

pub async fn handle_tasks(
    State(state): State<AppState>,
    Query(query): Query<TasksQuery>,
) -> Json<Value> {
    let limit = query.limit.unwrap_or(10);
    let tasks = state.manager.list(limit);
    Json(json!({"tasks": tasks}))
}

/// JSON-RPC entry point for every `tasks/*` method.
pub async fn handle_rpc(State(state): State<AppState>, body: Bytes) -> Response {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(err) => return rejected(None, A2AError::JsonParse(Some(err.to_string()))),
    };
    let id = raw.get("id").cloned().filter(|id| !id.is_null());
    let request: JsonRpcRequest = match serde_json::from_value(raw) {
        Ok(request) => request,
        Err(err) => return rejected(id, A2AError::InvalidRequest(Some(err.to_string()))),
    };
    if request.jsonrpc != JSONRPC_VERSION {
        return rejected(id, A2AError::InvalidRequest(Some("jsonrpc must be \"2.0\"".to_string())));
    }

    debug!(method = %request.method, "json-rpc request");
    match dispatch(&state, request).await {
        Ok(Reply::Json(result)) => Json(JsonRpcResponse::success(id, result)).into_response(),
        Ok(Reply::Stream(rx)) => event_stream(id, rx),
        Err(err @ A2AError::MethodNotFound) => rejected(id, err),
        Err(err) => {
            warn!(code = err.code(), error = %err, "json-rpc request failed");
            Json(JsonRpcResponse::failure(id, &err)).into_response()
        }
    }
}

async fn dispatch(state: &AppState, request: JsonRpcRequest) -> Result<Reply, A2AError> {
    let manager = &state.manager;
    let params = request.params;
    match request.method.as_str() {
        METHOD_SEND => to_reply(manager.on_send_task(parse(params)?).await?),
        METHOD_GET => to_reply(manager.on_get_task(parse(params)?).await?),
        METHOD_CANCEL => to_reply(manager.on_cancel_task(parse(params)?).await?),
        METHOD_SET_PUSH => to_reply(manager.on_set_push_notification(parse(params)?).await?),
        METHOD_GET_PUSH => to_reply(manager.on_get_push_notification(parse(params)?).await?),
        METHOD_SEND_SUBSCRIBE => {
            if !state.card.capabilities.streaming {
                return Err(A2AError::UnsupportedOperation);
            }
            let rx = manager.clone().on_send_task_subscribe(parse(params)?).await?;
            Ok(Reply::Stream(rx))
        }
        METHOD_RESUBSCRIBE => Ok(Reply::Stream(manager.on_resubscribe(parse(params)?).await?)),
        _ => Err(A2AError::MethodNotFound),
    }
}

fn parse<T: DeserializeOwned>(params: Value) -> Result<T, A2AError> {
    serde_json::from_value(params).map_err(|err| A2AError::InvalidParams(err.to_string()))
}

fn to_reply<T: serde::Serialize>(result: T) -> Result<Reply, A2AError> {
    serde_json::to_value(result)
        .map(Reply::Json)
        .map_err(|err| A2AError::Internal(err.to_string()))
}

fn rejected(id: Option<Value>, err: A2AError) -> Response {
    warn!(code = err.code(), error = %err, "rejected json-rpc request");
    (StatusCode::BAD_REQUEST, Json(JsonRpcResponse::failure(id, &err))).into_response()
}

fn event_stream(id: Option<Value>, rx: mpsc::Receiver<StreamItem>) -> Response {
    let events = ReceiverStream::new(rx).map(move |item| {
        let response = match item.and_then(|event| {
            serde_json::to_value(event).map_err(|err| A2AError::Internal(err.to_string()))
        }) {
            Ok(result) => JsonRpcResponse::success(id.clone(), result),
            Err(err) => JsonRpcResponse::failure(id.clone(), &err),
        };
        Event::default().json_data(response)
    });
    Sse::new(events).keep_alive(KeepAlive::default()).into_response()
}
