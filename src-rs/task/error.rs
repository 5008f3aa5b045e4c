use serde_json::Value;
use thiserror::Error;

/// Task-level failures, each carrying its JSON-RPC error code.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum A2AError {
    #[error("Invalid JSON payload")]
    JsonParse(Option<String>),
    #[error("Request payload validation error")]
    InvalidRequest(Option<String>),
    #[error("Method not found")]
    MethodNotFound,
    #[error("{0}")]
    InvalidParams(String),
    #[error("{0}")]
    Internal(String),
    #[error("Task not found")]
    TaskNotFound,
    #[error("Task cannot be canceled")]
    TaskNotCancelable,
    #[error("Push Notification is not supported")]
    PushNotificationNotSupported,
    #[error("This operation is not supported")]
    UnsupportedOperation,
    #[error("Incompatible content types")]
    ContentTypeNotSupported,
}

impl A2AError {
    pub fn code(&self) -> i32 {
        match self {
            Self::JsonParse(_) => -32700,
            Self::InvalidRequest(_) => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams(_) => -32602,
            Self::Internal(_) => -32603,
            Self::TaskNotFound => -32001,
            Self::TaskNotCancelable => -32002,
            Self::PushNotificationNotSupported => -32003,
            Self::UnsupportedOperation => -32004,
            Self::ContentTypeNotSupported => -32005,
        }
    }

    pub fn data(&self) -> Option<Value> {
        match self {
            Self::JsonParse(Some(detail)) | Self::InvalidRequest(Some(detail)) => {
                Some(Value::String(detail.clone()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_json_rpc_and_a2a_ranges() {
        assert_eq!(A2AError::JsonParse(None).code(), -32700);
        assert_eq!(A2AError::MethodNotFound.code(), -32601);
        assert_eq!(A2AError::TaskNotFound.code(), -32001);
        assert_eq!(A2AError::ContentTypeNotSupported.code(), -32005);
    }

    #[test]
    fn parse_details_travel_as_data() {
        let err = A2AError::InvalidRequest(Some("missing field `method`".to_string()));
        assert_eq!(err.data(), Some(Value::String("missing field `method`".to_string())));
        assert_eq!(A2AError::TaskNotCancelable.data(), None);
        assert_eq!(A2AError::InvalidParams("bad".to_string()).to_string(), "bad");
    }
}
