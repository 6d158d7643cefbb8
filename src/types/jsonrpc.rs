//! JSON-RPC 2.0 envelope and method parameter types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Message;
use crate::error::A2AError;

/// The JSON-RPC protocol version.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC request identifier: string, number, or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// String identifier.
    String(String),
    /// Numeric identifier.
    Number(i64),
    /// Explicit null identifier.
    Null,
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        RequestId::Null
    }
}

/// Represents a JSON-RPC 2.0 Request object with raw params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// The version of the JSON-RPC protocol (must be "2.0").
    pub jsonrpc: String,
    /// A unique identifier for this request.
    #[serde(default)]
    pub id: RequestId,
    /// The method name to be invoked.
    pub method: String,
    /// The parameters for the method invocation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    /// Creates a new request for a method with params.
    pub fn new(
        id: impl Into<RequestId>,
        method: impl Into<String>,
        params: serde_json::Value,
    ) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: method.into(),
            params: Some(params),
        }
    }
}

/// Represents a successful JSON-RPC 2.0 Response object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcSuccessResponse<R> {
    /// The version of the JSON-RPC protocol (always "2.0").
    pub jsonrpc: String,
    /// The identifier established by the client.
    pub id: RequestId,
    /// The result of the method invocation.
    pub result: R,
}

impl<R> JsonRpcSuccessResponse<R> {
    /// Creates a new successful response.
    pub fn new(id: RequestId, result: R) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result,
        }
    }
}

/// Represents a JSON-RPC 2.0 Error Response object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcErrorResponse {
    /// The version of the JSON-RPC protocol (always "2.0").
    pub jsonrpc: String,
    /// The identifier established by the client, or null if unreadable.
    pub id: RequestId,
    /// An object describing the error.
    pub error: A2AError,
}

impl JsonRpcErrorResponse {
    /// Creates a new error response.
    pub fn new(id: RequestId, error: A2AError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error,
        }
    }
}

/// Parameters for `tasks/send` and `tasks/sendSubscribe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSendParams {
    /// The caller-chosen task identifier.
    pub id: String,
    /// An optional session to associate the task with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// The message triggering this handler invocation.
    pub message: Message,
    /// Optional metadata for extensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl TaskSendParams {
    /// Creates new send parameters.
    pub fn new(id: impl Into<String>, message: Message) -> Self {
        Self {
            id: id.into(),
            session_id: None,
            message,
            metadata: None,
        }
    }
}

/// Parameters for `tasks/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    /// The unique identifier of the task.
    pub id: String,
    /// Advisory history limit; accepted but not applied by this server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_length: Option<i32>,
    /// Optional metadata associated with the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl TaskQueryParams {
    /// Creates new query parameters.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            history_length: None,
            metadata: None,
        }
    }
}

/// Parameters for `tasks/cancel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskIdParams {
    /// The unique identifier of the task.
    pub id: String,
    /// Optional metadata associated with the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl TaskIdParams {
    /// Creates new task id parameters.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metadata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Part;

    #[test]
    fn test_request_id_untagged() {
        let s: RequestId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(s, RequestId::String("abc".into()));
        let n: RequestId = serde_json::from_str("7").unwrap();
        assert_eq!(n, RequestId::Number(7));
        let null: RequestId = serde_json::from_str("null").unwrap();
        assert_eq!(null, RequestId::Null);
        assert_eq!(serde_json::to_string(&RequestId::Null).unwrap(), "null");
    }

    #[test]
    fn test_send_params_wire_names() {
        let params = TaskSendParams {
            id: "t-1".into(),
            session_id: Some("s-1".into()),
            message: Message::user(vec![Part::text("hi")]),
            metadata: None,
        };
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("\"sessionId\":\"s-1\""));
        let parsed: TaskSendParams = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, "t-1");
    }

    #[test]
    fn test_query_params_history_length() {
        let json = r#"{"id":"t-1","historyLength":5}"#;
        let params: TaskQueryParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.history_length, Some(5));
    }

    #[test]
    fn test_success_response_envelope() {
        let response = JsonRpcSuccessResponse::new(RequestId::Number(1), serde_json::json!({}));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"result\""));
    }

    #[test]
    fn test_error_response_null_id() {
        let response = JsonRpcErrorResponse::new(RequestId::Null, A2AError::parse_error());
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"id\":null"));
        assert!(json.contains("-32700"));
    }

    #[test]
    fn test_request_missing_id_defaults_null() {
        let json = r#"{"jsonrpc":"2.0","method":"tasks/get"}"#;
        let request: JsonRpcRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.id, RequestId::Null);
        assert!(request.params.is_none());
    }
}
