//! Error types for the task server runtime.
//!
//! Every failure that can surface on the wire is described by a JSON-RPC
//! error code plus a message and optional data payload. Errors raised while
//! a task is in flight additionally carry the task id so log lines can be
//! correlated with the task they belong to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A specialized Result type for server operations.
pub type Result<T> = std::result::Result<T, A2AError>;

/// JSON-RPC 2.0 error codes used by the A2A protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum JsonRpcErrorCode {
    /// Invalid JSON was received by the server.
    ParseError = -32700,
    /// The JSON sent is not a valid Request object.
    InvalidRequest = -32600,
    /// The method does not exist / is not available.
    MethodNotFound = -32601,
    /// Invalid method parameter(s).
    InvalidParams = -32602,
    /// Internal JSON-RPC error.
    InternalError = -32603,

    // A2A-specific error codes
    /// Task not found.
    TaskNotFound = -32001,
    /// Task cannot be canceled. Declared for protocol completeness; the
    /// server currently treats cancel of a terminal task as a no-op success.
    TaskNotCancelable = -32002,
    /// Push notification not supported.
    PushNotificationNotSupported = -32003,
    /// Operation not supported.
    UnsupportedOperation = -32004,
    /// Request rejected by the authentication gate.
    AuthFailed = -32099,
}

impl JsonRpcErrorCode {
    /// Returns the default message for this error code.
    #[must_use]
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::ParseError => "Invalid JSON payload",
            Self::InvalidRequest => "Request payload validation error",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid parameters",
            Self::InternalError => "Internal error",
            Self::TaskNotFound => "Task not found",
            Self::TaskNotCancelable => "Task cannot be canceled",
            Self::PushNotificationNotSupported => "Push Notification is not supported",
            Self::UnsupportedOperation => "This operation is not supported",
            Self::AuthFailed => "Authentication failed",
        }
    }
}

impl From<i32> for JsonRpcErrorCode {
    fn from(code: i32) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32001 => Self::TaskNotFound,
            -32002 => Self::TaskNotCancelable,
            -32003 => Self::PushNotificationNotSupported,
            -32004 => Self::UnsupportedOperation,
            -32099 => Self::AuthFailed,
            _ => Self::InternalError,
        }
    }
}

/// The error type for everything the server can reject or fail at.
///
/// Serializing an `A2AError` produces the JSON-RPC `error` member:
/// `{code, message, data?}`. The `task_id` is context for logging only and
/// never leaves the process.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub struct A2AError {
    /// A number indicating the error type.
    pub code: i32,
    /// A short description of the error.
    pub message: String,
    /// Additional information about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// The task this error belongs to, when known at the raise site.
    #[serde(skip)]
    pub task_id: Option<String>,
}

impl fmt::Display for A2AError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.task_id {
            Some(ref id) => write!(f, "[{}] {} (task {})", self.code, self.message, id),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

impl A2AError {
    /// Creates a new error.
    pub fn new(code: JsonRpcErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            data: None,
            task_id: None,
        }
    }

    /// Creates a new error with additional data.
    pub fn with_data(
        code: JsonRpcErrorCode,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            data: Some(data),
            task_id: None,
        }
    }

    /// Attaches a task id for log correlation.
    #[must_use]
    pub fn for_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(
            JsonRpcErrorCode::ParseError,
            JsonRpcErrorCode::ParseError.default_message(),
        )
    }

    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidRequest, message)
    }

    /// Creates a method not found error.
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::MethodNotFound,
            format!("Method '{}' not found", method),
        )
    }

    /// Creates an invalid params error.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidParams, message)
    }

    /// Creates an internal error.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(JsonRpcErrorCode::InternalError, message)
    }

    /// Creates a task not found error.
    pub fn task_not_found(task_id: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::TaskNotFound,
            format!("Task '{}' not found", task_id),
        )
        .for_task(task_id)
    }

    /// Creates an authentication failure.
    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::new(JsonRpcErrorCode::AuthFailed, message)
    }

    /// Returns the error code as an enum variant.
    #[must_use]
    pub fn error_code(&self) -> JsonRpcErrorCode {
        JsonRpcErrorCode::from(self.code)
    }

    /// Returns true if this error came from the authentication gate.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        self.code == JsonRpcErrorCode::AuthFailed as i32
    }
}

impl From<serde_json::Error> for A2AError {
    fn from(e: serde_json::Error) -> Self {
        Self::internal_error(format!("JSON serialization failed: {}", e))
    }
}

impl From<std::io::Error> for A2AError {
    fn from(e: std::io::Error) -> Self {
        Self::internal_error(format!("I/O error: {}", e))
    }
}
