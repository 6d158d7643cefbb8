//! JSON-RPC dispatcher.
//!
//! Validates the JSON-RPC 2.0 envelope and routes to the four task
//! operations. Every outcome is HTTP 200: a success envelope, an error
//! envelope, or, for `tasks/sendSubscribe`, a switch to SSE streaming.
//! The response id echoes the request id, falling back to `null` when the
//! incoming id is unreadable.

use serde::de::DeserializeOwned;
use tracing::warn;

use super::{EventStream, ServerState};
use crate::error::{A2AError, Result};
use crate::types::{
    JsonRpcErrorResponse, JsonRpcSuccessResponse, RequestId, TaskIdParams, TaskQueryParams,
    TaskSendParams,
};

/// Method name for unary task submission.
pub const METHOD_SEND: &str = "tasks/send";
/// Method name for streaming task submission.
pub const METHOD_SEND_SUBSCRIBE: &str = "tasks/sendSubscribe";
/// Method name for task retrieval.
pub const METHOD_GET: &str = "tasks/get";
/// Method name for task cancellation.
pub const METHOD_CANCEL: &str = "tasks/cancel";

/// The outcome of dispatching one request body.
pub enum Dispatch {
    /// A complete JSON-RPC response body.
    Json(String),
    /// The request switched to SSE; each event must be wrapped in a success
    /// envelope echoing this id.
    Stream {
        /// The request id to echo on every frame.
        id: RequestId,
        /// The engine's event stream.
        events: EventStream,
    },
}

/// Dispatches a raw JSON-RPC request body.
pub async fn dispatch(state: &ServerState, body: &str) -> Dispatch {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return Dispatch::Json(error_body(RequestId::Null, A2AError::parse_error())),
    };

    // Best-effort id for echoing on envelope-validation failures.
    let id = lenient_id(&value);

    let (method, params) = match validate_envelope(&value) {
        Ok(parts) => parts,
        Err(e) => return Dispatch::Json(error_body(id, e)),
    };

    match method {
        METHOD_SEND => {
            let result: Result<_> = async {
                let params: TaskSendParams = parse_params(params)?;
                state.engine.send_task(params).await
            }
            .await;
            Dispatch::Json(into_body(id, result))
        }
        METHOD_SEND_SUBSCRIBE => {
            let result: Result<EventStream> = async {
                let params: TaskSendParams = parse_params(params)?;
                state.engine.subscribe_task(params).await
            }
            .await;
            match result {
                Ok(events) => Dispatch::Stream { id, events },
                Err(e) => Dispatch::Json(error_body(id, e)),
            }
        }
        METHOD_GET => {
            let result: Result<_> = async {
                let params: TaskQueryParams = parse_params(params)?;
                state.engine.get_task(params).await
            }
            .await;
            Dispatch::Json(into_body(id, result))
        }
        METHOD_CANCEL => {
            let result: Result<_> = async {
                let params: TaskIdParams = parse_params(params)?;
                state.engine.cancel_task(params).await
            }
            .await;
            Dispatch::Json(into_body(id, result))
        }
        other => Dispatch::Json(error_body(id, A2AError::method_not_found(other))),
    }
}

/// Checks the JSON-RPC 2.0 envelope shape and returns `(method, params)`.
fn validate_envelope(value: &serde_json::Value) -> Result<(&str, Option<serde_json::Value>)> {
    let object = value
        .as_object()
        .ok_or_else(|| A2AError::invalid_request("request must be a JSON object"))?;

    match object.get("jsonrpc").and_then(|v| v.as_str()) {
        Some("2.0") => {}
        _ => return Err(A2AError::invalid_request("jsonrpc must be the string \"2.0\"")),
    }

    let method = object
        .get("method")
        .and_then(|v| v.as_str())
        .ok_or_else(|| A2AError::invalid_request("method must be a string"))?;

    if let Some(id) = object.get("id") {
        if !(id.is_string() || id.is_number() || id.is_null()) {
            return Err(A2AError::invalid_request(
                "id must be a string, a number, or null",
            ));
        }
    }

    let params = object.get("params");
    if let Some(params) = params {
        if !(params.is_object() || params.is_array()) {
            return Err(A2AError::invalid_request(
                "params must be an object or an array",
            ));
        }
    }

    Ok((method, params.cloned()))
}

/// Extracts the request id without failing: anything unreadable becomes null.
fn lenient_id(value: &serde_json::Value) -> RequestId {
    match value.get("id") {
        Some(serde_json::Value::String(s)) => RequestId::String(s.clone()),
        Some(serde_json::Value::Number(n)) => {
            n.as_i64().map(RequestId::Number).unwrap_or(RequestId::Null)
        }
        _ => RequestId::Null,
    }
}

/// Extracts and deserializes method params.
fn parse_params<T: DeserializeOwned>(params: Option<serde_json::Value>) -> Result<T> {
    match params {
        Some(p) => serde_json::from_value(p).map_err(|e| A2AError::invalid_params(e.to_string())),
        None => Err(A2AError::invalid_params("Missing params")),
    }
}

fn into_body<T: serde::Serialize>(id: RequestId, result: Result<T>) -> String {
    match result {
        Ok(result) => serde_json::to_string(&JsonRpcSuccessResponse::new(id, result))
            .unwrap_or_else(|e| error_body(RequestId::Null, A2AError::from(e))),
        Err(e) => error_body(id, e),
    }
}

/// Serializes an error response, logging it on the way out.
fn error_body(id: RequestId, error: A2AError) -> String {
    warn!(
        code = error.code,
        task_id = error.task_id.as_deref().unwrap_or(""),
        request_id = ?id,
        message = %error.message,
        "request failed"
    );
    serde_json::to_string(&JsonRpcErrorResponse::new(id, error))
        .expect("error response serialization cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{HandlerFn, ServerState, TaskContext, TaskEngine, UpdateStream};
    use crate::store::InMemoryTaskStore;
    use crate::types::{AgentCard, Message, TaskState, TaskStatusUpdate};
    use futures::{stream, StreamExt};
    use std::sync::Arc;

    fn test_state() -> ServerState {
        let handler = HandlerFn(|_ctx: TaskContext| -> UpdateStream {
            Box::pin(stream::iter(vec![
                Ok(TaskStatusUpdate::with_message(
                    TaskState::Working,
                    Message::agent_text("working"),
                )
                .into()),
                Ok(TaskStatusUpdate::with_message(
                    TaskState::Completed,
                    Message::agent_text("done"),
                )
                .into()),
            ]))
        });
        let engine = TaskEngine::new(Arc::new(InMemoryTaskStore::new()), Arc::new(handler));
        ServerState::new(
            Arc::new(engine),
            AgentCard::builder("Test Agent", "http://localhost:41241").build(),
        )
    }

    async fn dispatch_json(state: &ServerState, body: &str) -> serde_json::Value {
        match dispatch(state, body).await {
            Dispatch::Json(body) => serde_json::from_str(&body).unwrap(),
            Dispatch::Stream { .. } => panic!("expected a JSON response"),
        }
    }

    #[tokio::test]
    async fn test_parse_error() {
        let state = test_state();
        let response = dispatch_json(&state, "{not json").await;
        assert_eq!(response["error"]["code"], -32700);
        assert_eq!(response["id"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_wrong_version_rejected() {
        let state = test_state();
        let body = r#"{"jsonrpc":"1.0","id":7,"method":"tasks/get","params":{"id":"x"}}"#;
        let response = dispatch_json(&state, body).await;
        assert_eq!(response["error"]["code"], -32600);
        assert_eq!(response["id"], 7);
    }

    #[tokio::test]
    async fn test_non_string_method_rejected() {
        let state = test_state();
        let body = r#"{"jsonrpc":"2.0","id":1,"method":42}"#;
        let response = dispatch_json(&state, body).await;
        assert_eq!(response["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_object_id_rejected_and_echoed_null() {
        let state = test_state();
        let body = r#"{"jsonrpc":"2.0","id":{"bad":true},"method":"tasks/get","params":{"id":"x"}}"#;
        let response = dispatch_json(&state, body).await;
        assert_eq!(response["error"]["code"], -32600);
        assert_eq!(response["id"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_non_object_params_rejected() {
        let state = test_state();
        let body = r#"{"jsonrpc":"2.0","id":1,"method":"tasks/send","params":"nope"}"#;
        let response = dispatch_json(&state, body).await;
        assert_eq!(response["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_method_not_found() {
        let state = test_state();
        let body = r#"{"jsonrpc":"2.0","id":"r1","method":"tasks/never"}"#;
        let response = dispatch_json(&state, body).await;
        assert_eq!(response["error"]["code"], -32601);
        assert_eq!(response["id"], "r1");
    }

    #[tokio::test]
    async fn test_send_success_echoes_id() {
        let state = test_state();
        let body = r#"{"jsonrpc":"2.0","id":"r2","method":"tasks/send","params":{"id":"t1","message":{"role":"user","parts":[{"kind":"text","text":"hi"}]}}}"#;
        let response = dispatch_json(&state, body).await;

        assert_eq!(response["id"], "r2");
        assert_eq!(response["jsonrpc"], "2.0");
        assert_eq!(response["result"]["id"], "t1");
        assert_eq!(response["result"]["status"]["state"], "completed");
        // tasks responses never include history
        assert!(response["result"].get("history").is_none());
    }

    #[tokio::test]
    async fn test_send_missing_params() {
        let state = test_state();
        let body = r#"{"jsonrpc":"2.0","id":3,"method":"tasks/send"}"#;
        let response = dispatch_json(&state, body).await;
        assert_eq!(response["error"]["code"], -32602);
        assert_eq!(response["id"], 3);
    }

    #[tokio::test]
    async fn test_send_malformed_params() {
        let state = test_state();
        let body = r#"{"jsonrpc":"2.0","id":4,"method":"tasks/send","params":{"id":"t1"}}"#;
        let response = dispatch_json(&state, body).await;
        assert_eq!(response["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_get_unknown_task() {
        let state = test_state();
        let body = r#"{"jsonrpc":"2.0","id":5,"method":"tasks/get","params":{"id":"ghost"}}"#;
        let response = dispatch_json(&state, body).await;
        assert_eq!(response["error"]["code"], -32001);
    }

    #[tokio::test]
    async fn test_get_after_send() {
        let state = test_state();
        let send = r#"{"jsonrpc":"2.0","id":1,"method":"tasks/send","params":{"id":"t2","message":{"role":"user","parts":[{"kind":"text","text":"hi"}]}}}"#;
        dispatch_json(&state, send).await;

        let get = r#"{"jsonrpc":"2.0","id":2,"method":"tasks/get","params":{"id":"t2","historyLength":1}}"#;
        let response = dispatch_json(&state, get).await;
        assert_eq!(response["result"]["id"], "t2");
        assert_eq!(response["result"]["status"]["state"], "completed");
    }

    #[tokio::test]
    async fn test_cancel_after_send() {
        let state = test_state();
        let send = r#"{"jsonrpc":"2.0","id":1,"method":"tasks/send","params":{"id":"t3","message":{"role":"user","parts":[{"kind":"text","text":"hi"}]}}}"#;
        dispatch_json(&state, send).await;

        // task completed, cancel is a no-op success
        let cancel = r#"{"jsonrpc":"2.0","id":2,"method":"tasks/cancel","params":{"id":"t3"}}"#;
        let response = dispatch_json(&state, cancel).await;
        assert_eq!(response["result"]["status"]["state"], "completed");
    }

    #[tokio::test]
    async fn test_subscribe_switches_to_stream() {
        let state = test_state();
        let body = r#"{"jsonrpc":"2.0","id":"s1","method":"tasks/sendSubscribe","params":{"id":"t4","message":{"role":"user","parts":[{"kind":"text","text":"hi"}]}}}"#;

        match dispatch(&state, body).await {
            Dispatch::Stream { id, events } => {
                assert_eq!(id, RequestId::String("s1".into()));
                let events: Vec<_> = events.collect().await;
                assert_eq!(events.len(), 2);
                assert!(events[1].is_final());
            }
            Dispatch::Json(body) => panic!("expected stream, got {body}"),
        }
    }

    #[tokio::test]
    async fn test_traversal_id_rejected_with_disk_store() {
        let dir = tempfile::tempdir().unwrap();
        let handler = HandlerFn(|_ctx: TaskContext| -> UpdateStream {
            Box::pin(stream::empty())
        });
        let engine = TaskEngine::new(
            Arc::new(crate::store::FileTaskStore::with_base_dir(dir.path())),
            Arc::new(handler),
        );
        let state = ServerState::new(
            Arc::new(engine),
            AgentCard::builder("Test", "http://localhost:41241").build(),
        );

        let body = r#"{"jsonrpc":"2.0","id":9,"method":"tasks/send","params":{"id":"../escape","message":{"role":"user","parts":[{"kind":"text","text":"hi"}]}}}"#;
        let response = dispatch_json(&state, body).await;
        assert_eq!(response["error"]["code"], -32602);
        assert_eq!(response["id"], 9);
    }

    #[tokio::test]
    async fn test_subscribe_invalid_params_stays_json() {
        let state = test_state();
        let body = r#"{"jsonrpc":"2.0","id":"s2","method":"tasks/sendSubscribe","params":{"id":""}}"#;
        let response = dispatch_json(&state, body).await;
        assert_eq!(response["error"]["code"], -32602);
    }
}
