//! HTTP client for the task protocol.
//!
//! Thin JSON-RPC client over the server's single POST endpoint:
//! `tasks/send`, `tasks/sendSubscribe` (SSE), `tasks/get`, `tasks/cancel`,
//! plus agent card discovery on the well-known path.

mod sse;

pub use sse::{decode_frame, SseDecoder};

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use futures::{stream, Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use crate::error::{A2AError, Result};
use crate::server::{METHOD_CANCEL, METHOD_GET, METHOD_SEND, METHOD_SEND_SUBSCRIBE};
use crate::types::{
    AgentCard, JsonRpcRequest, RequestId, Task, TaskIdParams, TaskQueryParams, TaskSendParams,
    TaskStreamEvent,
};
use crate::WELL_KNOWN_AGENT_PATH;

/// A stream of events from a `tasks/sendSubscribe` call.
pub type ClientEventStream = Pin<Box<dyn Stream<Item = Result<TaskStreamEvent>> + Send>>;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout in seconds. Streaming requests are exempt.
    pub timeout_secs: u64,
    /// Extra headers attached to every request (e.g. auth headers).
    pub headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            headers: Vec::new(),
        }
    }
}

/// HTTP JSON-RPC client for a task server.
#[derive(Debug)]
pub struct A2AClient {
    http: reqwest::Client,
    base_url: String,
    card_url: String,
    next_id: AtomicI64,
}

impl A2AClient {
    /// Creates a new client for the given server URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(base_url, ClientConfig::default())
    }

    /// Creates a new client with custom configuration.
    pub fn with_config(base_url: impl Into<String>, config: ClientConfig) -> Result<Self> {
        let base_url = base_url.into();
        let card_url = format!(
            "{}{}",
            base_url.trim_end_matches('/'),
            WELL_KNOWN_AGENT_PATH
        );

        let mut headers = reqwest::header::HeaderMap::new();
        for (name, value) in &config.headers {
            let name = reqwest::header::HeaderName::try_from(name.as_str())
                .map_err(|e| A2AError::internal_error(format!("invalid header name: {}", e)))?;
            let value = reqwest::header::HeaderValue::from_str(value)
                .map_err(|e| A2AError::internal_error(format!("invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(transport_err)?;

        Ok(Self {
            http,
            base_url,
            card_url,
            next_id: AtomicI64::new(1),
        })
    }

    /// Returns the base URL of the server.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submits a task and waits for the final persisted state.
    pub async fn send_task(&self, params: TaskSendParams) -> Result<Task> {
        self.call(METHOD_SEND, serde_json::to_value(params)?).await
    }

    /// Retrieves a task by id.
    pub async fn get_task(&self, params: TaskQueryParams) -> Result<Task> {
        self.call(METHOD_GET, serde_json::to_value(params)?).await
    }

    /// Requests cancellation of a task.
    pub async fn cancel_task(&self, params: TaskIdParams) -> Result<Task> {
        self.call(METHOD_CANCEL, serde_json::to_value(params)?).await
    }

    /// Fetches the agent card from the well-known endpoint.
    pub async fn agent_card(&self) -> Result<AgentCard> {
        let response = self
            .http
            .get(&self.card_url)
            .send()
            .await
            .map_err(transport_err)?;
        if !response.status().is_success() {
            return Err(A2AError::internal_error(format!(
                "agent card request failed with HTTP {}",
                response.status()
            )));
        }
        response.json().await.map_err(transport_err)
    }

    /// Submits a task and subscribes to its update stream.
    ///
    /// The returned stream yields one event per merged update; the event
    /// with `final: true` is the last. A JSON-RPC error response (e.g.
    /// invalid params) surfaces as the stream's single `Err` item.
    pub async fn subscribe_task(&self, params: TaskSendParams) -> Result<ClientEventStream> {
        let request = self.request(METHOD_SEND_SUBSCRIBE, serde_json::to_value(params)?);
        let response = self
            .http
            .post(&self.base_url)
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            // streaming runs are open-ended; cap at a day instead of the
            // unary timeout
            .timeout(Duration::from_secs(86_400))
            .send()
            .await
            .map_err(transport_err)?;

        if !response.status().is_success() {
            return Err(A2AError::internal_error(format!(
                "subscribe failed with HTTP {}",
                response.status()
            )));
        }

        // A JSON content type means the dispatcher rejected the request
        // before switching to SSE.
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));
        if is_json {
            let reply: Reply<TaskStreamEvent> = response.json().await.map_err(transport_err)?;
            return Err(reply
                .error
                .unwrap_or_else(|| A2AError::internal_error("unexpected non-stream response")));
        }

        let body = response.bytes_stream();
        let state = (body, SseDecoder::new(), VecDeque::new(), false);
        let events = stream::unfold(state, |(mut body, mut decoder, mut ready, mut done)| async move {
            loop {
                if let Some(item) = ready.pop_front() {
                    return Some((item, (body, decoder, ready, done)));
                }
                if done {
                    return None;
                }
                match body.next().await {
                    Some(Ok(chunk)) => {
                        let text = String::from_utf8_lossy(&chunk);
                        for payload in decoder.feed(&text) {
                            ready.push_back(decode_frame(&payload));
                        }
                    }
                    Some(Err(e)) => {
                        done = true;
                        ready.push_back(Err(transport_err(e)));
                    }
                    None => {
                        done = true;
                        if let Some(payload) = decoder.finish() {
                            ready.push_back(decode_frame(&payload));
                        }
                    }
                }
            }
        });

        Ok(Box::pin(events))
    }

    fn request(&self, method: &str, params: serde_json::Value) -> JsonRpcRequest {
        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::Relaxed));
        JsonRpcRequest::new(id, method, params)
    }

    async fn call<R: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<R> {
        let request = self.request(method, params);
        let response = self
            .http
            .post(&self.base_url)
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(transport_err)?;

        if !response.status().is_success() {
            return Err(A2AError::internal_error(format!(
                "request failed with HTTP {}",
                response.status()
            )));
        }

        let reply: Reply<R> = response.json().await.map_err(transport_err)?;
        if let Some(error) = reply.error {
            return Err(error);
        }
        reply
            .result
            .ok_or_else(|| A2AError::internal_error("response carried neither result nor error"))
    }
}

/// One side of a JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
struct Reply<R> {
    result: Option<R>,
    error: Option<A2AError>,
}

fn transport_err(e: reqwest::Error) -> A2AError {
    A2AError::internal_error(format!("HTTP transport error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{A2AServer, HandlerFn, TaskContext, TaskHandler, UpdateStream};
    use crate::types::{Message, TaskState, TaskStatusUpdate};
    use std::sync::Arc;

    fn echo_handler() -> Arc<dyn TaskHandler> {
        Arc::new(HandlerFn(|_ctx: TaskContext| -> UpdateStream {
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
        }))
    }

    async fn spawn_server() -> String {
        let server = A2AServer::builder()
            .handler(echo_handler())
            .agent_card(AgentCard::builder("Echo", "http://localhost:41241").build())
            .build();
        let router = server.router();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_send_and_get_roundtrip() {
        let url = spawn_server().await;
        let client = A2AClient::new(&url).unwrap();

        let task = client
            .send_task(TaskSendParams::new("c1", Message::user_text("hi")))
            .await
            .unwrap();
        assert_eq!(task.id, "c1");
        assert_eq!(task.status.state, TaskState::Completed);

        let fetched = client.get_task(TaskQueryParams::new("c1")).await.unwrap();
        assert_eq!(fetched.id, "c1");
    }

    #[tokio::test]
    async fn test_get_unknown_surfaces_error_code() {
        let url = spawn_server().await;
        let client = A2AClient::new(&url).unwrap();

        let err = client
            .get_task(TaskQueryParams::new("ghost"))
            .await
            .unwrap_err();
        assert_eq!(err.code, -32001);
    }

    #[tokio::test]
    async fn test_cancel_after_completion_is_noop() {
        let url = spawn_server().await;
        let client = A2AClient::new(&url).unwrap();

        client
            .send_task(TaskSendParams::new("c2", Message::user_text("hi")))
            .await
            .unwrap();
        let task = client.cancel_task(TaskIdParams::new("c2")).await.unwrap();
        assert_eq!(task.status.state, TaskState::Completed);
    }

    #[tokio::test]
    async fn test_agent_card_fetch() {
        let url = spawn_server().await;
        let client = A2AClient::new(&url).unwrap();

        let card = client.agent_card().await.unwrap();
        assert_eq!(card.name, "Echo");
        assert!(card.supports_streaming());
    }

    #[tokio::test]
    async fn test_subscribe_stream_end_to_end() {
        let url = spawn_server().await;
        let client = A2AClient::new(&url).unwrap();

        let events: Vec<_> = client
            .subscribe_task(TaskSendParams::new("c3", Message::user_text("hi")))
            .await
            .unwrap()
            .collect()
            .await;

        let events: Vec<_> = events.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(events.len(), 2);
        assert!(!events[0].is_final());
        assert!(events[1].is_final());
        match &events[1] {
            TaskStreamEvent::Status(e) => assert_eq!(e.status.state, TaskState::Completed),
            other => panic!("expected status event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_subscribe_invalid_params_is_error() {
        let url = spawn_server().await;
        let client = A2AClient::new(&url).unwrap();

        // Empty id fails validation before the stream starts.
        let err = match client
            .subscribe_task(TaskSendParams::new("", Message::user_text("hi")))
            .await
        {
            Err(e) => e,
            Ok(_) => panic!("expected subscribe_task to fail"),
        };
        assert_eq!(err.code, -32602);
    }

    #[tokio::test]
    async fn test_custom_headers_applied() {
        let config = ClientConfig {
            headers: vec![("X-Solana-Nonce".to_string(), "n-1".to_string())],
            ..Default::default()
        };
        // Header validation happens at build time.
        let client = A2AClient::with_config("http://localhost:41241", config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:41241");
    }
}
