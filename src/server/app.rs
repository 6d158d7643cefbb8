//! Axum application wiring.
//!
//! One POST endpoint accepts JSON-RPC and one well-known GET endpoint serves
//! the agent card. CORS is permissive unless disabled. When an [`AuthGate`]
//! is configured it runs before dispatch on the JSON-RPC endpoint.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tracing::info;

use super::{dispatch, sse_response, AuthGate, Dispatch, ServerState, TaskEngine, TaskHandler};
use crate::store::{InMemoryTaskStore, TaskStore};
use crate::types::AgentCard;
use crate::{DEFAULT_PORT, WELL_KNOWN_AGENT_PATH};

/// Configuration for the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// Enable permissive CORS for all origins.
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            enable_cors: true,
        }
    }
}

impl ServerConfig {
    /// Creates a new server configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the host address.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enables or disables CORS.
    #[must_use]
    pub const fn cors(mut self, enabled: bool) -> Self {
        self.enable_cors = enabled;
        self
    }

    /// Returns the bind address.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The task protocol server.
///
/// Wraps an axum router; build one with [`A2AServer::builder`].
pub struct A2AServer {
    router: Router,
    config: ServerConfig,
}

impl A2AServer {
    /// Creates a new server builder.
    #[must_use]
    pub fn builder() -> A2AServerBuilder {
        A2AServerBuilder::new()
    }

    /// Returns the axum router, e.g. for embedding into a larger app.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Starts the server and listens for incoming connections.
    pub async fn serve(self) -> Result<(), std::io::Error> {
        let addr = self.config.bind_address();
        info!("Starting A2A task server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, self.router).await
    }

    /// Starts the server with graceful shutdown support. Returning normally
    /// after the signal fires is the exit-code-0 path.
    pub async fn serve_with_shutdown<F>(self, shutdown_signal: F) -> Result<(), std::io::Error>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.bind_address();
        info!("Starting A2A task server on {} (with graceful shutdown)", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal)
            .await
    }
}

/// Handler for the well-known agent card endpoint.
async fn handle_agent_card(State(state): State<ServerState>) -> Json<AgentCard> {
    Json((*state.agent_card).clone())
}

/// Handler for the JSON-RPC endpoint. Unary methods answer with a JSON
/// body; `tasks/sendSubscribe` switches the response to SSE.
async fn handle_jsonrpc(State(state): State<ServerState>, body: String) -> Response {
    match dispatch(&state, &body).await {
        Dispatch::Json(body) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .expect("static response parts"),
        Dispatch::Stream { id, events } => sse_response(id, events),
    }
}

fn build_router(state: ServerState, config: &ServerConfig, gate: Option<Arc<AuthGate>>) -> Router {
    let mut rpc = Router::new().route("/", post(handle_jsonrpc));

    if let Some(gate) = gate {
        rpc = rpc.layer(middleware::from_fn(move |req: Request, next: Next| {
            let gate = Arc::clone(&gate);
            async move {
                match gate.check(req.headers()).await {
                    Ok(()) => next.run(req).await,
                    Err(e) => AuthGate::reject(e),
                }
            }
        }));
    }

    let mut router = Router::new()
        .route(WELL_KNOWN_AGENT_PATH, get(handle_agent_card))
        .merge(rpc)
        .with_state(state);

    if config.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
}

/// Builder for configuring an [`A2AServer`].
pub struct A2AServerBuilder {
    store: Arc<dyn TaskStore>,
    handler: Option<Arc<dyn TaskHandler>>,
    agent_card: Option<AgentCard>,
    auth_gate: Option<Arc<AuthGate>>,
    config: ServerConfig,
}

impl A2AServerBuilder {
    fn new() -> Self {
        Self {
            store: Arc::new(InMemoryTaskStore::new()),
            handler: None,
            agent_card: None,
            auth_gate: None,
            config: ServerConfig::default(),
        }
    }

    /// Sets the task store. Defaults to [`InMemoryTaskStore`].
    #[must_use]
    pub fn store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = store;
        self
    }

    /// Sets the task handler. Required.
    #[must_use]
    pub fn handler(mut self, handler: Arc<dyn TaskHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Sets the agent card served on the well-known endpoint. Required.
    #[must_use]
    pub fn agent_card(mut self, card: AgentCard) -> Self {
        self.agent_card = Some(card);
        self
    }

    /// Enables the authentication gate.
    #[must_use]
    pub fn auth_gate(mut self, gate: AuthGate) -> Self {
        self.auth_gate = Some(Arc::new(gate));
        self
    }

    /// Sets the full server configuration.
    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Builds the server.
    ///
    /// # Panics
    ///
    /// Panics if the handler or agent card has not been set.
    #[must_use]
    pub fn build(self) -> A2AServer {
        let handler = self.handler.expect("Task handler must be set");
        let agent_card = self.agent_card.expect("Agent card must be set");

        let engine = Arc::new(TaskEngine::new(self.store, handler));
        let state = ServerState::new(engine, agent_card);
        let router = build_router(state, &self.config, self.auth_gate);

        A2AServer {
            router,
            config: self.config,
        }
    }
}

impl Default for A2AServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
