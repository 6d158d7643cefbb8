//! # A2A Task Server Runtime
//!
//! A server runtime for the Agent-to-Agent (A2A) task protocol: clients
//! submit long-running tasks as multi-part messages over JSON-RPC 2.0, and a
//! user-supplied [`TaskHandler`](server::TaskHandler) streams back status
//! transitions and artifacts. The runtime validates envelopes, persists task
//! state and conversation history, merges handler updates into persisted
//! snapshots, streams updates to subscribers over Server-Sent Events, and
//! supports cooperative cancellation.
//!
//! ## Features
//!
//! - **JSON-RPC dispatch**: `tasks/send`, `tasks/sendSubscribe`,
//!   `tasks/get`, `tasks/cancel` on a single POST endpoint
//! - **SSE streaming**: one frame per merged update, exactly one final frame
//! - **Pluggable persistence**: in-memory and on-disk stores behind the
//!   [`TaskStore`](store::TaskStore) capability
//! - **Cooperative cancellation**: a process-wide cancellation set polled by
//!   handler code
//! - **Optional auth gate**: signed-nonce verification with a pluggable
//!   subscription ledger

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod client;
pub mod crypto;
pub mod error;
pub mod server;
pub mod store;
pub mod types;

pub use client::{A2AClient, ClientConfig};
pub use error::{A2AError, JsonRpcErrorCode, Result};
pub use server::{
    A2AServer, A2AServerBuilder, AuthGate, CancelProbe, CancellationSet, Ed25519Verifier,
    GateEnv, HandlerFn, ServerConfig, ServerState, SignatureVerifier, SubscriptionLedger,
    TaskContext, TaskEngine, TaskHandler, UpdateStream,
};
pub use store::{FileTaskStore, InMemoryTaskStore, TaskStore};
pub use types::{
    AgentCard, AgentCapabilities, AgentSkill, Artifact, Message, Part, Role, Task, TaskAndHistory,
    TaskState, TaskStatus, TaskStatusUpdate, TaskYieldUpdate,
};

/// Default TCP port the server binds to.
pub const DEFAULT_PORT: u16 = 41241;

/// Well-known path serving the agent card.
pub const WELL_KNOWN_AGENT_PATH: &str = "/.well-known/agent.json";
