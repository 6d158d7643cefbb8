//! Server implementation.
//!
//! # Features
//!
//! - **HTTP server**: axum-based application with a single JSON-RPC endpoint
//! - **SSE streaming**: per-update frames for `tasks/sendSubscribe`
//! - **Task engine**: lifecycle driving, update merging, persistence
//! - **Cooperative cancellation**: process-wide cancellation set polled by
//!   handlers

mod app;
mod auth;
mod dispatcher;
mod engine;
pub mod merge;
mod sse;

pub use app::*;
pub use auth::*;
pub use dispatcher::*;
pub use engine::*;
pub use sse::*;

use std::collections::HashSet;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use futures::Stream;
use tokio::sync::{Notify, RwLock};

use crate::error::Result;
use crate::types::{AgentCard, Message, Task, TaskYieldUpdate};

/// A lazy sequence of updates produced by a task handler.
pub type UpdateStream = Pin<Box<dyn Stream<Item = Result<TaskYieldUpdate>> + Send>>;

/// User-supplied task logic.
///
/// A handler is a lazy producer: given a [`TaskContext`] it returns a stream
/// the engine drives one update at a time, persisting after each. Returning
/// without a terminal status is fine; the engine finishes the task. An
/// `Err` item fails the task.
pub trait TaskHandler: Send + Sync {
    /// Starts a run for the given context.
    fn handle(&self, ctx: TaskContext) -> UpdateStream;
}

/// Adapter so a closure producing an [`UpdateStream`] can serve as a
/// [`TaskHandler`] without a named type.
pub struct HandlerFn<F>(
    /// The closure invoked once per run.
    pub F,
);

impl<F> TaskHandler for HandlerFn<F>
where
    F: Fn(TaskContext) -> UpdateStream + Send + Sync,
{
    fn handle(&self, ctx: TaskContext) -> UpdateStream {
        (self.0)(ctx)
    }
}

/// Context handed to a handler for one run.
///
/// The task snapshot is shared: the engine refreshes it after every merge so
/// `task()` always observes the latest persisted state of this run.
#[derive(Clone)]
pub struct TaskContext {
    task: Arc<RwLock<Task>>,
    /// The user message that triggered this run.
    pub user_message: Message,
    /// Copy of the history as of the start of the run, incoming message
    /// included.
    pub history: Vec<Message>,
    cancel: CancelProbe,
}

impl TaskContext {
    pub(crate) fn new(
        task: Arc<RwLock<Task>>,
        user_message: Message,
        history: Vec<Message>,
        cancel: CancelProbe,
    ) -> Self {
        Self {
            task,
            user_message,
            history,
            cancel,
        }
    }

    /// Returns the latest task snapshot for this run.
    pub async fn task(&self) -> Task {
        self.task.read().await.clone()
    }

    /// Returns true if cancellation has been requested for this task.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Waits until cancellation is requested. Convenience over polling;
    /// handlers that only poll [`Self::is_cancelled`] work too.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// Returns a standalone cancellation probe for this task.
    #[must_use]
    pub fn cancel_probe(&self) -> CancelProbe {
        self.cancel.clone()
    }
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("user_message", &self.user_message)
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}

/// Process-wide set of task ids with a pending cancellation request.
///
/// A flag stays set while a run for that task is active; the run's cleanup
/// clears it once termination is observed. Cancelling a task with no active
/// run clears the flag immediately.
#[derive(Debug, Default)]
pub struct CancellationSet {
    flags: Mutex<HashSet<String>>,
    notify: Notify,
}

impl CancellationSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags a task as cancellation-requested and wakes any waiters.
    pub fn request(&self, task_id: &str) {
        self.flags
            .lock()
            .expect("cancellation set poisoned")
            .insert(task_id.to_string());
        self.notify.notify_waiters();
    }

    /// Clears the flag for a task. Returns true if it was set.
    pub fn clear(&self, task_id: &str) -> bool {
        self.flags
            .lock()
            .expect("cancellation set poisoned")
            .remove(task_id)
    }

    /// Returns true if cancellation has been requested for the task.
    #[must_use]
    pub fn contains(&self, task_id: &str) -> bool {
        self.flags
            .lock()
            .expect("cancellation set poisoned")
            .contains(task_id)
    }

    async fn wait(&self, task_id: &str) {
        loop {
            let notified = self.notify.notified();
            if self.contains(task_id) {
                return;
            }
            notified.await;
        }
    }
}

/// Cancellation predicate for one task, cheap to clone into handler code.
#[derive(Debug, Clone)]
pub struct CancelProbe {
    set: Arc<CancellationSet>,
    task_id: String,
}

impl CancelProbe {
    pub(crate) fn new(set: Arc<CancellationSet>, task_id: impl Into<String>) -> Self {
        Self {
            set,
            task_id: task_id.into(),
        }
    }

    /// Returns true if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.set.contains(&self.task_id)
    }

    /// Waits until cancellation is requested.
    pub async fn cancelled(&self) {
        self.set.wait(&self.task_id).await;
    }
}

/// State shared across all HTTP request handlers.
#[derive(Clone)]
pub struct ServerState {
    /// The engine all task methods are dispatched to.
    pub engine: Arc<TaskEngine>,
    /// The agent card served on the well-known endpoint.
    pub agent_card: Arc<AgentCard>,
}

impl ServerState {
    /// Creates server state from an engine and an agent card.
    pub fn new(engine: Arc<TaskEngine>, agent_card: AgentCard) -> Self {
        Self {
            engine,
            agent_card: Arc::new(agent_card),
        }
    }
}

impl std::fmt::Debug for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerState")
            .field("agent_card", &self.agent_card)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cancellation_set_flags() {
        let set = CancellationSet::new();
        assert!(!set.contains("t-1"));

        set.request("t-1");
        assert!(set.contains("t-1"));
        assert!(!set.contains("t-2"));

        assert!(set.clear("t-1"));
        assert!(!set.clear("t-1"));
        assert!(!set.contains("t-1"));
    }

    #[tokio::test]
    async fn test_probe_wakes_on_request() {
        let set = Arc::new(CancellationSet::new());
        let probe = CancelProbe::new(Arc::clone(&set), "t-1");
        assert!(!probe.is_cancelled());

        let waiter = tokio::spawn({
            let probe = probe.clone();
            async move {
                probe.cancelled().await;
            }
        });

        // Give the waiter a chance to register before flagging
        tokio::time::sleep(Duration::from_millis(10)).await;
        set.request("t-1");

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert!(probe.is_cancelled());
    }

    #[tokio::test]
    async fn test_probe_already_cancelled_returns_immediately() {
        let set = Arc::new(CancellationSet::new());
        set.request("t-1");
        let probe = CancelProbe::new(set, "t-1");

        tokio::time::timeout(Duration::from_millis(100), probe.cancelled())
            .await
            .expect("should not block");
    }
}
