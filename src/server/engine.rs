//! The task lifecycle engine.
//!
//! One engine instance drives all four task operations. `tasks/send` and
//! `tasks/sendSubscribe` share the same per-request algorithm: load or
//! create the task, hand the handler a context, then fold each yielded
//! update into the persisted snapshot; the only difference is whether the
//! merged updates are also emitted as stream events.

use std::collections::HashSet;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use futures::{stream, Stream, StreamExt};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};

use super::{merge, CancelProbe, CancellationSet, TaskContext, TaskHandler};
use crate::error::{A2AError, Result};
use crate::store::TaskStore;
use crate::types::{
    Message, Task, TaskAndHistory, TaskArtifactUpdateEvent, TaskIdParams, TaskQueryParams,
    TaskSendParams, TaskState, TaskStatusUpdate, TaskStatusUpdateEvent, TaskStreamEvent,
    TaskYieldUpdate,
};

/// A stream of events for a `tasks/sendSubscribe` response. Handler
/// failures surface as `failed` status events, never as stream errors.
pub type EventStream = Pin<Box<dyn Stream<Item = TaskStreamEvent> + Send>>;

/// Message attached to the status written by `tasks/cancel`.
const CANCEL_MESSAGE: &str = "Task cancelled by request.";

/// Drives task lifecycles: load-or-create, handler iteration, update
/// merging, persistence, streaming, and cooperative cancellation.
pub struct TaskEngine {
    store: Arc<dyn TaskStore>,
    handler: Arc<dyn TaskHandler>,
    cancellations: Arc<CancellationSet>,
    active_runs: Arc<Mutex<HashSet<String>>>,
}

impl TaskEngine {
    /// Creates an engine over a store and a handler.
    pub fn new(store: Arc<dyn TaskStore>, handler: Arc<dyn TaskHandler>) -> Self {
        Self {
            store,
            handler,
            cancellations: Arc::new(CancellationSet::new()),
            active_runs: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Returns the process-wide cancellation set.
    #[must_use]
    pub fn cancellations(&self) -> Arc<CancellationSet> {
        Arc::clone(&self.cancellations)
    }

    /// Handles `tasks/send`: runs the handler to completion and returns the
    /// final persisted task.
    pub async fn send_task(&self, params: TaskSendParams) -> Result<Task> {
        let (current, ctx, shared) = self.prepare(params).await?;
        let task = self.run(current, ctx, shared, None).await?;
        info!(task_id = %task.id, state = ?task.status.state, "task send completed");
        Ok(task)
    }

    /// Handles `tasks/sendSubscribe`: starts the handler and returns the
    /// stream of merged update events. Exactly one event in the stream has
    /// `final: true`, and it is the last one.
    pub async fn subscribe_task(&self, params: TaskSendParams) -> Result<EventStream> {
        let (current, ctx, shared) = self.prepare(params).await?;
        let task_id = current.task.id.clone();

        let (tx, rx) = mpsc::channel(16);
        let engine = self.clone();
        tokio::spawn(async move {
            if let Err(e) = engine.run(current, ctx, shared, Some(tx)).await {
                error!(task_id = %e.task_id.as_deref().unwrap_or("?"), error = %e, "task run failed");
            }
        });

        debug!(task_id = %task_id, "started task subscription");
        Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })))
    }

    /// Handles `tasks/get`. History is persisted separately and never
    /// included in the response; `historyLength` is advisory and ignored.
    pub async fn get_task(&self, params: TaskQueryParams) -> Result<Task> {
        let entry = self
            .store
            .load(&params.id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(&params.id))?;
        Ok(entry.task)
    }

    /// Handles `tasks/cancel`.
    ///
    /// Cancelling a terminal task is a no-op success returning the current
    /// state. Otherwise the task id is flagged in the cancellation set, the
    /// `canceled` status is written, and the flag is left in place for any
    /// active run to observe; the run's cleanup clears it. With no active
    /// run there is nothing to observe the flag, so it is cleared here.
    pub async fn cancel_task(&self, params: TaskIdParams) -> Result<Task> {
        let current = self
            .store
            .load(&params.id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(&params.id))?;

        if current.task.is_terminal() {
            info!(task_id = %params.id, state = ?current.task.status.state,
                "cancel requested for terminal task, returning unchanged");
            return Ok(current.task);
        }

        self.cancellations.request(&params.id);

        let update = TaskStatusUpdate::with_message(
            TaskState::Canceled,
            Message::agent_text(CANCEL_MESSAGE),
        );
        let next = merge::apply_status_update(&current, &update);
        let save_result = self
            .store
            .save(&next)
            .await
            .map_err(|e| e.for_task(&params.id));

        if !self.run_is_active(&params.id) {
            self.cancellations.clear(&params.id);
        }
        save_result?;

        info!(task_id = %params.id, "task canceled");
        Ok(next.task)
    }

    /// Validates params and loads or creates the task-and-history pair.
    async fn prepare(
        &self,
        params: TaskSendParams,
    ) -> Result<(TaskAndHistory, TaskContext, Arc<RwLock<Task>>)> {
        if params.id.is_empty() {
            return Err(A2AError::invalid_params("task id must be a non-empty string"));
        }

        let current = self.load_or_create(&params).await?;
        let shared = Arc::new(RwLock::new(current.task.clone()));
        let probe = CancelProbe::new(Arc::clone(&self.cancellations), &params.id);
        let ctx = TaskContext::new(
            Arc::clone(&shared),
            params.message,
            current.history.clone(),
            probe,
        );
        Ok((current, ctx, shared))
    }

    async fn load_or_create(&self, params: &TaskSendParams) -> Result<TaskAndHistory> {
        let entry = match self.store.load(&params.id).await? {
            None => {
                debug!(task_id = %params.id, "creating new task");
                let mut task = Task::new(&params.id);
                task.session_id = params.session_id.clone();
                task.metadata = params.metadata.clone();
                TaskAndHistory::new(task, vec![params.message.clone()])
            }
            Some(mut current) => {
                current.history.push(params.message.clone());
                let state = current.task.status.state;
                if state.is_terminal() {
                    info!(task_id = %params.id, from = ?state,
                        "reopening terminal task for new message");
                    current = merge::apply_status_reset(&current, TaskState::Submitted);
                } else if state == TaskState::InputRequired {
                    debug!(task_id = %params.id, "input received, resuming task");
                    current = merge::apply_status_update(
                        &current,
                        &TaskStatusUpdate::new(TaskState::Working),
                    );
                }
                current
            }
        };

        self.store
            .save(&entry)
            .await
            .map_err(|e| e.for_task(&params.id))?;
        Ok(entry)
    }

    /// Iterates the handler, persisting each merged update. With an emitter
    /// attached, also sends one stream event per update and guarantees a
    /// single trailing `final: true` event.
    async fn run(
        &self,
        mut current: TaskAndHistory,
        ctx: TaskContext,
        shared: Arc<RwLock<Task>>,
        mut emit: Option<mpsc::Sender<TaskStreamEvent>>,
    ) -> Result<Task> {
        let task_id = current.task.id.clone();
        let _guard = RunGuard::register(self, &task_id);

        let mut updates = self.handler.handle(ctx);
        let mut sent_final = false;

        while let Some(item) = updates.next().await {
            let update = match item {
                Ok(update) => update,
                Err(e) => {
                    return self
                        .fail_task(current, &shared, emit.as_ref(), e)
                        .await;
                }
            };

            let closes_stream = matches!(
                &update,
                TaskYieldUpdate::Status(s) if s.state.ends_stream()
            );
            let terminal = matches!(
                &update,
                TaskYieldUpdate::Status(s) if s.state.is_terminal()
            );

            current = merge::apply_update(&current, &update);
            if let Err(e) = self.store.save(&current).await {
                let e = e.for_task(&task_id);
                if emit.is_some() {
                    // Headers are already out; end the stream without
                    // another event.
                    error!(task_id = %task_id, error = %e, "persist failed mid-stream");
                    return Ok(current.task);
                }
                return Err(e);
            }
            *shared.write().await = current.task.clone();

            let mut subscriber_gone = false;
            if let Some(tx) = &emit {
                let event = stream_event(&task_id, &update, &current, closes_stream);
                if tx.send(event).await.is_err() {
                    debug!(task_id = %task_id, "subscriber gone, run continues unobserved");
                    subscriber_gone = true;
                } else if closes_stream {
                    sent_final = true;
                }
            }
            if subscriber_gone {
                emit = None;
            }

            // No further updates from this run are merged past a terminal
            // status; input-required only closes the stream.
            if terminal || (closes_stream && emit.is_some()) {
                break;
            }
        }

        if let Some(tx) = &emit {
            if !sent_final {
                if !current.task.status.state.ends_stream() {
                    current = merge::apply_status_update(
                        &current,
                        &TaskStatusUpdate::new(TaskState::Completed),
                    );
                    if let Err(e) = self.store.save(&current).await {
                        error!(task_id = %task_id, error = %e, "persist failed on completion");
                        return Ok(current.task);
                    }
                    *shared.write().await = current.task.clone();
                }
                let _ = tx
                    .send(TaskStreamEvent::Status(TaskStatusUpdateEvent {
                        id: task_id.clone(),
                        status: current.task.status.clone(),
                        is_final: true,
                    }))
                    .await;
            }
        }

        Ok(current.task)
    }

    /// Converts a handler failure into a persisted `failed` status. Unary
    /// callers get the error back for a JSON-RPC InternalError response;
    /// streaming callers get a final `failed` event instead.
    async fn fail_task(
        &self,
        current: TaskAndHistory,
        shared: &Arc<RwLock<Task>>,
        emit: Option<&mpsc::Sender<TaskStreamEvent>>,
        cause: A2AError,
    ) -> Result<Task> {
        let task_id = current.task.id.clone();
        warn!(task_id = %task_id, error = %cause, "handler failed, marking task failed");

        let failure = TaskStatusUpdate::with_message(
            TaskState::Failed,
            Message::agent_text(format!("Handler failed: {}", cause.message)),
        );
        let next = merge::apply_status_update(&current, &failure);
        if let Err(e) = self.store.save(&next).await {
            error!(task_id = %task_id, error = %e, "failed to persist failure status");
        }
        *shared.write().await = next.task.clone();

        if let Some(tx) = emit {
            let _ = tx
                .send(TaskStreamEvent::Status(TaskStatusUpdateEvent {
                    id: task_id,
                    status: next.task.status.clone(),
                    is_final: true,
                }))
                .await;
            return Ok(next.task);
        }

        Err(A2AError::internal_error(cause.message).for_task(task_id))
    }

    fn run_is_active(&self, task_id: &str) -> bool {
        self.active_runs
            .lock()
            .expect("active run set poisoned")
            .contains(task_id)
    }
}

impl Clone for TaskEngine {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            handler: Arc::clone(&self.handler),
            cancellations: Arc::clone(&self.cancellations),
            active_runs: Arc::clone(&self.active_runs),
        }
    }
}

impl std::fmt::Debug for TaskEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskEngine").finish_non_exhaustive()
    }
}

/// Builds the stream event for one merged update. Status events are final
/// when the new state is terminal or `input-required`; artifact events never
/// are.
fn stream_event(
    task_id: &str,
    update: &TaskYieldUpdate,
    merged: &TaskAndHistory,
    closes_stream: bool,
) -> TaskStreamEvent {
    match update {
        TaskYieldUpdate::Status(_) => TaskStreamEvent::Status(TaskStatusUpdateEvent {
            id: task_id.to_string(),
            status: merged.task.status.clone(),
            is_final: closes_stream,
        }),
        TaskYieldUpdate::Artifact(artifact) => TaskStreamEvent::Artifact(TaskArtifactUpdateEvent {
            id: task_id.to_string(),
            artifact: artifact.clone(),
            is_final: false,
        }),
    }
}

/// Marks a task id as having an active run for the guard's lifetime. On
/// drop the id is deregistered and any pending cancellation flag cleared:
/// the engine has observed termination at that point.
struct RunGuard {
    active_runs: Arc<Mutex<HashSet<String>>>,
    cancellations: Arc<CancellationSet>,
    task_id: String,
}

impl RunGuard {
    fn register(engine: &TaskEngine, task_id: &str) -> Self {
        engine
            .active_runs
            .lock()
            .expect("active run set poisoned")
            .insert(task_id.to_string());
        Self {
            active_runs: Arc::clone(&engine.active_runs),
            cancellations: Arc::clone(&engine.cancellations),
            task_id: task_id.to_string(),
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.active_runs
            .lock()
            .expect("active run set poisoned")
            .remove(&self.task_id);
        self.cancellations.clear(&self.task_id);
    }
}
