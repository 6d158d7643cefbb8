//! Task types for the task protocol.
//!
//! Tasks are the stateful unit of work clients submit and agents drive to a
//! terminal state. A task's status carries a timestamp that is refreshed on
//! every applied update; its message history is persisted alongside the task
//! as a [`TaskAndHistory`] pair.

use std::collections::HashMap;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::{Message, Part};

/// Returns the current time as an ISO-8601 UTC string with millisecond
/// precision, the format used for all status timestamps.
#[must_use]
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Defines the lifecycle states of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Task has been submitted but not yet started.
    #[default]
    Submitted,
    /// Task is currently being processed.
    Working,
    /// Task is paused waiting for input from the user.
    InputRequired,
    /// Task has completed successfully.
    Completed,
    /// Task was canceled by the user.
    Canceled,
    /// Task failed due to an error.
    Failed,
    /// Task state is unknown.
    Unknown,
}

impl TaskState {
    /// Returns true if this state indicates the task has terminated.
    /// `input-required` is not terminal: it closes a stream but the task can
    /// be resumed by a subsequent client message.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled | Self::Failed)
    }

    /// Returns true if this state indicates the task is still active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Submitted | Self::Working | Self::InputRequired)
    }

    /// Returns true if a status with this state closes an update stream:
    /// terminal states plus `input-required`.
    #[must_use]
    pub const fn ends_stream(&self) -> bool {
        self.is_terminal() || matches!(self, Self::InputRequired)
    }
}

/// Represents the status of a task at a specific point in time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatus {
    /// The current state of the task's lifecycle.
    pub state: TaskState,
    /// An optional trailing agent message for the current status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// ISO-8601 UTC timestamp of when this status was recorded.
    pub timestamp: String,
}

impl TaskStatus {
    /// Creates a new task status with the given state, stamped now.
    #[must_use]
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            message: None,
            timestamp: current_timestamp(),
        }
    }

    /// Creates a new task status with a message, stamped now.
    #[must_use]
    pub fn with_message(state: TaskState, message: Message) -> Self {
        Self {
            state,
            message: Some(message),
            timestamp: current_timestamp(),
        }
    }

    /// Creates a submitted status.
    #[must_use]
    pub fn submitted() -> Self {
        Self::new(TaskState::Submitted)
    }

    /// Creates a working status.
    #[must_use]
    pub fn working() -> Self {
        Self::new(TaskState::Working)
    }

    /// Creates a completed status.
    #[must_use]
    pub fn completed() -> Self {
        Self::new(TaskState::Completed)
    }

    /// Creates a failed status carrying the error text as an agent message.
    pub fn failed(error: impl Into<String>) -> Self {
        Self::with_message(TaskState::Failed, Message::agent_text(error))
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::submitted()
    }
}

/// Represents a single, stateful operation between a client and an agent.
///
/// The message history is deliberately not part of this struct: it is
/// persisted next to the task as a [`TaskAndHistory`] pair and never included
/// in `tasks/get` responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// The caller-chosen identifier for the task.
    pub id: String,
    /// An optional session the task belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// The current status of the task.
    pub status: TaskStatus,
    /// Artifacts generated during the task, in merge order.
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    /// Optional metadata for extensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl Task {
    /// Creates a new task in the `submitted` state.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            session_id: None,
            status: TaskStatus::submitted(),
            artifacts: Vec::new(),
            metadata: None,
        }
    }

    /// Sets the session id for this task.
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Sets the metadata for this task.
    #[must_use]
    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Returns the current state of the task.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.status.state
    }

    /// Returns true if the task is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.state.is_terminal()
    }

    /// Finds an artifact by name.
    #[must_use]
    pub fn artifact_by_name(&self, name: &str) -> Option<&Artifact> {
        self.artifacts
            .iter()
            .find(|a| a.name.as_deref() == Some(name))
    }
}

/// Represents a piece of structured output attached to a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// An optional name for the artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// An optional description of the artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// An array of content parts that make up the artifact.
    pub parts: Vec<Part>,
    /// Position used when merging this artifact into the task's list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    /// If true, this update's parts extend the artifact at `index`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append: Option<bool>,
    /// If true, this is the final chunk of the artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_chunk: Option<bool>,
    /// Optional metadata for extensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl Artifact {
    /// Creates a new artifact from parts.
    #[must_use]
    pub fn new(parts: Vec<Part>) -> Self {
        Self {
            name: None,
            description: None,
            parts,
            index: None,
            append: None,
            last_chunk: None,
            metadata: None,
        }
    }

    /// Creates a named single-text artifact.
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(vec![Part::text(text)]).with_name(name)
    }

    /// Sets the name for this artifact.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the description for this artifact.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the merge index for this artifact.
    #[must_use]
    pub fn with_index(mut self, index: i64) -> Self {
        self.index = Some(index);
        self
    }

    /// Marks this artifact update as appending to an existing slot.
    #[must_use]
    pub fn appending(mut self) -> Self {
        self.append = Some(true);
        self
    }

    /// Marks this artifact update as the last chunk.
    #[must_use]
    pub fn final_chunk(mut self) -> Self {
        self.last_chunk = Some(true);
        self
    }
}

/// The atomic unit of persistence: a task and its message history, loaded
/// and saved together.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskAndHistory {
    /// The task snapshot.
    pub task: Task,
    /// Messages in the order they entered the task.
    pub history: Vec<Message>,
}

impl TaskAndHistory {
    /// Creates a pair from a task and its history.
    #[must_use]
    pub fn new(task: Task, history: Vec<Message>) -> Self {
        Self { task, history }
    }
}

/// A status transition yielded by a handler.
///
/// `message: None` leaves the previous status message in place; the engine
/// clears the message explicitly on terminal-state resets.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskStatusUpdate {
    /// The state to transition to.
    pub state: TaskState,
    /// An optional message accompanying the transition.
    pub message: Option<Message>,
}

impl TaskStatusUpdate {
    /// Creates a bare state transition.
    #[must_use]
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            message: None,
        }
    }

    /// Creates a state transition with a message.
    #[must_use]
    pub fn with_message(state: TaskState, message: Message) -> Self {
        Self {
            state,
            message: Some(message),
        }
    }
}

/// One element yielded by a task handler: either a status transition or an
/// artifact chunk. The distinction is structural: artifact updates are the
/// ones carrying parts.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskYieldUpdate {
    /// A status transition, possibly carrying an agent message.
    Status(TaskStatusUpdate),
    /// An artifact to merge into the task's artifact list.
    Artifact(Artifact),
}

impl From<TaskStatusUpdate> for TaskYieldUpdate {
    fn from(update: TaskStatusUpdate) -> Self {
        Self::Status(update)
    }
}

impl From<Artifact> for TaskYieldUpdate {
    fn from(artifact: Artifact) -> Self {
        Self::Artifact(artifact)
    }
}

/// An event streamed to a subscriber when a task's status changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatusUpdateEvent {
    /// The id of the task that was updated.
    pub id: String,
    /// The new status of the task.
    pub status: TaskStatus,
    /// If true, this is the final event in the stream.
    #[serde(rename = "final")]
    pub is_final: bool,
}

/// An event streamed to a subscriber when an artifact is merged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskArtifactUpdateEvent {
    /// The id of the task the artifact belongs to.
    pub id: String,
    /// The merged artifact update.
    pub artifact: Artifact,
    /// Artifact events never close the stream on their own.
    #[serde(rename = "final")]
    pub is_final: bool,
}

/// One frame of a `tasks/sendSubscribe` stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TaskStreamEvent {
    /// A status transition.
    Status(TaskStatusUpdateEvent),
    /// An artifact update.
    Artifact(TaskArtifactUpdateEvent),
}

impl TaskStreamEvent {
    /// Returns true if this event closes the stream.
    #[must_use]
    pub fn is_final(&self) -> bool {
        match self {
            Self::Status(e) => e.is_final,
            Self::Artifact(e) => e.is_final,
        }
    }
}
