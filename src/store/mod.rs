//! Task persistence.
//!
//! Defines the [`TaskStore`] capability plus the in-memory and on-disk
//! implementations. Stores operate on [`TaskAndHistory`] pairs: the task
//! and its message history are always loaded and saved together.

mod disk;
mod memory;

pub use disk::FileTaskStore;
pub use memory::InMemoryTaskStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::TaskAndHistory;

/// Capability for persisting and retrieving task snapshots.
///
/// Implementations must hand back owned copies so callers can never mutate
/// stored state in place, and must serialize `save` calls for the same task
/// id so concurrent writers cannot interleave mid-write.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Retrieves a task and its history by id. Returns `None` if unknown.
    async fn load(&self, task_id: &str) -> Result<Option<TaskAndHistory>>;

    /// Saves or overwrites a task and its history.
    async fn save(&self, entry: &TaskAndHistory) -> Result<()>;
}
