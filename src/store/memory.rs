//! In-memory task store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::TaskStore;
use crate::error::Result;
use crate::types::TaskAndHistory;

/// In-memory implementation of [`TaskStore`].
///
/// Backed by a map behind an async `RwLock`; the write lock serializes all
/// saves, and both operations clone at the boundary so callers never alias
/// stored state. Suitable for development, testing, and single-process
/// deployments that can afford to lose tasks on restart.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<HashMap<String, TaskAndHistory>>>,
}

impl InMemoryTaskStore {
    /// Creates a new empty in-memory task store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored tasks.
    pub async fn task_count(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Clears all tasks. Primarily for tests.
    pub async fn clear(&self) {
        self.tasks.write().await.clear();
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn load(&self, task_id: &str) -> Result<Option<TaskAndHistory>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.get(task_id).cloned())
    }

    async fn save(&self, entry: &TaskAndHistory) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        tasks.insert(entry.task.id.clone(), entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, Task};

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let store = InMemoryTaskStore::new();
        assert!(store.load("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let store = InMemoryTaskStore::new();
        let entry = TaskAndHistory::new(
            Task::new("t-1").with_session_id("s-1"),
            vec![Message::user_text("hi"), Message::agent_text("hello")],
        );

        store.save(&entry).await.unwrap();
        let loaded = store.load("t-1").await.unwrap().unwrap();
        assert_eq!(loaded, entry);
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = InMemoryTaskStore::new();
        let mut entry = TaskAndHistory::new(Task::new("t-1"), vec![]);
        store.save(&entry).await.unwrap();

        entry.history.push(Message::user_text("second"));
        store.save(&entry).await.unwrap();

        let loaded = store.load("t-1").await.unwrap().unwrap();
        assert_eq!(loaded.history.len(), 1);
        assert_eq!(store.task_count().await, 1);
    }

    #[tokio::test]
    async fn test_load_returns_copy() {
        let store = InMemoryTaskStore::new();
        let entry = TaskAndHistory::new(Task::new("t-1"), vec![Message::user_text("hi")]);
        store.save(&entry).await.unwrap();

        let mut loaded = store.load("t-1").await.unwrap().unwrap();
        loaded.history.clear();

        // Mutating the copy must not touch stored state
        let again = store.load("t-1").await.unwrap().unwrap();
        assert_eq!(again.history.len(), 1);
    }
}
