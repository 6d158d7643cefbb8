//! On-disk task store.
//!
//! Each task is persisted as two JSON files in the base directory:
//! `<id>.json` for the task and `<id>.history.json` for the history, the
//! latter wrapped as `{"messageHistory": [...]}`. The pair is not
//! crash-atomic; after a crash a load may observe a task from one save and
//! history from another, which callers tolerate.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::TaskStore;
use crate::error::{A2AError, Result};
use crate::types::{Message, Task, TaskAndHistory};

/// Default base directory, relative to the working directory.
pub const DEFAULT_BASE_DIR: &str = ".a2a-tasks";

/// On-disk JSON layout of the history file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryFile {
    message_history: Vec<Message>,
}

/// File-backed implementation of [`TaskStore`].
///
/// Saves for the same task id are serialized through a per-id async mutex;
/// unrelated tasks write concurrently.
#[derive(Debug)]
pub struct FileTaskStore {
    base_dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileTaskStore {
    /// Creates a store rooted at the default hidden directory under the
    /// working directory.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_dir(DEFAULT_BASE_DIR)
    }

    /// Creates a store rooted at the given directory.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Validates a task id for use as a file name stem.
    ///
    /// Ids carrying path separators or parent references are rejected
    /// outright rather than sanitized, so a hostile id can never address a
    /// file outside the base directory.
    fn safe_id<'a>(&self, task_id: &'a str) -> Result<&'a str> {
        if task_id.is_empty() {
            return Err(A2AError::invalid_params("task id must not be empty"));
        }
        if task_id.contains('/') || task_id.contains('\\') || task_id.contains("..") {
            return Err(A2AError::invalid_params(format!(
                "task id '{}' contains path traversal sequences",
                task_id
            ))
            .for_task(task_id));
        }
        Ok(task_id)
    }

    fn task_path(&self, safe_id: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", safe_id))
    }

    fn history_path(&self, safe_id: &str) -> PathBuf {
        self.base_dir.join(format!("{}.history.json", safe_id))
    }

    fn save_lock(&self, task_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock map poisoned");
        Arc::clone(locks.entry(task_id.to_string()).or_default())
    }

    /// Reads the history file, degrading to an empty history when the file
    /// is absent or unreadable.
    async fn read_history(&self, safe_id: &str) -> Vec<Message> {
        let path = self.history_path(safe_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(task_id = %safe_id, "history file missing, starting with empty history");
                return Vec::new();
            }
            Err(e) => {
                warn!(task_id = %safe_id, error = %e, "failed to read history file");
                return Vec::new();
            }
        };

        match serde_json::from_slice::<HistoryFile>(&bytes) {
            Ok(file) => file.message_history,
            Err(e) => {
                warn!(task_id = %safe_id, error = %e, "malformed history file, ignoring");
                Vec::new()
            }
        }
    }
}

impl Default for FileTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    async fn load(&self, task_id: &str) -> Result<Option<TaskAndHistory>> {
        let safe_id = self.safe_id(task_id)?;

        let bytes = match tokio::fs::read(self.task_path(safe_id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(A2AError::internal_error(format!(
                    "failed to read task file: {}",
                    e
                ))
                .for_task(task_id))
            }
        };

        let task: Task = serde_json::from_slice(&bytes).map_err(|e| {
            A2AError::internal_error(format!("malformed task file: {}", e)).for_task(task_id)
        })?;
        let history = self.read_history(safe_id).await;

        Ok(Some(TaskAndHistory::new(task, history)))
    }

    async fn save(&self, entry: &TaskAndHistory) -> Result<()> {
        let safe_id = self.safe_id(&entry.task.id)?.to_string();

        let lock = self.save_lock(&safe_id);
        let _guard = lock.lock().await;

        tokio::fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| {
                A2AError::internal_error(format!("failed to create store directory: {}", e))
                    .for_task(&entry.task.id)
            })?;

        let task_json = serde_json::to_vec_pretty(&entry.task)?;
        let history_json = serde_json::to_vec_pretty(&HistoryFile {
            message_history: entry.history.clone(),
        })?;

        // Both writes may proceed in parallel; the pair is not crash-atomic.
        let (task_res, history_res) = tokio::join!(
            tokio::fs::write(self.task_path(&safe_id), task_json),
            tokio::fs::write(self.history_path(&safe_id), history_json),
        );
        task_res.map_err(|e| {
            A2AError::internal_error(format!("failed to write task file: {}", e))
                .for_task(&entry.task.id)
        })?;
        history_res.map_err(|e| {
            A2AError::internal_error(format!("failed to write history file: {}", e))
                .for_task(&entry.task.id)
        })?;

        Ok(())
    }
}
