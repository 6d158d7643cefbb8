//! Pure update-application logic.
//!
//! [`apply_update`] folds one handler yield into a `(task, history)`
//! snapshot and returns the next snapshot. Inputs are never mutated, so the
//! same update applied to equal snapshots always produces equal results
//! (modulo the refreshed status timestamp).

use crate::types::{
    Artifact, Role, TaskAndHistory, TaskState, TaskStatus, TaskStatusUpdate, TaskYieldUpdate,
};

/// Applies one yielded update to a snapshot, returning the new snapshot.
#[must_use]
pub fn apply_update(current: &TaskAndHistory, update: &TaskYieldUpdate) -> TaskAndHistory {
    match update {
        TaskYieldUpdate::Status(status) => apply_status_update(current, status),
        TaskYieldUpdate::Artifact(artifact) => apply_artifact_update(current, artifact),
    }
}

/// Applies a status transition.
///
/// The new status keeps the previous message unless the update carries one;
/// the timestamp is always refreshed. An `agent`-role update message is
/// appended to the history.
#[must_use]
pub fn apply_status_update(current: &TaskAndHistory, update: &TaskStatusUpdate) -> TaskAndHistory {
    let mut task = current.task.clone();
    let mut history = current.history.clone();

    let message = update
        .message
        .clone()
        .or_else(|| task.status.message.clone());

    if let Some(ref msg) = update.message {
        if msg.role == Role::Agent {
            history.push(msg.clone());
        }
    }

    task.status = TaskStatus {
        state: update.state,
        message,
        timestamp: crate::types::current_timestamp(),
    };

    TaskAndHistory::new(task, history)
}

/// Applies a reset transition, discarding any previous status message.
/// History is preserved untouched.
#[must_use]
pub fn apply_status_reset(current: &TaskAndHistory, state: TaskState) -> TaskAndHistory {
    let mut task = current.task.clone();
    task.status = TaskStatus::new(state);
    TaskAndHistory::new(task, current.history.clone())
}

/// Applies an artifact update.
///
/// Merge positioning, in order:
/// 1. an in-bounds `index` replaces that slot, or extends it when `append`
///    is set;
/// 2. a matching `name` replaces the named artifact;
/// 3. otherwise the update is appended, and the list is re-sorted ascending
///    by index when any artifact is indexed (unindexed artifacts sort as 0,
///    ties keep insertion order).
#[must_use]
pub fn apply_artifact_update(current: &TaskAndHistory, update: &Artifact) -> TaskAndHistory {
    let mut task = current.task.clone();
    let update = update.clone();

    let slot = update
        .index
        .and_then(|i| usize::try_from(i).ok())
        .filter(|&i| i < task.artifacts.len());

    if let Some(idx) = slot {
        if update.append.unwrap_or(false) {
            let existing = &mut task.artifacts[idx];
            existing.parts.extend(update.parts);
            if let Some(meta) = update.metadata {
                existing
                    .metadata
                    .get_or_insert_with(Default::default)
                    .extend(meta);
            }
            if update.last_chunk.is_some() {
                existing.last_chunk = update.last_chunk;
            }
            if update.description.is_some() {
                existing.description = update.description;
            }
        } else {
            task.artifacts[idx] = update;
        }
    } else if let Some(pos) = update
        .name
        .as_deref()
        .and_then(|name| position_by_name(&task.artifacts, name))
    {
        task.artifacts[pos] = update;
    } else {
        task.artifacts.push(update);
        if task.artifacts.iter().any(|a| a.index.is_some()) {
            task.artifacts.sort_by_key(|a| a.index.unwrap_or(0));
        }
    }

    TaskAndHistory::new(task, current.history.clone())
}

fn position_by_name(artifacts: &[Artifact], name: &str) -> Option<usize> {
    artifacts
        .iter()
        .position(|a| a.name.as_deref() == Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, Task};

    fn snapshot(id: &str) -> TaskAndHistory {
        TaskAndHistory::new(Task::new(id), vec![Message::user_text("hi")])
    }

    #[test]
    fn test_status_update_refreshes_timestamp() {
        let current = snapshot("t-1");
        let before = current.task.status.timestamp.clone();

        let next = apply_status_update(&current, &TaskStatusUpdate::new(TaskState::Working));
        assert_eq!(next.task.status.state, TaskState::Working);
        assert!(next.task.status.timestamp >= before);
        // input untouched
        assert_eq!(current.task.status.state, TaskState::Submitted);
    }

    #[test]
    fn test_agent_status_message_appends_history() {
        let current = snapshot("t-1");
        let update =
            TaskStatusUpdate::with_message(TaskState::Working, Message::agent_text("working"));

        let next = apply_status_update(&current, &update);
        assert_eq!(next.history.len(), 2);
        assert!(next.history[1].is_agent());
        // old history is a prefix of the new one
        assert_eq!(&next.history[..1], &current.history[..]);
    }

    #[test]
    fn test_user_status_message_not_appended() {
        let current = snapshot("t-1");
        let update =
            TaskStatusUpdate::with_message(TaskState::InputRequired, Message::user_text("more?"));

        let next = apply_status_update(&current, &update);
        assert_eq!(next.history.len(), 1);
        assert!(next.task.status.message.is_some());
    }

    #[test]
    fn test_message_kept_when_update_has_none() {
        let current = snapshot("t-1");
        let with_msg = apply_status_update(
            &current,
            &TaskStatusUpdate::with_message(TaskState::Working, Message::agent_text("step 1")),
        );
        let bare = apply_status_update(&with_msg, &TaskStatusUpdate::new(TaskState::Working));
        assert_eq!(
            bare.task.status.message.unwrap().text_content().unwrap(),
            "step 1"
        );
    }

    #[test]
    fn test_reset_clears_message_keeps_history() {
        let current = snapshot("t-1");
        let failed = apply_status_update(
            &current,
            &TaskStatusUpdate::with_message(TaskState::Failed, Message::agent_text("boom")),
        );

        let reset = apply_status_reset(&failed, TaskState::Submitted);
        assert_eq!(reset.task.status.state, TaskState::Submitted);
        assert!(reset.task.status.message.is_none());
        assert_eq!(reset.history, failed.history);
    }

    #[test]
    fn test_artifact_appended_when_new() {
        let current = snapshot("t-1");
        let artifact = Artifact::text("out.txt", "A").with_index(0);

        let next = apply_artifact_update(&current, &artifact);
        assert_eq!(next.task.artifacts.len(), 1);
        assert_eq!(next.task.artifacts[0].name.as_deref(), Some("out.txt"));
        assert!(current.task.artifacts.is_empty());
    }

    #[test]
    fn test_artifact_append_extends_parts() {
        let current = snapshot("t-2");
        let first = apply_artifact_update(&current, &Artifact::text("out.txt", "A").with_index(0));
        let second = apply_artifact_update(
            &first,
            &Artifact::text("out.txt", "B")
                .with_index(0)
                .appending()
                .final_chunk(),
        );

        let merged = &second.task.artifacts[0];
        assert_eq!(merged.parts.len(), 2);
        assert_eq!(merged.parts[0].as_text(), Some("A"));
        assert_eq!(merged.parts[1].as_text(), Some("B"));
        assert_eq!(merged.last_chunk, Some(true));
        assert_eq!(merged.name.as_deref(), Some("out.txt"));
    }

    #[test]
    fn test_artifact_append_adopts_description_and_metadata() {
        let current = snapshot("t-2");
        let first = apply_artifact_update(
            &current,
            &Artifact::text("out.txt", "A")
                .with_index(0)
                .with_description("draft"),
        );

        let mut update = Artifact::text("out.txt", "B")
            .with_index(0)
            .appending()
            .with_description("final");
        update.metadata = Some(
            [("k".to_string(), serde_json::json!(1))]
                .into_iter()
                .collect(),
        );

        let next = apply_artifact_update(&first, &update);
        let merged = &next.task.artifacts[0];
        assert_eq!(merged.description.as_deref(), Some("final"));
        assert_eq!(merged.metadata.as_ref().unwrap()["k"], serde_json::json!(1));
    }

    #[test]
    fn test_artifact_in_bounds_replace_without_append() {
        let current = snapshot("t-3");
        let first = apply_artifact_update(&current, &Artifact::text("a", "old").with_index(0));
        let next = apply_artifact_update(&first, &Artifact::text("a", "new").with_index(0));

        assert_eq!(next.task.artifacts.len(), 1);
        assert_eq!(next.task.artifacts[0].parts[0].as_text(), Some("new"));
    }

    #[test]
    fn test_artifact_name_match_replaces() {
        let current = snapshot("t-4");
        let first = apply_artifact_update(&current, &Artifact::text("report", "v1"));
        // no index, falls through to the name match
        let next = apply_artifact_update(&first, &Artifact::text("report", "v2"));

        assert_eq!(next.task.artifacts.len(), 1);
        assert_eq!(next.task.artifacts[0].parts[0].as_text(), Some("v2"));
    }

    #[test]
    fn test_artifacts_sorted_by_index() {
        let current = snapshot("t-5");
        let a = apply_artifact_update(&current, &Artifact::text("two", "2").with_index(2));
        let b = apply_artifact_update(&a, &Artifact::text("one", "1").with_index(1));
        let c = apply_artifact_update(&b, &Artifact::text("zero", "0"));

        let names: Vec<_> = c
            .task
            .artifacts
            .iter()
            .map(|a| a.name.as_deref().unwrap())
            .collect();
        // unindexed sorts as 0
        assert_eq!(names, vec!["zero", "one", "two"]);
    }

    #[test]
    fn test_out_of_bounds_index_appends() {
        let current = snapshot("t-6");
        let next = apply_artifact_update(&current, &Artifact::text("later", "x").with_index(5));
        assert_eq!(next.task.artifacts.len(), 1);
        assert_eq!(next.task.artifacts[0].index, Some(5));
    }

    #[test]
    fn test_merger_is_pure() {
        let current = snapshot("t-7");
        let update = TaskYieldUpdate::Artifact(Artifact::text("a", "x").with_index(0));

        let first = apply_update(&current, &update);
        let second = apply_update(&current, &update);
        assert_eq!(first.task.artifacts, second.task.artifacts);
        assert_eq!(first.history, second.history);
    }
}
