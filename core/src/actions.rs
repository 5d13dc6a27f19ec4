//! User actions on the task list.
//!
//! Every action mutates the [`TaskStore`] first and then issues the
//! matching remote write. Only `add` reports a remote failure to the
//! caller; the others log it and leave the optimistic state in place
//! until the next snapshot replaces it.

use chrono::{NaiveDate, Utc};

use crate::models::{start_of_day, NewTaskDocument, RepeatType, Task, TaskKey, TaskPriority, TaskUpdate};
use crate::reorder::plan_reorder;
use crate::storage::RemoteStore;
use crate::task_store::TaskStore;
use crate::{Error, Result};

/// Input of the add form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub text: String,
    pub priority: TaskPriority,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Memo saved with the task; blank means none
    pub notes: Option<String>,
}

impl TaskDraft {
    pub fn new(text: impl Into<String>, priority: TaskPriority) -> Self {
        Self { text: text.into(), priority, ..Self::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Stored remotely under the returned key
    Added(TaskKey),
    /// Blank text; nothing was changed
    Rejected,
}

pub struct TaskActions<'a> {
    store: &'a mut TaskStore,
    remote: &'a dyn RemoteStore,
    owner: Option<&'a str>,
}

impl<'a> TaskActions<'a> {
    pub fn new(store: &'a mut TaskStore, remote: &'a dyn RemoteStore, owner: Option<&'a str>) -> Self {
        Self { store, remote, owner }
    }

    /// Create a task at the end of its priority group.
    ///
    /// The task shows up locally right away and is withdrawn again if the
    /// remote store refuses it.
    pub fn add(&mut self, draft: &TaskDraft) -> Result<AddOutcome> {
        let text = draft.text.trim();
        if text.is_empty() {
            return Ok(AddOutcome::Rejected);
        }
        let owner = self.owner.ok_or(Error::NotLoggedIn)?;

        let start = draft.start.map(start_of_day).unwrap_or_else(Utc::now);
        let end = draft.end.map(start_of_day).unwrap_or(start);
        let is_range = draft.end.map(|e| e != start.date_naive()).unwrap_or(false);

        let mut task = Task::new_local(owner.to_string(), text.to_string(), draft.priority);
        while self.store.get(&TaskKey::Local(task.local_id)).is_some() {
            task.local_id += 1;
        }
        task.order = self.store.count_in_group(draft.priority) as i64;
        task.start_date = Some(start);
        task.end_date = Some(end);
        task.repeat_type = if is_range { RepeatType::Range } else { RepeatType::None };
        task.notes = draft.notes.clone().filter(|n| !n.trim().is_empty());

        let local_id = task.local_id;
        let doc = NewTaskDocument::from_task(&task);
        self.store.insert(task);

        match self.remote.create(&doc) {
            Ok(remote_id) => {
                self.store.confirm(local_id, remote_id.clone());
                tracing::debug!(remote_id = %remote_id, "task added");
                Ok(AddOutcome::Added(TaskKey::Remote(remote_id)))
            }
            Err(e) => {
                self.store.discard_local(local_id);
                tracing::warn!(error = %e, "failed to add task");
                Err(e)
            }
        }
    }

    /// Flip the completion flag. Returns the new value, or `None` if the
    /// task is unknown or not stored yet.
    pub fn toggle_complete(&mut self, key: &TaskKey) -> Option<bool> {
        let remote_id = self.stored_id(key)?;
        let is_complete = !self.store.get_remote(&remote_id)?.is_complete;
        self.write(&remote_id, TaskUpdate::completion(is_complete));
        Some(is_complete)
    }

    /// Change text and priority, keeping the saved notes.
    /// Blank text is ignored.
    pub fn edit(&mut self, key: &TaskKey, text: &str, priority: TaskPriority) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        let Some(remote_id) = self.stored_id(key) else {
            return false;
        };
        let notes = match self.store.get_remote(&remote_id) {
            Some(task) => task.notes_text().to_string(),
            None => return false,
        };
        self.write(&remote_id, TaskUpdate::content(text.to_string(), priority, notes));
        true
    }

    pub fn delete(&mut self, key: &TaskKey) -> bool {
        let Some(remote_id) = self.stored_id(key) else {
            return false;
        };
        if self.store.remove(&remote_id).is_none() {
            return false;
        }
        if let Err(e) = self.remote.delete(&remote_id) {
            tracing::warn!(remote_id = %remote_id, error = %e, "failed to delete task");
        }
        true
    }

    /// Drop `dragged` onto `target`.
    ///
    /// With a `group` the move happens inside that priority group and the
    /// other groups keep their positions; otherwise the whole list is the
    /// source. Each changed order is written independently.
    pub fn reorder(&mut self, dragged: &TaskKey, target: &TaskKey, group: Option<TaskPriority>) -> bool {
        let mut source: Vec<Task> = match group {
            Some(priority) => self.store.tasks().iter().filter(|t| t.priority == priority).cloned().collect(),
            None => self.store.tasks().to_vec(),
        };
        source.sort_by_key(|t| t.order);

        let Some(plan) = plan_reorder(&source, dragged, target) else {
            return false;
        };

        let merged = match group {
            Some(priority) => {
                let mut moved = plan.tasks.into_iter();
                self.store
                    .tasks()
                    .iter()
                    .map(|t| {
                        if t.priority == priority {
                            moved.next().unwrap_or_else(|| t.clone())
                        } else {
                            t.clone()
                        }
                    })
                    .collect()
            }
            None => plan.tasks,
        };
        self.store.replace_all(merged);

        for write in &plan.writes {
            if let Err(e) = self.remote.update(&write.remote_id, &TaskUpdate::order(write.order)) {
                tracing::warn!(remote_id = %write.remote_id, error = %e, "failed to persist order");
            }
        }
        tracing::debug!(writes = plan.writes.len(), "tasks reordered");
        true
    }

    /// Store `notes` remotely and mirror them locally once accepted
    pub fn save_notes(&mut self, remote_id: &str, notes: String) -> Result<()> {
        let update = TaskUpdate::notes(notes);
        self.remote.update(remote_id, &update)?;
        self.store.patch(remote_id, &update);
        Ok(())
    }

    fn stored_id(&self, key: &TaskKey) -> Option<String> {
        match key {
            TaskKey::Remote(id) => Some(id.clone()),
            TaskKey::Local(_) => {
                tracing::debug!(task = %key, "ignoring action on unconfirmed task");
                None
            }
        }
    }

    fn write(&mut self, remote_id: &str, update: TaskUpdate) {
        self.store.patch(remote_id, &update);
        if let Err(e) = self.remote.update(remote_id, &update) {
            tracing::warn!(remote_id, error = %e, "failed to update task");
        }
    }
}
