//! In-memory list of the current owner's tasks.
//!
//! The store never performs remote I/O; it is overwritten by the sync
//! adapter on every snapshot and mutated optimistically by user actions.

use crate::models::{Task, TaskKey, TaskPriority, TaskUpdate};

#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tasks in display order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, key: &TaskKey) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.key() == key)
    }

    pub fn get_remote(&self, remote_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.remote_id.as_deref() == Some(remote_id))
    }

    /// Number of tasks currently in a priority group
    pub fn count_in_group(&self, priority: TaskPriority) -> usize {
        self.tasks.iter().filter(|t| t.priority == priority).count()
    }

    /// Overwrite the whole list
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    /// Append a locally originated task.
    ///
    /// A task carrying a remote id that is already present replaces the
    /// existing entry in place instead of being added twice.
    pub fn insert(&mut self, task: Task) {
        if let Some(remote_id) = task.remote_id.as_deref() {
            if let Some(existing) = self.tasks.iter_mut().find(|t| t.remote_id.as_deref() == Some(remote_id)) {
                tracing::debug!(remote_id, "insert replaced existing task");
                *existing = task;
                return;
            }
        }
        self.tasks.push(task);
    }

    /// Apply a field-level update to the task with the given remote id.
    /// Returns `false` if no such task is present.
    pub fn patch(&mut self, remote_id: &str, update: &TaskUpdate) -> bool {
        match self.tasks.iter_mut().find(|t| t.remote_id.as_deref() == Some(remote_id)) {
            Some(task) => {
                update.apply_to(task);
                true
            }
            None => false,
        }
    }

    /// Remove the task with the given remote id
    pub fn remove(&mut self, remote_id: &str) -> Option<Task> {
        let index = self.tasks.iter().position(|t| t.remote_id.as_deref() == Some(remote_id))?;
        Some(self.tasks.remove(index))
    }

    /// Attach the store-assigned id to a task created locally
    pub fn confirm(&mut self, local_id: i64, remote_id: String) -> bool {
        match self
            .tasks
            .iter_mut()
            .find(|t| t.remote_id.is_none() && t.local_id == local_id)
        {
            Some(task) => {
                task.remote_id = Some(remote_id);
                true
            }
            None => false,
        }
    }

    /// Withdraw a local task whose creation failed
    pub fn discard_local(&mut self, local_id: i64) -> Option<Task> {
        let index = self
            .tasks
            .iter()
            .position(|t| t.remote_id.is_none() && t.local_id == local_id)?;
        Some(self.tasks.remove(index))
    }
}
