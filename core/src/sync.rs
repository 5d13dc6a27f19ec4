//! One-way sync from the remote collection into the [`TaskStore`].
//!
//! This is the only path by which remote state enters the application.
//! Each snapshot replaces the local list wholesale; optimistic local edits
//! are not merged, so a snapshot produced before a local write can briefly
//! undo it on screen until the next snapshot arrives.

use chrono::Utc;

use crate::models::{Task, TaskDocument};
use crate::storage::{RemoteStore, Snapshot, Subscription};
use crate::task_store::TaskStore;

/// Convert remote documents into tasks sorted by `order` ascending.
///
/// Documents arrive newest first; the sort is stable so equal orders keep
/// that relative position. Documents that cannot be adapted (for example an
/// unknown priority) are skipped with a warning.
pub fn adapt_documents(documents: Vec<TaskDocument>) -> Vec<Task> {
    let local_id = Utc::now().timestamp_millis();
    let mut tasks: Vec<Task> = documents
        .into_iter()
        .filter_map(|doc| {
            let id = doc.id.clone();
            match doc.into_task(local_id) {
                Ok(task) => Some(task),
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "skipping malformed task document");
                    None
                }
            }
        })
        .collect();
    tasks.sort_by_key(|t| t.order);
    tasks
}

#[derive(Default)]
pub struct SyncAdapter {
    subscription: Option<Subscription>,
    loading: bool,
    last_seq: u64,
}

impl SyncAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(&self) -> Option<&str> {
        self.subscription.as_ref().map(|s| s.owner())
    }

    /// True from subscribing until the first snapshot or error arrives
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Switch the subscription to a new owner.
    ///
    /// Any previous subscription is dropped. With no owner the store is
    /// emptied. A failure to subscribe is logged and ends the loading state.
    pub fn set_owner(&mut self, remote: &dyn RemoteStore, owner: Option<&str>, store: &mut TaskStore) {
        if owner.is_some() && self.owner() == owner {
            return;
        }

        self.teardown();

        let Some(owner) = owner else {
            store.replace_all(Vec::new());
            self.loading = false;
            return;
        };

        self.loading = true;
        match remote.subscribe(owner) {
            Ok(subscription) => {
                tracing::info!(owner, "task subscription started");
                self.subscription = Some(subscription);
            }
            Err(e) => {
                tracing::warn!(owner, error = %e, "failed to subscribe to tasks");
                self.loading = false;
            }
        }
    }

    /// Apply every queued snapshot. Returns how many were applied.
    pub fn pump(&mut self, store: &mut TaskStore) -> usize {
        let events: Vec<_> = match &self.subscription {
            Some(sub) => std::iter::from_fn(|| sub.try_next()).collect(),
            None => return 0,
        };

        let mut applied = 0;
        for event in events {
            match event {
                Ok(snapshot) => {
                    if self.apply_snapshot(snapshot, store) {
                        applied += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "task subscription error");
                    self.loading = false;
                }
            }
        }
        applied
    }

    /// Replace the store's contents with a snapshot.
    ///
    /// Snapshots older than the last one applied are discarded.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot, store: &mut TaskStore) -> bool {
        if snapshot.seq <= self.last_seq {
            tracing::debug!(seq = snapshot.seq, last = self.last_seq, "discarding stale snapshot");
            return false;
        }
        self.last_seq = snapshot.seq;
        store.replace_all(adapt_documents(snapshot.documents));
        self.loading = false;
        true
    }

    /// Stop listening. Writes already issued are unaffected.
    pub fn teardown(&mut self) {
        if let Some(sub) = self.subscription.take() {
            tracing::info!(owner = sub.owner(), "task subscription stopped");
        }
        self.last_seq = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTaskDocument, TaskPriority, TaskUpdate};
    use crate::storage::testing::MemoryRemote;

    fn doc(id: &str, order: Option<i64>) -> TaskDocument {
        TaskDocument {
            id: id.to_string(),
            text: id.to_string(),
            is_complete: false,
            priority: "medium".to_string(),
            notes: None,
            order,
            user_id: "u1".to_string(),
            created_at: None,
            start_date: None,
            end_date: None,
            repeat_type: None,
        }
    }

    fn new_doc(text: &str, order: i64) -> NewTaskDocument {
        NewTaskDocument {
            text: text.to_string(),
            is_complete: false,
            priority: "medium".to_string(),
            notes: None,
            order: Some(order),
            user_id: "u1".to_string(),
            start_date: None,
            end_date: None,
            repeat_type: None,
        }
    }

    fn texts(store: &TaskStore) -> Vec<String> {
        store.tasks().iter().map(|t| t.text.clone()).collect()
    }

    #[test]
    fn test_adapt_sorts_by_order_and_keeps_ties_stable() {
        let tasks = adapt_documents(vec![doc("c", Some(2)), doc("x", None), doc("a", Some(0)), doc("b", Some(1))]);
        let ids: Vec<_> = tasks.iter().map(|t| t.text.as_str()).collect();
        // "x" has no order (0) and arrived before "a", so it stays first
        assert_eq!(ids, vec!["x", "a", "b", "c"]);
    }

    #[test]
    fn test_adapt_skips_unknown_priority() {
        let mut bad = doc("bad", Some(0));
        bad.priority = "urgent".to_string();
        let tasks = adapt_documents(vec![bad, doc("ok", Some(0))]);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].priority, TaskPriority::Medium);
    }

    #[test]
    fn test_subscription_feeds_store() {
        let remote = MemoryRemote::new();
        remote.create(&new_doc("second", 1)).unwrap();
        remote.create(&new_doc("first", 0)).unwrap();

        let mut store = TaskStore::new();
        let mut sync = SyncAdapter::new();
        sync.set_owner(&remote, Some("u1"), &mut store);
        assert!(sync.is_loading());

        assert_eq!(sync.pump(&mut store), 1);
        assert!(!sync.is_loading());
        assert_eq!(texts(&store), vec!["first", "second"]);

        remote.update("doc-1", &TaskUpdate::order(-1)).unwrap();
        sync.pump(&mut store);
        assert_eq!(texts(&store), vec!["second", "first"]);
    }

    #[test]
    fn test_snapshot_overwrites_optimistic_state() {
        let remote = MemoryRemote::new();
        remote.create(&new_doc("task", 0)).unwrap();

        let mut store = TaskStore::new();
        let mut sync = SyncAdapter::new();
        sync.set_owner(&remote, Some("u1"), &mut store);
        sync.pump(&mut store);

        store.patch("doc-1", &TaskUpdate::completion(true));
        remote.create(&new_doc("another", 1)).unwrap();
        sync.pump(&mut store);

        // The snapshot knows nothing of the local-only change
        assert!(!store.get_remote("doc-1").unwrap().is_complete);
    }

    #[test]
    fn test_stale_snapshot_is_discarded() {
        let mut store = TaskStore::new();
        let mut sync = SyncAdapter::new();

        assert!(sync.apply_snapshot(Snapshot { seq: 2, documents: vec![doc("new", Some(0))] }, &mut store));
        assert!(!sync.apply_snapshot(Snapshot { seq: 1, documents: vec![doc("old", Some(0))] }, &mut store));
        assert_eq!(texts(&store), vec!["new"]);
    }

    #[test]
    fn test_no_owner_empties_store() {
        let remote = MemoryRemote::new();
        remote.create(&new_doc("task", 0)).unwrap();

        let mut store = TaskStore::new();
        let mut sync = SyncAdapter::new();
        sync.set_owner(&remote, Some("u1"), &mut store);
        sync.pump(&mut store);
        assert_eq!(store.len(), 1);

        sync.set_owner(&remote, None, &mut store);
        assert!(store.is_empty());
        assert!(!sync.is_loading());
        assert_eq!(sync.owner(), None);
        assert_eq!(sync.pump(&mut store), 0);
    }

    #[test]
    fn test_subscription_error_is_swallowed() {
        let remote = MemoryRemote::new();
        remote.create(&new_doc("task", 0)).unwrap();
        let mut store = TaskStore::new();
        let mut sync = SyncAdapter::new();
        sync.set_owner(&remote, Some("u1"), &mut store);
        sync.pump(&mut store);

        remote.emit_error("u1", "permission denied");
        assert_eq!(sync.pump(&mut store), 0);
        assert_eq!(store.len(), 1);
        assert!(!sync.is_loading());
    }

    #[test]
    fn test_failed_subscribe_ends_loading() {
        let remote = MemoryRemote::new();
        remote.fail_all_writes(true);
        let mut store = TaskStore::new();
        let mut sync = SyncAdapter::new();

        sync.set_owner(&remote, Some("u1"), &mut store);
        assert!(!sync.is_loading());
        assert_eq!(sync.owner(), None);
    }
}
