use std::cell::RefCell;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use chrono::Utc;

use super::{Connection, Database, TaskDocumentRepository};
use crate::models::{NewTaskDocument, TaskDocument, TaskUpdate};
use crate::{Error, Result};

/// Full view of one owner's collection at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Monotonic per-subscription sequence number, starting at 1
    pub seq: u64,
    /// Documents ordered by creation time, newest first
    pub documents: Vec<TaskDocument>,
}

/// A live query over one owner's documents.
///
/// Snapshots are queued as the store changes and drained with
/// [`Subscription::try_next`]. Dropping the subscription unsubscribes.
pub struct Subscription {
    owner: String,
    receiver: Receiver<Result<Snapshot>>,
}

impl Subscription {
    pub fn new(owner: String, receiver: Receiver<Result<Snapshot>>) -> Self {
        Self { owner, receiver }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Next pending event, if any. Returns `None` when nothing is queued or
    /// the store has gone away.
    pub fn try_next(&self) -> Option<Result<Snapshot>> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

/// The remote task collection.
///
/// Every write is an independent point operation; there is no batching or
/// transaction across calls.
pub trait RemoteStore {
    /// Create a document and return its store-assigned id
    fn create(&self, doc: &NewTaskDocument) -> Result<String>;

    /// Update the given subset of fields on a document
    fn update(&self, id: &str, update: &TaskUpdate) -> Result<()>;

    /// Delete a document
    fn delete(&self, id: &str) -> Result<()>;

    /// Subscribe to an owner's documents ordered by creation time, newest first
    fn subscribe(&self, owner: &str) -> Result<Subscription>;

    /// One-shot query of an owner's documents, newest first
    fn list(&self, owner: &str) -> Result<Vec<TaskDocument>>;
}

struct Subscriber {
    owner: String,
    seq: u64,
    sender: Sender<Result<Snapshot>>,
}

/// Document store backed by a SQLite database.
///
/// After every write a fresh snapshot is pushed to each subscriber of the
/// affected owner.
pub struct SqliteRemote {
    conn: Connection,
    subscribers: RefCell<Vec<Subscriber>>,
}

impl SqliteRemote {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            subscribers: RefCell::new(Vec::new()),
        }
    }

    /// Open (creating if needed) the database and wrap it
    pub fn open(db: &Database) -> Result<Self> {
        Ok(Self::new(db.open()?))
    }

    /// Underlying connection, shared with the account store
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    fn notify(&self, owner: &str) {
        let documents = TaskDocumentRepository::list_by_owner(&self.conn, owner);
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain_mut(|sub| {
            if sub.owner != owner {
                return true;
            }
            sub.seq += 1;
            let event = match &documents {
                Ok(docs) => Ok(Snapshot { seq: sub.seq, documents: docs.clone() }),
                Err(e) => Err(Error::Remote(e.to_string())),
            };
            // A closed channel means the subscription was dropped
            sub.sender.send(event).is_ok()
        });
    }
}

impl RemoteStore for SqliteRemote {
    fn create(&self, doc: &NewTaskDocument) -> Result<String> {
        let created = TaskDocumentRepository::create(&self.conn, doc, Utc::now())?;
        tracing::debug!(id = %created.id, owner = %created.user_id, "created task document");
        self.notify(&created.user_id);
        Ok(created.id)
    }

    fn update(&self, id: &str, update: &TaskUpdate) -> Result<()> {
        let owner = TaskDocumentRepository::owner_of(&self.conn, id)?
            .ok_or_else(|| Error::NotFound(format!("Task not found: {}", id)))?;
        TaskDocumentRepository::update(&self.conn, id, update)?;
        tracing::debug!(id, ?update, "updated task document");
        self.notify(&owner);
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let owner = TaskDocumentRepository::owner_of(&self.conn, id)?
            .ok_or_else(|| Error::NotFound(format!("Task not found: {}", id)))?;
        TaskDocumentRepository::delete(&self.conn, id)?;
        tracing::debug!(id, "deleted task document");
        self.notify(&owner);
        Ok(())
    }

    fn subscribe(&self, owner: &str) -> Result<Subscription> {
        let (sender, receiver) = mpsc::channel();
        let documents = TaskDocumentRepository::list_by_owner(&self.conn, owner)?;
        // The initial snapshot is queued before the subscriber is registered
        // so it is always seq 1.
        let _ = sender.send(Ok(Snapshot { seq: 1, documents }));
        self.subscribers.borrow_mut().push(Subscriber {
            owner: owner.to_string(),
            seq: 1,
            sender,
        });
        tracing::debug!(owner, "subscribed to task documents");
        Ok(Subscription::new(owner.to_string(), receiver))
    }

    fn list(&self, owner: &str) -> Result<Vec<TaskDocument>> {
        TaskDocumentRepository::list_by_owner(&self.conn, owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup_remote() -> (tempfile::TempDir, SqliteRemote) {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db"));
        let remote = SqliteRemote::open(&db).unwrap();
        (dir, remote)
    }

    fn new_doc(user: &str, text: &str) -> NewTaskDocument {
        NewTaskDocument {
            text: text.to_string(),
            is_complete: false,
            priority: "low".to_string(),
            notes: None,
            order: None,
            user_id: user.to_string(),
            start_date: None,
            end_date: None,
            repeat_type: None,
        }
    }

    fn drain(sub: &Subscription) -> Vec<Snapshot> {
        std::iter::from_fn(|| sub.try_next()).map(|e| e.unwrap()).collect()
    }

    #[test]
    fn test_initial_snapshot_is_delivered() {
        let (_dir, remote) = setup_remote();
        remote.create(&new_doc("u1", "a")).unwrap();

        let sub = remote.subscribe("u1").unwrap();
        let snapshots = drain(&sub);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].seq, 1);
        assert_eq!(snapshots[0].documents.len(), 1);
    }

    #[test]
    fn test_writes_push_snapshots_to_owner_only() {
        let (_dir, remote) = setup_remote();
        let sub1 = remote.subscribe("u1").unwrap();
        let sub2 = remote.subscribe("u2").unwrap();
        drain(&sub1);
        drain(&sub2);

        let id = remote.create(&new_doc("u1", "a")).unwrap();
        remote.update(&id, &TaskUpdate::completion(true)).unwrap();
        remote.delete(&id).unwrap();

        let seqs: Vec<u64> = drain(&sub1).iter().map(|s| s.seq).collect();
        assert_eq!(seqs, vec![2, 3, 4]);
        assert!(drain(&sub2).is_empty());
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let (_dir, remote) = setup_remote();
        let sub = remote.subscribe("u1").unwrap();
        assert_eq!(remote.subscriber_count(), 1);
        drop(sub);

        remote.create(&new_doc("u1", "a")).unwrap();
        assert_eq!(remote.subscriber_count(), 0);
    }

    #[test]
    fn test_update_unknown_document() {
        let (_dir, remote) = setup_remote();
        assert!(matches!(remote.update("missing", &TaskUpdate::order(1)), Err(Error::NotFound(_))));
        assert!(matches!(remote.delete("missing"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_subscribe_on_existing_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dayboard.db");
        std::fs::write(&path, b"").unwrap();

        let remote = SqliteRemote::open(&Database::new(&path)).unwrap();
        let sub = remote.subscribe("u1").unwrap();
        let snapshots = drain(&sub);
        assert_eq!(snapshots.len(), 1);
        assert!(snapshots[0].documents.is_empty());
    }
}
