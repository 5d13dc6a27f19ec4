//! In-memory document store for tests: records every write and can be told
//! to fail writes, either all of them or for specific document ids.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::sync::mpsc::{self, Sender};

use chrono::{Duration, Utc};

use super::{RemoteStore, Snapshot, Subscription};
use crate::models::{NewTaskDocument, TaskDocument, TaskUpdate};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedWrite {
    Create(NewTaskDocument),
    Update(String, TaskUpdate),
    Delete(String),
}

#[derive(Default)]
pub struct MemoryRemote {
    documents: RefCell<Vec<TaskDocument>>,
    writes: RefCell<Vec<RecordedWrite>>,
    subscribers: RefCell<Vec<(String, u64, Sender<Result<Snapshot>>)>>,
    next_id: Cell<u64>,
    fail_all: Cell<bool>,
    failing_ids: RefCell<HashSet<String>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document directly, bypassing the write log
    pub fn seed(&self, doc: TaskDocument) {
        self.documents.borrow_mut().push(doc);
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.borrow().clone()
    }

    pub fn clear_writes(&self) {
        self.writes.borrow_mut().clear();
    }

    /// Fail every write (and new subscriptions)
    pub fn fail_all_writes(&self, fail: bool) {
        self.fail_all.set(fail);
    }

    pub fn fail_writes_for(&self, id: &str) {
        self.failing_ids.borrow_mut().insert(id.to_string());
    }

    pub fn document(&self, id: &str) -> Option<TaskDocument> {
        self.documents.borrow().iter().find(|d| d.id == id).cloned()
    }

    /// Push an error event to every subscriber of `owner`
    pub fn emit_error(&self, owner: &str, message: &str) {
        for (sub_owner, _, sender) in self.subscribers.borrow().iter() {
            if sub_owner == owner {
                let _ = sender.send(Err(Error::Remote(message.to_string())));
            }
        }
    }

    fn check(&self, id: Option<&str>) -> Result<()> {
        if self.fail_all.get() {
            return Err(Error::Remote("simulated network failure".to_string()));
        }
        if let Some(id) = id {
            if self.failing_ids.borrow().contains(id) {
                return Err(Error::Remote(format!("simulated failure for {}", id)));
            }
        }
        Ok(())
    }

    fn owner_of(&self, id: &str) -> Result<String> {
        self.document(id)
            .map(|d| d.user_id)
            .ok_or_else(|| Error::NotFound(format!("Task not found: {}", id)))
    }

    fn notify(&self, owner: &str) {
        let documents = self.list(owner).unwrap_or_default();
        for (sub_owner, seq, sender) in self.subscribers.borrow_mut().iter_mut() {
            if sub_owner == owner {
                *seq += 1;
                let _ = sender.send(Ok(Snapshot { seq: *seq, documents: documents.clone() }));
            }
        }
    }
}

impl RemoteStore for MemoryRemote {
    fn create(&self, doc: &NewTaskDocument) -> Result<String> {
        self.writes.borrow_mut().push(RecordedWrite::Create(doc.clone()));
        self.check(None)?;
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        let id = format!("doc-{}", n);
        self.documents.borrow_mut().push(TaskDocument {
            id: id.clone(),
            text: doc.text.clone(),
            is_complete: doc.is_complete,
            priority: doc.priority.clone(),
            notes: doc.notes.clone(),
            order: doc.order,
            user_id: doc.user_id.clone(),
            // Strictly increasing so creation order is unambiguous
            created_at: Some(Utc::now() + Duration::milliseconds(n as i64)),
            start_date: doc.start_date.clone(),
            end_date: doc.end_date.clone(),
            repeat_type: doc.repeat_type.clone(),
        });
        self.notify(&doc.user_id);
        Ok(id)
    }

    fn update(&self, id: &str, update: &TaskUpdate) -> Result<()> {
        self.writes.borrow_mut().push(RecordedWrite::Update(id.to_string(), update.clone()));
        self.check(Some(id))?;
        let owner = self.owner_of(id)?;
        for doc in self.documents.borrow_mut().iter_mut().filter(|d| d.id == id) {
            if let Some(v) = update.is_complete {
                doc.is_complete = v;
            }
            if let Some(v) = &update.text {
                doc.text = v.clone();
            }
            if let Some(v) = update.priority {
                doc.priority = v.as_str().to_string();
            }
            if let Some(v) = &update.notes {
                doc.notes = Some(v.clone());
            }
            if let Some(v) = update.order {
                doc.order = Some(v);
            }
        }
        self.notify(&owner);
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.writes.borrow_mut().push(RecordedWrite::Delete(id.to_string()));
        self.check(Some(id))?;
        let owner = self.owner_of(id)?;
        self.documents.borrow_mut().retain(|d| d.id != id);
        self.notify(&owner);
        Ok(())
    }

    fn subscribe(&self, owner: &str) -> Result<Subscription> {
        self.check(None)?;
        let (sender, receiver) = mpsc::channel();
        let _ = sender.send(Ok(Snapshot { seq: 1, documents: self.list(owner)? }));
        self.subscribers.borrow_mut().push((owner.to_string(), 1, sender));
        Ok(Subscription::new(owner.to_string(), receiver))
    }

    fn list(&self, owner: &str) -> Result<Vec<TaskDocument>> {
        let mut docs: Vec<TaskDocument> = self
            .documents
            .borrow()
            .iter()
            .filter(|d| d.user_id == owner)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(docs)
    }
}
