//! Note editing sessions.
//!
//! Each task can have a transient session holding a draft of its notes.
//! The [`NoteCoordinator`] owns every session and the single "currently
//! open" slot: opening one session first closes whichever other session
//! holds the slot, saving its draft if it has unsaved changes.
//!
//! Saves are issued and their failures logged; the caller never waits on
//! them to keep the UI moving. A failed save leaves the session dirty and
//! is not retried.

use std::collections::HashMap;

use crate::actions::TaskActions;
use crate::models::{TaskKey, TaskUpdate};
use crate::storage::RemoteStore;
use crate::task_store::TaskStore;
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteSession {
    open: bool,
    draft: String,
    dirty: bool,
}

impl NoteSession {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

#[derive(Debug, Default)]
pub struct NoteCoordinator {
    sessions: HashMap<TaskKey, NoteSession>,
    active: Option<TaskKey>,
}

impl NoteCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The task whose note editor is open, if any
    pub fn active(&self) -> Option<&TaskKey> {
        self.active.as_ref()
    }

    pub fn session(&self, key: &TaskKey) -> Option<&NoteSession> {
        self.sessions.get(key)
    }

    pub fn is_open(&self, key: &TaskKey) -> bool {
        self.sessions.get(key).map(|s| s.open).unwrap_or(false)
    }

    pub fn is_dirty(&self, key: &TaskKey) -> bool {
        self.sessions.get(key).map(|s| s.dirty).unwrap_or(false)
    }

    /// Open or close the note editor for a task.
    ///
    /// Ignored while the task's text is being edited. Returns whether the
    /// editor is open afterwards.
    pub fn toggle(
        &mut self,
        key: &TaskKey,
        text_edit_active: bool,
        store: &mut TaskStore,
        remote: &dyn RemoteStore,
    ) -> bool {
        if text_edit_active {
            return self.is_open(key);
        }
        if self.is_open(key) {
            self.close(key, store, remote);
            false
        } else {
            self.open(key, store, remote);
            true
        }
    }

    /// Open a session, closing (and flushing) whichever other one is open.
    /// The draft starts from the task's saved notes.
    pub fn open(&mut self, key: &TaskKey, store: &mut TaskStore, remote: &dyn RemoteStore) {
        if let Some(other) = self.active.clone() {
            if &other != key {
                self.close(&other, store, remote);
            }
        }

        let saved = store.get(key).map(|t| t.notes_text().to_string()).unwrap_or_default();
        let session = self.sessions.entry(key.clone()).or_default();
        session.open = true;
        session.draft = saved;
        session.dirty = false;
        self.active = Some(key.clone());
        tracing::debug!(task = %key, "note editor opened");
    }

    /// Close a session, saving first if the draft has unsaved changes
    pub fn close(&mut self, key: &TaskKey, store: &mut TaskStore, remote: &dyn RemoteStore) {
        if self.is_dirty(key) {
            // Failure is logged inside save; the session still closes
            let _ = self.save(key, store, remote);
        }
        if let Some(session) = self.sessions.get_mut(key) {
            session.open = false;
        }
        if self.active.as_ref() == Some(key) {
            self.active = None;
        }
        tracing::debug!(task = %key, "note editor closed");
    }

    /// Replace the draft of an open session and mark it dirty.
    /// Returns `false` if the session is not open.
    pub fn on_change(&mut self, key: &TaskKey, text: String) -> bool {
        match self.sessions.get_mut(key) {
            Some(session) if session.open => {
                session.draft = text;
                session.dirty = true;
                true
            }
            _ => false,
        }
    }

    /// Persist the draft as the task's notes and mirror it into the store
    pub fn save(&mut self, key: &TaskKey, store: &mut TaskStore, remote: &dyn RemoteStore) -> Result<()> {
        let Some(session) = self.sessions.get_mut(key) else {
            return Err(Error::NotFound(format!("No note session for {}", key)));
        };
        let TaskKey::Remote(remote_id) = key else {
            tracing::warn!(task = %key, "cannot save notes before the task is stored");
            return Err(Error::InvalidInput("Task has not been stored yet".to_string()));
        };

        match TaskActions::new(store, remote, None).save_notes(remote_id, session.draft.clone()) {
            Ok(()) => {
                session.dirty = false;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(task = %key, error = %e, "failed to save notes");
                Err(e)
            }
        }
    }

    /// The editor lost focus: save pending changes
    pub fn blur(&mut self, key: &TaskKey, store: &mut TaskStore, remote: &dyn RemoteStore) {
        if self.is_dirty(key) {
            let _ = self.save(key, store, remote);
        }
    }

    /// The task entered text-edit mode, which hides its note editor
    pub fn enter_text_edit(&mut self, key: &TaskKey, store: &mut TaskStore, remote: &dyn RemoteStore) {
        if self.is_open(key) {
            self.close(key, store, remote);
        }
    }

    /// Resynchronise sessions with the store after it changed.
    ///
    /// Clean drafts follow the saved notes; dirty drafts are kept. Sessions
    /// whose task disappeared are dropped.
    pub fn refresh(&mut self, store: &TaskStore) {
        self.sessions.retain(|key, _| store.get(key).is_some());
        if let Some(active) = &self.active {
            if !self.sessions.contains_key(active) {
                self.active = None;
            }
        }
        for (key, session) in self.sessions.iter_mut() {
            if !session.dirty {
                if let Some(task) = store.get(key) {
                    session.draft = task.notes_text().to_string();
                }
            }
        }
    }

    /// Best-effort flush of every dirty draft before the view goes away.
    ///
    /// Writes go straight to the remote store; the local list is not
    /// updated since it is about to be discarded. Returns how many saves
    /// succeeded.
    pub fn teardown(&mut self, remote: &dyn RemoteStore) -> usize {
        let mut saved = 0;
        for (key, session) in self.sessions.iter_mut() {
            session.open = false;
            if !session.dirty {
                continue;
            }
            let TaskKey::Remote(remote_id) = key else {
                continue;
            };
            match remote.update(remote_id, &TaskUpdate::notes(session.draft.clone())) {
                Ok(()) => {
                    session.dirty = false;
                    saved += 1;
                }
                Err(e) => tracing::warn!(task = %key, error = %e, "notes lost on shutdown"),
            }
        }
        self.active = None;
        saved
    }
}
