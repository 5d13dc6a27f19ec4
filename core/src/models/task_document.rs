use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{format_iso_datetime, parse_iso_datetime, RepeatType, Task, TaskPriority};
use crate::{Error, Result};

/// A task document as held by the remote collection.
///
/// Field names and value encodings follow the collection schema, so
/// optional fields may be missing on older documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskDocument {
    pub id: String,
    pub text: String,
    pub is_complete: bool,
    pub priority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_type: Option<String>,
}

impl TaskDocument {
    /// Adapt a remote document into a local task.
    ///
    /// Missing `order` becomes 0, missing `repeatType` becomes `none` and a
    /// missing `endDate` is taken from `startDate`. A priority outside the
    /// known set is rejected.
    pub fn into_task(self, local_id: i64) -> Result<Task> {
        let priority = TaskPriority::parse(&self.priority).ok_or_else(|| {
            Error::InvalidInput(format!("Unknown priority '{}' on task {}", self.priority, self.id))
        })?;
        let repeat_type = match self.repeat_type.as_deref() {
            None => RepeatType::None,
            Some(s) => RepeatType::parse(s).ok_or_else(|| {
                Error::InvalidInput(format!("Unknown repeat type '{}' on task {}", s, self.id))
            })?,
        };
        let start_date = self.start_date.as_deref().and_then(parse_iso_datetime);
        let end_date = self
            .end_date
            .as_deref()
            .and_then(parse_iso_datetime)
            .or(start_date);

        Ok(Task {
            local_id,
            remote_id: Some(self.id),
            text: self.text,
            is_complete: self.is_complete,
            priority,
            notes: self.notes,
            order: self.order.unwrap_or(0),
            owner_id: self.user_id,
            created_at: self.created_at.unwrap_or_else(Utc::now),
            start_date,
            end_date,
            repeat_type,
        })
    }
}

/// Fields written when creating a document; id and `createdAt` are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTaskDocument {
    pub text: String,
    pub is_complete: bool,
    pub priority: String,
    pub notes: Option<String>,
    pub order: Option<i64>,
    pub user_id: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub repeat_type: Option<String>,
}

impl NewTaskDocument {
    pub fn from_task(task: &Task) -> Self {
        Self {
            text: task.text.clone(),
            is_complete: task.is_complete,
            priority: task.priority.as_str().to_string(),
            notes: task.notes.clone(),
            order: Some(task.order),
            user_id: task.owner_id.clone(),
            start_date: task.start_date.as_ref().map(format_iso_datetime),
            end_date: task.end_date.as_ref().map(format_iso_datetime),
            repeat_type: Some(task.repeat_type.as_str().to_string()),
        }
    }
}
