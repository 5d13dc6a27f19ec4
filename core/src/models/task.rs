use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl TaskPriority {
    /// Fixed display order of priority groups
    pub const ALL: [TaskPriority; 3] = [TaskPriority::High, TaskPriority::Medium, TaskPriority::Low];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "high" => Some(TaskPriority::High),
            "medium" => Some(TaskPriority::Medium),
            "low" => Some(TaskPriority::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::High => "high",
            TaskPriority::Medium => "medium",
            TaskPriority::Low => "low",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskPriority::High => "High",
            TaskPriority::Medium => "Medium",
            TaskPriority::Low => "Low",
        }
    }

    /// Next priority when cycling through the choices in an editor
    pub fn cycle(&self) -> Self {
        match self {
            TaskPriority::High => TaskPriority::Medium,
            TaskPriority::Medium => TaskPriority::Low,
            TaskPriority::Low => TaskPriority::High,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RepeatType {
    #[default]
    None,
    Range,
}

impl RepeatType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(RepeatType::None),
            "range" => Some(RepeatType::Range),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatType::None => "none",
            RepeatType::Range => "range",
        }
    }
}

/// Identity of a task in the local list.
///
/// Tasks created locally carry only their creation-time id until the
/// remote store confirms them; from then on the remote id is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskKey {
    Local(i64),
    Remote(String),
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKey::Local(id) => write!(f, "local:{}", id),
            TaskKey::Remote(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub local_id: i64,
    pub remote_id: Option<String>,
    pub text: String,
    pub is_complete: bool,
    pub priority: TaskPriority,
    pub notes: Option<String>,
    pub order: i64,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub repeat_type: RepeatType,
}

impl Task {
    /// Create a task that exists only locally (no remote id yet)
    pub fn new_local(owner_id: String, text: String, priority: TaskPriority) -> Self {
        let now = Utc::now();
        Self {
            local_id: now.timestamp_millis(),
            remote_id: None,
            text,
            is_complete: false,
            priority,
            notes: None,
            order: 0,
            owner_id,
            created_at: now,
            start_date: None,
            end_date: None,
            repeat_type: RepeatType::None,
        }
    }

    pub fn key(&self) -> TaskKey {
        match &self.remote_id {
            Some(id) => TaskKey::Remote(id.clone()),
            None => TaskKey::Local(self.local_id),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.remote_id.is_some()
    }

    /// Saved notes, or an empty string when there are none
    pub fn notes_text(&self) -> &str {
        self.notes.as_deref().unwrap_or("")
    }

    pub fn has_notes(&self) -> bool {
        !self.notes_text().trim().is_empty()
    }

    /// Inclusive calendar-day span of the task, end defaulting to start
    pub fn day_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.start_date?.date_naive();
        let end = self.end_date.map(|d| d.date_naive()).unwrap_or(start);
        Some((start, end))
    }
}

/// A field-level change to a task.
///
/// Used both to patch the local list and as the payload of a remote update,
/// so that both sides always receive the same subset of fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub is_complete: Option<bool>,
    pub text: Option<String>,
    pub priority: Option<TaskPriority>,
    pub notes: Option<String>,
    pub order: Option<i64>,
}

impl TaskUpdate {
    pub fn completion(is_complete: bool) -> Self {
        Self { is_complete: Some(is_complete), ..Self::default() }
    }

    pub fn content(text: String, priority: TaskPriority, notes: String) -> Self {
        Self {
            text: Some(text),
            priority: Some(priority),
            notes: Some(notes),
            ..Self::default()
        }
    }

    pub fn order(order: i64) -> Self {
        Self { order: Some(order), ..Self::default() }
    }

    pub fn notes(notes: String) -> Self {
        Self { notes: Some(notes), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.is_complete.is_none()
            && self.text.is_none()
            && self.priority.is_none()
            && self.notes.is_none()
            && self.order.is_none()
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(is_complete) = self.is_complete {
            task.is_complete = is_complete;
        }
        if let Some(text) = &self.text {
            task.text = text.clone();
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(notes) = &self.notes {
            task.notes = Some(notes.clone());
        }
        if let Some(order) = self.order {
            task.order = order;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_conversion() {
        assert_eq!(TaskPriority::parse("low"), Some(TaskPriority::Low));
        assert_eq!(TaskPriority::parse("HIGH"), Some(TaskPriority::High));
        assert_eq!(TaskPriority::parse("urgent"), None);
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
        assert_eq!(TaskPriority::Medium.as_str(), "medium");
    }

    #[test]
    fn test_priority_cycle_visits_all() {
        let mut p = TaskPriority::High;
        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(p);
            p = p.cycle();
        }
        assert_eq!(seen, TaskPriority::ALL.to_vec());
        assert_eq!(p, TaskPriority::High);
    }

    #[test]
    fn test_local_task_has_local_key() {
        let task = Task::new_local("user-1".to_string(), "Buy milk".to_string(), TaskPriority::Medium);
        assert!(!task.is_persisted());
        assert_eq!(task.key(), TaskKey::Local(task.local_id));

        let mut confirmed = task.clone();
        confirmed.remote_id = Some("doc-1".to_string());
        assert_eq!(confirmed.key(), TaskKey::Remote("doc-1".to_string()));
    }

    #[test]
    fn test_update_applies_only_set_fields() {
        let mut task = Task::new_local("user-1".to_string(), "Old".to_string(), TaskPriority::Low);
        task.notes = Some("keep".to_string());

        TaskUpdate::completion(true).apply_to(&mut task);
        assert!(task.is_complete);
        assert_eq!(task.text, "Old");
        assert_eq!(task.notes.as_deref(), Some("keep"));

        TaskUpdate::order(4).apply_to(&mut task);
        assert_eq!(task.order, 4);
        assert!(TaskUpdate::default().is_empty());
    }

    #[test]
    fn test_day_span_defaults_end_to_start() {
        let mut task = Task::new_local("u".to_string(), "t".to_string(), TaskPriority::Low);
        assert_eq!(task.day_span(), None);

        let start = crate::models::parse_iso_datetime("2024-06-01").unwrap();
        task.start_date = Some(start);
        let day = start.date_naive();
        assert_eq!(task.day_span(), Some((day, day)));
    }
}
