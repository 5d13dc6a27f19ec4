//! Search, date filter and priority grouping over the task list.
//!
//! Everything here is a pure function of the list and a [`ViewQuery`];
//! callers recompute the view whenever either changes.

use chrono::NaiveDate;

use crate::models::{RepeatType, Task, TaskPriority};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewQuery {
    pub search: String,
    pub selected_date: Option<NaiveDate>,
    pub group_by_priority: bool,
}

/// Case-insensitive substring match on the task text
pub fn matches_search(task: &Task, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    task.text.to_lowercase().contains(&term.to_lowercase())
}

/// Whether a task is scheduled on the selected calendar day (UTC).
///
/// Single-day tasks match only on their start day; range tasks match
/// anywhere in `[start, end]`. With no day selected every task matches.
pub fn matches_date(task: &Task, selected: Option<NaiveDate>) -> bool {
    let Some(day) = selected else {
        return true;
    };
    match task.repeat_type {
        RepeatType::None => task.start_date.map(|s| s.date_naive() == day).unwrap_or(false),
        RepeatType::Range => task
            .day_span()
            .map(|(start, end)| start <= day && day <= end)
            .unwrap_or(false),
    }
}

pub fn filter_tasks<'a>(tasks: &'a [Task], query: &ViewQuery) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| matches_search(t, &query.search) && matches_date(t, query.selected_date))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriorityGroup<'a> {
    pub priority: TaskPriority,
    pub tasks: Vec<&'a Task>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayList<'a> {
    Flat(Vec<&'a Task>),
    Grouped(Vec<PriorityGroup<'a>>),
}

impl<'a> DisplayList<'a> {
    /// All displayed tasks, top to bottom
    pub fn rows(&self) -> Vec<&'a Task> {
        match self {
            DisplayList::Flat(tasks) => tasks.clone(),
            DisplayList::Grouped(groups) => groups.iter().flat_map(|g| g.tasks.iter().copied()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DisplayList::Flat(tasks) => tasks.len(),
            DisplayList::Grouped(groups) => groups.iter().map(|g| g.tasks.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split tasks into high, medium and low groups, each sorted by `order`.
/// Empty groups are left out.
pub fn group_by_priority<'a>(tasks: &[&'a Task]) -> Vec<PriorityGroup<'a>> {
    TaskPriority::ALL
        .iter()
        .filter_map(|&priority| {
            let mut members: Vec<&Task> = tasks.iter().copied().filter(|t| t.priority == priority).collect();
            if members.is_empty() {
                return None;
            }
            members.sort_by_key(|t| t.order);
            Some(PriorityGroup { priority, tasks: members })
        })
        .collect()
}

pub fn build_view<'a>(tasks: &'a [Task], query: &ViewQuery) -> DisplayList<'a> {
    let matching = filter_tasks(tasks, query);
    if query.group_by_priority {
        DisplayList::Grouped(group_by_priority(&matching))
    } else {
        DisplayList::Flat(matching)
    }
}
