//! Month grid and per-day task counts for the calendar panel.

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarMonth {
    pub year: i32,
    /// 1-based month
    pub month: u32,
}

impl CalendarMonth {
    /// The month containing `date`
    pub fn containing(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next().first_day() - Duration::days(1)
    }

    pub fn num_days(&self) -> u32 {
        self.last_day().day()
    }

    pub fn prev(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// Every day of the month in order
    pub fn days(&self) -> Vec<NaiveDate> {
        self.first_day().iter_days().take(self.num_days() as usize).collect()
    }

    /// Empty cells before the 1st in a grid whose weeks start on Sunday
    pub fn leading_blanks(&self) -> u32 {
        self.first_day().weekday().num_days_from_sunday()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// e.g. "June 2024"
    pub fn title(&self) -> String {
        self.first_day().format("%B %Y").to_string()
    }
}

/// Number of tasks whose day span includes `date`.
/// Tasks without a start date are not counted.
pub fn tasks_on(tasks: &[Task], date: NaiveDate) -> usize {
    tasks
        .iter()
        .filter_map(Task::day_span)
        .filter(|(start, end)| *start <= date && date <= *end)
        .count()
}

/// Number of tasks whose day span overlaps `month`
pub fn tasks_in_month(tasks: &[Task], month: CalendarMonth) -> usize {
    let first = month.first_day();
    let last = month.last_day();
    tasks
        .iter()
        .filter_map(Task::day_span)
        .filter(|(start, end)| *start <= last && *end >= first)
        .count()
}

/// The displayed month plus an optional selected day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateSelection {
    month: CalendarMonth,
    selected: Option<NaiveDate>,
}

impl DateSelection {
    pub fn new(month: CalendarMonth) -> Self {
        Self { month, selected: None }
    }

    pub fn month(&self) -> CalendarMonth {
        self.month
    }

    pub fn selected(&self) -> Option<NaiveDate> {
        self.selected
    }

    /// Select `date`, or clear the selection if it is already selected
    pub fn toggle(&mut self, date: NaiveDate) {
        if self.selected == Some(date) {
            self.selected = None;
        } else {
            self.selected = Some(date);
        }
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn prev_month(&mut self) {
        self.month = self.month.prev();
        self.selected = None;
    }

    pub fn next_month(&mut self) {
        self.month = self.month.next();
        self.selected = None;
    }
}
