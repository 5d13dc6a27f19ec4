use chrono::{Duration, NaiveDate, Utc};
use dayboard_core::{
    actions::{AddOutcome, TaskActions, TaskDraft},
    calendar::{CalendarMonth, DateSelection},
    models::{Session, Task, TaskKey, TaskPriority},
    notes::NoteCoordinator,
    storage::SqliteRemote,
    sync::SyncAdapter,
    task_store::TaskStore,
    view::{build_view, DisplayList, ViewQuery},
};

use crate::config::Config;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddField {
    Text,
    Priority,
    Start,
    End,
    Notes,
}

impl AddField {
    pub fn next(self) -> Self {
        match self {
            AddField::Text => AddField::Priority,
            AddField::Priority => AddField::Start,
            AddField::Start => AddField::End,
            AddField::End => AddField::Notes,
            AddField::Notes => AddField::Text,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            AddField::Text => AddField::Notes,
            AddField::Priority => AddField::Text,
            AddField::Start => AddField::Priority,
            AddField::End => AddField::Start,
            AddField::Notes => AddField::End,
        }
    }
}

/// State of the add-task overlay. Dates are typed as `YYYY-MM-DD`;
/// notes may span several lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddForm {
    pub text: String,
    pub priority: TaskPriority,
    pub start: String,
    pub end: String,
    pub notes: String,
    pub field: AddField,
}

impl AddForm {
    pub fn new(start: Option<NaiveDate>) -> Self {
        Self {
            text: String::new(),
            priority: TaskPriority::default(),
            start: start.map(|d| d.format(DATE_FORMAT).to_string()).unwrap_or_default(),
            end: String::new(),
            notes: String::new(),
            field: AddField::Text,
        }
    }

    /// The text buffer behind the focused field; priority has none
    pub fn buffer_mut(&mut self) -> Option<&mut String> {
        match self.field {
            AddField::Text => Some(&mut self.text),
            AddField::Priority => None,
            AddField::Start => Some(&mut self.start),
            AddField::End => Some(&mut self.end),
            AddField::Notes => Some(&mut self.notes),
        }
    }

    pub fn to_draft(&self) -> std::result::Result<TaskDraft, String> {
        let start = parse_date_field(&self.start).ok_or_else(|| format!("Invalid start date: {}", self.start))?;
        let end = parse_date_field(&self.end).ok_or_else(|| format!("Invalid end date: {}", self.end))?;
        if let (Some(s), Some(e)) = (start, end) {
            if e < s {
                return Err("End date is before the start date".to_string());
            }
        }
        Ok(TaskDraft {
            text: self.text.clone(),
            priority: self.priority,
            start,
            end,
            notes: Some(self.notes.clone()).filter(|n| !n.trim().is_empty()),
        })
    }
}

/// `Some(None)` for a blank field, `None` if it doesn't parse
fn parse_date_field(input: &str) -> Option<Option<NaiveDate>> {
    let input = input.trim();
    if input.is_empty() {
        return Some(None);
    }
    NaiveDate::parse_from_str(input, DATE_FORMAT).ok().map(Some)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Text,
    Priority,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditForm {
    pub key: TaskKey,
    pub text: String,
    pub priority: TaskPriority,
    pub field: EditField,
}

/// What the keyboard is currently driving
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    Search,
    Help,
    Adding(AddForm),
    Editing(EditForm),
    ConfirmDelete(TaskKey),
    /// Typing into the note editor of this task
    Notes(TaskKey),
}

/// Application state
pub struct App {
    pub should_quit: bool,
    pub config: Config,
    pub remote: SqliteRemote,
    pub store: TaskStore,
    pub sync: SyncAdapter,
    pub notes: NoteCoordinator,
    pub session: Option<Session>,
    pub mode: Mode,
    pub search_query: String,
    pub group_by_priority: bool,
    pub calendar: DateSelection,
    pub calendar_cursor: NaiveDate,
    pub cursor_position: usize,
    pub list_offset: usize,
    pub status_message: Option<String>,
}

impl App {
    pub fn new(remote: SqliteRemote, config: Config) -> Self {
        let today = Utc::now().date_naive();
        let group_by_priority = config.view.group_by_priority;
        Self {
            should_quit: false,
            config,
            remote,
            store: TaskStore::new(),
            sync: SyncAdapter::new(),
            notes: NoteCoordinator::new(),
            session: None,
            mode: Mode::Normal,
            search_query: String::new(),
            group_by_priority,
            calendar: DateSelection::new(CalendarMonth::containing(today)),
            calendar_cursor: today,
            cursor_position: 0,
            list_offset: 0,
            status_message: None,
        }
    }

    /// Switch the signed-in user (or sign out with `None`)
    pub fn set_session(&mut self, session: Option<Session>) {
        self.session = session;
        let owner = self.session.as_ref().map(|s| s.uid.as_str());
        self.sync.set_owner(&self.remote, owner, &mut self.store);
        self.cursor_position = 0;
        self.tick();
    }

    pub fn owner(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.uid.as_str())
    }

    fn actions(&mut self) -> TaskActions<'_> {
        let owner = self.session.as_ref().map(|s| s.uid.as_str());
        TaskActions::new(&mut self.store, &self.remote, owner)
    }

    pub fn view_query(&self) -> ViewQuery {
        ViewQuery {
            search: self.search_query.clone(),
            selected_date: self.calendar.selected(),
            group_by_priority: self.group_by_priority,
        }
    }

    pub fn display_list(&self) -> DisplayList<'_> {
        build_view(self.store.tasks(), &self.view_query())
    }

    /// Tasks as listed on screen, top to bottom
    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.display_list().rows()
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.visible_tasks().get(self.cursor_position).copied()
    }

    pub fn selected_key(&self) -> Option<TaskKey> {
        self.selected_task().map(Task::key)
    }

    fn select_key(&mut self, key: &TaskKey) {
        if let Some(index) = self.visible_tasks().iter().position(|t| &t.key() == key) {
            self.cursor_position = index;
        }
    }

    fn clamp_cursor(&mut self) {
        let len = self.visible_tasks().len();
        if self.cursor_position >= len {
            self.cursor_position = len.saturating_sub(1);
        }
    }

    pub fn move_cursor_up(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    pub fn move_cursor_down(&mut self) {
        if self.cursor_position + 1 < self.visible_tasks().len() {
            self.cursor_position += 1;
        }
    }

    /// Apply any snapshots that arrived since the last tick
    pub fn tick(&mut self) {
        if self.sync.pump(&mut self.store) > 0 {
            self.notes.refresh(&self.store);
            self.clamp_cursor();
        }
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    fn require_login(&mut self) -> bool {
        if self.session.is_none() {
            self.set_status("Log in to manage tasks.");
            return false;
        }
        true
    }

    pub fn start_adding(&mut self) {
        if !self.require_login() {
            return;
        }
        self.mode = Mode::Adding(AddForm::new(self.calendar.selected()));
    }

    pub fn commit_add(&mut self) {
        let Mode::Adding(form) = &self.mode else {
            return;
        };
        let draft = match form.to_draft() {
            Ok(draft) => draft,
            Err(message) => {
                self.set_status(message);
                return;
            }
        };

        self.mode = Mode::Normal;
        match self.actions().add(&draft) {
            Ok(AddOutcome::Added(key)) => self.select_key(&key),
            Ok(AddOutcome::Rejected) => {}
            Err(_) => self.set_status("Could not add the task. Please try again."),
        }
    }

    pub fn cancel_form(&mut self) {
        self.mode = Mode::Normal;
    }

    pub fn toggle_selected_complete(&mut self) {
        if !self.require_login() {
            return;
        }
        if let Some(key) = self.selected_key() {
            self.actions().toggle_complete(&key);
        }
    }

    /// Open the text editor for the selected task, closing its notes first
    pub fn start_editing(&mut self) {
        if !self.require_login() {
            return;
        }
        let Some(task) = self.selected_task() else {
            return;
        };
        let form = EditForm {
            key: task.key(),
            text: task.text.clone(),
            priority: task.priority,
            field: EditField::Text,
        };
        self.notes.enter_text_edit(&form.key, &mut self.store, &self.remote);
        self.mode = Mode::Editing(form);
    }

    pub fn commit_edit(&mut self) {
        let Mode::Editing(form) = std::mem::take(&mut self.mode) else {
            return;
        };
        self.actions().edit(&form.key, &form.text, form.priority);
        self.select_key(&form.key);
    }

    pub fn initiate_delete(&mut self) {
        if !self.require_login() {
            return;
        }
        if let Some(key) = self.selected_key() {
            self.mode = Mode::ConfirmDelete(key);
        }
    }

    pub fn confirm_delete(&mut self) {
        let Mode::ConfirmDelete(key) = std::mem::take(&mut self.mode) else {
            return;
        };
        self.actions().delete(&key);
        self.notes.refresh(&self.store);
        self.clamp_cursor();
    }

    pub fn cancel_delete(&mut self) {
        self.mode = Mode::Normal;
    }

    pub fn move_selected_up(&mut self) {
        self.move_selected(-1);
    }

    pub fn move_selected_down(&mut self) {
        self.move_selected(1);
    }

    /// Drop the selected task onto its neighbour. In grouped view the
    /// neighbour must be in the same priority group.
    fn move_selected(&mut self, delta: isize) {
        if !self.require_login() {
            return;
        }
        let (dragged, target, group) = {
            let rows = self.visible_tasks();
            let Some(current) = rows.get(self.cursor_position) else {
                return;
            };
            let Some(neighbour) = self.cursor_position.checked_add_signed(delta).and_then(|i| rows.get(i)) else {
                return;
            };
            if self.group_by_priority && neighbour.priority != current.priority {
                return;
            }
            let group = self.group_by_priority.then_some(current.priority);
            (current.key(), neighbour.key(), group)
        };

        if self.actions().reorder(&dragged, &target, group) {
            self.select_key(&dragged);
        }
    }

    /// Open the selected task's note editor, or focus it if already open
    pub fn toggle_selected_notes(&mut self) {
        if !self.require_login() {
            return;
        }
        let Some(key) = self.selected_key() else {
            return;
        };
        if self.notes.is_open(&key) || self.notes.toggle(&key, false, &mut self.store, &self.remote) {
            self.mode = Mode::Notes(key);
        }
    }

    /// Close the focused note editor, saving unsaved changes
    pub fn close_notes(&mut self) {
        let Mode::Notes(key) = std::mem::take(&mut self.mode) else {
            return;
        };
        self.notes.toggle(&key, false, &mut self.store, &self.remote);
    }

    /// Return focus to the list, leaving the note editor open
    pub fn blur_notes(&mut self) {
        let Mode::Notes(key) = std::mem::take(&mut self.mode) else {
            return;
        };
        self.notes.blur(&key, &mut self.store, &self.remote);
    }

    pub fn edit_note_draft(&mut self, edit: impl FnOnce(&mut String)) {
        let Mode::Notes(key) = &self.mode else {
            return;
        };
        let mut draft = self.notes.session(key).map(|s| s.draft().to_string()).unwrap_or_default();
        edit(&mut draft);
        self.notes.on_change(key, draft);
    }

    pub fn open_search(&mut self) {
        self.mode = Mode::Search;
    }

    /// Leave the search box, keeping the filter
    pub fn close_search(&mut self) {
        self.mode = Mode::Normal;
    }

    pub fn clear_search(&mut self) {
        self.search_query.clear();
        self.cursor_position = 0;
        self.mode = Mode::Normal;
    }

    pub fn update_search_query(&mut self, ch: char) {
        self.search_query.push(ch);
        self.cursor_position = 0;
    }

    pub fn backspace_search_query(&mut self) {
        self.search_query.pop();
        self.cursor_position = 0;
    }

    pub fn toggle_grouping(&mut self) {
        let selected = self.selected_key();
        self.group_by_priority = !self.group_by_priority;
        if let Some(key) = selected {
            self.select_key(&key);
        }
    }

    pub fn calendar_prev_month(&mut self) {
        self.calendar.prev_month();
        self.calendar_cursor = self.calendar.month().first_day();
        self.cursor_position = 0;
    }

    pub fn calendar_next_month(&mut self) {
        self.calendar.next_month();
        self.calendar_cursor = self.calendar.month().first_day();
        self.cursor_position = 0;
    }

    /// Move the calendar cursor, following it into neighbouring months
    pub fn calendar_move_day(&mut self, delta: i64) {
        let target = self.calendar_cursor + Duration::days(delta);
        while target < self.calendar.month().first_day() {
            self.calendar.prev_month();
            self.cursor_position = 0;
        }
        while target > self.calendar.month().last_day() {
            self.calendar.next_month();
            self.cursor_position = 0;
        }
        self.calendar_cursor = target;
    }

    /// Select the day under the calendar cursor, or clear it if selected
    pub fn calendar_select_cursor(&mut self) {
        self.calendar.toggle(self.calendar_cursor);
        self.cursor_position = 0;
    }

    pub fn open_help(&mut self) {
        self.mode = Mode::Help;
    }

    pub fn close_help(&mut self) {
        self.mode = Mode::Normal;
    }

    /// Flush pending notes and stop syncing before exit
    pub fn quit(&mut self) {
        let saved = self.notes.teardown(&self.remote);
        self.sync.teardown();
        tracing::info!(saved_notes = saved, "shutting down");
        self.should_quit = true;
    }
}
