use crate::app::{App, Mode};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};

use super::{
    render_add_form, render_calendar, render_day_summary, render_delete_confirmation, render_edit_form,
    render_header, render_help_screen, render_search_bar, render_status_bar, render_task_list,
};

/// Render the complete UI
pub fn render(frame: &mut Frame, app: &mut App) {
    let size = frame.size();

    // Create main layout: header, content, status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(size);

    render_header(frame, app, chunks[0]);
    render_content(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    // Overlays (drawn last)
    match &app.mode {
        Mode::Adding(form) => render_add_form(frame, form, size),
        Mode::Editing(form) => render_edit_form(frame, form, size),
        Mode::ConfirmDelete(key) => render_delete_confirmation(frame, app, key, size),
        Mode::Help => render_help_screen(frame, app, size),
        Mode::Normal | Mode::Search | Mode::Notes(_) => {}
    }
}

/// Task list on the left, calendar column on the right
fn render_content(frame: &mut Frame, app: &mut App, area: Rect) {
    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Tasks
            Constraint::Length(30), // Calendar column
        ])
        .split(area);

    let show_search = app.mode == Mode::Search || !app.search_query.is_empty();
    let list_area = if show_search {
        let list_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(main_chunks[0]);
        render_search_bar(frame, app, list_chunks[0]);
        list_chunks[1]
    } else {
        main_chunks[0]
    };
    render_task_list(frame, app, list_area);

    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(11), // Month grid
            Constraint::Min(0),     // Counts
        ])
        .split(main_chunks[1]);
    render_calendar(frame, app, right_chunks[0]);
    render_day_summary(frame, app, right_chunks[1]);
}
