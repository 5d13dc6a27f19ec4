use anyhow::Result;
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind};
use std::time::Duration;

use crate::app::{AddField, App, EditField, Mode};
use crate::config::Action;

/// Terminal events
#[derive(Debug, Clone, Copy)]
pub enum Event {
    /// Key press event
    Key(KeyEvent),
    /// Nothing happened within the tick interval
    Tick,
    /// Mouse event
    Mouse(MouseEvent),
}

/// Event handler for the terminal
pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new(tick_rate_ms: u64) -> Self {
        Self {
            tick_rate: Duration::from_millis(tick_rate_ms),
        }
    }

    /// Poll for the next event
    pub fn next(&self) -> Result<Event> {
        if event::poll(self.tick_rate)? {
            match event::read()? {
                CEvent::Key(key) => return Ok(Event::Key(key)),
                CEvent::Mouse(m) => return Ok(Event::Mouse(m)),
                _ => {}
            }
        }
        Ok(Event::Tick)
    }
}

fn is_text_input(key: &KeyEvent) -> bool {
    // Allow AltGr combinations (CONTROL+ALT) for special characters
    !key.modifiers.contains(KeyModifiers::CONTROL) || key.modifiers.contains(KeyModifiers::ALT)
}

/// Handle key events for the application
pub fn handle_key_event(key: KeyEvent, app: &mut App) {
    // On Windows, crossterm reports both key press and release events.
    if key.kind != KeyEventKind::Press {
        return;
    }

    match app.mode {
        Mode::Help => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.close_help();
            }
        }
        Mode::Search => handle_search_input(key, app),
        Mode::ConfirmDelete(_) => match key.code {
            KeyCode::Char('y') | KeyCode::Enter => app.confirm_delete(),
            KeyCode::Char('n') | KeyCode::Esc => app.cancel_delete(),
            _ => {}
        },
        Mode::Adding(_) => handle_add_input(key, app),
        Mode::Editing(_) => handle_edit_input(key, app),
        Mode::Notes(_) => handle_notes_input(key, app),
        Mode::Normal => {
            if let Some(action) = app.config.keymap.action_for(&key) {
                dispatch(action, app);
            } else if key.code == KeyCode::Esc {
                app.clear_status();
            }
        }
    }
}

fn dispatch(action: Action, app: &mut App) {
    match action {
        Action::Quit => app.quit(),
        Action::CursorUp => app.move_cursor_up(),
        Action::CursorDown => app.move_cursor_down(),
        Action::ToggleComplete => app.toggle_selected_complete(),
        Action::Edit => app.start_editing(),
        Action::Add => app.start_adding(),
        Action::Delete => app.initiate_delete(),
        Action::MoveUp => app.move_selected_up(),
        Action::MoveDown => app.move_selected_down(),
        Action::ToggleNotes => app.toggle_selected_notes(),
        Action::Search => app.open_search(),
        Action::ToggleGrouping => app.toggle_grouping(),
        Action::PrevMonth => app.calendar_prev_month(),
        Action::NextMonth => app.calendar_next_month(),
        Action::CalendarLeft => app.calendar_move_day(-1),
        Action::CalendarRight => app.calendar_move_day(1),
        Action::CalendarUp => app.calendar_move_day(-7),
        Action::CalendarDown => app.calendar_move_day(7),
        Action::SelectDay => app.calendar_select_cursor(),
        Action::Help => app.open_help(),
    }
}

fn handle_search_input(key: KeyEvent, app: &mut App) {
    match key.code {
        KeyCode::Esc => app.clear_search(),
        KeyCode::Enter => app.close_search(),
        KeyCode::Backspace => app.backspace_search_query(),
        KeyCode::Char(c) if is_text_input(&key) => app.update_search_query(c),
        _ => {}
    }
}

fn handle_add_input(key: KeyEvent, app: &mut App) {
    let in_notes = matches!(&app.mode, Mode::Adding(form) if form.field == AddField::Notes);
    match key.code {
        KeyCode::Esc => return app.cancel_form(),
        // Enter breaks the line inside notes and submits everywhere else
        KeyCode::Enter if !in_notes => return app.commit_add(),
        _ => {}
    }
    let Mode::Adding(form) = &mut app.mode else {
        return;
    };
    match key.code {
        KeyCode::Enter => form.notes.push('\n'),
        KeyCode::Tab => form.field = form.field.next(),
        KeyCode::BackTab => form.field = form.field.prev(),
        KeyCode::Backspace => {
            if let Some(buffer) = form.buffer_mut() {
                buffer.pop();
            }
        }
        KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') if form.field == AddField::Priority => {
            form.priority = form.priority.cycle();
        }
        KeyCode::Char(c) if is_text_input(&key) => {
            if let Some(buffer) = form.buffer_mut() {
                buffer.push(c);
            }
        }
        _ => {}
    }
}

fn handle_edit_input(key: KeyEvent, app: &mut App) {
    match key.code {
        KeyCode::Esc => return app.cancel_form(),
        KeyCode::Enter => return app.commit_edit(),
        _ => {}
    }
    let Mode::Editing(form) = &mut app.mode else {
        return;
    };
    match key.code {
        KeyCode::Tab | KeyCode::BackTab => {
            form.field = match form.field {
                EditField::Text => EditField::Priority,
                EditField::Priority => EditField::Text,
            };
        }
        KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') if form.field == EditField::Priority => {
            form.priority = form.priority.cycle();
        }
        KeyCode::Backspace if form.field == EditField::Text => {
            form.text.pop();
        }
        KeyCode::Char(c) if form.field == EditField::Text && is_text_input(&key) => form.text.push(c),
        _ => {}
    }
}

fn handle_notes_input(key: KeyEvent, app: &mut App) {
    match key.code {
        KeyCode::Esc => app.close_notes(),
        KeyCode::Tab => app.blur_notes(),
        KeyCode::Enter => app.edit_note_draft(|draft| draft.push('\n')),
        KeyCode::Backspace => app.edit_note_draft(|draft| {
            draft.pop();
        }),
        KeyCode::Char(c) if is_text_input(&key) => app.edit_note_draft(|draft| draft.push(c)),
        _ => {}
    }
}

/// Scroll wheel moves the cursor
pub fn handle_mouse_event(mouse: MouseEvent, app: &mut App) {
    if app.mode != Mode::Normal {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollUp => app.move_cursor_up(),
        MouseEventKind::ScrollDown => app.move_cursor_down(),
        _ => {}
    }
}
