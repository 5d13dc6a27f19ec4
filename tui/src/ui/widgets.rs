use crate::app::{AddField, AddForm, App, EditField, EditForm, Mode};
use chrono::{Datelike, NaiveDate, Utc};
use dayboard_core::{
    calendar::{tasks_in_month, tasks_on},
    models::{Task, TaskKey, TaskPriority},
    view::DisplayList,
};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

fn priority_color(priority: TaskPriority) -> Color {
    match priority {
        TaskPriority::High => Color::Red,
        TaskPriority::Medium => Color::Yellow,
        TaskPriority::Low => Color::Green,
    }
}

fn section_style() -> Style {
    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
}

/// A centred rectangle clipped to `area`
fn popup_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}

/// Render the header with title and key hints
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let title = match &app.session {
        Some(session) => format!(" Dayboard · {} ", session.display()),
        None => " Dayboard ".to_string(),
    };

    let key_hints = match app.mode {
        Mode::Adding(_) | Mode::Editing(_) => " [Enter:Save] [Esc:Cancel] [Tab:Next field] [←/→:Priority] ",
        Mode::Notes(_) => " [Esc:Close notes] [Tab:Back to list] [Typing...] ",
        Mode::Search => " [Enter:Keep filter] [Esc:Clear] [Type to search] ",
        Mode::ConfirmDelete(_) => " [y:Delete] [n:Keep] ",
        Mode::Help => " [Esc:Close help] ",
        Mode::Normal => {
            " [q:Quit] [?:Help] [a:Add] [Enter:Edit] [x:Done] [d:Del] [o:Notes] [Alt+↑/↓:Move] [/:Search] [g:Group] [c:Pick day] "
        }
    };

    let header_spans = vec![
        Span::styled(title, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw(" | "),
        Span::styled(key_hints, Style::default().fg(Color::DarkGray)),
    ];

    let header = Paragraph::new(Line::from(header_spans))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Left);

    frame.render_widget(header, area);
}

fn date_label(task: &Task) -> Option<String> {
    let (start, end) = task.day_span()?;
    if start == end {
        Some(start.format("%b %-d").to_string())
    } else {
        Some(format!("{} – {}", start.format("%b %-d"), end.format("%b %-d")))
    }
}

fn task_line(task: &Task, selected: bool) -> Line<'static> {
    let checkbox = if task.is_complete { "[x] " } else { "[ ] " };
    let mut text_style = Style::default().fg(Color::White);
    if task.is_complete {
        text_style = text_style.fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT);
    }

    let mut spans = vec![
        Span::styled("● ", Style::default().fg(priority_color(task.priority))),
        Span::raw(checkbox),
        Span::styled(task.text.clone(), text_style),
    ];
    if let Some(label) = date_label(task) {
        spans.push(Span::styled(format!("  {}", label), Style::default().fg(Color::Cyan)));
    }
    if task.has_notes() {
        spans.push(Span::styled("  ✎", Style::default().fg(Color::DarkGray)));
    }
    if !task.is_persisted() {
        spans.push(Span::styled("  (saving…)", Style::default().fg(Color::DarkGray)));
    }

    let line = Line::from(spans);
    if selected {
        line.style(Style::default().bg(Color::Blue).fg(Color::White))
    } else {
        line
    }
}

/// Lines of the inline note editor shown under a task
fn note_editor_lines(app: &App, key: &TaskKey) -> Vec<Line<'static>> {
    let Some(session) = app.notes.session(key) else {
        return Vec::new();
    };
    let focused = app.mode == Mode::Notes(key.clone());
    let border = Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray });

    let mut heading = vec![Span::styled("    ┌ Notes", border)];
    if session.is_dirty() {
        heading.push(Span::styled(" (unsaved)", Style::default().fg(Color::Yellow)));
    }
    let mut lines = vec![Line::from(heading)];

    let draft = session.draft();
    let mut rows: Vec<&str> = draft.split('\n').collect();
    if draft.is_empty() && !focused {
        rows = vec![""];
    }
    let last = rows.len().saturating_sub(1);
    for (i, row) in rows.into_iter().enumerate() {
        let mut spans = vec![Span::styled("    │ ", border), Span::raw(row.to_string())];
        if focused && i == last {
            spans.push(Span::styled("▏", Style::default().fg(Color::Cyan)));
        }
        lines.push(Line::from(spans));
    }
    lines
}

/// Render the task list, grouped by priority or flat
pub fn render_task_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(match app.calendar.selected() {
        Some(day) => format!(" Tasks · {} ", day.format("%a %b %-d")),
        None => " Tasks ".to_string(),
    });

    let empty_message = if app.session.is_none() {
        Some("Not logged in. Start dayboard with --email and --password.")
    } else if app.sync.is_loading() {
        Some("Loading tasks…")
    } else if app.store.is_empty() {
        Some("No tasks yet. Press 'a' to add one.")
    } else if app.visible_tasks().is_empty() {
        Some("No tasks match the current filter.")
    } else {
        None
    };
    if let Some(message) = empty_message {
        let paragraph = Paragraph::new(message)
            .block(block)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, area);
        return;
    }

    // Build all lines, remembering where the selected task lands
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut selected_line = 0;
    let mut row = 0;
    {
        let mut push_task = |lines: &mut Vec<Line<'static>>, task: &Task| {
            let selected = row == app.cursor_position;
            if selected {
                selected_line = lines.len();
            }
            lines.push(task_line(task, selected));
            if app.notes.is_open(&task.key()) {
                lines.extend(note_editor_lines(app, &task.key()));
            }
            row += 1;
        };

        match app.display_list() {
            DisplayList::Flat(tasks) => {
                for task in tasks {
                    push_task(&mut lines, task);
                }
            }
            DisplayList::Grouped(groups) => {
                for group in groups {
                    if !lines.is_empty() {
                        lines.push(Line::from(""));
                    }
                    lines.push(Line::from(Span::styled(
                        format!("{} ({})", group.priority.label(), group.tasks.len()),
                        Style::default().fg(priority_color(group.priority)).add_modifier(Modifier::BOLD),
                    )));
                    for task in group.tasks {
                        push_task(&mut lines, task);
                    }
                }
            }
        }
    }

    // Keep the selected line on screen
    let height = area.height.saturating_sub(2) as usize;
    if selected_line < app.list_offset {
        app.list_offset = selected_line;
    } else if height > 0 && selected_line >= app.list_offset + height {
        app.list_offset = selected_line + 1 - height;
    }
    let visible: Vec<Line> = lines.into_iter().skip(app.list_offset).take(height).collect();

    frame.render_widget(Paragraph::new(visible).block(block), area);
}

pub fn render_search_bar(frame: &mut Frame, app: &App, area: Rect) {
    let active = app.mode == Mode::Search;
    let mut spans = vec![Span::styled("/ ", Style::default().fg(Color::DarkGray)), Span::raw(app.search_query.clone())];
    if active {
        spans.push(Span::styled("▏", Style::default().fg(Color::Cyan)));
    }
    let border = if active { Color::Cyan } else { Color::DarkGray };
    let input = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title(" Search ").border_style(Style::default().fg(border)));
    frame.render_widget(input, area);
}

/// Month grid, Sunday first. Days with tasks are highlighted.
pub fn render_calendar(frame: &mut Frame, app: &App, area: Rect) {
    let month = app.calendar.month();
    let tasks = app.store.tasks();
    let today = Utc::now().date_naive();

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(month.title(), section_style())));
    lines.push(Line::from(" Su Mo Tu We Th Fr Sa"));

    let blanks = month.leading_blanks() as usize;
    let mut cells: Vec<Option<NaiveDate>> = vec![None; blanks];
    cells.extend(month.days().into_iter().map(Some));

    for week in cells.chunks(7) {
        let mut spans: Vec<Span> = Vec::new();
        for cell in week {
            spans.push(Span::raw(" "));
            let Some(date) = cell else {
                spans.push(Span::raw("  "));
                continue;
            };
            let mut style = Style::default().fg(Color::White);
            if tasks_on(tasks, *date) > 0 {
                style = style.fg(Color::Green).add_modifier(Modifier::BOLD);
            }
            if *date == today {
                style = style.fg(Color::Cyan).add_modifier(Modifier::BOLD);
            }
            if app.calendar.selected() == Some(*date) {
                style = style.bg(Color::Blue).fg(Color::Black);
            }
            if *date == app.calendar_cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            spans.push(Span::styled(format!("{:>2}", date.day()), style));
        }
        lines.push(Line::from(spans));
    }

    let widget = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Calendar "));
    frame.render_widget(widget, area);
}

pub fn render_day_summary(frame: &mut Frame, app: &App, area: Rect) {
    let tasks = app.store.tasks();
    let cursor = app.calendar_cursor;
    let on_cursor = tasks_on(tasks, cursor);
    let in_month = tasks_in_month(tasks, app.calendar.month());

    let mut lines = vec![
        Line::from(format!("{}: {} task{}", cursor.format("%b %-d"), on_cursor, if on_cursor == 1 { "" } else { "s" })),
        Line::from(format!("This month: {}", in_month)),
        Line::from(""),
    ];
    match app.calendar.selected() {
        Some(day) => lines.push(Line::from(Span::styled(
            format!("Showing {}", day.format("%b %-d")),
            Style::default().fg(Color::Cyan),
        ))),
        None => lines.push(Line::from(Span::styled("Showing all days", Style::default().fg(Color::DarkGray)))),
    }
    lines.push(Line::from(Span::styled("[ ] month  c pick day", Style::default().fg(Color::DarkGray))));

    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    frame.render_widget(widget, area);
}

pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status_text = if let Some(message) = &app.status_message {
        format!(" {} ", message)
    } else {
        let tasks = app.store.tasks();
        let done = tasks.iter().filter(|t| t.is_complete).count();
        let mut text = format!(" {} tasks | {} done | {} shown", tasks.len(), done, app.visible_tasks().len());
        if app.group_by_priority {
            text.push_str(" | grouped");
        }
        if !app.search_query.is_empty() {
            text.push_str(&format!(" | search: {}", app.search_query));
        }
        text.push(' ');
        text
    };

    let status_bar = Paragraph::new(status_text)
        .style(Style::default().bg(Color::DarkGray).fg(Color::White))
        .alignment(Alignment::Center);

    frame.render_widget(status_bar, area);
}

fn form_field<'a>(label: &'a str, value: String, focused: bool) -> Line<'a> {
    let label_style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let mut spans = vec![Span::styled(format!("{:<10}", label), label_style), Span::raw(value)];
    if focused {
        spans.push(Span::styled("▏", Style::default().fg(Color::Cyan)));
    }
    Line::from(spans)
}

/// Multi-line field; continuation lines are indented under the first
fn notes_field(notes: &str, focused: bool) -> Vec<Line<'static>> {
    let mut rows = notes.split('\n');
    let first = rows.next().unwrap_or_default().to_string();
    let mut lines = vec![form_field("Notes", first, false)];
    lines.extend(rows.map(|row| Line::from(format!("{:<10}{}", "", row))));
    if focused {
        if let Some(last) = lines.last_mut() {
            last.spans.push(Span::styled("▏", Style::default().fg(Color::Cyan)));
        }
        if let Some(label) = lines.first_mut().and_then(|l| l.spans.first_mut()) {
            label.style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
        }
    }
    lines
}

fn priority_value(priority: TaskPriority) -> String {
    format!("‹ {} ›", priority.label())
}

pub fn render_add_form(frame: &mut Frame, form: &AddForm, area: Rect) {
    let mut lines = vec![
        form_field("Task", form.text.clone(), form.field == AddField::Text),
        form_field("Priority", priority_value(form.priority), form.field == AddField::Priority),
        form_field("Start", form.start.clone(), form.field == AddField::Start),
        form_field("End", form.end.clone(), form.field == AddField::End),
    ];
    lines.extend(notes_field(&form.notes, form.field == AddField::Notes));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Dates are YYYY-MM-DD. Leave start blank for today.",
        Style::default().fg(Color::DarkGray),
    )));
    lines.push(Line::from(Span::styled(
        "Enter in Notes starts a new line.",
        Style::default().fg(Color::DarkGray),
    )));

    let popup_area = popup_rect(area, 64, lines.len() as u16 + 2);
    let paragraph = Paragraph::new(lines).block(Block::default().title(" New task ").borders(Borders::ALL));
    frame.render_widget(Clear, popup_area);
    frame.render_widget(paragraph, popup_area);
}

pub fn render_edit_form(frame: &mut Frame, form: &EditForm, area: Rect) {
    let lines = vec![
        form_field("Task", form.text.clone(), form.field == EditField::Text),
        form_field("Priority", priority_value(form.priority), form.field == EditField::Priority),
    ];

    let popup_area = popup_rect(area, 64, lines.len() as u16 + 2);
    let paragraph = Paragraph::new(lines).block(Block::default().title(" Edit task ").borders(Borders::ALL));
    frame.render_widget(Clear, popup_area);
    frame.render_widget(paragraph, popup_area);
}

pub fn render_delete_confirmation(frame: &mut Frame, app: &App, key: &TaskKey, area: Rect) {
    let popup_area = popup_rect(area, 60, 5);

    let text = match app.store.get(key) {
        Some(task) => format!("Delete \"{}\"? (y/n)", task.text),
        None => "Delete this task? (y/n)".to_string(),
    };
    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .title("Confirm Deletion")
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Yellow)),
        )
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    frame.render_widget(Clear, popup_area);
    frame.render_widget(paragraph, popup_area);
}

pub fn render_help_screen(frame: &mut Frame, app: &App, size: Rect) {
    let keys = &app.config.keymap;
    let row = |key: &str, what: &str| Line::from(format!("{:<13}{}", key, what));
    let help_text = vec![
        Line::from(""),
        Line::from(Span::styled("Tasks", section_style())),
        row(&format!("{}/{}", keys.cursor_up, keys.cursor_down), "Move cursor"),
        row(&keys.add, "Add a task"),
        row(&keys.edit, "Edit text and priority"),
        row(&keys.toggle_complete, "Toggle completed"),
        row(&keys.delete, "Delete task"),
        row(&format!("{}/{}", keys.move_up, keys.move_down), "Reorder within the group"),
        Line::from(""),
        Line::from(Span::styled("Notes", section_style())),
        row(&keys.toggle_notes, "Open or focus notes"),
        row("Tab", "Back to the list (saves)"),
        row("Esc", "Close notes (saves)"),
        Line::from(""),
        Line::from(Span::styled("View", section_style())),
        row(&keys.search, "Search tasks"),
        row(&keys.toggle_grouping, "Group by priority"),
        Line::from(""),
        Line::from(Span::styled("Calendar", section_style())),
        row(&format!("{}/{}", keys.prev_month, keys.next_month), "Previous/next month"),
        row("shift-arrows", "Move day cursor"),
        row(&keys.select_day, "Show only that day"),
        Line::from(""),
        row(&keys.help, "Show this help"),
        row(&keys.quit, "Quit"),
        Line::from(""),
        Line::from(Span::styled("Press '?' or 'Esc' to close", Style::default().fg(Color::DarkGray))),
    ];

    let popup_area = popup_rect(size, 60, help_text.len() as u16 + 2);
    let block = Block::default()
        .title(" Help - Keyboard Shortcuts ")
        .borders(Borders::ALL)
        .style(Style::default().bg(Color::Black));

    let paragraph = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::White));

    frame.render_widget(Clear, popup_area);
    frame.render_widget(paragraph, popup_area);
}
