use chrono::{DateTime, Utc};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::plan::PlanStep;
use crate::record::RecordKind;
use crate::task::{self, Task, TaskStatus};

use super::app::{AppState, DeleteConfirmState, Pane, StatusKind};
use super::editor::{EditorFieldId, EditorState};

const STATUS_WIDTH: usize = 6;
const HELP_KEY_WIDTH: usize = 14;
const LABEL_WIDTH: usize = 13;
const COLOR_TEXT: Color = Color::Rgb(234, 236, 239);
const COLOR_MUTED: Color = Color::Rgb(160, 165, 172);
const COLOR_MUTED_DARK: Color = Color::Rgb(118, 124, 130);
const COLOR_BG_MUTED: Color = Color::Rgb(52, 56, 60);
const COLOR_INFO: Color = Color::Rgb(116, 198, 219);
const COLOR_WARNING: Color = Color::Rgb(244, 200, 98);
const COLOR_ERROR: Color = Color::Rgb(255, 107, 107);
const COLOR_SUCCESS: Color = Color::Rgb(126, 210, 146);
const COLOR_ACCENT: Color = Color::Rgb(122, 170, 255);
const COLOR_BORDER_LIST: Color = Color::Rgb(92, 126, 166);
const COLOR_BORDER_DETAIL: Color = Color::Rgb(180, 156, 92);
const COLOR_MAGENTA: Color = Color::Rgb(214, 140, 230);

pub fn render(frame: &mut Frame, app: &AppState) {
    let area = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(area);
    let main = chunks[0];
    let footer = chunks[1];

    let left = if app.notes_visible {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)].as_ref())
            .split(main);
        render_notes(frame, app, columns[1]);
        columns[0]
    } else {
        main
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)].as_ref())
        .split(left);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)].as_ref())
        .split(rows[0]);

    render_task_list(frame, app, top[0]);
    render_task_detail(frame, app, top[1]);
    render_plan(frame, app, rows[1]);
    render_footer(frame, app, footer);

    if let Some(editor) = app.editor.as_ref() {
        render_editor_modal(frame, area, editor);
    }
    if let Some(state) = app.delete_confirm.as_ref() {
        render_delete_confirm_modal(frame, area, state);
    }
    if app.show_help {
        render_help_modal(frame, area);
    }
}

fn pane_block(title: String, focused: bool, color: Color) -> Block<'static> {
    let border = if focused { COLOR_ACCENT } else { color };
    let mut title_style = Style::default().fg(border);
    if focused {
        title_style = title_style.add_modifier(Modifier::BOLD);
    }
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(title, title_style))
        .border_style(Style::default().fg(border))
}

fn render_task_list(frame: &mut Frame, app: &AppState, area: Rect) {
    let tasks = app.api.tasks();
    let content_width = area.width.saturating_sub(2) as usize;
    let mut lines = Vec::new();

    if tasks.is_empty() {
        lines.push(Line::from(Span::styled(
            "No tasks (n to add)",
            Style::default().fg(COLOR_MUTED_DARK),
        )));
    } else {
        let height = area.height.saturating_sub(2) as usize;
        let (start, end) = list_window(tasks.len(), Some(app.task_selected), height);
        for (idx, task) in tasks.iter().enumerate().take(end).skip(start) {
            let selected = app.focus == Pane::Tasks && idx == app.task_selected;
            lines.push(render_task_row(task, selected, content_width));
        }
    }

    let widget = Paragraph::new(lines).block(pane_block(
        format!("Tasks ({})", tasks.len()),
        app.focus == Pane::Tasks,
        COLOR_BORDER_LIST,
    ));
    frame.render_widget(widget, area);
}

fn render_task_row(task: &Task, selected: bool, width: usize) -> Line<'static> {
    let status = pad_text(status_label(task.status), STATUS_WIDTH);
    let priority = format!("P{}", task.priority);
    let title_width = width.saturating_sub(STATUS_WIDTH + priority.len() + 3);
    let mut title_style = Style::default().fg(COLOR_TEXT);
    if task.status == TaskStatus::Completed {
        title_style = title_style.fg(COLOR_MUTED_DARK);
    }
    if selected {
        title_style = title_style.bg(COLOR_BG_MUTED).add_modifier(Modifier::BOLD);
    }
    Line::from(vec![
        Span::styled(status, status_style(task.status)),
        Span::raw(" "),
        Span::styled(priority, Style::default().fg(priority_color(task.priority))),
        Span::raw(" "),
        Span::styled(truncate_text(&task.title, title_width), title_style),
    ])
}

fn render_task_detail(frame: &mut Frame, app: &AppState, area: Rect) {
    let mut lines = Vec::new();
    match app.selected_task() {
        None => lines.push(Line::from(Span::styled(
            "No task selected",
            Style::default().fg(COLOR_MUTED_DARK),
        ))),
        Some(task) => {
            lines.push(Line::from(Span::styled(
                task.title.clone(),
                Style::default().fg(COLOR_TEXT).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                label_span("ID"),
                Span::styled(task.id.clone(), id_style()),
            ]));
            lines.push(Line::from(vec![
                label_span("Status"),
                Span::styled(task.status.as_str().to_string(), status_style(task.status)),
            ]));
            lines.push(Line::from(vec![
                label_span("Priority"),
                Span::styled(
                    format!("{} ({})", task.priority, task::priority_label(task.priority)),
                    Style::default().fg(priority_color(task.priority)),
                ),
            ]));
            lines.push(Line::from(vec![
                label_span("Created"),
                Span::styled(format_timestamp(task.created_at), Style::default().fg(COLOR_MUTED)),
            ]));
            lines.push(Line::from(vec![
                label_span("Updated"),
                Span::styled(format_timestamp(task.updated_at), Style::default().fg(COLOR_MUTED)),
            ]));
            if !task.description.trim().is_empty() {
                lines.push(Line::from(""));
                lines.push(section_header("Description"));
                for line in task.description.lines() {
                    lines.push(Line::from(Span::styled(
                        line.to_string(),
                        Style::default().fg(COLOR_TEXT),
                    )));
                }
            }
        }
    }

    let widget = Paragraph::new(lines)
        .block(pane_block("Details".to_string(), false, COLOR_BORDER_DETAIL))
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, area);
}

fn render_plan(frame: &mut Frame, app: &AppState, area: Rect) {
    let steps = app.api.plan_steps();
    let content_width = area.width.saturating_sub(2) as usize;
    let mut lines = Vec::new();

    if steps.is_empty() {
        lines.push(Line::from(Span::styled(
            "No plan steps (n to add)",
            Style::default().fg(COLOR_MUTED_DARK),
        )));
    } else {
        let height = area.height.saturating_sub(2) as usize;
        let (start, end) = list_window(steps.len(), Some(app.step_selected), height);
        for (idx, step) in steps.iter().enumerate().take(end).skip(start) {
            let selected = app.focus == Pane::Plan && idx == app.step_selected;
            lines.push(render_step_row(step, selected, content_width));
            if idx == app.step_selected && app.show_step_details {
                append_step_details(&mut lines, step, content_width);
            }
        }
    }

    let done = steps.iter().filter(|step| step.completed).count();
    let widget = Paragraph::new(lines).block(pane_block(
        format!("Plan ({done}/{})", steps.len()),
        app.focus == Pane::Plan,
        COLOR_BORDER_LIST,
    ));
    frame.render_widget(widget, area);
}

fn render_step_row(step: &PlanStep, selected: bool, width: usize) -> Line<'static> {
    let (mark, mark_color) = if step.completed {
        ("[x]", COLOR_SUCCESS)
    } else {
        ("[ ]", COLOR_MUTED)
    };
    let position = format!("{:>2}.", step.order + 1);
    let name_width = width.saturating_sub(mark.len() + position.len() + 2);
    let mut name_style = Style::default().fg(COLOR_TEXT);
    if step.completed {
        name_style = name_style
            .fg(COLOR_MUTED_DARK)
            .add_modifier(Modifier::CROSSED_OUT);
    }
    if selected {
        name_style = name_style.bg(COLOR_BG_MUTED).add_modifier(Modifier::BOLD);
    }
    Line::from(vec![
        Span::styled(mark, Style::default().fg(mark_color)),
        Span::raw(" "),
        Span::styled(position, Style::default().fg(COLOR_MUTED_DARK)),
        Span::raw(" "),
        Span::styled(truncate_text(&step.name, name_width), name_style),
    ])
}

fn append_step_details(lines: &mut Vec<Line<'static>>, step: &PlanStep, width: usize) {
    let indent = "      ";
    let text_width = width.saturating_sub(indent.len());
    let description = if step.description.trim().is_empty() {
        "(no description)".to_string()
    } else {
        step.description.clone()
    };
    lines.push(Line::from(vec![
        Span::raw(indent),
        Span::styled(
            truncate_text(&description, text_width),
            Style::default().fg(COLOR_INFO),
        ),
    ]));
    for line in step.details.lines() {
        lines.push(Line::from(vec![
            Span::raw(indent),
            Span::styled(truncate_text(line, text_width), Style::default().fg(COLOR_MUTED)),
        ]));
    }
}

fn render_notes(frame: &mut Frame, app: &AppState, area: Rect) {
    let notes = app.api.get_notes();
    let lines: Vec<Line<'static>> = if notes.trim().is_empty() {
        vec![Line::from(Span::styled(
            "No notes (e to edit)",
            Style::default().fg(COLOR_MUTED_DARK),
        ))]
    } else {
        notes
            .lines()
            .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(COLOR_TEXT))))
            .collect()
    };
    let widget = Paragraph::new(lines)
        .block(pane_block(
            "Notes".to_string(),
            app.focus == Pane::Notes,
            COLOR_BORDER_DETAIL,
        ))
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, area);
}

fn render_footer(frame: &mut Frame, app: &AppState, area: Rect) {
    let hint_span = Span::styled(app.footer_hint(), Style::default().fg(COLOR_INFO));
    let line = if let Some((status, kind)) = app.status_line() {
        let status_style = match kind {
            StatusKind::Error => Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
            StatusKind::Info => Style::default().fg(COLOR_WARNING),
        };
        Line::from(vec![
            hint_span,
            Span::raw("  |  "),
            Span::styled(status, status_style),
        ])
    } else {
        Line::from(hint_span)
    };
    let counts_line = Line::from(Span::styled(
        app.count_summary(),
        Style::default().fg(COLOR_ACCENT),
    ));
    let widget = Paragraph::new(vec![line, counts_line])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(COLOR_BORDER_LIST)),
        );
    frame.render_widget(widget, area);
}

fn render_editor_modal(frame: &mut Frame, area: Rect, editor: &EditorState) {
    let content_width = area.width.saturating_sub(8).min(72);
    let height = (editor.fields().len() as u16 * 2 + 6).min(area.height.saturating_sub(2));
    let modal = centered_rect(content_width, height, area);
    frame.render_widget(Clear, modal);

    let width = content_width.saturating_sub(2) as usize;
    let lines = if editor.confirming() {
        build_confirm_lines(editor, width)
    } else {
        build_editor_lines(editor, width)
    };
    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(editor.kind().title())
                .border_style(Style::default().fg(COLOR_BORDER_DETAIL)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, modal);
}

fn build_editor_lines(editor: &EditorState, width: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let value_width = width.saturating_sub(LABEL_WIDTH);
    for (idx, field) in editor.fields().iter().enumerate() {
        let is_active = idx == editor.active_index();
        let label_style = if is_active {
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_MUTED_DARK)
        };
        let mut spans = vec![Span::styled(pad_text(field.label, LABEL_WIDTH), label_style)];

        if field.value.is_empty() && !is_active {
            let placeholder = if field.required {
                Some("<required>".to_string())
            } else if field.id == EditorFieldId::Priority {
                editor
                    .default_priority()
                    .map(|priority| format!("(default {priority})"))
            } else if field.id == EditorFieldId::Status {
                Some("(default)".to_string())
            } else {
                None
            };
            if let Some(placeholder) = placeholder {
                spans.push(Span::styled(placeholder, Style::default().fg(COLOR_MUTED_DARK)));
            }
        } else {
            let shown = tail_text(&field.value, value_width.saturating_sub(1));
            spans.push(Span::styled(shown, Style::default().fg(COLOR_TEXT)));
            if is_active {
                spans.push(Span::styled(
                    " ",
                    Style::default().add_modifier(Modifier::REVERSED),
                ));
            }
        }
        lines.push(Line::from(spans));
        if field.id == EditorFieldId::Priority && is_active {
            lines.push(Line::from(Span::styled(
                format!(
                    "{}{}-{} or high/medium/low",
                    " ".repeat(LABEL_WIDTH),
                    task::MIN_PRIORITY,
                    task::MAX_PRIORITY
                ),
                Style::default().fg(COLOR_MUTED_DARK),
            )));
        }
        if field.id == EditorFieldId::Status && is_active {
            lines.push(Line::from(Span::styled(
                format!("{}not_started/in_progress/completed", " ".repeat(LABEL_WIDTH)),
                Style::default().fg(COLOR_MUTED_DARK),
            )));
        }
    }

    if let Some(error) = editor.error() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "enter next/confirm  tab field  ctrl+u clear  esc cancel",
        Style::default().fg(COLOR_MUTED_DARK),
    )));
    lines
}

fn build_confirm_lines(editor: &EditorState, width: usize) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(
            "Save these values?",
            Style::default()
                .fg(COLOR_WARNING)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    let value_width = width.saturating_sub(LABEL_WIDTH);
    for field in editor.fields() {
        let value = if field.value.trim().is_empty() {
            Span::styled("-", Style::default().fg(COLOR_MUTED_DARK))
        } else {
            Span::styled(
                truncate_text(field.value.trim(), value_width),
                Style::default().fg(COLOR_TEXT),
            )
        };
        lines.push(Line::from(vec![
            Span::styled(
                pad_text(field.label, LABEL_WIDTH),
                Style::default().fg(COLOR_MUTED_DARK),
            ),
            value,
        ]));
    }
    if let Some(error) = editor.error() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(COLOR_ERROR),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "y/enter save  e/backspace edit  esc cancel",
        Style::default().fg(COLOR_MUTED_DARK),
    )));
    lines
}

fn render_delete_confirm_modal(frame: &mut Frame, area: Rect, state: &DeleteConfirmState) {
    let content_width = area.width.saturating_sub(8).min(64);
    let height = 8u16.min(area.height.saturating_sub(4).max(6));
    let modal = centered_rect(content_width, height, area);
    frame.render_widget(Clear, modal);

    let (heading, title) = match state.kind {
        RecordKind::Task => ("Delete task?", "Delete Task"),
        RecordKind::PlanStep => ("Delete plan step?", "Delete Step"),
    };
    let label_width = (content_width as usize).saturating_sub(10);
    let lines = vec![
        Line::from(Span::styled(
            heading,
            Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("ID: ", Style::default().fg(COLOR_MUTED_DARK)),
            Span::styled(state.id.clone(), id_style()),
        ]),
        Line::from(vec![
            Span::styled("Name: ", Style::default().fg(COLOR_MUTED_DARK)),
            Span::styled(
                truncate_text(&state.label, label_width),
                Style::default().fg(COLOR_TEXT),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "y/enter confirm  esc/n cancel",
            Style::default().fg(COLOR_MUTED_DARK),
        )),
    ];

    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: true });
    frame.render_widget(widget, modal);
}

fn render_help_modal(frame: &mut Frame, area: Rect) {
    let content_width = area.width.saturating_sub(8).min(56);
    let width = content_width.saturating_sub(2) as usize;
    let lines = build_help_lines(width);
    let height = (lines.len() as u16 + 2).min(area.height.saturating_sub(2));
    let modal = centered_rect(content_width, height, area);
    frame.render_widget(Clear, modal);
    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Help")
            .border_style(Style::default().fg(COLOR_INFO)),
    );
    frame.render_widget(widget, modal);
}

fn build_help_lines(width: usize) -> Vec<Line<'static>> {
    vec![
        help_header("Everywhere"),
        help_line("tab/shift+tab", "next or previous pane", width),
        help_line("ctrl+x", "show or hide notes", width),
        help_line("r", "reload from disk", width),
        help_line("q", "save and quit", width),
        help_line("?/esc", "hide help", width),
        help_header("Tasks"),
        help_line("j/k or up/down", "move selection", width),
        help_line("space", "next status", width),
        help_line("n / e", "new or edit task", width),
        help_line("d", "delete task", width),
        help_header("Plan"),
        help_line("space", "toggle completed", width),
        help_line("enter", "show or hide details", width),
        help_line("n / e", "new or edit step", width),
        help_line("K / J", "move step up or down", width),
        help_line("D", "delete step", width),
        help_header("Notes"),
        help_line("e", "edit in $EDITOR", width),
    ]
}

fn help_header(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        title.to_string(),
        Style::default().fg(COLOR_MAGENTA).add_modifier(Modifier::BOLD),
    ))
}

fn help_line(keys: &str, desc: &str, width: usize) -> Line<'static> {
    let key_text = pad_text(keys, HELP_KEY_WIDTH.min(width));
    let desc_width = width.saturating_sub(HELP_KEY_WIDTH + 1);
    let desc_text = truncate_text(desc, desc_width);
    Line::from(vec![
        Span::styled(
            key_text,
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(desc_text, Style::default().fg(COLOR_MUTED)),
    ])
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn list_window(total: usize, selected: Option<usize>, height: usize) -> (usize, usize) {
    if total == 0 || height == 0 {
        return (0, 0);
    }
    if total <= height {
        return (0, total);
    }
    let selected = selected.unwrap_or(0);
    let mut start = selected.saturating_sub(height / 2);
    if start + height > total {
        start = total - height;
    }
    (start, start + height)
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::NotStarted => "TODO",
        TaskStatus::InProgress => "PROG",
        TaskStatus::Completed => "DONE",
    }
}

fn status_style(status: TaskStatus) -> Style {
    let (fg, bg) = match status {
        TaskStatus::NotStarted => (Color::Rgb(80, 250, 123), Color::Rgb(26, 61, 42)),
        TaskStatus::InProgress => (Color::Rgb(139, 233, 253), Color::Rgb(26, 51, 68)),
        TaskStatus::Completed => (Color::Rgb(98, 114, 164), Color::Rgb(42, 42, 61)),
    };
    Style::default().fg(fg).bg(bg)
}

fn priority_color(priority: u8) -> Color {
    match priority {
        1 => Color::Rgb(255, 147, 112),
        2 => COLOR_WARNING,
        3 => COLOR_ACCENT,
        _ => COLOR_INFO,
    }
}

fn pad_text(value: &str, width: usize) -> String {
    let text = truncate_text(value, width);
    format!("{text:width$}")
}

fn truncate_text(value: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= max {
        return value.to_string();
    }
    if max <= 3 {
        return chars[..max].iter().collect();
    }
    let mut out: String = chars[..(max - 3)].iter().collect();
    out.push_str("...");
    out
}

/// Keep the end of `value` visible while typing
fn tail_text(value: &str, max: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= max {
        return value.to_string();
    }
    chars[chars.len() - max..].iter().collect()
}

fn format_timestamp(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M").to_string()
}

fn label_span(label: &str) -> Span<'static> {
    Span::styled(pad_text(label, 10), Style::default().fg(COLOR_MUTED_DARK))
}

fn section_header(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        title.to_string(),
        Style::default()
            .fg(COLOR_MAGENTA)
            .add_modifier(Modifier::BOLD),
    ))
}

fn id_style() -> Style {
    Style::default()
        .fg(COLOR_MUTED)
        .add_modifier(Modifier::BOLD)
}
