//! Building blocks shared by every screen: palette, flash messages,
//! confirmation dialogs and a simple keyboard-driven form.

use crate::models::AppointmentStatus;
use crate::tui::Frame;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};
use std::time::{Duration, Instant};
use time::PrimitiveDateTime;

pub const BG: Color = Color::Rgb(16, 16, 28);
pub const PANEL: Color = Color::Rgb(22, 22, 35);
pub const BORDER: Color = Color::Rgb(75, 75, 120);
pub const FOCUS: Color = Color::Rgb(250, 250, 110);
pub const TITLE: Color = Color::Rgb(230, 230, 250);
pub const TEXT: Color = Color::Rgb(220, 220, 240);
pub const MUTED: Color = Color::Rgb(180, 180, 200);
pub const HELP: Color = Color::Rgb(140, 140, 170);
pub const ACCENT: Color = Color::Rgb(129, 199, 245);
pub const SUCCESS: Color = Color::Rgb(140, 219, 140);
pub const ERROR: Color = Color::Rgb(255, 100, 100);
pub const HEADER_ROW: Color = Color::Rgb(80, 60, 130);
pub const SELECTED_ROW: Color = Color::Rgb(40, 40, 60);

/// How long a flash message stays on screen.
const FLASH_TIMEOUT: Duration = Duration::from_secs(5);

/// Fills the whole frame with the base background.
pub fn background(frame: &mut Frame) {
    frame.render_widget(Block::default().style(Style::default().bg(BG)), frame.area());
}

/// Screen title with a rule underneath.
pub fn header(frame: &mut Frame, area: Rect, title: &str) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(BORDER))
        .style(Style::default().bg(BG));
    frame.render_widget(block, area);

    let title = Paragraph::new(title.to_string())
        .style(Style::default().fg(TITLE).add_modifier(Modifier::BOLD).bg(BG))
        .alignment(Alignment::Center);
    frame.render_widget(title, area);
}

/// Rounded panel, highlighted when focused.
pub fn panel(title: &str, focused: bool) -> Block<'static> {
    Block::default()
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(TITLE).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(if focused { FOCUS } else { BORDER }))
        .style(Style::default().bg(PANEL))
}

pub fn help(frame: &mut Frame, area: Rect, text: &str) {
    let help = Paragraph::new(text.to_string())
        .style(Style::default().fg(HELP))
        .alignment(Alignment::Center);
    frame.render_widget(help, area);
}

/// A `► Label ◄` button.
pub fn button(frame: &mut Frame, area: Rect, label: &str, focused: bool, color: Color) {
    let (text, style) = if focused {
        (
            format!("► {label} ◄"),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )
    } else {
        (format!("  {label}  "), Style::default().fg(MUTED))
    };
    frame.render_widget(
        Paragraph::new(text).style(style).alignment(Alignment::Center),
        area,
    );
}

pub fn table_header(titles: &[&str]) -> Row<'static> {
    let cells = titles
        .iter()
        .map(|h| Cell::from(h.to_string()).style(Style::default().fg(TITLE)));
    Row::new(cells).style(Style::default().bg(HEADER_ROW)).height(1)
}

pub fn selected_row() -> Style {
    Style::default()
        .fg(FOCUS)
        .bg(SELECTED_ROW)
        .add_modifier(Modifier::BOLD)
}

/// Placeholder shown instead of an empty table.
pub fn empty_notice(frame: &mut Frame, area: Rect, title: &str, message: &str) {
    let notice = Paragraph::new(message.to_string())
        .style(Style::default().fg(TEXT))
        .alignment(Alignment::Center)
        .block(panel(title, false));
    frame.render_widget(notice, area);
}

pub fn status_color(status: AppointmentStatus) -> Color {
    match status {
        AppointmentStatus::Pending => Color::Rgb(230, 180, 80),
        AppointmentStatus::Approved => ACCENT,
        AppointmentStatus::Completed => SUCCESS,
        AppointmentStatus::Rejected => ERROR,
    }
}

pub fn format_slot(at: PrimitiveDateTime) -> String {
    format!(
        "{} {:02}:{:02}",
        at.date(),
        at.hour(),
        at.minute()
    )
}

pub fn select_next(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let next = match state.selected() {
        Some(i) if i + 1 < len => i + 1,
        _ => 0,
    };
    state.select(Some(next));
}

pub fn select_previous(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let previous = match state.selected() {
        Some(0) | None => len - 1,
        Some(i) => i - 1,
    };
    state.select(Some(previous));
}

/// Keeps the selection inside a list that may have shrunk.
pub fn clamp_selection(state: &mut TableState, len: usize) {
    match state.selected() {
        _ if len == 0 => state.select(None),
        Some(i) if i >= len => state.select(Some(len - 1)),
        None => state.select(Some(0)),
        _ => {}
    }
}

/// Helper function to create a centered rectangle.
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// A status line that disappears after a few seconds.
#[derive(Debug, Default)]
pub struct Flash {
    message: Option<(String, bool)>,
    shown_at: Option<Instant>,
}

impl Flash {
    pub fn error(&mut self, message: impl Into<String>) {
        self.message = Some((message.into(), true));
        self.shown_at = Some(Instant::now());
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.message = Some((message.into(), false));
        self.shown_at = Some(Instant::now());
    }

    pub fn clear(&mut self) {
        self.message = None;
        self.shown_at = None;
    }

    /// Hides the message once it has been shown long enough.
    pub fn expire(&mut self) {
        if let Some(time) = self.shown_at {
            if time.elapsed() >= FLASH_TIMEOUT {
                self.clear();
            }
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        if let Some((message, is_error)) = &self.message {
            let color = if *is_error { ERROR } else { SUCCESS };
            let paragraph = Paragraph::new(message.as_str())
                .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
                .alignment(Alignment::Center);
            frame.render_widget(paragraph, area);
        }
    }
}

/// Yes/No confirmation popup.
#[derive(Debug, Default)]
pub struct Confirm {
    open: bool,
    yes_selected: bool,
}

impl Confirm {
    /// Opens the dialog with "No" preselected.
    pub fn open(&mut self) {
        self.open = true;
        self.yes_selected = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// `Some(answer)` once the user has decided.
    pub fn handle_input(&mut self, key: KeyEvent) -> Option<bool> {
        match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                self.yes_selected = !self.yes_selected;
                None
            }
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.open = false;
                Some(true)
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.open = false;
                Some(false)
            }
            KeyCode::Enter => {
                self.open = false;
                Some(self.yes_selected)
            }
            _ => None,
        }
    }

    pub fn render(&self, frame: &mut Frame, title: &str, question: &str) {
        if !self.open {
            return;
        }
        let area = centered_rect(50, 20, frame.area());
        let block = Block::default()
            .title(format!(" {title} "))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(FOCUS))
            .style(Style::default().bg(PANEL));

        let text = vec![
            Line::from(""),
            Line::from(Span::styled(question.to_string(), Style::default().fg(TEXT))),
            Line::from(""),
            Line::from(vec![
                Span::styled(
                    " Yes ",
                    Style::default().fg(if self.yes_selected { SUCCESS } else { Color::DarkGray }),
                ),
                Span::raw("    "),
                Span::styled(
                    " No ",
                    Style::default().fg(if self.yes_selected { Color::DarkGray } else { ERROR }),
                ),
            ]),
        ];

        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(text).block(block).alignment(Alignment::Center),
            area,
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Secret,
    /// Yes/No switch flipped with Space.
    Toggle,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
    pub kind: FieldKind,
    pub on: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
    Edited,
    Submit,
    Back,
}

/// Vertical list of input fields followed by Submit and Back buttons.
#[derive(Debug, Clone)]
pub struct Form {
    fields: Vec<Field>,
    focus: usize,
    submit_label: &'static str,
}

impl Form {
    pub fn new(labels: &[&'static str], submit_label: &'static str) -> Self {
        let fields = labels
            .iter()
            .map(|label| Field {
                label,
                value: String::new(),
                kind: FieldKind::Text,
                on: false,
            })
            .collect();
        Self {
            fields,
            focus: 0,
            submit_label,
        }
    }

    pub fn with_kind(mut self, index: usize, kind: FieldKind) -> Self {
        if let Some(field) = self.fields.get_mut(index) {
            field.kind = kind;
        }
        self
    }

    pub fn value(&self, index: usize) -> &str {
        self.fields.get(index).map(|f| f.value.as_str()).unwrap_or_default()
    }

    pub fn is_on(&self, index: usize) -> bool {
        self.fields.get(index).is_some_and(|f| f.on)
    }

    pub fn set(&mut self, index: usize, value: impl Into<String>) {
        if let Some(field) = self.fields.get_mut(index) {
            field.value = value.into();
        }
    }

    pub fn set_on(&mut self, index: usize, on: bool) {
        if let Some(field) = self.fields.get_mut(index) {
            field.on = on;
        }
    }

    pub fn clear(&mut self) {
        for field in &mut self.fields {
            field.value.clear();
            field.on = false;
        }
        self.focus = 0;
    }

    fn submit_index(&self) -> usize {
        self.fields.len()
    }

    fn back_index(&self) -> usize {
        self.fields.len() + 1
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Option<FormEvent> {
        let positions = self.fields.len() + 2;
        match key.code {
            KeyCode::Tab | KeyCode::Down => {
                self.focus = (self.focus + 1) % positions;
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = (self.focus + positions - 1) % positions;
            }
            KeyCode::Esc => return Some(FormEvent::Back),
            KeyCode::Enter => {
                if self.focus == self.submit_index() {
                    return Some(FormEvent::Submit);
                }
                if self.focus == self.back_index() {
                    return Some(FormEvent::Back);
                }
                self.focus += 1;
            }
            KeyCode::Char(c) => {
                let field = self.fields.get_mut(self.focus)?;
                if field.kind == FieldKind::Toggle {
                    if c == ' ' {
                        field.on = !field.on;
                    }
                } else {
                    field.value.push(c);
                }
                return Some(FormEvent::Edited);
            }
            KeyCode::Backspace => {
                let field = self.fields.get_mut(self.focus)?;
                field.value.pop();
                return Some(FormEvent::Edited);
            }
            _ => {}
        }
        None
    }

    /// Rows needed to draw the form.
    pub fn height(&self) -> u16 {
        self.fields.len() as u16 * 3 + 2
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let mut constraints: Vec<Constraint> =
            self.fields.iter().map(|_| Constraint::Length(3)).collect();
        constraints.push(Constraint::Length(1));
        constraints.push(Constraint::Length(1));
        constraints.push(Constraint::Min(0));

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        for (i, field) in self.fields.iter().enumerate() {
            let focused = self.focus == i;
            let shown = match field.kind {
                FieldKind::Text => field.value.clone(),
                FieldKind::Secret => "•".repeat(field.value.chars().count()),
                FieldKind::Toggle => {
                    if field.on {
                        "[x] Yes  (Space to toggle)".to_string()
                    } else {
                        "[ ] No   (Space to toggle)".to_string()
                    }
                }
            };
            let input = Paragraph::new(shown)
                .style(Style::default().fg(TEXT))
                .block(panel(field.label, focused));
            frame.render_widget(input, rows[i]);
        }

        let n = self.fields.len();
        button(frame, rows[n], self.submit_label, self.focus == n, SUCCESS);
        button(frame, rows[n + 1], "Back", self.focus == n + 1, ACCENT);
    }
}
