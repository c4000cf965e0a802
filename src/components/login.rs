//! Login screen.

use crate::app::SelectedApp;
use crate::auth::Credentials;
use crate::components::widgets::{self, Confirm, Flash};
use crate::components::Component;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::Paragraph};

const EMAIL: usize = 0;
const PASSWORD: usize = 1;
const REGISTER: usize = 2;
const EXIT: usize = 3;

#[derive(Debug, Default)]
pub struct Login {
    pub email: String,
    pub password: String,
    selected_index: usize,
    exit_dialog: Confirm,
    pub flash: Flash,
}

impl Login {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }

    /// Empties the form, e.g. after a logout.
    pub fn reset(&mut self) {
        self.email.clear();
        self.password.clear();
        self.selected_index = EMAIL;
    }
}

impl Component for Login {
    fn handle_input(&mut self, event: KeyEvent) -> Result<Option<SelectedApp>> {
        if self.exit_dialog.is_open() {
            if let Some(true) = self.exit_dialog.handle_input(event) {
                return Ok(Some(SelectedApp::Quit));
            }
            return Ok(None);
        }

        match event.code {
            KeyCode::Char(c) => {
                match self.selected_index {
                    EMAIL => self.email.push(c),
                    PASSWORD => self.password.push(c),
                    _ => {}
                }
                self.flash.clear();
            }
            KeyCode::Backspace => {
                match self.selected_index {
                    EMAIL => {
                        self.email.pop();
                    }
                    PASSWORD => {
                        self.password.pop();
                    }
                    _ => {}
                }
                self.flash.clear();
            }
            KeyCode::Tab | KeyCode::Down => {
                self.selected_index = (self.selected_index + 1) % 4;
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.selected_index = (self.selected_index + 3) % 4;
            }
            KeyCode::Enter => match self.selected_index {
                REGISTER => return Ok(Some(SelectedApp::Register)),
                EXIT => self.exit_dialog.open(),
                _ => {
                    if self.email.trim().is_empty() {
                        self.flash.error("Email cannot be empty.");
                        return Ok(None);
                    }
                    if self.password.is_empty() {
                        self.flash.error("Password cannot be empty.");
                        return Ok(None);
                    }
                    // Signal login attempt
                    return Ok(Some(SelectedApp::None));
                }
            },
            KeyCode::Esc => self.exit_dialog.open(),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame) {
        widgets::background(frame);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Length(1), // Slogan
                Constraint::Length(2),
                Constraint::Length(3), // Email
                Constraint::Length(3), // Password
                Constraint::Length(2), // Flash
                Constraint::Length(1), // Register
                Constraint::Length(1), // Exit
                Constraint::Min(0),
                Constraint::Length(1), // Help
            ])
            .margin(1)
            .split(frame.area());

        let title = Paragraph::new(Text::from(vec![
            Line::from(""),
            Line::from(Span::styled(
                "C A R E W E L L",
                Style::default()
                    .fg(widgets::ACCENT)
                    .add_modifier(Modifier::BOLD),
            )),
        ]))
        .alignment(Alignment::Center);
        frame.render_widget(title, layout[0]);

        let slogan = Paragraph::new(Span::styled(
            "Appointments, treatments and bills in one place",
            Style::default()
                .fg(widgets::HELP)
                .add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center);
        frame.render_widget(slogan, layout[1]);

        let form_area = |area: Rect| widgets::centered_rect(60, 100, area);

        let email = Paragraph::new(self.email.clone())
            .style(Style::default().fg(widgets::TEXT))
            .block(widgets::panel("Email", self.selected_index == EMAIL));
        frame.render_widget(email, form_area(layout[3]));

        let password = Paragraph::new("•".repeat(self.password.chars().count()))
            .style(Style::default().fg(widgets::TEXT))
            .block(widgets::panel("Password", self.selected_index == PASSWORD));
        frame.render_widget(password, form_area(layout[4]));

        self.flash.render(frame, layout[5]);

        widgets::button(
            frame,
            layout[6],
            "Create a patient account",
            self.selected_index == REGISTER,
            widgets::ACCENT,
        );
        widgets::button(
            frame,
            layout[7],
            "Exit",
            self.selected_index == EXIT,
            widgets::ERROR,
        );

        widgets::help(
            frame,
            layout[9],
            "Tab/↑↓: Move | Enter: Log in or select | Esc: Exit | Ctrl+Q: Quit",
        );

        self.exit_dialog
            .render(frame, "Confirm Exit", "Are you sure you want to quit?");
    }

    fn tick(&mut self) {
        self.flash.expire();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(login: &mut Login, code: KeyCode) -> Option<SelectedApp> {
        login
            .handle_input(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap()
    }

    fn type_text(login: &mut Login, text: &str) {
        for c in text.chars() {
            press(login, KeyCode::Char(c));
        }
    }

    #[test]
    fn enter_signals_a_login_attempt() {
        let mut login = Login::new();
        type_text(&mut login, "ana@example.org");
        press(&mut login, KeyCode::Tab);
        type_text(&mut login, "secret1");

        assert_eq!(press(&mut login, KeyCode::Enter), Some(SelectedApp::None));
        let credentials = login.credentials();
        assert_eq!(credentials.email, "ana@example.org");
        assert_eq!(credentials.password, "secret1");
    }

    #[test]
    fn empty_fields_do_not_submit() {
        let mut login = Login::new();
        assert_eq!(press(&mut login, KeyCode::Enter), None);
    }

    #[test]
    fn exit_needs_confirmation() {
        let mut login = Login::new();
        press(&mut login, KeyCode::Esc);
        assert_eq!(press(&mut login, KeyCode::Char('y')), Some(SelectedApp::Quit));
    }

    #[test]
    fn register_link() {
        let mut login = Login::new();
        press(&mut login, KeyCode::Up);
        press(&mut login, KeyCode::Up);
        assert_eq!(press(&mut login, KeyCode::Enter), Some(SelectedApp::Register));
    }
}
