//! Patient self-registration screen.

use crate::app::SelectedApp;
use crate::auth::{self, AuthError, Registration};
use crate::components::widgets::{self, FieldKind, Flash, Form, FormEvent};
use crate::components::Component;
use crate::db::Database;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::KeyEvent;
use log::error;
use ratatui::prelude::*;
use std::rc::Rc;

const LABELS: [&str; 8] = [
    "Email",
    "Password",
    "Confirm password",
    "Full name",
    "Phone (optional)",
    "Address (optional)",
    "Gender (M/F)",
    "Birth date (YYYY-MM-DD)",
];

pub struct Register {
    db: Rc<Database>,
    form: Form,
    flash: Flash,
    /// Set once an account was created, so the login screen can say so.
    pub registration_success: bool,
}

impl Register {
    pub fn new(db: Rc<Database>) -> Self {
        Self {
            db,
            form: Form::new(&LABELS, "Register")
                .with_kind(1, FieldKind::Secret)
                .with_kind(2, FieldKind::Secret),
            flash: Flash::default(),
            registration_success: false,
        }
    }

    pub fn reset(&mut self) {
        self.form.clear();
        self.flash.clear();
        self.registration_success = false;
    }

    fn registration(&self) -> Registration {
        Registration {
            email: self.form.value(0).to_string(),
            password: self.form.value(1).to_string(),
            confirm_password: self.form.value(2).to_string(),
            name: self.form.value(3).to_string(),
            phone: self.form.value(4).to_string(),
            address: self.form.value(5).to_string(),
            gender: self.form.value(6).to_string(),
            birth_date: self.form.value(7).to_string(),
        }
    }

    fn submit(&mut self) -> bool {
        match auth::register_patient(&self.db, &self.registration()) {
            Ok(_) => {
                self.registration_success = true;
                true
            }
            Err(AuthError::Store(e)) => {
                error!("Registration failed: {e}");
                self.flash.error("Could not create the account. Please try again.");
                false
            }
            Err(AuthError::Hash(e)) => {
                error!("Registration failed: {e}");
                self.flash.error("Could not create the account. Please try again.");
                false
            }
            Err(e) => {
                self.flash.error(e.to_string());
                false
            }
        }
    }
}

impl Component for Register {
    fn handle_input(&mut self, event: KeyEvent) -> Result<Option<SelectedApp>> {
        match self.form.handle_input(event) {
            Some(FormEvent::Submit) => {
                if self.submit() {
                    return Ok(Some(SelectedApp::None));
                }
            }
            Some(FormEvent::Back) => {
                self.registration_success = false;
                return Ok(Some(SelectedApp::None));
            }
            Some(FormEvent::Edited) => self.flash.clear(),
            None => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame) {
        widgets::background(frame);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(self.form.height()),
                Constraint::Length(2),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(frame.area());

        widgets::header(frame, layout[0], "Create a Patient Account");
        self.form
            .render(frame, widgets::centered_rect(60, 100, layout[1]));
        self.flash.render(frame, layout[2]);
        widgets::help(
            frame,
            layout[4],
            "Tab/↑↓: Move | Enter: Next field or press button | Esc: Back to login",
        );
    }

    fn tick(&mut self) {
        self.flash.expire();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing;
    use crate::db::Repository;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn press(register: &mut Register, code: KeyCode) -> Option<SelectedApp> {
        register
            .handle_input(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap()
    }

    fn fill(register: &mut Register, values: &[&str]) {
        for value in values {
            for c in value.chars() {
                press(register, KeyCode::Char(c));
            }
            press(register, KeyCode::Tab);
        }
    }

    #[test]
    fn completed_form_creates_a_patient() {
        let db = Rc::new(testing::db());
        let mut register = Register::new(db.clone());
        fill(
            &mut register,
            &[
                "noor@example.org",
                "longpass",
                "longpass",
                "Noor",
                "",
                "",
                "F",
                "1988-02-29",
            ],
        );

        assert_eq!(press(&mut register, KeyCode::Enter), Some(SelectedApp::None));
        assert!(register.registration_success);
        assert_eq!(db.patients().list().unwrap().len(), 1);
    }

    #[test]
    fn invalid_form_stays_on_screen() {
        let db = Rc::new(testing::db());
        let mut register = Register::new(db.clone());
        fill(&mut register, &["noor@example.org", "longpass", "different"]);
        // Skip to the submit button.
        for _ in 0..5 {
            press(&mut register, KeyCode::Tab);
        }

        assert_eq!(press(&mut register, KeyCode::Enter), None);
        assert!(!register.registration_success);
        assert!(db.users().list().unwrap().is_empty());
    }
}
