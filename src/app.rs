//! The main application state and logic for CareWell.
//!
//! `App` owns the login and registration screens and, after a successful
//! login, the portal that matches the user's role.

use crate::auth::{self, AuthError};
use crate::components::admin::AdminPortal;
use crate::components::doctor::DoctorPortal;
use crate::components::patient::PatientPortal;
use crate::components::{login::Login, register::Register, Component, Session};
use crate::db::Database;
use crate::models::Account;
use crate::tui::{self, Tui};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::{error, info};
use std::rc::Rc;

/// What a screen asks the application to switch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectedApp {
    PatientPortal,
    DoctorPortal,
    AdminPortal,
    Register,
    /// From the login screen a login attempt, from a portal a logout.
    None,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Init,
    Login,
    Register,
    Running(SelectedApp),
}

pub struct App {
    pub state: AppState,
    pub should_quit: bool,
    db: Rc<Database>,
    pub login: Login,
    pub register: Register,
    /// The portal of the logged-in user.
    portal: Option<Box<dyn Component>>,
}

impl App {
    pub fn new(db: Database) -> Self {
        let db = Rc::new(db);
        Self {
            state: AppState::Init,
            should_quit: false,
            register: Register::new(db.clone()),
            db,
            login: Login::new(),
            portal: None,
        }
    }

    /// Runs the application's main loop.
    pub fn run(&mut self, tui: &mut Tui) -> Result<()> {
        self.state = AppState::Login;

        while !self.should_quit {
            tui.draw(|frame| self.render_ui(frame))?;
            self.handle_event(tui.next_event()?)?;
        }
        Ok(())
    }

    fn handle_event(&mut self, event: tui::Event) -> Result<()> {
        match event {
            tui::Event::Input(crossterm::event::Event::Key(key)) => self.handle_key(key),
            tui::Event::Input(_) => Ok(()),
            tui::Event::Tick => {
                match self.state {
                    AppState::Login => self.login.tick(),
                    AppState::Register => self.register.tick(),
                    AppState::Running(_) => {
                        if let Some(portal) = &mut self.portal {
                            portal.tick();
                        }
                    }
                    AppState::Init => {}
                }
                Ok(())
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Global keybinding: Ctrl+Q to quit
        if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return Ok(());
        }

        match self.state {
            AppState::Init => self.state = AppState::Login,
            AppState::Login => match self.login.handle_input(key)? {
                Some(SelectedApp::Quit) => self.should_quit = true,
                Some(SelectedApp::Register) => {
                    self.register.reset();
                    self.state = AppState::Register;
                }
                Some(SelectedApp::None) => self.attempt_login(),
                _ => {}
            },
            AppState::Register => {
                if self.register.handle_input(key)?.is_some() {
                    self.state = AppState::Login;
                    if self.register.registration_success {
                        self.login.reset();
                        self.login
                            .flash
                            .success("Registration successful! Please log in.");
                    }
                }
            }
            AppState::Running(_) => {
                let Some(portal) = &mut self.portal else {
                    self.state = AppState::Login;
                    return Ok(());
                };
                match portal.handle_input(key)? {
                    Some(SelectedApp::None) => self.logout(),
                    Some(SelectedApp::Quit) => self.should_quit = true,
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn attempt_login(&mut self) {
        let identity = match auth::login(&self.db, &self.login.credentials()) {
            Ok(identity) => identity,
            Err(e) => {
                self.report(e);
                return;
            }
        };
        let account = match auth::load_account(&self.db, &identity) {
            Ok(account) => account,
            Err(e) => {
                self.report(e);
                return;
            }
        };

        let session = Session {
            db: self.db.clone(),
            identity,
        };
        let (portal, selected): (Box<dyn Component>, SelectedApp) = match account {
            Account::Patient(patient) => {
                info!("Opening patient portal for {}", patient.name);
                (Box::new(PatientPortal::new(session)), SelectedApp::PatientPortal)
            }
            Account::Doctor(doctor) => {
                info!("Opening doctor portal for Dr. {}", doctor.name);
                (Box::new(DoctorPortal::new(session)), SelectedApp::DoctorPortal)
            }
            Account::Admin => {
                info!("Opening admin portal");
                (Box::new(AdminPortal::new(session)), SelectedApp::AdminPortal)
            }
        };
        self.portal = Some(portal);
        self.login.password.clear();
        self.state = AppState::Running(selected);
    }

    fn report(&mut self, e: AuthError) {
        match e {
            AuthError::Store(_) | AuthError::Hash(_) => {
                error!("Login failed: {e}");
                self.login.flash.error("Login is unavailable right now. Please try again.");
            }
            other => self.login.flash.error(other.to_string()),
        }
    }

    fn logout(&mut self) {
        if self.portal.take().is_some() {
            info!("User logged out");
        }
        self.login.reset();
        self.state = AppState::Login;
    }

    fn render_ui(&self, frame: &mut tui::Frame) {
        match self.state {
            AppState::Init | AppState::Login => self.login.render(frame),
            AppState::Register => self.register.render(frame),
            AppState::Running(_) => match &self.portal {
                Some(portal) => portal.render(frame),
                None => self.login.render(frame),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing;

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap();
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn app_with_admin() -> App {
        let db = testing::db();
        auth::ensure_admin(&db, "boss@carewell.test", "letmein").unwrap();
        let mut app = App::new(db);
        app.state = AppState::Login;
        app
    }

    fn log_in(app: &mut App, email: &str, password: &str) {
        type_text(app, email);
        press(app, KeyCode::Tab);
        type_text(app, password);
        press(app, KeyCode::Enter);
    }

    #[test]
    fn login_routes_by_role_and_logout_returns() {
        let mut app = app_with_admin();
        log_in(&mut app, "boss@carewell.test", "letmein");
        assert_eq!(app.state, AppState::Running(SelectedApp::AdminPortal));
        assert!(app.login.password.is_empty());

        press(&mut app, KeyCode::Esc);
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.state, AppState::Login);
        assert!(app.portal.is_none());
    }

    #[test]
    fn wrong_password_stays_on_login() {
        let mut app = app_with_admin();
        log_in(&mut app, "boss@carewell.test", "wrong-one");
        assert_eq!(app.state, AppState::Login);
    }

    #[test]
    fn patient_lands_in_patient_portal() {
        let mut app = app_with_admin();
        auth::register_patient(
            &app.db,
            &auth::Registration {
                email: "pat@carewell.test".to_string(),
                password: "patient1".to_string(),
                confirm_password: "patient1".to_string(),
                name: "Pat".to_string(),
                gender: "M".to_string(),
                birth_date: "2000-01-01".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        log_in(&mut app, "pat@carewell.test", "patient1");
        assert_eq!(app.state, AppState::Running(SelectedApp::PatientPortal));
    }

    #[test]
    fn ctrl_q_quits_from_anywhere() {
        let mut app = app_with_admin();
        app.handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL))
            .unwrap();
        assert!(app.should_quit);
    }
}
