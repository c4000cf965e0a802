//! Patient portal: dashboard, booking, appointment details and histories.

use crate::app::SelectedApp;
use crate::components::widgets::Confirm;
use crate::components::{Component, Session};
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::KeyEvent;
use log::info;

pub mod book;
pub mod dashboard;
pub mod detail;
pub mod history;

use book::BookAppointment;
use dashboard::Dashboard;
use detail::AppointmentView;
use history::History;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    Appointments,
    Notifications,
    Bills,
    Treatments,
}

/// What a patient screen asks the portal to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientAction {
    Book,
    Booked(i64),
    Open(i64),
    Show(HistoryKind),
    Back,
    Logout,
}

enum Screen {
    Dashboard,
    Book(BookAppointment),
    Detail(AppointmentView),
    History(History),
}

pub struct PatientPortal {
    session: Session,
    dashboard: Dashboard,
    screen: Screen,
    /// The list a detail view was opened from.
    return_to: Option<HistoryKind>,
    logout_dialog: Confirm,
}

impl PatientPortal {
    pub fn new(session: Session) -> Self {
        Self {
            dashboard: Dashboard::new(session.clone()),
            session,
            screen: Screen::Dashboard,
            return_to: None,
            logout_dialog: Confirm::default(),
        }
    }

    fn show_dashboard(&mut self) {
        self.dashboard.refresh();
        self.return_to = None;
        self.screen = Screen::Dashboard;
    }

    fn apply(&mut self, action: PatientAction) {
        match action {
            PatientAction::Book => {
                self.screen = Screen::Book(BookAppointment::new(self.session.clone()));
            }
            PatientAction::Booked(id) => {
                info!("Patient {} requested appointment {id}", self.session.identity.user_id);
                self.show_dashboard();
                self.dashboard
                    .flash
                    .success("Appointment requested. The doctor will confirm it shortly.");
            }
            PatientAction::Open(id) => {
                if let Screen::History(history) = &self.screen {
                    self.return_to = Some(history.kind());
                }
                self.screen = Screen::Detail(AppointmentView::new(self.session.clone(), id));
            }
            PatientAction::Show(kind) => {
                self.screen = Screen::History(History::new(self.session.clone(), kind));
            }
            PatientAction::Back => {
                let from_detail = matches!(self.screen, Screen::Detail(_));
                match self.return_to.take() {
                    Some(kind) if from_detail => {
                        self.screen = Screen::History(History::new(self.session.clone(), kind));
                    }
                    _ => self.show_dashboard(),
                }
            }
            PatientAction::Logout => self.logout_dialog.open(),
        }
    }
}

impl Component for PatientPortal {
    fn handle_input(&mut self, event: KeyEvent) -> Result<Option<SelectedApp>> {
        if self.logout_dialog.is_open() {
            if let Some(true) = self.logout_dialog.handle_input(event) {
                return Ok(Some(SelectedApp::None));
            }
            return Ok(None);
        }

        let action = match &mut self.screen {
            Screen::Dashboard => self.dashboard.process_input(event)?,
            Screen::Book(book) => book.process_input(event)?,
            Screen::Detail(detail) => detail.process_input(event)?,
            Screen::History(history) => history.process_input(event)?,
        };
        if let Some(action) = action {
            self.apply(action);
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame) {
        match &self.screen {
            Screen::Dashboard => self.dashboard.render(frame),
            Screen::Book(book) => book.render(frame),
            Screen::Detail(detail) => detail.render(frame),
            Screen::History(history) => history.render(frame),
        }
        self.logout_dialog
            .render(frame, "Confirm Logout", "Are you sure you want to log out?");
    }

    fn tick(&mut self) {
        match &mut self.screen {
            Screen::Dashboard => self.dashboard.flash.expire(),
            Screen::Book(book) => book.tick(),
            Screen::Detail(detail) => detail.tick(),
            Screen::History(history) => history.tick(),
        }
    }
}
