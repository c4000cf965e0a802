//! Doctor portal.

use crate::app::SelectedApp;
use crate::components::widgets::Confirm;
use crate::components::{Component, Session};
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::KeyEvent;

pub mod dashboard;
pub mod detail;
pub mod history;

use dashboard::Dashboard;
use detail::AppointmentView;
use history::History;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoctorAction {
    Open(i64),
    History,
    Back,
    Logout,
}

enum Screen {
    Dashboard,
    Detail {
        view: AppointmentView,
        from_history: bool,
    },
    History(History),
}

pub struct DoctorPortal {
    session: Session,
    dashboard: Dashboard,
    screen: Screen,
    logout_dialog: Confirm,
}

impl DoctorPortal {
    pub fn new(session: Session) -> Self {
        Self {
            dashboard: Dashboard::new(session.clone()),
            session,
            screen: Screen::Dashboard,
            logout_dialog: Confirm::default(),
        }
    }

    fn apply(&mut self, action: DoctorAction) {
        match action {
            DoctorAction::Open(id) => {
                let from_history = matches!(self.screen, Screen::History(_));
                self.screen = Screen::Detail {
                    view: AppointmentView::new(self.session.clone(), id),
                    from_history,
                };
            }
            DoctorAction::History => {
                self.screen = Screen::History(History::new(self.session.clone()));
            }
            DoctorAction::Back => {
                if let Screen::Detail {
                    from_history: true, ..
                } = self.screen
                {
                    self.screen = Screen::History(History::new(self.session.clone()));
                } else {
                    self.dashboard.refresh();
                    self.screen = Screen::Dashboard;
                }
            }
            DoctorAction::Logout => self.logout_dialog.open(),
        }
    }
}

impl Component for DoctorPortal {
    fn handle_input(&mut self, event: KeyEvent) -> Result<Option<SelectedApp>> {
        if self.logout_dialog.is_open() {
            if let Some(true) = self.logout_dialog.handle_input(event) {
                return Ok(Some(SelectedApp::None));
            }
            return Ok(None);
        }

        let action = match &mut self.screen {
            Screen::Dashboard => self.dashboard.process_input(event)?,
            Screen::Detail { view, .. } => view.process_input(event)?,
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
            Screen::Detail { view, .. } => view.render(frame),
            Screen::History(history) => history.render(frame),
        }
        self.logout_dialog
            .render(frame, "Confirm Logout", "Are you sure you want to log out?");
    }

    fn tick(&mut self) {
        match &mut self.screen {
            Screen::Dashboard => self.dashboard.flash.expire(),
            Screen::Detail { view, .. } => view.tick(),
            Screen::History(history) => history.tick(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Repository;
    use crate::lifecycle;
    use crate::models::AppointmentStatus;
    use crate::services::fixtures;
    use crossterm::event::{KeyCode, KeyModifiers};
    use std::rc::Rc;
    use time::macros::datetime;

    fn press(portal: &mut DoctorPortal, code: KeyCode) -> Option<SelectedApp> {
        portal
            .handle_input(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap()
    }

    #[test]
    fn approve_from_the_pending_list() {
        let clinic = fixtures::clinic();
        let id = lifecycle::create(
            &clinic.db.work(),
            clinic.doctor.user_id,
            clinic.patient.user_id,
            datetime!(2099-01-10 09:00),
        )
        .unwrap();
        let db = Rc::new(clinic.db);
        let mut portal = DoctorPortal::new(Session {
            db: db.clone(),
            identity: clinic.doctor,
        });

        press(&mut portal, KeyCode::Char('a'));

        let stored = db.appointments().get(id).unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Approved);
    }

    #[test]
    fn history_back_then_logout() {
        let clinic = fixtures::clinic();
        let mut portal = DoctorPortal::new(Session {
            db: Rc::new(clinic.db),
            identity: clinic.doctor,
        });

        press(&mut portal, KeyCode::Char('h'));
        assert!(matches!(portal.screen, Screen::History(_)));
        press(&mut portal, KeyCode::Esc);
        assert!(matches!(portal.screen, Screen::Dashboard));
        press(&mut portal, KeyCode::Esc);
        assert_eq!(press(&mut portal, KeyCode::Char('y')), Some(SelectedApp::None));
    }
}
