use super::DoctorAction;
use crate::components::visits::{Perspective, VisitTable};
use crate::components::widgets::{self, Confirm, Flash};
use crate::components::Session;
use crate::services::doctor::{self, DoctorDashboard};
use crate::slots;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::Paragraph};

const TODAY: usize = 0;
const PENDING: usize = 1;

pub struct Dashboard {
    session: Session,
    data: Option<DoctorDashboard>,
    today: VisitTable,
    pending: VisitTable,
    focus: usize,
    reject_dialog: Confirm,
    pub flash: Flash,
}

impl Dashboard {
    pub fn new(session: Session) -> Self {
        let mut dashboard = Self {
            session,
            data: None,
            today: VisitTable::new("Today's Appointments", Perspective::Doctor),
            pending: VisitTable::new("Pending Requests", Perspective::Doctor),
            focus: PENDING,
            reject_dialog: Confirm::default(),
            flash: Flash::default(),
        };
        dashboard.refresh();
        dashboard
    }

    pub fn refresh(&mut self) {
        let today = slots::local_now().date();
        match doctor::doctor_dashboard(&self.session.db, &self.session.identity, today) {
            Ok(data) => {
                self.today.set(data.today.clone());
                self.pending.set(data.pending.clone());
                self.data = Some(data);
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    fn focused(&mut self) -> &mut VisitTable {
        if self.focus == TODAY {
            &mut self.today
        } else {
            &mut self.pending
        }
    }

    fn selected_pending(&self) -> Option<i64> {
        if self.focus != PENDING {
            return None;
        }
        self.pending.selected().map(|v| v.appointment.id)
    }

    pub fn process_input(&mut self, key: KeyEvent) -> Result<Option<DoctorAction>> {
        if self.reject_dialog.is_open() {
            if let Some(true) = self.reject_dialog.handle_input(key) {
                if let Some(id) = self.selected_pending() {
                    match doctor::reject_appointment(&self.session.db, &self.session.identity, id) {
                        Ok(()) => self.flash.success("Request rejected. The patient will be notified."),
                        Err(e) => self.flash.error(e.to_string()),
                    }
                    self.refresh();
                }
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Tab | KeyCode::Left | KeyCode::Right => self.focus = 1 - self.focus,
            KeyCode::Down => self.focused().next(),
            KeyCode::Up => self.focused().previous(),
            KeyCode::Enter => {
                let table = if self.focus == TODAY { &self.today } else { &self.pending };
                if let Some(visit) = table.selected() {
                    return Ok(Some(DoctorAction::Open(visit.appointment.id)));
                }
            }
            KeyCode::Char('a') => match self.selected_pending() {
                Some(id) => {
                    match doctor::approve_appointment(&self.session.db, &self.session.identity, id) {
                        Ok(()) => self.flash.success("Request approved."),
                        Err(e) => self.flash.error(e.to_string()),
                    }
                    self.refresh();
                }
                None => self.flash.error("Select a pending request first."),
            },
            KeyCode::Char('x') => {
                if self.selected_pending().is_some() {
                    self.reject_dialog.open();
                } else {
                    self.flash.error("Select a pending request first.");
                }
            }
            KeyCode::Char('h') => return Ok(Some(DoctorAction::History)),
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Esc => return Ok(Some(DoctorAction::Logout)),
            _ => {}
        }
        Ok(None)
    }

    pub fn render(&self, frame: &mut Frame) {
        widgets::background(frame);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(12),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let (name, department) = match &self.data {
            Some(data) => (
                data.doctor.name.as_str(),
                data.department.as_ref().map(|d| d.name.as_str()).unwrap_or_default(),
            ),
            None => ("", ""),
        };
        widgets::header(frame, layout[0], &format!("Dr. {name}"));
        frame.render_widget(
            Paragraph::new(department.to_string())
                .style(Style::default().fg(widgets::HELP))
                .alignment(Alignment::Center),
            layout[1],
        );

        let tables = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .margin(1)
            .split(layout[2]);
        self.today.render(frame, tables[0], self.focus == TODAY);
        self.pending.render(frame, tables[1], self.focus == PENDING);

        self.flash.render(frame, layout[3]);
        widgets::help(
            frame,
            layout[4],
            "Tab: Switch list | ↑↓: Navigate | Enter: Open | a: Approve | x: Reject | h: History | r: Refresh | Esc: Logout",
        );

        self.reject_dialog.render(
            frame,
            "Reject Request",
            "Reject this appointment request?",
        );
    }
}
