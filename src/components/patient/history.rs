use super::{HistoryKind, PatientAction};
use crate::components::visits::{Perspective, VisitTable};
use crate::components::widgets::{self, Flash};
use crate::components::Session;
use crate::models::BillStatus;
use crate::services::{patient, Visit};
use crate::slots;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::Paragraph};

pub struct History {
    session: Session,
    kind: HistoryKind,
    table: VisitTable,
    /// Sum of unpaid bills, shown on the bills page.
    outstanding: f64,
    flash: Flash,
}

impl History {
    pub fn new(session: Session, kind: HistoryKind) -> Self {
        let title = match kind {
            HistoryKind::Appointments => "My Appointments",
            HistoryKind::Notifications => "Notifications",
            HistoryKind::Bills => "Bills",
            HistoryKind::Treatments => "Treatment History",
        };
        let mut history = Self {
            session,
            kind,
            table: VisitTable::new(title, Perspective::Patient),
            outstanding: 0.0,
            flash: Flash::default(),
        };
        history.refresh();
        history
    }

    pub fn kind(&self) -> HistoryKind {
        self.kind
    }

    pub fn tick(&mut self) {
        self.flash.expire();
    }

    pub fn refresh(&mut self) {
        let db = &self.session.db;
        let who = &self.session.identity;
        let loaded = match self.kind {
            HistoryKind::Appointments => patient::patient_appointments(db, who),
            HistoryKind::Notifications => {
                patient::patient_notifications(db, who, slots::local_now().date())
            }
            HistoryKind::Bills => patient::bill_history(db, who),
            HistoryKind::Treatments => patient::treatment_history(db, who),
        };
        match loaded {
            Ok(visits) => {
                self.outstanding = outstanding(&visits);
                self.table.set(visits);
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    pub fn process_input(&mut self, key: KeyEvent) -> Result<Option<PatientAction>> {
        match key.code {
            KeyCode::Down => self.table.next(),
            KeyCode::Up => self.table.previous(),
            KeyCode::Enter => {
                if let Some(visit) = self.table.selected() {
                    return Ok(Some(PatientAction::Open(visit.appointment.id)));
                }
            }
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Esc => return Ok(Some(PatientAction::Back)),
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
                Constraint::Min(8),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let title = match self.kind {
            HistoryKind::Appointments => "All Appointments",
            HistoryKind::Notifications => "Upcoming Decisions on Your Requests",
            HistoryKind::Bills => "Bill History",
            HistoryKind::Treatments => "Treatment History",
        };
        widgets::header(frame, layout[0], title);

        let body = layout[1].inner(Margin {
            vertical: 1,
            horizontal: 2,
        });
        self.table.render(frame, body, true);

        if self.kind == HistoryKind::Bills && !self.table.is_empty() {
            let total = Paragraph::new(format!("Outstanding: {:.2}", self.outstanding))
                .style(Style::default().fg(if self.outstanding > 0.0 {
                    widgets::ERROR
                } else {
                    widgets::SUCCESS
                }))
                .alignment(Alignment::Right);
            frame.render_widget(total, layout[2]);
        }

        self.flash.render(frame, layout[3]);
        widgets::help(
            frame,
            layout[4],
            "↑↓: Navigate | Enter: Open | r: Refresh | Esc: Back | ● marks unseen updates",
        );
    }
}

fn outstanding(visits: &[Visit]) -> f64 {
    visits
        .iter()
        .filter(|v| v.appointment.bill_status == BillStatus::Pending)
        .map(|v| v.appointment.bill_amount)
        .sum()
}
