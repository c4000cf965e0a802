use super::DoctorAction;
use crate::components::visits::{Perspective, VisitTable};
use crate::components::widgets::{self, Flash};
use crate::components::Session;
use crate::services::doctor;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;

/// Completed visits, newest first.
pub struct History {
    session: Session,
    table: VisitTable,
    flash: Flash,
}

impl History {
    pub fn new(session: Session) -> Self {
        let mut history = Self {
            session,
            table: VisitTable::new("Completed Visits", Perspective::Doctor),
            flash: Flash::default(),
        };
        history.refresh();
        history
    }

    pub fn tick(&mut self) {
        self.flash.expire();
    }

    fn refresh(&mut self) {
        match doctor::doctor_history(&self.session.db, &self.session.identity) {
            Ok(visits) => self.table.set(visits),
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    pub fn process_input(&mut self, key: KeyEvent) -> Result<Option<DoctorAction>> {
        match key.code {
            KeyCode::Down => self.table.next(),
            KeyCode::Up => self.table.previous(),
            KeyCode::Enter => {
                if let Some(visit) = self.table.selected() {
                    return Ok(Some(DoctorAction::Open(visit.appointment.id)));
                }
            }
            KeyCode::Esc => return Ok(Some(DoctorAction::Back)),
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
            ])
            .split(frame.area());

        widgets::header(frame, layout[0], "Treatment History");
        self.table.render(
            frame,
            layout[1].inner(Margin {
                vertical: 1,
                horizontal: 2,
            }),
            true,
        );
        self.flash.render(frame, layout[2]);
        widgets::help(frame, layout[3], "↑↓: Navigate | Enter: Open | Esc: Back");
    }
}
