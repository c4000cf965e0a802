use super::{HistoryKind, PatientAction};
use crate::components::visits::{Perspective, VisitTable};
use crate::components::widgets::{self, Flash};
use crate::components::Session;
use crate::services::patient::{self, PatientDashboard};
use crate::slots;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};

const MENU: [&str; 6] = [
    "Book an appointment",
    "My appointments",
    "Notifications",
    "Bills",
    "Treatment history",
    "Logout",
];

pub struct Dashboard {
    session: Session,
    data: Option<PatientDashboard>,
    recent: VisitTable,
    selected: usize,
    pub flash: Flash,
}

impl Dashboard {
    pub fn new(session: Session) -> Self {
        let mut dashboard = Self {
            session,
            data: None,
            recent: VisitTable::new("Recent Treatments", Perspective::Patient),
            selected: 0,
            flash: Flash::default(),
        };
        dashboard.refresh();
        dashboard
    }

    pub fn refresh(&mut self) {
        let today = slots::local_now().date();
        match patient::patient_dashboard(&self.session.db, &self.session.identity, today) {
            Ok(data) => {
                self.recent.set(data.recent_treatments.clone());
                self.data = Some(data);
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    pub fn process_input(&mut self, key: KeyEvent) -> Result<Option<PatientAction>> {
        match key.code {
            KeyCode::Up => {
                self.selected = (self.selected + MENU.len() - 1) % MENU.len();
            }
            KeyCode::Down | KeyCode::Tab => {
                self.selected = (self.selected + 1) % MENU.len();
            }
            KeyCode::Char('c') => {
                let current = self.data.as_ref().and_then(|d| d.current.as_ref());
                match current {
                    Some(visit) => return Ok(Some(PatientAction::Open(visit.appointment.id))),
                    None => self.flash.error("You have no upcoming appointment."),
                }
            }
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Enter => {
                return Ok(Some(match self.selected {
                    0 => PatientAction::Book,
                    1 => PatientAction::Show(HistoryKind::Appointments),
                    2 => PatientAction::Show(HistoryKind::Notifications),
                    3 => PatientAction::Show(HistoryKind::Bills),
                    4 => PatientAction::Show(HistoryKind::Treatments),
                    _ => PatientAction::Logout,
                }));
            }
            KeyCode::Esc => return Ok(Some(PatientAction::Logout)),
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
                Constraint::Min(12),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let name = self
            .data
            .as_ref()
            .map(|d| d.patient.name.as_str())
            .unwrap_or("patient");
        widgets::header(frame, layout[0], &format!("Welcome, {name}"));

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
            .margin(1)
            .split(layout[1]);

        self.render_menu(frame, body[0]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(8), Constraint::Min(5)])
            .split(body[1]);

        self.render_current(frame, right[0]);
        self.recent.render(frame, right[1], false);

        self.flash.render(frame, layout[2]);
        widgets::help(
            frame,
            layout[3],
            "↑↓: Navigate | Enter: Select | c: Open upcoming appointment | r: Refresh | Esc: Logout",
        );
    }

    fn render_menu(&self, frame: &mut Frame, area: Rect) {
        let unseen = self.data.as_ref().map_or(0, |d| d.unseen_notifications);
        let items: Vec<ListItem> = MENU
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let label = if i == 2 && unseen > 0 {
                    format!("{item} ({unseen} new)")
                } else {
                    item.to_string()
                };
                let style = if i == self.selected {
                    Style::default()
                        .fg(widgets::FOCUS)
                        .add_modifier(Modifier::BOLD)
                } else if i == MENU.len() - 1 {
                    Style::default().fg(widgets::ERROR)
                } else {
                    Style::default().fg(widgets::TEXT)
                };
                let prefix = if i == self.selected { " ► " } else { "   " };
                ListItem::new(format!("{prefix}{label}")).style(style)
            })
            .collect();

        frame.render_widget(List::new(items).block(widgets::panel("Menu", true)), area);
    }

    fn render_current(&self, frame: &mut Frame, area: Rect) {
        let current = self.data.as_ref().and_then(|d| d.current.as_ref());
        let lines = match current {
            Some(visit) => {
                let appointment = &visit.appointment;
                vec![
                    Line::from(vec![
                        Span::styled("When:   ", Style::default().fg(widgets::HELP)),
                        Span::styled(
                            widgets::format_slot(appointment.date),
                            Style::default().fg(widgets::TEXT),
                        ),
                    ]),
                    Line::from(vec![
                        Span::styled("Doctor: ", Style::default().fg(widgets::HELP)),
                        Span::styled(
                            visit.doctor_name.clone().unwrap_or_default(),
                            Style::default().fg(widgets::TEXT),
                        ),
                    ]),
                    Line::from(vec![
                        Span::styled("Status: ", Style::default().fg(widgets::HELP)),
                        Span::styled(
                            appointment.status.to_string(),
                            Style::default().fg(widgets::status_color(appointment.status)),
                        ),
                    ]),
                ]
            }
            None => vec![Line::from(Span::styled(
                "No upcoming appointment. Book one from the menu.",
                Style::default().fg(widgets::TEXT),
            ))],
        };

        let paragraph = Paragraph::new(lines)
            .block(widgets::panel("Upcoming Appointment", false))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}
