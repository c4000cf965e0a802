//! Appointment table used by both the patient and the doctor portals.

use crate::components::widgets::{self, select_next, select_previous};
use crate::models::{BillStatus, FeedbackState, NotificationState};
use crate::services::{AppointmentDetail, Visit};
use crate::tui::Frame;
use ratatui::{prelude::*, widgets::*};

/// Whose portal the table is shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perspective {
    Patient,
    Doctor,
}

#[derive(Debug, Clone)]
pub struct VisitTable {
    title: &'static str,
    perspective: Perspective,
    visits: Vec<Visit>,
    state: TableState,
}

impl VisitTable {
    pub fn new(title: &'static str, perspective: Perspective) -> Self {
        Self {
            title,
            perspective,
            visits: Vec::new(),
            state: TableState::default(),
        }
    }

    /// Replaces the rows, keeping the cursor where it was when possible.
    pub fn set(&mut self, visits: Vec<Visit>) {
        self.visits = visits;
        widgets::clamp_selection(&mut self.state, self.visits.len());
    }

    pub fn selected(&self) -> Option<&Visit> {
        self.state.selected().and_then(|i| self.visits.get(i))
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    pub fn next(&mut self) {
        select_next(&mut self.state, self.visits.len());
    }

    pub fn previous(&mut self) {
        select_previous(&mut self.state, self.visits.len());
    }

    fn is_unseen(&self, visit: &Visit) -> bool {
        let flag = match self.perspective {
            Perspective::Patient => visit.appointment.patient_notification,
            Perspective::Doctor => visit.appointment.doctor_notification,
        };
        flag == NotificationState::Unseen
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        if self.visits.is_empty() {
            widgets::empty_notice(frame, area, self.title, "Nothing to show.");
            return;
        }

        let counterpart = match self.perspective {
            Perspective::Patient => "Doctor",
            Perspective::Doctor => "Patient",
        };
        let header = widgets::table_header(&["", "When", counterpart, "Status", "Diagnosis", "Bill"]);

        let rows = self.visits.iter().map(|visit| {
            let appointment = &visit.appointment;
            let name = match self.perspective {
                Perspective::Patient => visit
                    .doctor_name
                    .clone()
                    .unwrap_or_else(|| "(no longer on staff)".to_string()),
                Perspective::Doctor => visit.patient_name.clone(),
            };
            let bill = if appointment.bill_status == BillStatus::NotGenerated {
                "-".to_string()
            } else {
                format!("{:.2} ({})", appointment.bill_amount, appointment.bill_status)
            };
            let marker = if self.is_unseen(visit) { "●" } else { " " };

            Row::new(vec![
                Cell::from(marker).style(Style::default().fg(widgets::FOCUS)),
                Cell::from(widgets::format_slot(appointment.date)),
                Cell::from(name),
                Cell::from(appointment.status.to_string())
                    .style(Style::default().fg(widgets::status_color(appointment.status))),
                Cell::from(appointment.disease.clone().unwrap_or_default()),
                Cell::from(bill),
            ])
            .style(Style::default().fg(widgets::TEXT))
        });

        let widths = [
            Constraint::Length(2),
            Constraint::Length(17),
            Constraint::Percentage(25),
            Constraint::Length(10),
            Constraint::Percentage(25),
            Constraint::Min(14),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(widgets::panel(self.title, focused))
            .row_highlight_style(widgets::selected_row())
            .highlight_symbol(if focused { "► " } else { "  " });

        frame.render_stateful_widget(table, area, &mut self.state.clone());
    }
}

fn field(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<14}"), Style::default().fg(widgets::HELP)),
        Span::styled(value, Style::default().fg(widgets::TEXT)),
    ])
}

/// Appointment summary with both parties, the treatment and the bill.
pub fn render_detail(frame: &mut Frame, area: Rect, detail: &AppointmentDetail) {
    let appointment = &detail.appointment;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let doctor = detail.doctor.as_ref();
    let mut visit = vec![
        field("When", widgets::format_slot(appointment.date)),
        Line::from(vec![
            Span::styled(format!("{:<14}", "Status"), Style::default().fg(widgets::HELP)),
            Span::styled(
                appointment.status.to_string(),
                Style::default()
                    .fg(widgets::status_color(appointment.status))
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        field(
            "Doctor",
            doctor.map_or_else(|| "(no longer on staff)".to_string(), |d| d.name.clone()),
        ),
        field(
            "Department",
            detail
                .department
                .as_ref()
                .map(|d| d.name.clone())
                .unwrap_or_default(),
        ),
        field(
            "Fee per visit",
            doctor.map_or_else(String::new, |d| format!("{:.2}", d.charges_per_visit)),
        ),
        Line::from(""),
        field("Patient", detail.patient.name.clone()),
        field("Gender", detail.patient.gender.as_str().to_string()),
        field("Born", detail.patient.birth_date.to_string()),
        field("Phone", detail.patient.phone.clone().unwrap_or_default()),
    ];
    if appointment.feedback == FeedbackState::Given {
        visit.push(Line::from(""));
        visit.push(field("Feedback", "Given".to_string()));
    }
    frame.render_widget(
        Paragraph::new(visit)
            .block(widgets::panel("Appointment", false))
            .wrap(Wrap { trim: true }),
        columns[0],
    );

    let bill = if appointment.bill_status == BillStatus::NotGenerated {
        "Not generated".to_string()
    } else {
        format!("{:.2} ({})", appointment.bill_amount, appointment.bill_status)
    };
    let treatment = vec![
        field("Diagnosis", appointment.disease.clone().unwrap_or_default()),
        field("Progress", appointment.progress.clone().unwrap_or_default()),
        field(
            "Prescription",
            appointment.prescription.clone().unwrap_or_default(),
        ),
        Line::from(""),
        field("Bill", bill),
    ];
    frame.render_widget(
        Paragraph::new(treatment)
            .block(widgets::panel("Treatment", false))
            .wrap(Wrap { trim: true }),
        columns[1],
    );
}
