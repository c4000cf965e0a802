//! One appointment from the doctor's side, with the treatment form.

use super::DoctorAction;
use crate::components::visits;
use crate::components::widgets::{self, Confirm, FieldKind, Flash, Form, FormEvent};
use crate::components::Session;
use crate::lifecycle::{self, Transition};
use crate::models::{AppointmentStatus, BillStatus, NotificationState};
use crate::services::doctor::{self, DoctorAppointment, TreatmentForm};
use crate::services;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use log::warn;
use ratatui::{prelude::*, widgets::*};

const DISEASE: usize = 0;
const PROGRESS: usize = 1;
const PRESCRIPTION: usize = 2;
const BILL: usize = 3;
const PAID: usize = 4;

pub struct AppointmentView {
    session: Session,
    appointment_id: i64,
    data: Option<DoctorAppointment>,
    /// Open while the treatment form is shown.
    form: Option<Form>,
    approve_dialog: Confirm,
    reject_dialog: Confirm,
    flash: Flash,
}

impl AppointmentView {
    pub fn new(session: Session, appointment_id: i64) -> Self {
        let mut view = Self {
            session,
            appointment_id,
            data: None,
            form: None,
            approve_dialog: Confirm::default(),
            reject_dialog: Confirm::default(),
            flash: Flash::default(),
        };
        view.load();
        view.acknowledge();
        view
    }

    pub fn tick(&mut self) {
        self.flash.expire();
    }

    fn load(&mut self) {
        match doctor::doctor_appointment(&self.session.db, &self.session.identity, self.appointment_id) {
            Ok(data) => self.data = Some(data),
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    fn acknowledge(&mut self) {
        let unseen = self.data.as_ref().is_some_and(|d| {
            d.detail.appointment.doctor_notification == NotificationState::Unseen
        });
        if !unseen {
            return;
        }
        if let Err(e) =
            services::mark_notification_seen(&self.session.db, &self.session.identity, self.appointment_id)
        {
            warn!("Could not mark appointment {} seen: {e}", self.appointment_id);
        }
    }

    fn status(&self) -> Option<AppointmentStatus> {
        self.data.as_ref().map(|d| d.detail.appointment.status)
    }

    fn allows(&self, transition: Transition) -> bool {
        self.status()
            .and_then(|status| lifecycle::next_status(status, transition))
            .is_some()
    }

    /// Builds the treatment form, prefilled when the visit was already recorded.
    fn open_form(&mut self) {
        let Some(data) = &self.data else {
            return;
        };
        let appointment = &data.detail.appointment;
        let mut form = Form::new(
            &[
                "Diagnosis",
                "Progress (optional)",
                "Prescription (optional)",
                "Bill amount",
                "Paid",
            ],
            if appointment.status == AppointmentStatus::Completed {
                "Update treatment"
            } else {
                "Complete visit"
            },
        )
        .with_kind(PAID, FieldKind::Toggle);

        form.set(DISEASE, appointment.disease.clone().unwrap_or_default());
        form.set(PROGRESS, appointment.progress.clone().unwrap_or_default());
        form.set(PRESCRIPTION, appointment.prescription.clone().unwrap_or_default());
        if appointment.bill_status != BillStatus::NotGenerated {
            form.set(BILL, format!("{:.2}", appointment.bill_amount));
        } else if let Some(doctor) = &data.detail.doctor {
            form.set(BILL, format!("{:.2}", doctor.charges_per_visit));
        }
        form.set_on(PAID, appointment.bill_status == BillStatus::Paid);
        self.form = Some(form);
    }

    fn submit(&mut self) {
        let Some(form) = &self.form else {
            return;
        };
        let treatment = TreatmentForm {
            disease: form.value(DISEASE).to_string(),
            progress: form.value(PROGRESS).to_string(),
            prescription: form.value(PRESCRIPTION).to_string(),
            bill_amount: form.value(BILL).to_string(),
            paid: form.is_on(PAID),
        };

        let db = &self.session.db;
        let who = &self.session.identity;
        let result = match self.status() {
            Some(AppointmentStatus::Completed) => {
                doctor::update_treatment(db, who, self.appointment_id, &treatment)
            }
            _ => doctor::complete_treatment(db, who, self.appointment_id, &treatment),
        };
        match result {
            Ok(()) => {
                self.form = None;
                self.flash.success("Treatment saved.");
                self.load();
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    fn transition(&mut self, approve: bool) {
        let db = &self.session.db;
        let who = &self.session.identity;
        let result = if approve {
            doctor::approve_appointment(db, who, self.appointment_id)
        } else {
            doctor::reject_appointment(db, who, self.appointment_id)
        };
        match result {
            Ok(()) if approve => self.flash.success("Appointment approved."),
            Ok(()) => self.flash.success("Appointment rejected."),
            Err(e) => self.flash.error(e.to_string()),
        }
        self.load();
    }

    pub fn process_input(&mut self, key: KeyEvent) -> Result<Option<DoctorAction>> {
        if let Some(form) = &mut self.form {
            match form.handle_input(key) {
                Some(FormEvent::Submit) => self.submit(),
                Some(FormEvent::Back) => self.form = None,
                Some(FormEvent::Edited) => self.flash.clear(),
                None => {}
            }
            return Ok(None);
        }
        if self.approve_dialog.is_open() {
            if let Some(true) = self.approve_dialog.handle_input(key) {
                self.transition(true);
            }
            return Ok(None);
        }
        if self.reject_dialog.is_open() {
            if let Some(true) = self.reject_dialog.handle_input(key) {
                self.transition(false);
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Char('a') => {
                if self.allows(Transition::Approve) {
                    self.approve_dialog.open();
                } else {
                    self.flash.error("Only pending requests can be approved.");
                }
            }
            KeyCode::Char('x') => {
                if self.allows(Transition::Reject) {
                    self.reject_dialog.open();
                } else {
                    self.flash.error("This appointment can no longer be rejected.");
                }
            }
            KeyCode::Char('t') => {
                if self.allows(Transition::Complete) {
                    self.open_form();
                } else {
                    self.flash.error("Approve the appointment before recording a treatment.");
                }
            }
            KeyCode::Esc | KeyCode::Backspace => return Ok(Some(DoctorAction::Back)),
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

        widgets::header(frame, layout[0], "Appointment");

        let body = layout[1].inner(Margin {
            vertical: 1,
            horizontal: 2,
        });

        if let Some(form) = &self.form {
            form.render(frame, widgets::centered_rect(70, 100, body));
        } else {
            match &self.data {
                Some(data) => {
                    let parts = Layout::default()
                        .direction(Direction::Vertical)
                        .constraints([Constraint::Length(14), Constraint::Min(5)])
                        .split(body);
                    visits::render_detail(frame, parts[0], &data.detail);
                    self.render_earlier_visits(frame, parts[1], data);
                }
                None => widgets::empty_notice(frame, body, "Appointment", "Appointment not available."),
            }
        }

        self.flash.render(frame, layout[2]);
        let help = if self.form.is_some() {
            "Tab/↑↓: Move | Space: Toggle paid | Enter: Next or press button | Esc: Close form"
        } else {
            match self.status() {
                Some(AppointmentStatus::Pending) => "a: Approve | x: Reject | Esc: Back",
                Some(AppointmentStatus::Approved) => "t: Record treatment | x: Reject | Esc: Back",
                Some(AppointmentStatus::Completed) => "t: Edit treatment | Esc: Back",
                _ => "Esc: Back",
            }
        };
        widgets::help(frame, layout[3], help);

        self.approve_dialog
            .render(frame, "Approve", "Approve this appointment request?");
        self.reject_dialog.render(
            frame,
            "Reject",
            "Reject this appointment? The patient will be notified.",
        );
    }

    fn render_earlier_visits(&self, frame: &mut Frame, area: Rect, data: &DoctorAppointment) {
        let title = format!("Earlier visits of {}", data.detail.patient.name);
        if data.earlier_visits.is_empty() {
            widgets::empty_notice(frame, area, &title, "First visit with you.");
            return;
        }
        let rows = data.earlier_visits.iter().map(|visit| {
            Row::new(vec![
                Cell::from(widgets::format_slot(visit.date)),
                Cell::from(visit.disease.clone().unwrap_or_default()),
                Cell::from(visit.progress.clone().unwrap_or_default()),
                Cell::from(visit.prescription.clone().unwrap_or_default()),
            ])
            .style(Style::default().fg(widgets::TEXT))
        });
        let table = Table::new(
            rows,
            [
                Constraint::Length(17),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Min(10),
            ],
        )
        .header(widgets::table_header(&["When", "Diagnosis", "Progress", "Prescription"]))
        .block(widgets::panel(&title, false));
        frame.render_widget(table, area);
    }
}
