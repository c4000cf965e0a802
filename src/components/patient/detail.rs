use super::PatientAction;
use crate::components::visits;
use crate::components::widgets::{self, Confirm, Flash};
use crate::components::Session;
use crate::lifecycle::{self, Transition};
use crate::models::{AppointmentStatus, FeedbackState, NotificationState};
use crate::services::{self, patient, AppointmentDetail};
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use log::warn;
use ratatui::prelude::*;

pub struct AppointmentView {
    session: Session,
    appointment_id: i64,
    detail: Option<AppointmentDetail>,
    cancel_dialog: Confirm,
    feedback_dialog: Confirm,
    flash: Flash,
}

impl AppointmentView {
    pub fn new(session: Session, appointment_id: i64) -> Self {
        let mut view = Self {
            session,
            appointment_id,
            detail: None,
            cancel_dialog: Confirm::default(),
            feedback_dialog: Confirm::default(),
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
        match patient::patient_appointment(&self.session.db, &self.session.identity, self.appointment_id) {
            Ok(detail) => self.detail = Some(detail),
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    /// Clears the notification flag once the patient has opened the appointment.
    fn acknowledge(&mut self) {
        let unseen = self
            .detail
            .as_ref()
            .is_some_and(|d| d.appointment.patient_notification == NotificationState::Unseen);
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
        self.detail.as_ref().map(|d| d.appointment.status)
    }

    fn can_cancel(&self) -> bool {
        self.status()
            .and_then(|status| lifecycle::next_status(status, Transition::Reject))
            .is_some()
    }

    fn can_give_feedback(&self) -> bool {
        self.detail.as_ref().is_some_and(|d| {
            d.appointment.status.is_terminal() && d.appointment.feedback == FeedbackState::Pending
        })
    }

    pub fn process_input(&mut self, key: KeyEvent) -> Result<Option<PatientAction>> {
        if self.cancel_dialog.is_open() {
            if let Some(true) = self.cancel_dialog.handle_input(key) {
                match patient::cancel_appointment(&self.session.db, &self.session.identity, self.appointment_id) {
                    Ok(()) => self.flash.success("Appointment cancelled."),
                    Err(e) => self.flash.error(e.to_string()),
                }
                self.load();
            }
            return Ok(None);
        }
        if self.feedback_dialog.is_open() {
            if let Some(true) = self.feedback_dialog.handle_input(key) {
                match patient::give_feedback(&self.session.db, &self.session.identity, self.appointment_id) {
                    Ok(()) => self.flash.success("Thank you for your feedback."),
                    Err(e) => self.flash.error(e.to_string()),
                }
                self.load();
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Char('c') => {
                if self.can_cancel() {
                    self.cancel_dialog.open();
                } else {
                    self.flash.error("Only pending or approved appointments can be cancelled.");
                }
            }
            KeyCode::Char('f') => {
                if self.can_give_feedback() {
                    self.feedback_dialog.open();
                } else {
                    self.flash.error("Feedback can be given once, after the visit has ended.");
                }
            }
            KeyCode::Esc | KeyCode::Backspace => return Ok(Some(PatientAction::Back)),
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

        widgets::header(frame, layout[0], "Appointment Details");

        let body = layout[1].inner(Margin {
            vertical: 1,
            horizontal: 2,
        });
        match &self.detail {
            Some(detail) => visits::render_detail(frame, body, detail),
            None => widgets::empty_notice(frame, body, "Appointment", "Appointment not available."),
        }

        self.flash.render(frame, layout[2]);

        let mut help = Vec::new();
        if self.can_cancel() {
            help.push("c: Cancel appointment");
        }
        if self.can_give_feedback() {
            help.push("f: Give feedback");
        }
        help.push("Esc: Back");
        widgets::help(frame, layout[3], &help.join(" | "));

        self.cancel_dialog.render(
            frame,
            "Cancel Appointment",
            "Cancel this appointment? The doctor will be notified.",
        );
        self.feedback_dialog.render(
            frame,
            "Give Feedback",
            "Mark this visit as reviewed?",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures;
    use crate::db::Repository;
    use crossterm::event::KeyModifiers;
    use std::rc::Rc;
    use time::macros::datetime;

    fn press(view: &mut AppointmentView, code: KeyCode) {
        view.process_input(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap();
    }

    #[test]
    fn cancel_after_confirmation() {
        let clinic = fixtures::clinic();
        let id = lifecycle::create(
            &clinic.db.work(),
            clinic.doctor.user_id,
            clinic.patient.user_id,
            datetime!(2099-03-02 10:00),
        )
        .unwrap();
        let db = Rc::new(clinic.db);
        let mut view = AppointmentView::new(
            Session {
                db: db.clone(),
                identity: clinic.patient,
            },
            id,
        );

        press(&mut view, KeyCode::Char('c'));
        press(&mut view, KeyCode::Char('y'));

        let stored = db.appointments().get(id).unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Rejected);
        assert_eq!(stored.doctor_notification, NotificationState::Unseen);
    }

    #[test]
    fn opening_a_notification_marks_it_seen() {
        let clinic = fixtures::clinic();
        let work = clinic.db.work();
        let id = lifecycle::create(
            &work,
            clinic.doctor.user_id,
            clinic.patient.user_id,
            datetime!(2099-03-02 10:00),
        )
        .unwrap();
        lifecycle::approve(&work, id).unwrap();
        let db = Rc::new(clinic.db);

        AppointmentView::new(
            Session {
                db: db.clone(),
                identity: clinic.patient,
            },
            id,
        );

        let stored = db.appointments().get(id).unwrap().unwrap();
        assert_eq!(stored.patient_notification, NotificationState::Seen);
    }
}
