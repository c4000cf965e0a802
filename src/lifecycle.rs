//! Appointment lifecycle.
//!
//! ```text
//!   create ──► Pending ──approve──► Approved ──complete──► Completed ◄─┐
//!                 │                    │                      └──────┘ re-complete
//!                 └──reject──► Rejected ◄──reject/cancel──┘
//! ```
//!
//! Every transition returns `Ok(false)` when the appointment does not exist
//! or its stored status does not allow the move; the row is then untouched.
//! The check and the write are one conditional UPDATE.

use crate::db::appointments::{Recipient, TreatmentRecord};
use crate::db::{Repository, UnitOfWork};
use crate::models::{
    Appointment, AppointmentStatus, BillStatus, FeedbackState, NotificationState,
};
use crate::validation::{self, Validated, ValidationError};
use time::PrimitiveDateTime;

pub const MAX_BILL_AMOUNT: f64 = 10_000.0;
const TREATMENT_FIELD_MAX: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Approve,
    Reject,
    Complete,
}

impl Transition {
    /// Statuses the transition may start from.
    pub fn allowed_from(self) -> &'static [AppointmentStatus] {
        match self {
            Transition::Approve => &[AppointmentStatus::Pending],
            Transition::Reject => &[AppointmentStatus::Pending, AppointmentStatus::Approved],
            Transition::Complete => &[AppointmentStatus::Approved, AppointmentStatus::Completed],
        }
    }

    pub fn target(self) -> AppointmentStatus {
        match self {
            Transition::Approve => AppointmentStatus::Approved,
            Transition::Reject => AppointmentStatus::Rejected,
            Transition::Complete => AppointmentStatus::Completed,
        }
    }
}

/// The status `current` moves to under `transition`, if the move is allowed.
pub fn next_status(current: AppointmentStatus, transition: Transition) -> Option<AppointmentStatus> {
    transition
        .allowed_from()
        .contains(&current)
        .then(|| transition.target())
}

/// Diagnosis and notes recorded when a visit is completed.
///
/// Only constructible through [`Treatment::new`], so a completion without a
/// diagnosis cannot be expressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Treatment {
    disease: String,
    progress: Option<String>,
    prescription: Option<String>,
}

impl Treatment {
    pub fn new(disease: &str, progress: &str, prescription: &str) -> Validated<Self> {
        Ok(Self {
            disease: validation::required("Diagnosis", disease, TREATMENT_FIELD_MAX)?,
            progress: validation::optional("Progress", progress, TREATMENT_FIELD_MAX)?,
            prescription: validation::optional("Prescription", prescription, TREATMENT_FIELD_MAX)?,
        })
    }

    pub fn disease(&self) -> &str {
        &self.disease
    }

    pub fn progress(&self) -> Option<&str> {
        self.progress.as_deref()
    }

    pub fn prescription(&self) -> Option<&str> {
        self.prescription.as_deref()
    }
}

/// Bill generated at completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bill {
    amount: f64,
    paid: bool,
}

impl Bill {
    pub fn new(amount: f64, paid: bool) -> Validated<Self> {
        if !amount.is_finite() || !(0.0..=MAX_BILL_AMOUNT).contains(&amount) {
            return Err(ValidationError::new(format!(
                "Bill amount must be between 0 and {MAX_BILL_AMOUNT}."
            )));
        }
        Ok(Self { amount, paid })
    }

    /// Parses the amount as typed into a form.
    pub fn parse(amount: &str, paid: bool) -> Validated<Self> {
        let amount = validation::amount("Bill amount", amount, 0.0, MAX_BILL_AMOUNT)?;
        Self::new(amount, paid)
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn status(&self) -> BillStatus {
        BillStatus::for_payment(self.paid)
    }
}

/// Stores a new Pending request and flags it for the doctor.
pub fn create(
    work: &UnitOfWork<'_>,
    doctor_id: i64,
    patient_id: i64,
    at: PrimitiveDateTime,
) -> rusqlite::Result<i64> {
    work.appointments().add(&Appointment {
        id: 0,
        doctor_id: Some(doctor_id),
        patient_id,
        date: at,
        status: AppointmentStatus::Pending,
        bill_amount: 0.0,
        bill_status: BillStatus::NotGenerated,
        doctor_notification: NotificationState::Unseen,
        patient_notification: NotificationState::Seen,
        feedback: FeedbackState::Pending,
        disease: None,
        progress: None,
        prescription: None,
    })
}

pub fn approve(work: &UnitOfWork<'_>, id: i64) -> rusqlite::Result<bool> {
    let t = Transition::Approve;
    work.appointments()
        .set_status(id, t.allowed_from(), t.target(), Recipient::Patient)
}

/// Doctor-side rejection; the patient is notified.
pub fn reject(work: &UnitOfWork<'_>, id: i64) -> rusqlite::Result<bool> {
    let t = Transition::Reject;
    work.appointments()
        .set_status(id, t.allowed_from(), t.target(), Recipient::Patient)
}

/// Patient-side cancellation. Same transition as [`reject`], but the doctor is notified.
pub fn cancel(work: &UnitOfWork<'_>, id: i64) -> rusqlite::Result<bool> {
    let t = Transition::Reject;
    work.appointments()
        .set_status(id, t.allowed_from(), t.target(), Recipient::Doctor)
}

/// Completes an Approved visit, or corrects the record of a Completed one.
pub fn complete(
    work: &UnitOfWork<'_>,
    id: i64,
    treatment: &Treatment,
    bill: Bill,
) -> rusqlite::Result<bool> {
    let record = TreatmentRecord {
        disease: treatment.disease(),
        progress: treatment.progress(),
        prescription: treatment.prescription(),
        bill_amount: bill.amount(),
        bill_status: bill.status(),
    };
    work.appointments()
        .record_treatment(id, Transition::Complete.allowed_from(), &record)
}

/// Records that the patient left feedback. Only once the visit is over.
pub fn give_feedback(work: &UnitOfWork<'_>, id: i64) -> rusqlite::Result<bool> {
    work.appointments().set_feedback_given(
        id,
        &[AppointmentStatus::Completed, AppointmentStatus::Rejected],
    )
}

pub fn mark_seen(work: &UnitOfWork<'_>, id: i64, recipient: Recipient) -> rusqlite::Result<bool> {
    work.appointments().mark_seen(id, recipient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{testing, Database};
    use time::macros::datetime;

    fn setup() -> (Database, i64) {
        let db = testing::db();
        let dept = testing::department(&db, "General");
        let doctor = testing::doctor(&db, "Quinn", dept);
        let patient = testing::patient(&db, "Rosa");
        let id = create(&db.work(), doctor, patient, datetime!(2030-01-10 10:00)).unwrap();
        (db, id)
    }

    fn status(db: &Database, id: i64) -> AppointmentStatus {
        db.appointments().get(id).unwrap().unwrap().status
    }

    fn flu() -> Treatment {
        Treatment::new("Flu", "Recovering", "Rest").unwrap()
    }

    #[test]
    fn transition_table() {
        use AppointmentStatus::*;
        assert_eq!(next_status(Pending, Transition::Approve), Some(Approved));
        assert_eq!(next_status(Approved, Transition::Approve), None);
        assert_eq!(next_status(Pending, Transition::Reject), Some(Rejected));
        assert_eq!(next_status(Approved, Transition::Reject), Some(Rejected));
        assert_eq!(next_status(Completed, Transition::Reject), None);
        assert_eq!(next_status(Approved, Transition::Complete), Some(Completed));
        assert_eq!(next_status(Completed, Transition::Complete), Some(Completed));
        assert_eq!(next_status(Rejected, Transition::Complete), None);
        assert_eq!(next_status(Pending, Transition::Complete), None);
    }

    #[test]
    fn create_starts_pending_and_unbilled() {
        let (db, id) = setup();
        let appointment = db.appointments().get(id).unwrap().unwrap();

        assert_eq!(appointment.status, AppointmentStatus::Pending);
        assert_eq!(appointment.bill_amount, 0.0);
        assert_eq!(appointment.bill_status.as_str(), "Not Generated");
        assert_eq!(appointment.feedback, FeedbackState::Pending);
        assert_eq!(appointment.doctor_notification, NotificationState::Unseen);
    }

    #[test]
    fn approve_only_from_pending() {
        let (db, id) = setup();
        let work = db.work();

        assert!(approve(&work, id).unwrap());
        assert_eq!(status(&db, id), AppointmentStatus::Approved);
        assert_eq!(
            db.appointments().get(id).unwrap().unwrap().patient_notification,
            NotificationState::Unseen
        );

        assert!(!approve(&work, id).unwrap());
        assert_eq!(status(&db, id), AppointmentStatus::Approved);
    }

    #[test]
    fn unknown_ids_report_false() {
        let (db, _) = setup();
        let work = db.work();
        assert!(!approve(&work, 999).unwrap());
        assert!(!reject(&work, 999).unwrap());
        assert!(!complete(&work, 999, &flu(), Bill::new(10.0, true).unwrap()).unwrap());
        assert!(!give_feedback(&work, 999).unwrap());
    }

    #[test]
    fn rejected_is_terminal() {
        let (db, id) = setup();
        let work = db.work();

        assert!(reject(&work, id).unwrap());
        assert!(!approve(&work, id).unwrap());
        assert!(!complete(&work, id, &flu(), Bill::new(10.0, true).unwrap()).unwrap());
        assert!(!reject(&work, id).unwrap());
        assert_eq!(status(&db, id), AppointmentStatus::Rejected);
    }

    #[test]
    fn cancel_rejects_an_approved_visit_and_notifies_the_doctor() {
        let (db, id) = setup();
        let work = db.work();
        approve(&work, id).unwrap();
        mark_seen(&work, id, Recipient::Doctor).unwrap();

        assert!(cancel(&work, id).unwrap());
        let stored = db.appointments().get(id).unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Rejected);
        assert_eq!(stored.doctor_notification, NotificationState::Unseen);
    }

    #[test]
    fn complete_requires_approval_and_writes_the_bill() {
        let (db, id) = setup();
        let work = db.work();

        assert!(!complete(&work, id, &flu(), Bill::new(80.0, false).unwrap()).unwrap());
        approve(&work, id).unwrap();
        assert!(complete(&work, id, &flu(), Bill::new(80.0, false).unwrap()).unwrap());

        let stored = db.appointments().get(id).unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Completed);
        assert_eq!(stored.disease.as_deref(), Some("Flu"));
        assert_eq!(stored.bill_amount, 80.0);
        assert_eq!(stored.bill_status.as_str(), "Pending");
    }

    #[test]
    fn re_complete_corrects_the_record() {
        let (db, id) = setup();
        let work = db.work();
        approve(&work, id).unwrap();
        complete(&work, id, &flu(), Bill::new(80.0, false).unwrap()).unwrap();

        let corrected = Treatment::new("Influenza A", "", "").unwrap();
        assert!(complete(&work, id, &corrected, Bill::new(80.0, true).unwrap()).unwrap());

        let stored = db.appointments().get(id).unwrap().unwrap();
        assert_eq!(stored.disease.as_deref(), Some("Influenza A"));
        assert_eq!(stored.progress, None);
        assert_eq!(stored.bill_status.as_str(), "Paid");
    }

    #[test]
    fn diagnosis_is_required() {
        assert!(Treatment::new("   ", "fine", "none").is_err());
        assert!(Treatment::new(&"x".repeat(101), "", "").is_err());
    }

    #[test]
    fn bill_bounds() {
        assert!(Bill::new(-0.5, true).is_err());
        assert!(Bill::new(10_000.5, true).is_err());
        assert!(Bill::new(f64::NAN, true).is_err());
        assert_eq!(Bill::new(0.0, true).unwrap().status(), BillStatus::Paid);
        assert_eq!(Bill::parse("120", false).unwrap().amount(), 120.0);
    }

    #[test]
    fn feedback_waits_for_a_terminal_status() {
        let (db, id) = setup();
        let work = db.work();

        assert!(!give_feedback(&work, id).unwrap());
        approve(&work, id).unwrap();
        complete(&work, id, &flu(), Bill::new(20.0, true).unwrap()).unwrap();
        assert!(give_feedback(&work, id).unwrap());
        assert!(!give_feedback(&work, id).unwrap());

        let stored = db.appointments().get(id).unwrap().unwrap();
        assert_eq!(stored.feedback, FeedbackState::Given);
    }
}
