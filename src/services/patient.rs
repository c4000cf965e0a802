//! Patient portal actions.

use super::{detail, find_appointment, visits, AppointmentDetail, Visit};
use crate::access::{Action, Context, Identity};
use crate::db::{Database, Repository, UnitOfWork};
use crate::error::{ServiceError, ServiceResult};
use crate::lifecycle;
use crate::models::{DoctorStatus, NotificationState, Patient};
use crate::slots;
use crate::validation::ValidationError;
use log::{info, warn};
use serde::Serialize;
use time::{Date, PrimitiveDateTime};

/// Completed visits shown on the dashboard.
const RECENT_TREATMENTS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct PatientDashboard {
    pub patient: Patient,
    /// Earliest Pending or Approved appointment.
    pub current: Option<Visit>,
    pub recent_treatments: Vec<Visit>,
    pub unseen_notifications: usize,
}

fn own_profile(db: &Database, who: &Identity) -> ServiceResult<Patient> {
    Context::new(who).patient_record(who.user_id, Action::Read)?;
    db.patients()
        .get(who.user_id)?
        .ok_or(ServiceError::NotFound("Patient"))
}

pub fn patient_dashboard(db: &Database, who: &Identity, today: Date) -> ServiceResult<PatientDashboard> {
    let patient = own_profile(db, who)?;
    let work = db.work();
    let appointments = work.appointments();

    let current = match appointments.current_for_patient(patient.id)? {
        Some(a) => visits(&work, vec![a])?.pop(),
        None => None,
    };

    let mut treatments = appointments.treatments_for_patient(patient.id)?;
    treatments.truncate(RECENT_TREATMENTS);

    let unseen_notifications = appointments
        .notifications_for_patient(patient.id, today)?
        .iter()
        .filter(|a| a.patient_notification == NotificationState::Unseen)
        .count();

    Ok(PatientDashboard {
        patient,
        current,
        recent_treatments: visits(&work, treatments)?,
        unseen_notifications,
    })
}

/// Every appointment of the caller, newest first.
pub fn patient_appointments(db: &Database, who: &Identity) -> ServiceResult<Vec<Visit>> {
    Context::new(who).patient_record(who.user_id, Action::Read)?;
    let work = db.work();
    visits(&work, work.appointments().for_patient(who.user_id)?)
}

/// Free slots of a doctor over the booking window.
pub fn available_slots(
    db: &Database,
    who: &Identity,
    doctor_id: i64,
    now: PrimitiveDateTime,
) -> ServiceResult<Vec<PrimitiveDateTime>> {
    Context::new(who).patient_record(who.user_id, Action::Book)?;
    let work = db.work();
    bookable_doctor(&work, doctor_id)?;
    Ok(slots::free_slots_for_doctor(&work, doctor_id, now)?)
}

/// Only doctors still on staff take bookings.
fn bookable_doctor(work: &UnitOfWork<'_>, doctor_id: i64) -> ServiceResult<()> {
    match work.doctors().get(doctor_id)? {
        Some(doctor) if doctor.status == DoctorStatus::Active => Ok(()),
        _ => Err(ServiceError::NotFound("Doctor")),
    }
}

/// Books `at` with the doctor as a new Pending request.
///
/// The slot is re-checked inside the same transaction that inserts the
/// appointment, so two bookings can never share a slot.
pub fn book_appointment(
    db: &Database,
    who: &Identity,
    doctor_id: i64,
    at: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> ServiceResult<i64> {
    Context::new(who).patient_record(who.user_id, Action::Book)?;
    if !slots::is_slot_start(at) {
        return Err(ValidationError::new("Appointments start on the hour between 09:00 and 16:00.").into());
    }

    let id = db.transaction(|work| {
        bookable_doctor(work, doctor_id)?;

        let free = slots::free_slots_for_doctor(work, doctor_id, now)?;
        if !free.contains(&at) {
            warn!("Slot {at} with doctor {doctor_id} is not free");
            return Err(ServiceError::SlotTaken);
        }

        Ok(lifecycle::create(work, doctor_id, who.user_id, at)?)
    })?;

    info!("Patient {} booked appointment {id} with doctor {doctor_id} at {at}", who.user_id);
    Ok(id)
}

pub fn patient_appointment(db: &Database, who: &Identity, appointment_id: i64) -> ServiceResult<AppointmentDetail> {
    let work = db.work();
    let appointment = find_appointment(&work, appointment_id)?;
    Context::new(who).appointment(&appointment, Action::Read)?;
    detail(&work, appointment)
}

/// Withdraws a Pending or Approved appointment.
pub fn cancel_appointment(db: &Database, who: &Identity, appointment_id: i64) -> ServiceResult<()> {
    let work = db.work();
    let appointment = find_appointment(&work, appointment_id)?;
    Context::new(who).appointment(&appointment, Action::Cancel)?;

    if !lifecycle::cancel(&work, appointment_id)? {
        warn!("Appointment {appointment_id} is {} and cannot be cancelled", appointment.status);
        return Err(ServiceError::InvalidTransition("cancelled"));
    }
    info!("Patient {} cancelled appointment {appointment_id}", who.user_id);
    Ok(())
}

pub fn give_feedback(db: &Database, who: &Identity, appointment_id: i64) -> ServiceResult<()> {
    let work = db.work();
    let appointment = find_appointment(&work, appointment_id)?;
    Context::new(who).appointment(&appointment, Action::GiveFeedback)?;

    if !lifecycle::give_feedback(&work, appointment_id)? {
        return Err(ServiceError::InvalidTransition("reviewed"));
    }
    info!("Patient {} gave feedback on appointment {appointment_id}", who.user_id);
    Ok(())
}

/// Approved or Rejected appointments from `today` on.
pub fn patient_notifications(db: &Database, who: &Identity, today: Date) -> ServiceResult<Vec<Visit>> {
    Context::new(who).patient_record(who.user_id, Action::Read)?;
    let work = db.work();
    visits(&work, work.appointments().notifications_for_patient(who.user_id, today)?)
}

/// Appointments that carry a bill.
pub fn bill_history(db: &Database, who: &Identity) -> ServiceResult<Vec<Visit>> {
    Context::new(who).patient_record(who.user_id, Action::Read)?;
    let work = db.work();
    visits(&work, work.appointments().bills_for_patient(who.user_id)?)
}

pub fn treatment_history(db: &Database, who: &Identity) -> ServiceResult<Vec<Visit>> {
    Context::new(who).patient_record(who.user_id, Action::Read)?;
    let work = db.work();
    visits(&work, work.appointments().treatments_for_patient(who.user_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{Bill, Treatment};
    use crate::models::{AppointmentStatus, BillStatus, FeedbackState};
    use crate::services::fixtures::clinic;
    use time::macros::{date, datetime};

    const NOW: PrimitiveDateTime = datetime!(2030-04-01 08:15);

    #[test]
    fn booking_takes_the_slot() {
        let c = clinic();
        let slot = datetime!(2030-04-02 10:00);

        let id = book_appointment(&c.db, &c.patient, c.doctor.user_id, slot, NOW).unwrap();
        let stored = c.db.appointments().get(id).unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Pending);
        assert_eq!(stored.patient_id, c.patient.user_id);

        let free = available_slots(&c.db, &c.patient, c.doctor.user_id, NOW).unwrap();
        assert!(!free.contains(&slot));
    }

    #[test]
    fn double_booking_is_refused() {
        let c = clinic();
        let rival = c.other_patient("Noor");
        let slot = datetime!(2030-04-02 10:00);

        book_appointment(&c.db, &c.patient, c.doctor.user_id, slot, NOW).unwrap();
        let second = book_appointment(&c.db, &rival, c.doctor.user_id, slot, NOW);
        assert!(matches!(second, Err(ServiceError::SlotTaken)));
        assert_eq!(c.db.appointments().list().unwrap().len(), 1);
    }

    #[test]
    fn booking_outside_the_template_is_refused() {
        let c = clinic();
        for at in [
            datetime!(2030-04-02 18:00),
            datetime!(2030-04-01 08:00),
            datetime!(2030-04-02 10:30),
        ] {
            let result = book_appointment(&c.db, &c.patient, c.doctor.user_id, at, NOW);
            assert!(matches!(result, Err(ServiceError::Validation(_))), "{at}");
        }

        let beyond_window = book_appointment(&c.db, &c.patient, c.doctor.user_id, datetime!(2030-04-20 10:00), NOW);
        assert!(matches!(beyond_window, Err(ServiceError::SlotTaken)));
        assert!(c.db.appointments().list().unwrap().is_empty());
    }

    #[test]
    fn booking_an_unknown_doctor() {
        let c = clinic();
        let result = book_appointment(&c.db, &c.patient, 999, datetime!(2030-04-02 10:00), NOW);
        assert!(matches!(result, Err(ServiceError::NotFound("Doctor"))));
    }

    #[test]
    fn departed_doctors_offer_no_slots() {
        let c = clinic();
        let mut doctor = c.db.doctors().get(c.doctor.user_id).unwrap().unwrap();
        doctor.status = DoctorStatus::Left;
        assert!(c.db.doctors().update(&doctor).unwrap());

        let slots = available_slots(&c.db, &c.patient, c.doctor.user_id, NOW);
        assert!(matches!(slots, Err(ServiceError::NotFound("Doctor"))));
        let booking = book_appointment(&c.db, &c.patient, c.doctor.user_id, datetime!(2030-04-02 10:00), NOW);
        assert!(matches!(booking, Err(ServiceError::NotFound("Doctor"))));
    }

    #[test]
    fn doctors_cannot_book() {
        let c = clinic();
        let result = book_appointment(&c.db, &c.doctor, c.doctor.user_id, datetime!(2030-04-02 10:00), NOW);
        assert!(matches!(result, Err(ServiceError::AccessDenied(_))));
    }

    #[test]
    fn cancel_only_open_appointments() {
        let c = clinic();
        let id = book_appointment(&c.db, &c.patient, c.doctor.user_id, datetime!(2030-04-02 10:00), NOW).unwrap();

        cancel_appointment(&c.db, &c.patient, id).unwrap();
        let stored = c.db.appointments().get(id).unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Rejected);

        assert!(matches!(
            cancel_appointment(&c.db, &c.patient, id),
            Err(ServiceError::InvalidTransition(_))
        ));
    }

    #[test]
    fn cannot_cancel_someone_elses_appointment() {
        let c = clinic();
        let other = c.other_patient("Lina");
        let id = book_appointment(&c.db, &c.patient, c.doctor.user_id, datetime!(2030-04-02 10:00), NOW).unwrap();

        assert!(matches!(
            cancel_appointment(&c.db, &other, id),
            Err(ServiceError::AccessDenied(_))
        ));
        let stored = c.db.appointments().get(id).unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Pending);
    }

    #[test]
    fn dashboard_and_histories() {
        let c = clinic();
        let work = c.db.work();
        let done = book_appointment(&c.db, &c.patient, c.doctor.user_id, datetime!(2030-04-01 09:00), datetime!(2030-04-01 08:00)).unwrap();
        lifecycle::approve(&work, done).unwrap();
        let treatment = Treatment::new("Migraine", "", "").unwrap();
        lifecycle::complete(&work, done, &treatment, Bill::new(45.0, false).unwrap()).unwrap();
        let next = book_appointment(&c.db, &c.patient, c.doctor.user_id, datetime!(2030-04-03 11:00), NOW).unwrap();

        let dashboard = patient_dashboard(&c.db, &c.patient, date!(2030 - 04 - 01)).unwrap();
        assert_eq!(dashboard.patient.name, "Yusuf");
        assert_eq!(dashboard.current.map(|v| v.appointment.id), Some(next));
        assert_eq!(dashboard.recent_treatments.len(), 1);

        let bills = bill_history(&c.db, &c.patient).unwrap();
        assert_eq!(bills.len(), 1);
        assert_eq!(bills[0].appointment.bill_status, BillStatus::Pending);
        assert_eq!(treatment_history(&c.db, &c.patient).unwrap().len(), 1);
        assert_eq!(patient_appointments(&c.db, &c.patient).unwrap().len(), 2);
    }

    #[test]
    fn notifications_follow_doctor_decisions() {
        let c = clinic();
        let id = book_appointment(&c.db, &c.patient, c.doctor.user_id, datetime!(2030-04-02 10:00), NOW).unwrap();
        assert!(patient_notifications(&c.db, &c.patient, NOW.date()).unwrap().is_empty());

        lifecycle::approve(&c.db.work(), id).unwrap();
        let notes = patient_notifications(&c.db, &c.patient, NOW.date()).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].doctor_name.as_deref(), Some("Mensah"));

        let dashboard = patient_dashboard(&c.db, &c.patient, NOW.date()).unwrap();
        assert_eq!(dashboard.unseen_notifications, 1);
    }

    #[test]
    fn feedback_after_completion() {
        let c = clinic();
        let work = c.db.work();
        let id = book_appointment(&c.db, &c.patient, c.doctor.user_id, datetime!(2030-04-02 10:00), NOW).unwrap();

        assert!(matches!(
            give_feedback(&c.db, &c.patient, id),
            Err(ServiceError::InvalidTransition(_))
        ));

        lifecycle::approve(&work, id).unwrap();
        lifecycle::complete(&work, id, &Treatment::new("Flu", "", "").unwrap(), Bill::new(0.0, true).unwrap()).unwrap();
        give_feedback(&c.db, &c.patient, id).unwrap();

        let stored = c.db.appointments().get(id).unwrap().unwrap();
        assert_eq!(stored.feedback, FeedbackState::Given);
    }

    #[test]
    fn detail_includes_the_doctor_and_department() {
        let c = clinic();
        let id = book_appointment(&c.db, &c.patient, c.doctor.user_id, datetime!(2030-04-02 10:00), NOW).unwrap();

        let detail = patient_appointment(&c.db, &c.patient, id).unwrap();
        assert_eq!(detail.doctor.map(|d| d.name).as_deref(), Some("Mensah"));
        assert_eq!(detail.department.map(|d| d.name).as_deref(), Some("General Medicine"));
    }
}
