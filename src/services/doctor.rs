//! Doctor portal actions.

use super::{detail, find_appointment, visits, AppointmentDetail, Visit};
use crate::access::{Action, Context, Identity};
use crate::db::{Database, Repository};
use crate::error::{ServiceError, ServiceResult};
use crate::lifecycle::{self, Bill, Treatment};
use crate::models::{Appointment, AppointmentStatus, Department, Doctor};
use log::{info, warn};
use serde::Serialize;
use time::Date;

#[derive(Debug, Clone, Serialize)]
pub struct DoctorDashboard {
    pub doctor: Doctor,
    pub department: Option<Department>,
    /// Approved visits scheduled for today.
    pub today: Vec<Visit>,
    /// Requests waiting for a decision, soonest first.
    pub pending: Vec<Visit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorAppointment {
    pub detail: AppointmentDetail,
    /// The patient's other completed visits with this doctor.
    pub earlier_visits: Vec<Appointment>,
}

/// Treatment form as typed by the doctor.
#[derive(Debug, Clone, Default)]
pub struct TreatmentForm {
    pub disease: String,
    pub progress: String,
    pub prescription: String,
    pub bill_amount: String,
    pub paid: bool,
}

impl TreatmentForm {
    fn validate(&self) -> ServiceResult<(Treatment, Bill)> {
        let treatment = Treatment::new(&self.disease, &self.progress, &self.prescription)?;
        let bill = Bill::parse(&self.bill_amount, self.paid)?;
        Ok((treatment, bill))
    }
}

pub fn doctor_dashboard(db: &Database, who: &Identity, today: Date) -> ServiceResult<DoctorDashboard> {
    Context::new(who).doctor_record(who.user_id)?;
    let work = db.work();

    let doctor = work
        .doctors()
        .get(who.user_id)?
        .ok_or(ServiceError::NotFound("Doctor"))?;
    let department = work.departments().get(doctor.dept_no)?;
    let today = visits(&work, work.appointments().approved_on_day(doctor.id, today)?)?;
    let pending = visits(&work, work.appointments().pending_for_doctor(doctor.id)?)?;

    Ok(DoctorDashboard {
        doctor,
        department,
        today,
        pending,
    })
}

pub fn doctor_appointment(db: &Database, who: &Identity, appointment_id: i64) -> ServiceResult<DoctorAppointment> {
    let work = db.work();
    let appointment = find_appointment(&work, appointment_id)?;
    Context::new(who).appointment(&appointment, Action::Read)?;

    let earlier_visits = work
        .appointments()
        .earlier_visits(appointment.patient_id, who.user_id, appointment.id)?;
    Ok(DoctorAppointment {
        detail: detail(&work, appointment)?,
        earlier_visits,
    })
}

pub fn approve_appointment(db: &Database, who: &Identity, appointment_id: i64) -> ServiceResult<()> {
    let work = db.work();
    let appointment = find_appointment(&work, appointment_id)?;
    Context::new(who).appointment(&appointment, Action::Approve)?;

    if !lifecycle::approve(&work, appointment_id)? {
        warn!("Appointment {appointment_id} is {} and cannot be approved", appointment.status);
        return Err(ServiceError::InvalidTransition("approved"));
    }
    info!("Appointment {appointment_id} approved by doctor {}", who.user_id);
    Ok(())
}

pub fn reject_appointment(db: &Database, who: &Identity, appointment_id: i64) -> ServiceResult<()> {
    let work = db.work();
    let appointment = find_appointment(&work, appointment_id)?;
    Context::new(who).appointment(&appointment, Action::Reject)?;

    if !lifecycle::reject(&work, appointment_id)? {
        warn!("Appointment {appointment_id} is {} and cannot be rejected", appointment.status);
        return Err(ServiceError::InvalidTransition("rejected"));
    }
    info!("Appointment {appointment_id} rejected by doctor {}", who.user_id);
    Ok(())
}

/// Completes an Approved visit with its treatment and bill.
pub fn complete_treatment(
    db: &Database,
    who: &Identity,
    appointment_id: i64,
    form: &TreatmentForm,
) -> ServiceResult<()> {
    record(db, who, appointment_id, form, AppointmentStatus::Approved, "completed")
}

/// Corrects the treatment and bill of an already Completed visit.
pub fn update_treatment(
    db: &Database,
    who: &Identity,
    appointment_id: i64,
    form: &TreatmentForm,
) -> ServiceResult<()> {
    record(db, who, appointment_id, form, AppointmentStatus::Completed, "updated")
}

fn record(
    db: &Database,
    who: &Identity,
    appointment_id: i64,
    form: &TreatmentForm,
    expected: AppointmentStatus,
    verb: &'static str,
) -> ServiceResult<()> {
    let (treatment, bill) = form.validate()?;

    db.transaction(|work| {
        let appointment = find_appointment(work, appointment_id)?;
        Context::new(who).appointment(&appointment, Action::Complete)?;

        if appointment.status != expected || !lifecycle::complete(work, appointment_id, &treatment, bill)? {
            warn!("Appointment {appointment_id} is {} and cannot be {verb}", appointment.status);
            return Err(ServiceError::InvalidTransition(verb));
        }
        Ok(())
    })?;

    info!(
        "Treatment of appointment {appointment_id} {verb} by doctor {} (bill {} {})",
        who.user_id,
        bill.amount(),
        bill.status()
    );
    Ok(())
}

/// Completed visits treated by the caller, newest first.
pub fn doctor_history(db: &Database, who: &Identity) -> ServiceResult<Vec<Visit>> {
    Context::new(who).doctor_record(who.user_id)?;
    let work = db.work();
    visits(&work, work.appointments().history_for_doctor(who.user_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BillStatus;
    use crate::services::fixtures::{clinic, Clinic};
    use crate::services::patient::book_appointment;
    use time::macros::{date, datetime};
    use time::PrimitiveDateTime;

    const NOW: PrimitiveDateTime = datetime!(2030-06-10 07:00);

    fn flu(paid: bool) -> TreatmentForm {
        TreatmentForm {
            disease: "Flu".to_string(),
            progress: "Stable".to_string(),
            prescription: "Paracetamol".to_string(),
            bill_amount: "60".to_string(),
            paid,
        }
    }

    fn booked(c: &Clinic, at: PrimitiveDateTime) -> i64 {
        book_appointment(&c.db, &c.patient, c.doctor.user_id, at, NOW).unwrap()
    }

    #[test]
    fn dashboard_lists_today_and_pending() {
        let c = clinic();
        let today = booked(&c, datetime!(2030-06-10 09:00));
        let tomorrow = booked(&c, datetime!(2030-06-11 09:00));
        approve_appointment(&c.db, &c.doctor, today).unwrap();

        let dashboard = doctor_dashboard(&c.db, &c.doctor, date!(2030 - 06 - 10)).unwrap();
        assert_eq!(dashboard.doctor.name, "Mensah");
        assert_eq!(dashboard.department.map(|d| d.name).as_deref(), Some("General Medicine"));
        let ids = |v: &[Visit]| v.iter().map(|v| v.appointment.id).collect::<Vec<_>>();
        assert_eq!(ids(&dashboard.today), [today]);
        assert_eq!(ids(&dashboard.pending), [tomorrow]);
    }

    #[test]
    fn approve_twice_is_an_invalid_transition() {
        let c = clinic();
        let id = booked(&c, datetime!(2030-06-11 10:00));

        approve_appointment(&c.db, &c.doctor, id).unwrap();
        assert!(matches!(
            approve_appointment(&c.db, &c.doctor, id),
            Err(ServiceError::InvalidTransition(_))
        ));
    }

    #[test]
    fn other_doctors_are_denied() {
        let c = clinic();
        let other = c.other_doctor("Kowalski");
        let id = booked(&c, datetime!(2030-06-11 10:00));

        assert!(matches!(
            approve_appointment(&c.db, &other, id),
            Err(ServiceError::AccessDenied(_))
        ));
        assert!(matches!(
            doctor_appointment(&c.db, &other, id),
            Err(ServiceError::AccessDenied(_))
        ));
        assert!(matches!(
            approve_appointment(&c.db, &c.doctor, 12345),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn completing_requires_approval_and_a_diagnosis() {
        let c = clinic();
        let id = booked(&c, datetime!(2030-06-11 10:00));

        assert!(matches!(
            complete_treatment(&c.db, &c.doctor, id, &flu(true)),
            Err(ServiceError::InvalidTransition(_))
        ));

        approve_appointment(&c.db, &c.doctor, id).unwrap();
        let blank = TreatmentForm {
            disease: " ".to_string(),
            ..flu(true)
        };
        assert!(matches!(
            complete_treatment(&c.db, &c.doctor, id, &blank),
            Err(ServiceError::Validation(_))
        ));
        let stored = c.db.appointments().get(id).unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Approved);

        complete_treatment(&c.db, &c.doctor, id, &flu(true)).unwrap();
        let stored = c.db.appointments().get(id).unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Completed);
        assert_eq!(stored.bill_status, BillStatus::Paid);
        assert_eq!(stored.bill_amount, 60.0);
    }

    #[test]
    fn overpriced_bills_are_rejected() {
        let c = clinic();
        let id = booked(&c, datetime!(2030-06-11 10:00));
        approve_appointment(&c.db, &c.doctor, id).unwrap();

        let form = TreatmentForm {
            bill_amount: "10000.01".to_string(),
            ..flu(false)
        };
        assert!(matches!(
            complete_treatment(&c.db, &c.doctor, id, &form),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn update_only_after_completion() {
        let c = clinic();
        let id = booked(&c, datetime!(2030-06-11 10:00));
        approve_appointment(&c.db, &c.doctor, id).unwrap();

        assert!(matches!(
            update_treatment(&c.db, &c.doctor, id, &flu(false)),
            Err(ServiceError::InvalidTransition(_))
        ));

        complete_treatment(&c.db, &c.doctor, id, &flu(false)).unwrap();
        let corrected = TreatmentForm {
            disease: "Bronchitis".to_string(),
            ..flu(true)
        };
        update_treatment(&c.db, &c.doctor, id, &corrected).unwrap();

        let stored = c.db.appointments().get(id).unwrap().unwrap();
        assert_eq!(stored.disease.as_deref(), Some("Bronchitis"));
        assert_eq!(stored.bill_status, BillStatus::Paid);
    }

    #[test]
    fn detail_shows_earlier_visits_with_this_doctor() {
        let c = clinic();
        let first = booked(&c, datetime!(2030-06-10 09:00));
        approve_appointment(&c.db, &c.doctor, first).unwrap();
        complete_treatment(&c.db, &c.doctor, first, &flu(true)).unwrap();
        let second = booked(&c, datetime!(2030-06-12 09:00));

        let view = doctor_appointment(&c.db, &c.doctor, second).unwrap();
        assert_eq!(view.detail.patient.name, "Yusuf");
        let earlier: Vec<_> = view.earlier_visits.iter().map(|a| a.id).collect();
        assert_eq!(earlier, [first]);

        let history = doctor_history(&c.db, &c.doctor).unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn end_to_end_visit() {
        let c = clinic();
        let tomorrow_ten = datetime!(2030-06-11 10:00);

        let id = book_appointment(&c.db, &c.patient, c.doctor.user_id, tomorrow_ten, NOW).unwrap();
        let stored = c.db.appointments().get(id).unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Pending);
        assert_eq!(stored.bill_status.as_str(), "Not Generated");

        approve_appointment(&c.db, &c.doctor, id).unwrap();
        assert_eq!(
            c.db.appointments().get(id).unwrap().unwrap().status,
            AppointmentStatus::Approved
        );

        complete_treatment(&c.db, &c.doctor, id, &flu(false)).unwrap();
        let stored = c.db.appointments().get(id).unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Completed);
        assert_eq!(stored.disease.as_deref(), Some("Flu"));
        assert_eq!(stored.bill_status.as_str(), "Pending");
    }
}
