//! Portal services: one function per user action.
//!
//! Each service takes the store, the caller's [`Identity`] and its inputs.
//! Form input is validated first, then the access gate is asked, and only
//! then is the store touched.

pub mod admin;
pub mod doctor;
pub mod patient;

use crate::access::{Action, Context, Identity};
use crate::db::appointments::Recipient;
use crate::db::{Database, Repository, UnitOfWork};
use crate::error::{ServiceError, ServiceResult};
use crate::lifecycle;
use crate::models::{Appointment, Department, Doctor, Patient, UserRole};
use log::{info, warn};
use serde::Serialize;
use std::collections::HashMap;

/// An appointment with the names of both parties, for lists.
#[derive(Debug, Clone, Serialize)]
pub struct Visit {
    pub appointment: Appointment,
    pub patient_name: String,
    /// `None` once the doctor's record is gone.
    pub doctor_name: Option<String>,
}

/// An appointment with both profiles, for detail views.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetail {
    pub appointment: Appointment,
    pub patient: Patient,
    pub doctor: Option<Doctor>,
    pub department: Option<Department>,
}

/// Loads the appointment or reports it missing.
fn find_appointment(work: &UnitOfWork<'_>, id: i64) -> ServiceResult<Appointment> {
    work.appointments().get(id)?.ok_or_else(|| {
        warn!("Appointment {id} not found");
        ServiceError::NotFound("Appointment")
    })
}

/// Attaches party names to each appointment, looking each profile up once.
fn visits(work: &UnitOfWork<'_>, appointments: Vec<Appointment>) -> ServiceResult<Vec<Visit>> {
    let mut patients: HashMap<i64, String> = HashMap::new();
    let mut doctors: HashMap<i64, Option<String>> = HashMap::new();
    let mut result = Vec::with_capacity(appointments.len());

    for appointment in appointments {
        let patient_name = match patients.get(&appointment.patient_id) {
            Some(name) => name.clone(),
            None => {
                let name = work
                    .patients()
                    .get(appointment.patient_id)?
                    .map(|p| p.name)
                    .unwrap_or_default();
                patients.insert(appointment.patient_id, name.clone());
                name
            }
        };

        let doctor_name = match appointment.doctor_id {
            None => None,
            Some(doctor_id) => match doctors.get(&doctor_id) {
                Some(name) => name.clone(),
                None => {
                    let name = work.doctors().get(doctor_id)?.map(|d| d.name);
                    doctors.insert(doctor_id, name.clone());
                    name
                }
            },
        };

        result.push(Visit {
            appointment,
            patient_name,
            doctor_name,
        });
    }

    Ok(result)
}

fn detail(work: &UnitOfWork<'_>, appointment: Appointment) -> ServiceResult<AppointmentDetail> {
    let patient = work
        .patients()
        .get(appointment.patient_id)?
        .ok_or(ServiceError::NotFound("Patient"))?;
    let doctor = match appointment.doctor_id {
        Some(id) => work.doctors().get(id)?,
        None => None,
    };
    let department = match &doctor {
        Some(d) => work.departments().get(d.dept_no)?,
        None => None,
    };

    Ok(AppointmentDetail {
        appointment,
        patient,
        doctor,
        department,
    })
}

/// Clears the caller's notification flag on one of their appointments.
///
/// Patients clear the patient flag, doctors the doctor flag.
pub fn mark_notification_seen(db: &Database, who: &Identity, appointment_id: i64) -> ServiceResult<()> {
    let work = db.work();
    let appointment = find_appointment(&work, appointment_id)?;
    Context::new(who).appointment(&appointment, Action::MarkSeen)?;

    let recipient = match who.role {
        UserRole::Doctor => Recipient::Doctor,
        _ => Recipient::Patient,
    };
    if lifecycle::mark_seen(&work, appointment_id, recipient)? {
        info!("Appointment {appointment_id} seen by user {}", who.user_id);
    }
    Ok(())
}
