//! Role and ownership checks.
//!
//! Every portal service asks a [`Context`] before touching the store. A
//! decision is a pure lookup in [`permits`]; the context only adds the
//! logging, one structured line per decision.

use crate::models::{Appointment, UserRole};
use log::{debug, warn};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Who is acting: established at login or registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: i64,
    pub role: UserRole,
}

impl Identity {
    pub fn new(user_id: i64, role: UserRole) -> Self {
        Self { user_id, role }
    }
}

/// Refusal without details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Access denied.")]
pub struct AccessDenied;

pub type AccessResult = Result<(), AccessDenied>;

/// What an action is performed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Object {
    Appointment {
        id: i64,
        patient_id: i64,
        doctor_id: Option<i64>,
    },
    PatientRecord {
        patient_id: i64,
    },
    DoctorRecord {
        doctor_id: i64,
    },
    Departments,
    Doctors,
    Staff,
}

impl From<&Appointment> for Object {
    fn from(a: &Appointment) -> Self {
        Object::Appointment {
            id: a.id,
            patient_id: a.patient_id,
            doctor_id: a.doctor_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Book,
    Cancel,
    GiveFeedback,
    Approve,
    Reject,
    Complete,
    MarkSeen,
    Browse,
    Manage,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Read => "read",
            Action::Book => "book",
            Action::Cancel => "cancel",
            Action::GiveFeedback => "give-feedback",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Complete => "complete",
            Action::MarkSeen => "mark-seen",
            Action::Browse => "browse",
            Action::Manage => "manage",
        };
        f.write_str(name)
    }
}

/// The rule table.
pub fn permits(subject: &Identity, object: &Object, action: Action) -> bool {
    use Action::*;
    let me = subject.user_id;

    match (subject.role, object) {
        (UserRole::Patient, Object::Appointment { patient_id, .. }) => {
            *patient_id == me && matches!(action, Read | Cancel | GiveFeedback | MarkSeen)
        }
        (UserRole::Patient, Object::PatientRecord { patient_id }) => {
            *patient_id == me && matches!(action, Read | Book)
        }
        (UserRole::Patient, Object::Departments | Object::Doctors) => action == Browse,

        (UserRole::Doctor, Object::Appointment { doctor_id, .. }) => {
            *doctor_id == Some(me) && matches!(action, Read | Approve | Reject | Complete | MarkSeen)
        }
        (UserRole::Doctor, Object::DoctorRecord { doctor_id }) => *doctor_id == me && action == Read,

        (UserRole::Admin, Object::Departments | Object::Staff) => matches!(action, Browse | Manage),
        (UserRole::Admin, Object::Doctors) => action == Browse,

        _ => false,
    }
}

/// A subject about to act.
pub struct Context<'a> {
    subject: &'a Identity,
}

impl<'a> Context<'a> {
    pub fn new(subject: &'a Identity) -> Self {
        Self { subject }
    }

    pub fn enforce(&self, object: Object, action: Action) -> AccessResult {
        let decision = json!({ "sub": self.subject, "obj": object, "act": action });

        if permits(self.subject, &object, action) {
            debug!("Granted {decision}");
            Ok(())
        } else {
            warn!("Denied {decision}");
            Err(AccessDenied)
        }
    }

    pub fn appointment(&self, appointment: &Appointment, action: Action) -> AccessResult {
        self.enforce(Object::from(appointment), action)
    }

    pub fn patient_record(&self, patient_id: i64, action: Action) -> AccessResult {
        self.enforce(Object::PatientRecord { patient_id }, action)
    }

    pub fn doctor_record(&self, doctor_id: i64) -> AccessResult {
        self.enforce(Object::DoctorRecord { doctor_id }, Action::Read)
    }

    pub fn browse_departments(&self) -> AccessResult {
        self.enforce(Object::Departments, Action::Browse)
    }

    pub fn manage_departments(&self) -> AccessResult {
        self.enforce(Object::Departments, Action::Manage)
    }

    pub fn browse_doctors(&self) -> AccessResult {
        self.enforce(Object::Doctors, Action::Browse)
    }

    pub fn browse_staff(&self) -> AccessResult {
        self.enforce(Object::Staff, Action::Browse)
    }

    pub fn manage_staff(&self) -> AccessResult {
        self.enforce(Object::Staff, Action::Manage)
    }
}
