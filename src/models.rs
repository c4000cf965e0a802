//! Data models for Carewell.
//!
//! Every status-like column of the store is an integer on disk. In memory
//! each one gets its own enum so a feedback code can never be mistaken for
//! an appointment status.

use serde::Serialize;
use std::fmt;
use time::{Date, PrimitiveDateTime};

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UserRole {
    Doctor,
    Patient,
    Admin,
}

impl UserRole {
    /// The integer stored in `users.role`.
    pub fn code(self) -> i64 {
        match self {
            UserRole::Doctor => 1,
            UserRole::Patient => 2,
            UserRole::Admin => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(UserRole::Doctor),
            2 => Some(UserRole::Patient),
            3 => Some(UserRole::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UserRole::Doctor => "Doctor",
            UserRole::Patient => "Patient",
            UserRole::Admin => "Admin",
        })
    }
}

/// Where an appointment is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AppointmentStatus {
    Approved,
    Pending,
    Completed,
    Rejected,
}

impl AppointmentStatus {
    /// The integer stored in `appointments.status`.
    pub fn code(self) -> i64 {
        match self {
            AppointmentStatus::Approved => 1,
            AppointmentStatus::Pending => 2,
            AppointmentStatus::Completed => 3,
            AppointmentStatus::Rejected => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(AppointmentStatus::Approved),
            2 => Some(AppointmentStatus::Pending),
            3 => Some(AppointmentStatus::Completed),
            4 => Some(AppointmentStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Rejected)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AppointmentStatus::Approved => "Approved",
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Rejected => "Rejected",
        })
    }
}

/// Whether a party has looked at the latest change of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NotificationState {
    Seen,
    Unseen,
}

impl NotificationState {
    pub fn code(self) -> i64 {
        match self {
            NotificationState::Seen => 1,
            NotificationState::Unseen => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(NotificationState::Seen),
            2 => Some(NotificationState::Unseen),
            _ => None,
        }
    }
}

/// Whether the patient has left feedback for a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FeedbackState {
    Given,
    Pending,
}

impl FeedbackState {
    pub fn code(self) -> i64 {
        match self {
            FeedbackState::Given => 1,
            FeedbackState::Pending => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(FeedbackState::Given),
            2 => Some(FeedbackState::Pending),
            _ => None,
        }
    }
}

/// Payment state of an appointment's bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BillStatus {
    NotGenerated,
    Pending,
    Paid,
}

impl BillStatus {
    /// The label stored in `appointments.bill_status`.
    pub fn as_str(self) -> &'static str {
        match self {
            BillStatus::NotGenerated => "Not Generated",
            BillStatus::Pending => "Pending",
            BillStatus::Paid => "Paid",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Not Generated" => Some(BillStatus::NotGenerated),
            "Pending" => Some(BillStatus::Pending),
            "Paid" => Some(BillStatus::Paid),
            _ => None,
        }
    }

    /// Status written when a bill is generated at completion.
    pub fn for_payment(is_paid: bool) -> Self {
        if is_paid {
            BillStatus::Paid
        } else {
            BillStatus::Pending
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "M" => Some(Gender::Male),
            "F" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// Employment status of a doctor (1 = present, 0 = left).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DoctorStatus {
    Active,
    Left,
}

impl DoctorStatus {
    pub fn code(self) -> i64 {
        match self {
            DoctorStatus::Active => 1,
            DoctorStatus::Left => 0,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(DoctorStatus::Active),
            0 => Some(DoctorStatus::Left),
            _ => None,
        }
    }
}

/// A login identity.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
}

/// Patient profile, keyed by the owning user's id.
#[derive(Debug, Clone, Serialize)]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Date,
    pub gender: Gender,
}

/// Doctor profile, keyed by the owning user's id.
#[derive(Debug, Clone, Serialize)]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub birth_date: Date,
    pub gender: Gender,
    pub dept_no: i64,
    pub charges_per_visit: f64,
    pub monthly_salary: Option<f64>,
    pub repute_index: Option<f64>,
    pub patients_treated: i64,
    pub qualification: String,
    pub specialization: Option<String>,
    pub work_experience: Option<i64>,
    pub status: DoctorStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct Department {
    pub dept_no: i64,
    pub name: String,
    pub description: Option<String>,
}

/// A department together with the number of doctors assigned to it.
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentSummary {
    pub department: Department,
    pub doctor_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Appointment {
    pub id: i64,
    /// `None` once the doctor's record has been removed.
    pub doctor_id: Option<i64>,
    pub patient_id: i64,
    pub date: PrimitiveDateTime,
    pub status: AppointmentStatus,
    pub bill_amount: f64,
    pub bill_status: BillStatus,
    pub doctor_notification: NotificationState,
    pub patient_notification: NotificationState,
    pub feedback: FeedbackState,
    pub disease: Option<String>,
    pub progress: Option<String>,
    pub prescription: Option<String>,
}

/// Non-medical staff member.
#[derive(Debug, Clone, Serialize)]
pub struct OtherStaff {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub designation: String,
    pub gender: Gender,
    pub birth_date: Option<Date>,
    pub highest_qualification: Option<String>,
    pub salary: Option<f64>,
}

/// The profile a user owns, decided by the user's role.
#[derive(Debug, Clone)]
pub enum Account {
    Patient(Patient),
    Doctor(Doctor),
    Admin,
}
