//! Appointment rows and the status-filtered lists the portals show.
//!
//! Status changes are conditional updates (`WHERE status IN (...)`), so a
//! transition that is not allowed from the stored status touches nothing
//! and reports `false`. Which transitions exist is decided in
//! [`crate::lifecycle`].

use super::{Repository, SqlDateTime};
use crate::models::{Appointment, AppointmentStatus, BillStatus, FeedbackState, NotificationState};
use rusqlite::{params, Connection, OptionalExtension, Row};
use time::{Date, Duration, PrimitiveDateTime};

const COLUMNS: &str = "id, doctor_id, patient_id, date, status, bill_amount, bill_status, \
    doctor_notification, patient_notification, feedback, disease, progress, prescription";

/// Which side of an appointment a notification flag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Doctor,
    Patient,
}

impl Recipient {
    fn column(self) -> &'static str {
        match self {
            Recipient::Doctor => "doctor_notification",
            Recipient::Patient => "patient_notification",
        }
    }
}

/// Treatment and bill fields written when a visit is completed.
#[derive(Debug, Clone, PartialEq)]
pub struct TreatmentRecord<'a> {
    pub disease: &'a str,
    pub progress: Option<&'a str>,
    pub prescription: Option<&'a str>,
    pub bill_amount: f64,
    pub bill_status: BillStatus,
}

fn status_set(statuses: &[AppointmentStatus]) -> String {
    statuses
        .iter()
        .map(|s| s.code().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct AppointmentRepository<'c> {
    conn: &'c Connection,
}

impl<'c> AppointmentRepository<'c> {
    pub(super) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Appointment> {
        Ok(Appointment {
            id: row.get(0)?,
            doctor_id: row.get(1)?,
            patient_id: row.get(2)?,
            date: row.get::<_, SqlDateTime>(3)?.0,
            status: row.get(4)?,
            bill_amount: row.get(5)?,
            bill_status: row.get(6)?,
            doctor_notification: row.get(7)?,
            patient_notification: row.get(8)?,
            feedback: row.get(9)?,
            disease: row.get(10)?,
            progress: row.get(11)?,
            prescription: row.get(12)?,
        })
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> rusqlite::Result<Vec<Appointment>> {
        let mut stmt = self.conn.prepare(sql)?;
        let appointments = stmt.query_map(params, Self::from_row)?;
        appointments.collect()
    }

    /// Start times of the doctor's Pending and Approved appointments in `[start, end)`.
    pub fn occupied_between(
        &self,
        doctor_id: i64,
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
    ) -> rusqlite::Result<Vec<PrimitiveDateTime>> {
        let occupying = status_set(&[AppointmentStatus::Approved, AppointmentStatus::Pending]);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT date FROM appointments
             WHERE doctor_id = ?1 AND date >= ?2 AND date < ?3 AND status IN ({occupying})
             ORDER BY date"
        ))?;
        let dates = stmt.query_map(
            params![doctor_id, SqlDateTime(start), SqlDateTime(end)],
            |row| row.get::<_, SqlDateTime>(0).map(|d| d.0),
        )?;
        dates.collect()
    }

    /// Moves the appointment to `to` if its stored status is one of `from`,
    /// flagging the change as unseen for `notify`.
    pub fn set_status(
        &self,
        id: i64,
        from: &[AppointmentStatus],
        to: AppointmentStatus,
        notify: Recipient,
    ) -> rusqlite::Result<bool> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE appointments SET status = ?1, {flag} = ?2
                 WHERE id = ?3 AND status IN ({from})",
                flag = notify.column(),
                from = status_set(from),
            ),
            params![to, NotificationState::Unseen, id],
        )?;
        Ok(changed > 0)
    }

    /// Writes treatment and bill and marks the appointment Completed, if its
    /// stored status is one of `from`. The patient is notified.
    pub fn record_treatment(
        &self,
        id: i64,
        from: &[AppointmentStatus],
        record: &TreatmentRecord<'_>,
    ) -> rusqlite::Result<bool> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE appointments
                 SET status = ?1, disease = ?2, progress = ?3, prescription = ?4,
                     bill_amount = ?5, bill_status = ?6, patient_notification = ?7
                 WHERE id = ?8 AND status IN ({from})",
                from = status_set(from),
            ),
            params![
                AppointmentStatus::Completed,
                record.disease,
                record.progress,
                record.prescription,
                record.bill_amount,
                record.bill_status,
                NotificationState::Unseen,
                id,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Sets feedback to Given if the stored status is one of `when`.
    pub fn set_feedback_given(&self, id: i64, when: &[AppointmentStatus]) -> rusqlite::Result<bool> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE appointments SET feedback = ?1
                 WHERE id = ?2 AND feedback = ?3 AND status IN ({when})",
                when = status_set(when),
            ),
            params![FeedbackState::Given, id, FeedbackState::Pending],
        )?;
        Ok(changed > 0)
    }

    pub fn mark_seen(&self, id: i64, recipient: Recipient) -> rusqlite::Result<bool> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE appointments SET {flag} = ?1 WHERE id = ?2",
                flag = recipient.column()
            ),
            params![NotificationState::Seen, id],
        )?;
        Ok(changed > 0)
    }

    // --- Patient views ---

    /// The patient's earliest Pending or Approved appointment.
    pub fn current_for_patient(&self, patient_id: i64) -> rusqlite::Result<Option<Appointment>> {
        let open = status_set(&[AppointmentStatus::Approved, AppointmentStatus::Pending]);
        self.conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM appointments
                     WHERE patient_id = ?1 AND status IN ({open})
                     ORDER BY date LIMIT 1"
                ),
                params![patient_id],
                Self::from_row,
            )
            .optional()
    }

    /// Every appointment of the patient, newest first.
    pub fn for_patient(&self, patient_id: i64) -> rusqlite::Result<Vec<Appointment>> {
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM appointments WHERE patient_id = ?1 ORDER BY date DESC"
            ),
            params![patient_id],
        )
    }

    /// Appointments that carry a bill, newest first.
    pub fn bills_for_patient(&self, patient_id: i64) -> rusqlite::Result<Vec<Appointment>> {
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM appointments
                 WHERE patient_id = ?1 AND bill_amount > 0
                 ORDER BY date DESC"
            ),
            params![patient_id],
        )
    }

    /// Completed visits, newest first.
    pub fn treatments_for_patient(&self, patient_id: i64) -> rusqlite::Result<Vec<Appointment>> {
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM appointments
                 WHERE patient_id = ?1 AND status = ?2
                 ORDER BY date DESC"
            ),
            params![patient_id, AppointmentStatus::Completed],
        )
    }

    /// Approved or Rejected appointments dated `today` or later, soonest first.
    pub fn notifications_for_patient(
        &self,
        patient_id: i64,
        today: Date,
    ) -> rusqlite::Result<Vec<Appointment>> {
        let decided = status_set(&[AppointmentStatus::Approved, AppointmentStatus::Rejected]);
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM appointments
                 WHERE patient_id = ?1 AND status IN ({decided}) AND date >= ?2
                 ORDER BY date"
            ),
            params![patient_id, SqlDateTime(today.midnight())],
        )
    }

    // --- Doctor views ---

    /// Pending requests for the doctor, soonest first.
    pub fn pending_for_doctor(&self, doctor_id: i64) -> rusqlite::Result<Vec<Appointment>> {
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM appointments
                 WHERE doctor_id = ?1 AND status = ?2
                 ORDER BY date"
            ),
            params![doctor_id, AppointmentStatus::Pending],
        )
    }

    /// Approved appointments of the doctor falling on `day`.
    pub fn approved_on_day(&self, doctor_id: i64, day: Date) -> rusqlite::Result<Vec<Appointment>> {
        let start = day.midnight();
        let end = start + Duration::DAY;
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM appointments
                 WHERE doctor_id = ?1 AND status = ?2 AND date >= ?3 AND date < ?4
                 ORDER BY date"
            ),
            params![
                doctor_id,
                AppointmentStatus::Approved,
                SqlDateTime(start),
                SqlDateTime(end)
            ],
        )
    }

    /// Completed visits treated by the doctor, newest first.
    pub fn history_for_doctor(&self, doctor_id: i64) -> rusqlite::Result<Vec<Appointment>> {
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM appointments
                 WHERE doctor_id = ?1 AND status = ?2
                 ORDER BY date DESC"
            ),
            params![doctor_id, AppointmentStatus::Completed],
        )
    }

    /// The patient's other completed visits with this doctor, newest first.
    pub fn earlier_visits(
        &self,
        patient_id: i64,
        doctor_id: i64,
        except_id: i64,
    ) -> rusqlite::Result<Vec<Appointment>> {
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM appointments
                 WHERE patient_id = ?1 AND doctor_id = ?2 AND id != ?3 AND status = ?4
                 ORDER BY date DESC"
            ),
            params![patient_id, doctor_id, except_id, AppointmentStatus::Completed],
        )
    }
}

impl Repository<Appointment> for AppointmentRepository<'_> {
    fn get(&self, id: i64) -> rusqlite::Result<Option<Appointment>> {
        self.conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM appointments WHERE id = ?1"),
                params![id],
                Self::from_row,
            )
            .optional()
    }

    fn list(&self) -> rusqlite::Result<Vec<Appointment>> {
        self.query(&format!("SELECT {COLUMNS} FROM appointments ORDER BY date"), [])
    }

    fn add(&self, a: &Appointment) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO appointments (doctor_id, patient_id, date, status, bill_amount,
                 bill_status, doctor_notification, patient_notification, feedback,
                 disease, progress, prescription)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                a.doctor_id,
                a.patient_id,
                SqlDateTime(a.date),
                a.status,
                a.bill_amount,
                a.bill_status,
                a.doctor_notification,
                a.patient_notification,
                a.feedback,
                a.disease,
                a.progress,
                a.prescription,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, a: &Appointment) -> rusqlite::Result<bool> {
        let changed = self.conn.execute(
            "UPDATE appointments
             SET doctor_id = ?1, patient_id = ?2, date = ?3, status = ?4, bill_amount = ?5,
                 bill_status = ?6, doctor_notification = ?7, patient_notification = ?8,
                 feedback = ?9, disease = ?10, progress = ?11, prescription = ?12
             WHERE id = ?13",
            params![
                a.doctor_id,
                a.patient_id,
                SqlDateTime(a.date),
                a.status,
                a.bill_amount,
                a.bill_status,
                a.doctor_notification,
                a.patient_notification,
                a.feedback,
                a.disease,
                a.progress,
                a.prescription,
                a.id,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete(&self, id: i64) -> rusqlite::Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM appointments WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing;
    use crate::db::Database;
    use time::macros::{date, datetime};

    fn book(db: &Database, doctor: i64, patient: i64, at: PrimitiveDateTime, status: AppointmentStatus) -> i64 {
        db.appointments()
            .add(&Appointment {
                id: 0,
                doctor_id: Some(doctor),
                patient_id: patient,
                date: at,
                status,
                bill_amount: 0.0,
                bill_status: BillStatus::NotGenerated,
                doctor_notification: NotificationState::Unseen,
                patient_notification: NotificationState::Seen,
                feedback: FeedbackState::Pending,
                disease: None,
                progress: None,
                prescription: None,
            })
            .unwrap()
    }

    fn setup() -> (Database, i64, i64) {
        let db = testing::db();
        let dept = testing::department(&db, "General");
        let doctor = testing::doctor(&db, "House", dept);
        let patient = testing::patient(&db, "Ines");
        (db, doctor, patient)
    }

    #[test]
    fn occupied_between_ignores_closed_appointments() {
        let (db, doctor, patient) = setup();
        book(&db, doctor, patient, datetime!(2030-05-02 10:00), AppointmentStatus::Pending);
        book(&db, doctor, patient, datetime!(2030-05-02 11:00), AppointmentStatus::Approved);
        book(&db, doctor, patient, datetime!(2030-05-02 12:00), AppointmentStatus::Rejected);
        book(&db, doctor, patient, datetime!(2030-05-02 13:00), AppointmentStatus::Completed);
        book(&db, doctor, patient, datetime!(2030-05-20 09:00), AppointmentStatus::Pending);

        let occupied = db
            .appointments()
            .occupied_between(doctor, datetime!(2030-05-01 0:00), datetime!(2030-05-08 0:00))
            .unwrap();
        assert_eq!(
            occupied,
            [datetime!(2030-05-02 10:00), datetime!(2030-05-02 11:00)]
        );
    }

    #[test]
    fn conditional_status_update_leaves_other_states_alone() {
        let (db, doctor, patient) = setup();
        let id = book(&db, doctor, patient, datetime!(2030-05-02 10:00), AppointmentStatus::Rejected);

        let moved = db
            .appointments()
            .set_status(
                id,
                &[AppointmentStatus::Pending],
                AppointmentStatus::Approved,
                Recipient::Patient,
            )
            .unwrap();
        assert!(!moved);

        let stored = db.appointments().get(id).unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Rejected);
        assert_eq!(stored.patient_notification, NotificationState::Seen);
    }

    #[test]
    fn current_appointment_is_the_earliest_open_one() {
        let (db, doctor, patient) = setup();
        book(&db, doctor, patient, datetime!(2030-05-01 09:00), AppointmentStatus::Completed);
        let early = book(&db, doctor, patient, datetime!(2030-05-03 09:00), AppointmentStatus::Approved);
        book(&db, doctor, patient, datetime!(2030-05-04 09:00), AppointmentStatus::Pending);

        let current = db.appointments().current_for_patient(patient).unwrap();
        assert_eq!(current.map(|a| a.id), Some(early));
    }

    #[test]
    fn notifications_start_today() {
        let (db, doctor, patient) = setup();
        book(&db, doctor, patient, datetime!(2030-05-01 09:00), AppointmentStatus::Approved);
        let today = book(&db, doctor, patient, datetime!(2030-05-02 08:00), AppointmentStatus::Rejected);
        let later = book(&db, doctor, patient, datetime!(2030-05-05 15:00), AppointmentStatus::Approved);
        book(&db, doctor, patient, datetime!(2030-05-06 15:00), AppointmentStatus::Pending);

        let ids: Vec<_> = db
            .appointments()
            .notifications_for_patient(patient, date!(2030 - 05 - 02))
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, [today, later]);
    }

    #[test]
    fn doctor_day_view_only_lists_approved_visits_of_that_day() {
        let (db, doctor, patient) = setup();
        let morning = book(&db, doctor, patient, datetime!(2030-05-02 09:00), AppointmentStatus::Approved);
        book(&db, doctor, patient, datetime!(2030-05-02 10:00), AppointmentStatus::Pending);
        book(&db, doctor, patient, datetime!(2030-05-03 09:00), AppointmentStatus::Approved);

        let ids: Vec<_> = db
            .appointments()
            .approved_on_day(doctor, date!(2030 - 05 - 02))
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, [morning]);
    }

    #[test]
    fn removing_the_doctor_keeps_the_appointment() {
        let (db, doctor, patient) = setup();
        let id = book(&db, doctor, patient, datetime!(2030-05-02 09:00), AppointmentStatus::Completed);

        assert!(db.doctors().delete(doctor).unwrap());

        let stored = db.appointments().get(id).unwrap().unwrap();
        assert_eq!(stored.doctor_id, None);
    }
}
