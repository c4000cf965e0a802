//! Database module for Carewell.
//!
//! The store is a single SQLite connection wrapped by [`Database`]. Each
//! entity gets a repository implementing the generic [`Repository`] trait
//! (get, list, add, update, delete) plus the queries specific to it.
//! [`UnitOfWork`] hands out those repositories over either the plain
//! connection or an open transaction, so multi-step writes such as
//! registration can commit as one.

use crate::models::{
    AppointmentStatus, BillStatus, DoctorStatus, FeedbackState, Gender, NotificationState,
    UserRole,
};
use anyhow::{Context, Result};
use log::info;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime};

pub mod appointments;
pub mod departments;
pub mod doctors;
pub mod patients;
pub mod staff;
pub mod users;

use appointments::AppointmentRepository;
use departments::DepartmentRepository;
use doctors::DoctorRepository;
use patients::PatientRepository;
use staff::StaffRepository;
use users::UserRepository;

/// Generic data access shared by every entity repository.
///
/// Lookups that find nothing return `Ok(None)` / `Ok(false)`; only genuine
/// store failures surface as errors.
pub trait Repository<T> {
    /// Fetches one entity by primary key.
    fn get(&self, id: i64) -> rusqlite::Result<Option<T>>;
    /// Fetches every entity of this type.
    fn list(&self) -> rusqlite::Result<Vec<T>>;
    /// Inserts the entity and returns its primary key.
    fn add(&self, entity: &T) -> rusqlite::Result<i64>;
    /// Overwrites the stored row with the entity's fields. `false` if no row matched.
    fn update(&self, entity: &T) -> rusqlite::Result<bool>;
    /// Removes the row. `false` if no row matched.
    fn delete(&self, id: i64) -> rusqlite::Result<bool>;
}

/// The application's entity store.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) the database file and applies the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        let db = Self::init(conn)?;
        info!("Opened database at {}", path.display());
        Ok(db)
    }

    /// Opens a private in-memory database with the schema applied.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", true)
            .context("Failed to enable foreign keys")?;

        let schema = include_str!("schema.sql");
        conn.execute_batch(schema)
            .context("Failed to execute schema")?;

        Ok(Self { conn })
    }

    /// Repositories over the plain connection; every statement commits on its own.
    pub fn work(&self) -> UnitOfWork<'_> {
        UnitOfWork { conn: &self.conn }
    }

    /// Runs `f` inside an immediate transaction.
    ///
    /// The transaction commits only if `f` returns `Ok`; any error rolls
    /// every write made through the provided [`UnitOfWork`] back.
    pub fn transaction<T, E>(&self, f: impl FnOnce(&UnitOfWork<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<rusqlite::Error>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let value = {
            let work = UnitOfWork { conn: &*tx };
            f(&work)?
        };
        tx.commit()?;
        Ok(value)
    }

    pub fn users(&self) -> UserRepository<'_> {
        self.work().users()
    }

    pub fn patients(&self) -> PatientRepository<'_> {
        self.work().patients()
    }

    pub fn doctors(&self) -> DoctorRepository<'_> {
        self.work().doctors()
    }

    pub fn departments(&self) -> DepartmentRepository<'_> {
        self.work().departments()
    }

    #[cfg(test)]
    pub fn appointments(&self) -> AppointmentRepository<'_> {
        self.work().appointments()
    }

    pub fn staff(&self) -> StaffRepository<'_> {
        self.work().staff()
    }
}

/// Access point to every repository over one connection or transaction.
#[derive(Clone, Copy)]
pub struct UnitOfWork<'c> {
    conn: &'c Connection,
}

impl<'c> UnitOfWork<'c> {
    pub fn users(&self) -> UserRepository<'c> {
        UserRepository::new(self.conn)
    }

    pub fn patients(&self) -> PatientRepository<'c> {
        PatientRepository::new(self.conn)
    }

    pub fn doctors(&self) -> DoctorRepository<'c> {
        DoctorRepository::new(self.conn)
    }

    pub fn departments(&self) -> DepartmentRepository<'c> {
        DepartmentRepository::new(self.conn)
    }

    pub fn appointments(&self) -> AppointmentRepository<'c> {
        AppointmentRepository::new(self.conn)
    }

    pub fn staff(&self) -> StaffRepository<'c> {
        StaffRepository::new(self.conn)
    }
}

/// `LIKE` pattern matching `fragment` anywhere; its own `%`, `_` and backslashes match literally.
fn contains_pattern(fragment: &str) -> String {
    let mut pattern = String::from("%");
    for c in fragment.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// --- Column conversions -------------------------------------------------

/// Calendar date stored as `YYYY-MM-DD` text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlDate(pub Date);

/// Date and time stored as `YYYY-MM-DD HH:MM:SS` text, which sorts chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlDateTime(pub PrimitiveDateTime);

impl ToSql for SqlDate {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let text = self
            .0
            .format(format_description!("[year]-[month]-[day]"))
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        Ok(ToSqlOutput::from(text))
    }
}

impl FromSql for SqlDate {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        Date::parse(text, format_description!("[year]-[month]-[day]"))
            .map(SqlDate)
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for SqlDateTime {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let text = self
            .0
            .format(format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second]"
            ))
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        Ok(ToSqlOutput::from(text))
    }
}

impl FromSql for SqlDateTime {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        PrimitiveDateTime::parse(
            text,
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        )
        .map(SqlDateTime)
        .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for UserRole {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for UserRole {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_i64()?;
        UserRole::from_code(code).ok_or(FromSqlError::OutOfRange(code))
    }
}

impl ToSql for AppointmentStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for AppointmentStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_i64()?;
        AppointmentStatus::from_code(code).ok_or(FromSqlError::OutOfRange(code))
    }
}

impl ToSql for NotificationState {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for NotificationState {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_i64()?;
        NotificationState::from_code(code).ok_or(FromSqlError::OutOfRange(code))
    }
}

impl ToSql for FeedbackState {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for FeedbackState {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_i64()?;
        FeedbackState::from_code(code).ok_or(FromSqlError::OutOfRange(code))
    }
}

impl ToSql for DoctorStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for DoctorStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_i64()?;
        DoctorStatus::from_code(code).ok_or(FromSqlError::OutOfRange(code))
    }
}

impl ToSql for BillStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for BillStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        BillStatus::from_label(value.as_str()?).ok_or(FromSqlError::InvalidType)
    }
}

impl ToSql for Gender {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Gender {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Gender::from_label(value.as_str()?).ok_or(FromSqlError::InvalidType)
    }
}

/// Fixtures shared by the repository, lifecycle and service tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::{Database, Repository};
    use crate::models::*;
    use time::macros::date;

    pub fn db() -> Database {
        Database::open_in_memory().expect("in-memory database")
    }

    pub fn user(db: &Database, email: &str, role: UserRole) -> i64 {
        db.users()
            .add(&User {
                id: 0,
                email: email.to_string(),
                password_hash: "not-a-real-hash".to_string(),
                role,
            })
            .expect("insert user")
    }

    pub fn patient(db: &Database, name: &str) -> i64 {
        let id = user(db, &format!("{}@patients.test", name.to_lowercase()), UserRole::Patient);
        db.patients()
            .add(&Patient {
                id,
                name: name.to_string(),
                phone: None,
                address: None,
                birth_date: date!(1990 - 01 - 01),
                gender: Gender::Female,
            })
            .expect("insert patient")
    }

    pub fn department(db: &Database, name: &str) -> i64 {
        db.departments()
            .add(&Department {
                dept_no: 0,
                name: name.to_string(),
                description: None,
            })
            .expect("insert department")
    }

    pub fn doctor(db: &Database, name: &str, dept_no: i64) -> i64 {
        let id = user(db, &format!("{}@doctors.test", name.to_lowercase()), UserRole::Doctor);
        db.doctors()
            .add(&Doctor {
                id,
                name: name.to_string(),
                phone: None,
                address: None,
                birth_date: date!(1975 - 06 - 15),
                gender: Gender::Male,
                dept_no,
                charges_per_visit: 50.0,
                monthly_salary: None,
                repute_index: None,
                patients_treated: 0,
                qualification: "MBBS".to_string(),
                specialization: None,
                work_experience: Some(10),
                status: DoctorStatus::Active,
            })
            .expect("insert doctor")
    }
}

#[cfg(test)]
mod tests {
    use super::testing;
    use super::*;
    use crate::models::UserRole;

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern(" ann "), "%ann%");
        assert_eq!(contains_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let db = testing::db();

        let result: Result<(), rusqlite::Error> = db.transaction(|work| {
            work.users().add(&crate::models::User {
                id: 0,
                email: "ghost@test.org".to_string(),
                password_hash: "x".to_string(),
                role: UserRole::Patient,
            })?;
            Err(rusqlite::Error::QueryReturnedNoRows)
        });

        assert!(result.is_err());
        assert!(db.users().find_by_email("ghost@test.org").unwrap().is_none());
    }

    #[test]
    fn transaction_commits_on_success() {
        let db = testing::db();

        let id = db
            .transaction(|work| {
                work.users().add(&crate::models::User {
                    id: 0,
                    email: "kept@test.org".to_string(),
                    password_hash: "x".to_string(),
                    role: UserRole::Admin,
                })
            })
            .unwrap();

        let stored = db.users().get(id).unwrap().unwrap();
        assert_eq!(stored.role, UserRole::Admin);
    }

    #[test]
    fn schema_is_idempotent() {
        let db = testing::db();
        db.conn
            .execute_batch(include_str!("schema.sql"))
            .expect("schema re-applies cleanly");
    }
}
