use super::{Repository, SqlDate};
use crate::models::OtherStaff;
use rusqlite::{params, Connection, OptionalExtension, Row};

const COLUMNS: &str =
    "id, name, phone, address, designation, gender, birth_date, highest_qualification, salary";

pub struct StaffRepository<'c> {
    conn: &'c Connection,
}

impl<'c> StaffRepository<'c> {
    pub(super) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<OtherStaff> {
        Ok(OtherStaff {
            id: row.get(0)?,
            name: row.get(1)?,
            phone: row.get(2)?,
            address: row.get(3)?,
            designation: row.get(4)?,
            gender: row.get(5)?,
            birth_date: row.get::<_, Option<SqlDate>>(6)?.map(|d| d.0),
            highest_qualification: row.get(7)?,
            salary: row.get(8)?,
        })
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> rusqlite::Result<Vec<OtherStaff>> {
        let mut stmt = self.conn.prepare(sql)?;
        let staff = stmt.query_map(params, Self::from_row)?;
        staff.collect()
    }

    pub fn search_by_name(&self, fragment: &str) -> rusqlite::Result<Vec<OtherStaff>> {
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM other_staff WHERE name LIKE ?1 ESCAPE '\\' ORDER BY name"
            ),
            params![super::contains_pattern(fragment)],
        )
    }

    /// Exact designation match, ignoring case.
    pub fn by_designation(&self, designation: &str) -> rusqlite::Result<Vec<OtherStaff>> {
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM other_staff
                 WHERE designation = ?1 COLLATE NOCASE ORDER BY name"
            ),
            params![designation.trim()],
        )
    }
}

impl Repository<OtherStaff> for StaffRepository<'_> {
    fn get(&self, id: i64) -> rusqlite::Result<Option<OtherStaff>> {
        self.conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM other_staff WHERE id = ?1"),
                params![id],
                Self::from_row,
            )
            .optional()
    }

    fn list(&self) -> rusqlite::Result<Vec<OtherStaff>> {
        self.query(&format!("SELECT {COLUMNS} FROM other_staff ORDER BY name"), [])
    }

    fn add(&self, s: &OtherStaff) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO other_staff (name, phone, address, designation, gender, birth_date,
                 highest_qualification, salary)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                s.name,
                s.phone,
                s.address,
                s.designation,
                s.gender,
                s.birth_date.map(SqlDate),
                s.highest_qualification,
                s.salary,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, s: &OtherStaff) -> rusqlite::Result<bool> {
        let changed = self.conn.execute(
            "UPDATE other_staff
             SET name = ?1, phone = ?2, address = ?3, designation = ?4, gender = ?5,
                 birth_date = ?6, highest_qualification = ?7, salary = ?8
             WHERE id = ?9",
            params![
                s.name,
                s.phone,
                s.address,
                s.designation,
                s.gender,
                s.birth_date.map(SqlDate),
                s.highest_qualification,
                s.salary,
                s.id,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete(&self, id: i64) -> rusqlite::Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM other_staff WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}
