use super::{Repository, SqlDate};
use crate::models::Patient;
use rusqlite::{params, Connection, OptionalExtension, Row};

const COLUMNS: &str = "id, name, phone, address, birth_date, gender";

pub struct PatientRepository<'c> {
    conn: &'c Connection,
}

impl<'c> PatientRepository<'c> {
    pub(super) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
        Ok(Patient {
            id: row.get(0)?,
            name: row.get(1)?,
            phone: row.get(2)?,
            address: row.get(3)?,
            birth_date: row.get::<_, SqlDate>(4)?.0,
            gender: row.get(5)?,
        })
    }
}

impl Repository<Patient> for PatientRepository<'_> {
    fn get(&self, id: i64) -> rusqlite::Result<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM patients WHERE id = ?1"),
                params![id],
                Self::from_row,
            )
            .optional()
    }

    fn list(&self) -> rusqlite::Result<Vec<Patient>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {COLUMNS} FROM patients ORDER BY name"))?;
        let patients = stmt.query_map([], Self::from_row)?;
        patients.collect()
    }

    /// Inserts the profile under the owning user's id, which must already exist.
    fn add(&self, patient: &Patient) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO patients (id, name, phone, address, birth_date, gender)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                patient.id,
                patient.name,
                patient.phone,
                patient.address,
                SqlDate(patient.birth_date),
                patient.gender,
            ],
        )?;
        Ok(patient.id)
    }

    fn update(&self, patient: &Patient) -> rusqlite::Result<bool> {
        let changed = self.conn.execute(
            "UPDATE patients
             SET name = ?1, phone = ?2, address = ?3, birth_date = ?4, gender = ?5
             WHERE id = ?6",
            params![
                patient.name,
                patient.phone,
                patient.address,
                SqlDate(patient.birth_date),
                patient.gender,
                patient.id,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete(&self, id: i64) -> rusqlite::Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM patients WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::testing;
    use crate::db::Repository;
    use time::macros::date;

    #[test]
    fn profile_shares_the_user_id() {
        let db = testing::db();
        let id = testing::patient(&db, "Amara");

        let patient = db.patients().get(id).unwrap().unwrap();
        assert_eq!(patient.id, id);
        assert_eq!(patient.name, "Amara");
        assert_eq!(patient.birth_date, date!(1990 - 01 - 01));
    }

    #[test]
    fn profile_requires_an_existing_user() {
        let db = testing::db();
        let orphan = crate::models::Patient {
            id: 999,
            name: "Nobody".to_string(),
            phone: None,
            address: None,
            birth_date: date!(2000 - 01 - 01),
            gender: crate::models::Gender::Male,
        };
        assert!(db.patients().add(&orphan).is_err());
    }

    #[test]
    fn update_changes_contact_details() {
        let db = testing::db();
        let id = testing::patient(&db, "Bilal");

        let mut patient = db.patients().get(id).unwrap().unwrap();
        patient.phone = Some("0300123456".to_string());
        assert!(db.patients().update(&patient).unwrap());

        let stored = db.patients().get(id).unwrap().unwrap();
        assert_eq!(stored.phone.as_deref(), Some("0300123456"));
    }
}
