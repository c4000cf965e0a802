use super::{Repository, SqlDate};
use crate::models::Doctor;
use rusqlite::{params, Connection, OptionalExtension, Row};

const COLUMNS: &str = "id, name, phone, address, birth_date, gender, dept_no, \
    charges_per_visit, monthly_salary, repute_index, patients_treated, \
    qualification, specialization, work_experience, status";

pub struct DoctorRepository<'c> {
    conn: &'c Connection,
}

impl<'c> DoctorRepository<'c> {
    pub(super) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Doctor> {
        Ok(Doctor {
            id: row.get(0)?,
            name: row.get(1)?,
            phone: row.get(2)?,
            address: row.get(3)?,
            birth_date: row.get::<_, SqlDate>(4)?.0,
            gender: row.get(5)?,
            dept_no: row.get(6)?,
            charges_per_visit: row.get(7)?,
            monthly_salary: row.get(8)?,
            repute_index: row.get(9)?,
            patients_treated: row.get(10)?,
            qualification: row.get(11)?,
            specialization: row.get(12)?,
            work_experience: row.get(13)?,
            status: row.get(14)?,
        })
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> rusqlite::Result<Vec<Doctor>> {
        let mut stmt = self.conn.prepare(sql)?;
        let doctors = stmt.query_map(params, Self::from_row)?;
        doctors.collect()
    }

    /// Doctors assigned to the department, alphabetically.
    pub fn by_department(&self, dept_no: i64) -> rusqlite::Result<Vec<Doctor>> {
        self.query(
            &format!("SELECT {COLUMNS} FROM doctors WHERE dept_no = ?1 ORDER BY name"),
            params![dept_no],
        )
    }

    /// Doctors whose name contains `fragment`, alphabetically.
    pub fn search_by_name(&self, fragment: &str) -> rusqlite::Result<Vec<Doctor>> {
        self.query(
            &format!(
                "SELECT {COLUMNS} FROM doctors WHERE name LIKE ?1 ESCAPE '\\' ORDER BY name"
            ),
            params![super::contains_pattern(fragment)],
        )
    }
}

impl Repository<Doctor> for DoctorRepository<'_> {
    fn get(&self, id: i64) -> rusqlite::Result<Option<Doctor>> {
        self.conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM doctors WHERE id = ?1"),
                params![id],
                Self::from_row,
            )
            .optional()
    }

    fn list(&self) -> rusqlite::Result<Vec<Doctor>> {
        self.query(&format!("SELECT {COLUMNS} FROM doctors ORDER BY name"), [])
    }

    /// Inserts the profile under the owning user's id, which must already exist.
    fn add(&self, doctor: &Doctor) -> rusqlite::Result<i64> {
        self.conn.execute(
            &format!(
                "INSERT INTO doctors ({COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
            ),
            params![
                doctor.id,
                doctor.name,
                doctor.phone,
                doctor.address,
                SqlDate(doctor.birth_date),
                doctor.gender,
                doctor.dept_no,
                doctor.charges_per_visit,
                doctor.monthly_salary,
                doctor.repute_index,
                doctor.patients_treated,
                doctor.qualification,
                doctor.specialization,
                doctor.work_experience,
                doctor.status,
            ],
        )?;
        Ok(doctor.id)
    }

    fn update(&self, doctor: &Doctor) -> rusqlite::Result<bool> {
        let changed = self.conn.execute(
            "UPDATE doctors
             SET name = ?1, phone = ?2, address = ?3, birth_date = ?4, gender = ?5,
                 dept_no = ?6, charges_per_visit = ?7, monthly_salary = ?8,
                 repute_index = ?9, patients_treated = ?10, qualification = ?11,
                 specialization = ?12, work_experience = ?13, status = ?14
             WHERE id = ?15",
            params![
                doctor.name,
                doctor.phone,
                doctor.address,
                SqlDate(doctor.birth_date),
                doctor.gender,
                doctor.dept_no,
                doctor.charges_per_visit,
                doctor.monthly_salary,
                doctor.repute_index,
                doctor.patients_treated,
                doctor.qualification,
                doctor.specialization,
                doctor.work_experience,
                doctor.status,
                doctor.id,
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete(&self, id: i64) -> rusqlite::Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM doctors WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::testing;
    use crate::db::Repository;
    use crate::models::DoctorStatus;

    #[test]
    fn doctors_are_grouped_by_department() {
        let db = testing::db();
        let cardiology = testing::department(&db, "Cardiology");
        let neurology = testing::department(&db, "Neurology");
        testing::doctor(&db, "Zafar", cardiology);
        testing::doctor(&db, "Aisha", cardiology);
        testing::doctor(&db, "Lee", neurology);

        let names: Vec<_> = db
            .doctors()
            .by_department(cardiology)
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, ["Aisha", "Zafar"]);
    }

    #[test]
    fn round_trips_every_column() {
        let db = testing::db();
        let dept = testing::department(&db, "Oncology");
        let id = testing::doctor(&db, "Rivera", dept);

        let mut doctor = db.doctors().get(id).unwrap().unwrap();
        assert_eq!(doctor.status, DoctorStatus::Active);
        assert_eq!(doctor.charges_per_visit, 50.0);
        assert_eq!(doctor.work_experience, Some(10));

        doctor.status = DoctorStatus::Left;
        doctor.specialization = Some("Radiation".to_string());
        assert!(db.doctors().update(&doctor).unwrap());

        let stored = db.doctors().get(id).unwrap().unwrap();
        assert_eq!(stored.status, DoctorStatus::Left);
        assert_eq!(stored.specialization.as_deref(), Some("Radiation"));
    }

    #[test]
    fn search_is_case_insensitive() {
        let db = testing::db();
        let dept = testing::department(&db, "General");
        testing::doctor(&db, "Grace", dept);

        assert_eq!(db.doctors().search_by_name("gra").unwrap().len(), 1);
        assert!(db.doctors().search_by_name("xyz").unwrap().is_empty());
        assert!(db.doctors().search_by_name("%").unwrap().is_empty());
        assert!(db.doctors().search_by_name("Gr_ce").unwrap().is_empty());
    }
}
