use super::Repository;
use crate::models::{Department, DepartmentSummary};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub struct DepartmentRepository<'c> {
    conn: &'c Connection,
}

impl<'c> DepartmentRepository<'c> {
    pub(super) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Department> {
        Ok(Department {
            dept_no: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
        })
    }

    /// Exact, case-insensitive name lookup.
    pub fn find_by_name(&self, name: &str) -> rusqlite::Result<Option<Department>> {
        self.conn
            .query_row(
                "SELECT dept_no, name, description FROM departments
                 WHERE name = ?1 COLLATE NOCASE",
                params![name.trim()],
                Self::from_row,
            )
            .optional()
    }

    /// Every department with its number of assigned doctors, by name.
    pub fn list_with_counts(&self) -> rusqlite::Result<Vec<DepartmentSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT d.dept_no, d.name, d.description, COUNT(doc.id)
             FROM departments d
             LEFT JOIN doctors doc ON doc.dept_no = d.dept_no
             GROUP BY d.dept_no
             ORDER BY d.name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DepartmentSummary {
                department: Self::from_row(row)?,
                doctor_count: row.get(3)?,
            })
        })?;
        rows.collect()
    }

    pub fn doctor_count(&self, dept_no: i64) -> rusqlite::Result<i64> {
        self.conn.query_row(
            "SELECT COUNT(*) FROM doctors WHERE dept_no = ?1",
            params![dept_no],
            |row| row.get(0),
        )
    }
}

impl Repository<Department> for DepartmentRepository<'_> {
    fn get(&self, dept_no: i64) -> rusqlite::Result<Option<Department>> {
        self.conn
            .query_row(
                "SELECT dept_no, name, description FROM departments WHERE dept_no = ?1",
                params![dept_no],
                Self::from_row,
            )
            .optional()
    }

    fn list(&self) -> rusqlite::Result<Vec<Department>> {
        let mut stmt = self
            .conn
            .prepare("SELECT dept_no, name, description FROM departments ORDER BY name")?;
        let departments = stmt.query_map([], Self::from_row)?;
        departments.collect()
    }

    fn add(&self, department: &Department) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO departments (name, description) VALUES (?1, ?2)",
            params![department.name, department.description],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, department: &Department) -> rusqlite::Result<bool> {
        let changed = self.conn.execute(
            "UPDATE departments SET name = ?1, description = ?2 WHERE dept_no = ?3",
            params![department.name, department.description, department.dept_no],
        )?;
        Ok(changed > 0)
    }

    /// Fails with a constraint error while doctors are still assigned.
    fn delete(&self, dept_no: i64) -> rusqlite::Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM departments WHERE dept_no = ?1", params![dept_no])?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::testing;
    use crate::db::Repository;

    #[test]
    fn counts_doctors_per_department() {
        let db = testing::db();
        let cardiology = testing::department(&db, "Cardiology");
        testing::department(&db, "Dermatology");
        testing::doctor(&db, "Okafor", cardiology);
        testing::doctor(&db, "Silva", cardiology);

        let summaries = db.departments().list_with_counts().unwrap();
        let counts: Vec<_> = summaries
            .iter()
            .map(|s| (s.department.name.as_str(), s.doctor_count))
            .collect();
        assert_eq!(counts, [("Cardiology", 2), ("Dermatology", 0)]);
        assert_eq!(db.departments().doctor_count(cardiology).unwrap(), 2);
    }

    #[test]
    fn name_lookup_ignores_case() {
        let db = testing::db();
        let id = testing::department(&db, "Pediatrics");

        let found = db.departments().find_by_name("pediatrics").unwrap();
        assert_eq!(found.map(|d| d.dept_no), Some(id));
    }

    #[test]
    fn store_refuses_to_orphan_doctors() {
        let db = testing::db();
        let dept = testing::department(&db, "Surgery");
        testing::doctor(&db, "Novak", dept);

        assert!(db.departments().delete(dept).is_err());
        assert!(db.departments().get(dept).unwrap().is_some());
    }
}
