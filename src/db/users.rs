use super::Repository;
use crate::models::User;
use rusqlite::{params, Connection, OptionalExtension, Row};

const COLUMNS: &str = "id, email, password_hash, role";

pub struct UserRepository<'c> {
    conn: &'c Connection,
}

impl<'c> UserRepository<'c> {
    pub(super) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            role: row.get(3)?,
        })
    }

    /// Looks a user up by email. Emails are stored lowercased.
    pub fn find_by_email(&self, email: &str) -> rusqlite::Result<Option<User>> {
        self.conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM users WHERE email = ?1"),
                params![email.trim().to_lowercase()],
                Self::from_row,
            )
            .optional()
    }

    pub fn email_exists(&self, email: &str) -> rusqlite::Result<bool> {
        Ok(self.find_by_email(email)?.is_some())
    }
}

impl Repository<User> for UserRepository<'_> {
    fn get(&self, id: i64) -> rusqlite::Result<Option<User>> {
        self.conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                Self::from_row,
            )
            .optional()
    }

    fn list(&self) -> rusqlite::Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {COLUMNS} FROM users ORDER BY id"))?;
        let users = stmt.query_map([], Self::from_row)?;
        users.collect()
    }

    fn add(&self, user: &User) -> rusqlite::Result<i64> {
        self.conn.execute(
            "INSERT INTO users (email, password_hash, role) VALUES (?1, ?2, ?3)",
            params![user.email.to_lowercase(), user.password_hash, user.role],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, user: &User) -> rusqlite::Result<bool> {
        let changed = self.conn.execute(
            "UPDATE users SET email = ?1, password_hash = ?2, role = ?3 WHERE id = ?4",
            params![user.email.to_lowercase(), user.password_hash, user.role, user.id],
        )?;
        Ok(changed > 0)
    }

    fn delete(&self, id: i64) -> rusqlite::Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}
