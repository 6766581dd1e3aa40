use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

use super::lock_conn;
use crate::models::{AccountStatus, User};
use crate::utils::{AppError, AppResult};

const USER_COLUMNS: &str =
    "id, email, password_hash, nickname, school_id, points, account_status, created_at, last_login";

pub struct UserRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UserRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Register a new student
    pub fn create(&self, user: &mut User) -> AppResult<i64> {
        user.email = user.email.trim().to_lowercase();
        user.validate()?;

        let conn = lock_conn(&self.conn);
        conn.execute(
            "INSERT INTO users (email, password_hash, nickname, school_id, points, account_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.email,
                user.password_hash,
                user.nickname.trim(),
                user.school_id,
                user.points,
                user.account_status.to_string(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        user.id = Some(id);

        Ok(id)
    }

    pub fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let conn = lock_conn(&self.conn);
        find_by_id(&conn, id)
    }

    pub fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let conn = lock_conn(&self.conn);
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                [email.trim().to_lowercase()],
                row_to_user,
            )
            .optional()?;

        Ok(user)
    }

    /// Students of a school, highest balance first
    pub fn find_by_school(&self, school_id: i64) -> AppResult<Vec<User>> {
        let conn = lock_conn(&self.conn);
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users WHERE school_id = ?1 ORDER BY points DESC, id",
            USER_COLUMNS
        ))?;

        let users = stmt
            .query_map([school_id], row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Move a student to another school (or none).
    ///
    /// Points already contributed stay with the old school.
    pub fn set_school(&self, user_id: i64, school_id: Option<i64>) -> AppResult<()> {
        let conn = lock_conn(&self.conn);
        let rows = conn.execute(
            "UPDATE users SET school_id = ?1 WHERE id = ?2",
            params![school_id, user_id],
        )?;

        if rows == 0 {
            return Err(AppError::validation(format!("unknown user {}", user_id)));
        }

        Ok(())
    }

    pub fn touch_login(&self, user_id: i64) -> AppResult<()> {
        let conn = lock_conn(&self.conn);
        let rows = conn.execute(
            "UPDATE users SET last_login = datetime('now') WHERE id = ?1",
            [user_id],
        )?;

        if rows == 0 {
            return Err(AppError::validation(format!("unknown user {}", user_id)));
        }

        Ok(())
    }

    pub fn set_status(&self, user_id: i64, status: AccountStatus) -> AppResult<()> {
        let conn = lock_conn(&self.conn);
        let rows = conn.execute(
            "UPDATE users SET account_status = ?1 WHERE id = ?2",
            params![status.to_string(), user_id],
        )?;

        if rows == 0 {
            return Err(AppError::validation(format!("unknown user {}", user_id)));
        }

        Ok(())
    }

    pub fn count(&self) -> AppResult<i64> {
        let conn = lock_conn(&self.conn);
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }
}

pub(crate) fn find_by_id(conn: &Connection, id: i64) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            [id],
            row_to_user,
        )
        .optional()?;

    Ok(user)
}

pub(crate) fn credit_points(conn: &Connection, user_id: i64, points: i64) -> AppResult<()> {
    let rows = conn.execute(
        "UPDATE users SET points = points + ?1 WHERE id = ?2",
        params![points, user_id],
    )?;

    if rows == 0 {
        return Err(AppError::referential(format!("unknown user {}", user_id)));
    }

    Ok(())
}

/// Compare-and-swap debit: only succeeds while the balance still covers `amount`.
///
/// Returns `false` without touching the row when it does not.
pub(crate) fn debit_points(conn: &Connection, user_id: i64, amount: i64) -> AppResult<bool> {
    let rows = conn.execute(
        "UPDATE users SET points = points - ?1 WHERE id = ?2 AND points >= ?1",
        params![amount, user_id],
    )?;

    Ok(rows == 1)
}

pub(crate) fn ids_by_school(conn: &Connection, school_id: i64) -> AppResult<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM users WHERE school_id = ?1 ORDER BY id")?;
    let ids = stmt
        .query_map([school_id], |row| row.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(ids)
}

pub(crate) fn detach_school(conn: &Connection, school_id: i64) -> AppResult<usize> {
    let rows = conn.execute("UPDATE users SET school_id = NULL WHERE school_id = ?1", [school_id])?;
    Ok(rows)
}

pub(crate) fn delete_by_school(conn: &Connection, school_id: i64) -> AppResult<usize> {
    let rows = conn.execute("DELETE FROM users WHERE school_id = ?1", [school_id])?;
    Ok(rows)
}

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let status: String = row.get(6)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        nickname: row.get(3)?,
        school_id: row.get(4)?,
        points: row.get(5)?,
        account_status: AccountStatus::from_db_str(&status),
        created_at: row.get(7)?,
        last_login: row.get(8)?,
    })
}
