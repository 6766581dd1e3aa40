use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

use super::lock_conn;
use crate::models::{LogEntry, Notification, NotificationType};
use crate::utils::{AppError, AppResult};

pub struct NotificationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl NotificationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn create(
        &self,
        user_id: i64,
        title: &str,
        message: &str,
        kind: NotificationType,
    ) -> AppResult<i64> {
        if title.trim().is_empty() {
            return Err(AppError::validation("notification title must not be empty"));
        }

        let conn = lock_conn(&self.conn);
        create(&conn, user_id, title, message, kind)
    }

    pub fn mark_read(&self, notification_id: i64) -> AppResult<()> {
        let conn = lock_conn(&self.conn);
        let rows = conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1",
            [notification_id],
        )?;

        if rows == 0 {
            return Err(AppError::validation(format!(
                "unknown notification {}",
                notification_id
            )));
        }

        Ok(())
    }

    /// Returns how many notifications changed
    pub fn mark_all_read(&self, user_id: i64) -> AppResult<usize> {
        let conn = lock_conn(&self.conn);
        let rows = conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
            [user_id],
        )?;
        Ok(rows)
    }

    /// A user's notifications, newest first
    pub fn list_for_user(&self, user_id: i64) -> AppResult<Vec<Notification>> {
        let conn = lock_conn(&self.conn);
        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, message, kind, is_read, created_at
             FROM notifications
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;

        let notifications = stmt
            .query_map([user_id], row_to_notification)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(notifications)
    }

    pub fn unread_count(&self, user_id: i64) -> AppResult<i64> {
        let conn = lock_conn(&self.conn);
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
            [user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

pub(crate) fn create(
    conn: &Connection,
    user_id: i64,
    title: &str,
    message: &str,
    kind: NotificationType,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO notifications (user_id, title, message, kind) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, title, message, kind.to_string()],
    )?;

    Ok(conn.last_insert_rowid())
}

fn row_to_notification(row: &Row) -> rusqlite::Result<Notification> {
    let kind: String = row.get(4)?;
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        kind: NotificationType::from_db_str(&kind),
        is_read: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub struct ActivityLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActivityLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn append(&self, user_id: i64, message: &str) -> AppResult<i64> {
        let conn = lock_conn(&self.conn);
        append(&conn, user_id, message)
    }

    /// A user's activity, newest first
    pub fn list_for_user(&self, user_id: i64) -> AppResult<Vec<LogEntry>> {
        let conn = lock_conn(&self.conn);
        let mut stmt = conn.prepare(
            "SELECT id, user_id, message, created_at
             FROM activity_log
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;

        let entries = stmt
            .query_map([user_id], |row| {
                Ok(LogEntry {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    message: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}

pub(crate) fn append(conn: &Connection, user_id: i64, message: &str) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO activity_log (user_id, message) VALUES (?1, ?2)",
        params![user_id, message],
    )?;

    Ok(conn.last_insert_rowid())
}
