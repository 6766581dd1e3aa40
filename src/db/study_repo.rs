use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

use super::lock_conn;
use crate::models::StudyTimeRecord;
use crate::utils::date::same_month;
use crate::utils::AppResult;

const RECORD_COLUMNS: &str =
    "id, user_id, record_date, daily_seconds, total_points, monthly_minutes, total_minutes";

pub struct StudyRecordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StudyRecordRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn find_for_day(&self, user_id: i64, date: NaiveDate) -> AppResult<Option<StudyTimeRecord>> {
        let conn = lock_conn(&self.conn);
        find_for_day(&conn, user_id, date)
    }

    /// All of a user's daily records, newest first
    pub fn list_for_user(&self, user_id: i64) -> AppResult<Vec<StudyTimeRecord>> {
        let conn = lock_conn(&self.conn);
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM study_records WHERE user_id = ?1 ORDER BY record_date DESC",
            RECORD_COLUMNS
        ))?;

        let records = stmt
            .query_map([user_id], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// The record carrying the user's latest running totals
    pub fn latest_for_user(&self, user_id: i64) -> AppResult<Option<StudyTimeRecord>> {
        let conn = lock_conn(&self.conn);
        latest_before(&conn, user_id, None)
    }
}

pub(crate) fn find_for_day(
    conn: &Connection,
    user_id: i64,
    date: NaiveDate,
) -> AppResult<Option<StudyTimeRecord>> {
    let record = conn
        .query_row(
            &format!(
                "SELECT {} FROM study_records WHERE user_id = ?1 AND record_date = ?2",
                RECORD_COLUMNS
            ),
            params![user_id, date],
            row_to_record,
        )
        .optional()?;

    Ok(record)
}

/// Latest record strictly before `date`, or the latest overall
fn latest_before(
    conn: &Connection,
    user_id: i64,
    date: Option<NaiveDate>,
) -> AppResult<Option<StudyTimeRecord>> {
    let record = conn
        .query_row(
            &format!(
                "SELECT {} FROM study_records
                 WHERE user_id = ?1 AND (?2 IS NULL OR record_date < ?2)
                 ORDER BY record_date DESC
                 LIMIT 1",
                RECORD_COLUMNS
            ),
            params![user_id, date],
            row_to_record,
        )
        .optional()?;

    Ok(record)
}

/// Add a submission to the user's row for `date`.
///
/// A new row starts from the running totals of the latest earlier record;
/// its monthly snapshot restarts at zero when that record is from another
/// month.
pub(crate) fn add_to_day(
    conn: &Connection,
    user_id: i64,
    date: NaiveDate,
    seconds: i64,
    minutes: i64,
    points: i64,
) -> AppResult<StudyTimeRecord> {
    if let Some(existing) = find_for_day(conn, user_id, date)? {
        conn.execute(
            "UPDATE study_records SET
                daily_seconds = daily_seconds + ?1,
                total_points = total_points + ?2,
                monthly_minutes = monthly_minutes + ?3,
                total_minutes = total_minutes + ?3
             WHERE id = ?4",
            params![seconds, points, minutes, existing.id],
        )?;

        carry_forward(conn, user_id, date, minutes, points)?;

        return Ok(StudyTimeRecord {
            daily_seconds: existing.daily_seconds + seconds,
            total_points: existing.total_points + points,
            monthly_minutes: existing.monthly_minutes + minutes,
            total_minutes: existing.total_minutes + minutes,
            ..existing
        });
    }

    let (base_points, base_monthly, base_total) = match latest_before(conn, user_id, Some(date))? {
        Some(prev) => {
            let monthly = if same_month(prev.record_date, date) {
                prev.monthly_minutes
            } else {
                0
            };
            (prev.total_points, monthly, prev.total_minutes)
        }
        None => (0, 0, 0),
    };

    let record = StudyTimeRecord {
        id: 0,
        user_id,
        record_date: date,
        daily_seconds: seconds,
        total_points: base_points + points,
        monthly_minutes: base_monthly + minutes,
        total_minutes: base_total + minutes,
    };

    conn.execute(
        "INSERT INTO study_records
            (user_id, record_date, daily_seconds, total_points, monthly_minutes, total_minutes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.user_id,
            record.record_date,
            record.daily_seconds,
            record.total_points,
            record.monthly_minutes,
            record.total_minutes,
        ],
    )?;

    let id = conn.last_insert_rowid();
    carry_forward(conn, user_id, date, minutes, points)?;

    Ok(StudyTimeRecord { id, ..record })
}

/// Add a back-dated submission to the running totals of every later record.
///
/// Monthly snapshots only move for later records in the same month.
fn carry_forward(
    conn: &Connection,
    user_id: i64,
    date: NaiveDate,
    minutes: i64,
    points: i64,
) -> AppResult<usize> {
    let rows = conn.execute(
        "UPDATE study_records SET
            total_points = total_points + ?1,
            total_minutes = total_minutes + ?2,
            monthly_minutes = monthly_minutes
                + CASE WHEN substr(record_date, 1, 7) = substr(?3, 1, 7) THEN ?2 ELSE 0 END
         WHERE user_id = ?4 AND record_date > ?3",
        params![points, minutes, date, user_id],
    )?;

    Ok(rows)
}

fn row_to_record(row: &Row) -> rusqlite::Result<StudyTimeRecord> {
    Ok(StudyTimeRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        record_date: row.get(2)?,
        daily_seconds: row.get(3)?,
        total_points: row.get(4)?,
        monthly_minutes: row.get(5)?,
        total_minutes: row.get(6)?,
    })
}
