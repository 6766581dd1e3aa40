use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

use super::lock_conn;
use crate::models::{Medal, MedalScope};
use crate::utils::AppResult;

const MEDAL_COLUMNS: &str =
    "id, user_id, school_id, school_name, rank, monthly_minutes, awarded_on, scope, region";

pub struct MedalRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MedalRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// A user's medals, newest first
    pub fn list_for_user(&self, user_id: i64) -> AppResult<Vec<Medal>> {
        let conn = lock_conn(&self.conn);
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM medals WHERE user_id = ?1 ORDER BY awarded_on DESC, id DESC",
            MEDAL_COLUMNS
        ))?;

        let medals = stmt
            .query_map([user_id], row_to_medal)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(medals)
    }

    /// Medals handed out on one closing date
    pub fn list_awarded_on(&self, date: NaiveDate) -> AppResult<Vec<Medal>> {
        let conn = lock_conn(&self.conn);
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM medals WHERE awarded_on = ?1 ORDER BY scope, rank, id",
            MEDAL_COLUMNS
        ))?;

        let medals = stmt
            .query_map([date], row_to_medal)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(medals)
    }
}

/// Field values of a medal about to be awarded
pub(crate) struct MedalSnapshot<'a> {
    pub user_id: i64,
    pub school_id: i64,
    pub school_name: &'a str,
    pub rank: i64,
    pub monthly_minutes: i64,
    pub awarded_on: NaiveDate,
    pub scope: MedalScope,
    pub region: Option<&'a str>,
}

pub(crate) fn insert(conn: &Connection, medal: &MedalSnapshot<'_>) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO medals
            (user_id, school_id, school_name, rank, monthly_minutes, awarded_on, scope, region)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            medal.user_id,
            medal.school_id,
            medal.school_name,
            medal.rank,
            medal.monthly_minutes,
            medal.awarded_on,
            medal.scope.to_string(),
            medal.region,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

fn row_to_medal(row: &Row) -> rusqlite::Result<Medal> {
    let scope: String = row.get(7)?;
    Ok(Medal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        school_id: row.get(2)?,
        school_name: row.get(3)?,
        rank: row.get(4)?,
        monthly_minutes: row.get(5)?,
        awarded_on: row.get(6)?,
        scope: MedalScope::from_db_str(&scope),
        region: row.get(8)?,
    })
}
