use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

use super::lock_conn;
use crate::models::{LeaderboardScope, RankAssignment, School, SchoolLevel, SchoolStanding};
use crate::utils::{AppError, AppResult};

const SCHOOL_COLUMNS: &str = "id, name, region, total_minutes, monthly_minutes, total_points,
     total_rank, monthly_rank, regional_rank, level, start_date, end_date";

pub struct SchoolRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SchoolRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Provision a new school
    pub fn create(&self, school: &mut School) -> AppResult<i64> {
        school.normalize();
        school.validate()?;

        let conn = lock_conn(&self.conn);
        conn.execute(
            "INSERT INTO schools (name, region, start_date, end_date) VALUES (?1, ?2, ?3, ?4)",
            params![school.name, school.region, school.start_date, school.end_date],
        )?;

        let id = conn.last_insert_rowid();
        school.id = Some(id);

        Ok(id)
    }

    pub fn find_by_id(&self, id: i64) -> AppResult<Option<School>> {
        let conn = lock_conn(&self.conn);
        find_by_id(&conn, id)
    }

    /// All schools in id order
    pub fn find_all(&self) -> AppResult<Vec<School>> {
        let conn = lock_conn(&self.conn);
        find_all(&conn)
    }

    /// Update name, region and competition window.
    ///
    /// Aggregates, ranks and level are owned by the recomputation engine
    /// and are not touched here, except that dropping a region clears the
    /// regional rank.
    pub fn update_details(&self, school: &mut School) -> AppResult<()> {
        let id = school
            .id
            .ok_or_else(|| AppError::validation("school has no id"))?;
        school.normalize();
        school.validate()?;

        let conn = lock_conn(&self.conn);
        let rows = conn.execute(
            "UPDATE schools SET
                name = ?1, region = ?2, start_date = ?3, end_date = ?4,
                regional_rank = CASE WHEN ?2 IS NULL THEN NULL ELSE regional_rank END
             WHERE id = ?5",
            params![school.name, school.region, school.start_date, school.end_date, id],
        )?;

        if rows == 0 {
            return Err(AppError::validation(format!("unknown school {}", id)));
        }

        Ok(())
    }

    pub fn count(&self) -> AppResult<i64> {
        let conn = lock_conn(&self.conn);
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM schools", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Distinct regions, alphabetically
    pub fn regions(&self) -> AppResult<Vec<String>> {
        let conn = lock_conn(&self.conn);
        let mut stmt = conn.prepare(
            "SELECT DISTINCT region FROM schools WHERE region IS NOT NULL ORDER BY region",
        )?;

        let regions = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(regions)
    }

    /// Top `limit` schools for a ranking, unranked schools last
    pub fn leaderboard(&self, scope: &LeaderboardScope, limit: usize) -> AppResult<Vec<School>> {
        let conn = lock_conn(&self.conn);
        let limit = limit as i64;

        let schools = match scope {
            LeaderboardScope::Total => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM schools
                     ORDER BY total_rank IS NULL, total_rank, id
                     LIMIT ?1",
                    SCHOOL_COLUMNS
                ))?;
                let rows = stmt.query_map([limit], row_to_school)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            LeaderboardScope::Monthly => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM schools
                     ORDER BY monthly_rank IS NULL, monthly_rank, id
                     LIMIT ?1",
                    SCHOOL_COLUMNS
                ))?;
                let rows = stmt.query_map([limit], row_to_school)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            LeaderboardScope::Regional(region) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM schools
                     WHERE region = ?1
                     ORDER BY regional_rank IS NULL, regional_rank, id
                     LIMIT ?2",
                    SCHOOL_COLUMNS
                ))?;
                let rows = stmt.query_map(params![region, limit], row_to_school)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(schools)
    }
}

pub(crate) fn find_by_id(conn: &Connection, id: i64) -> AppResult<Option<School>> {
    let school = conn
        .query_row(
            &format!("SELECT {} FROM schools WHERE id = ?1", SCHOOL_COLUMNS),
            [id],
            row_to_school,
        )
        .optional()?;

    Ok(school)
}

pub(crate) fn find_all(conn: &Connection) -> AppResult<Vec<School>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM schools ORDER BY id", SCHOOL_COLUMNS))?;

    let schools = stmt
        .query_map([], row_to_school)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(schools)
}

/// Snapshot of every school's aggregates, in id order
pub(crate) fn load_standings(conn: &Connection) -> AppResult<Vec<SchoolStanding>> {
    let mut stmt = conn.prepare(
        "SELECT id, region, total_minutes, monthly_minutes, total_points, level
         FROM schools ORDER BY id",
    )?;

    let standings = stmt
        .query_map([], |row| {
            Ok(SchoolStanding {
                id: row.get(0)?,
                region: row.get(1)?,
                total_minutes: row.get(2)?,
                monthly_minutes: row.get(3)?,
                total_points: row.get(4)?,
                level: SchoolLevel::from_db(row.get(5)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(standings)
}

pub(crate) fn write_assignments(conn: &Connection, assignments: &[RankAssignment]) -> AppResult<()> {
    let mut stmt = conn.prepare(
        "UPDATE schools SET
            total_rank = ?1,
            monthly_rank = ?2,
            regional_rank = COALESCE(?3, regional_rank),
            level = ?4
         WHERE id = ?5",
    )?;

    for assignment in assignments {
        stmt.execute(params![
            assignment.total_rank,
            assignment.monthly_rank,
            assignment.regional_rank,
            assignment.level.value(),
            assignment.school_id,
        ])?;
    }

    Ok(())
}

/// Add a study submission to a school's counters
pub(crate) fn add_study(conn: &Connection, school_id: i64, minutes: i64, points: i64) -> AppResult<()> {
    let rows = conn.execute(
        "UPDATE schools SET
            monthly_minutes = monthly_minutes + ?1,
            total_minutes = total_minutes + ?1,
            total_points = total_points + ?2
         WHERE id = ?3",
        params![minutes, points, school_id],
    )?;

    if rows == 0 {
        return Err(AppError::referential(format!("unknown school {}", school_id)));
    }

    Ok(())
}

/// Start a new monthly competition for every school
pub(crate) fn reset_monthly(conn: &Connection) -> AppResult<usize> {
    let rows = conn.execute("UPDATE schools SET monthly_minutes = 0", [])?;
    Ok(rows)
}

pub(crate) fn delete(conn: &Connection, school_id: i64) -> AppResult<bool> {
    let rows = conn.execute("DELETE FROM schools WHERE id = ?1", [school_id])?;
    Ok(rows > 0)
}

fn row_to_school(row: &Row) -> rusqlite::Result<School> {
    Ok(School {
        id: row.get(0)?,
        name: row.get(1)?,
        region: row.get(2)?,
        total_minutes: row.get(3)?,
        monthly_minutes: row.get(4)?,
        total_points: row.get(5)?,
        total_rank: row.get(6)?,
        monthly_rank: row.get(7)?,
        regional_rank: row.get(8)?,
        level: SchoolLevel::from_db(row.get(9)?),
        start_date: row.get(10)?,
        end_date: row.get(11)?,
    })
}
