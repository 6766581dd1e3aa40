use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

use super::schema::{CREATE_TABLES, SCHEMA_VERSION};

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_current_version(conn)?;

    if current_version == 0 {
        info!("creating new database with schema version {}", SCHEMA_VERSION);
        initial_setup(conn)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "migrating database from version {} to {}",
            current_version, SCHEMA_VERSION
        );
        migrate_from(conn, current_version)?;
    } else {
        info!("database is up to date (version {})", current_version);
    }

    Ok(())
}

fn get_current_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_migrations')",
        [],
        |row| row.get(0),
    )?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> = conn.query_row(
        "SELECT MAX(version) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    Ok(version.unwrap_or(0))
}

fn initial_setup(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TABLES)
        .context("failed to create tables")?;

    conn.execute(
        "INSERT INTO schema_migrations (version) VALUES (?)",
        [SCHEMA_VERSION],
    )?;

    info!("initial setup done");
    Ok(())
}

fn migrate_from(conn: &Connection, from_version: i32) -> Result<()> {
    for version in (from_version + 1)..=SCHEMA_VERSION {
        // Schema changes are added here as SCHEMA_VERSION grows
        conn.execute(
            "INSERT INTO schema_migrations (version) VALUES (?)",
            [version],
        )
        .with_context(|| format!("failed to record migration {}", version))?;

        info!("migrated to version {}", version);
    }

    Ok(())
}
