pub mod schema;
pub mod migrations;
pub mod school_repo;
pub mod user_repo;
pub mod study_repo;
pub mod medal_repo;
pub mod friend_repo;
pub mod store_repo;
pub mod notification_repo;

use anyhow::Result;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::utils::AppResult;

pub use school_repo::SchoolRepository;
pub use user_repo::UserRepository;
pub use study_repo::StudyRecordRepository;
pub use medal_repo::MedalRepository;
pub use friend_repo::FriendRepository;
pub use store_repo::StoreRepository;
pub use notification_repo::{ActivityLogRepository, NotificationRepository};

/// Thread-safe handle to the league database.
///
/// Clones share one connection; every statement and transaction is
/// serialized through its mutex.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create a database file
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            "
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a migrated in-memory database (for tests)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = lock_conn(&self.conn);
        migrations::run_migrations(&conn)
    }

    pub fn schools(&self) -> SchoolRepository {
        SchoolRepository::new(Arc::clone(&self.conn))
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(Arc::clone(&self.conn))
    }

    pub fn study_records(&self) -> StudyRecordRepository {
        StudyRecordRepository::new(Arc::clone(&self.conn))
    }

    pub fn medals(&self) -> MedalRepository {
        MedalRepository::new(Arc::clone(&self.conn))
    }

    pub fn friends(&self) -> FriendRepository {
        FriendRepository::new(Arc::clone(&self.conn))
    }

    pub fn store(&self) -> StoreRepository {
        StoreRepository::new(Arc::clone(&self.conn))
    }

    pub fn notifications(&self) -> NotificationRepository {
        NotificationRepository::new(Arc::clone(&self.conn))
    }

    pub fn activity_log(&self) -> ActivityLogRepository {
        ActivityLogRepository::new(Arc::clone(&self.conn))
    }

    /// Direct access to the connection
    pub fn with_connection<F, T>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&Connection) -> AppResult<T>,
    {
        let conn = lock_conn(&self.conn);
        f(&conn)
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back on any error.
    pub fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> AppResult<T>,
    {
        let mut conn = lock_conn(&self.conn);
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

/// A panic while holding the lock leaves SQLite itself consistent
/// (the open transaction is rolled back on drop), so poisoning is ignored.
pub(crate) fn lock_conn(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::AppError;

    #[test]
    fn test_foreign_keys_enabled() {
        let db = Database::open_in_memory().unwrap();
        let fk: i32 = db
            .with_connection(|conn| Ok(conn.pragma_query_value(None, "foreign_keys", |row| row.get(0))?))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();

        let result: AppResult<()> = db.transaction(|tx| {
            tx.execute("INSERT INTO schools (name) VALUES ('Seoul High')", [])?;
            Err(AppError::validation("abort"))
        });
        assert!(result.is_err());

        assert_eq!(db.schools().count().unwrap(), 0);
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("data").join("league.db")).unwrap();
        db.migrate().unwrap();
        assert_eq!(db.schools().count().unwrap(), 0);
    }
}
