use rusqlite::ffi;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("insufficient points: balance {balance}, price {price}")]
    InsufficientFunds { balance: i64, price: i64 },

    #[error("referential integrity violated: {0}")]
    Referential(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn referential(msg: impl Into<String>) -> Self {
        Self::Referential(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// SQLite reported lock contention; the whole operation may be retried.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Database(rusqlite::Error::SqliteFailure(e, _))
                if matches!(e.code, rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
        )
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(e, msg) = &err {
            let detail = msg.clone().unwrap_or_else(|| e.to_string());
            match e.extended_code {
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return Self::Referential(detail),
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return Self::AlreadyExists(detail)
                }
                _ => {}
            }
        }
        Self::Database(err)
    }
}

pub type AppResult<T> = Result<T, AppError>;
