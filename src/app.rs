//! Application handle tying the database, configuration and services together

use anyhow::{Context, Result};

use crate::db::Database;
use crate::models::{AppConfig, RecomputeMode};
use crate::services::{
    CompetitionService, PurchaseService, RecomputeWorker, Recomputer, SchoolAdminService, StudyService,
};

/// An opened league.
///
/// In deferred mode a background worker is running for as long as the
/// handle lives; dropping it flushes any pending recomputation.
pub struct StudyLeague {
    db: Database,
    config: AppConfig,
    recomputer: Recomputer,
    worker: Option<RecomputeWorker>,
}

impl StudyLeague {
    /// Open (and migrate) the database named in `config`
    pub fn open(config: AppConfig) -> Result<Self> {
        config.validate()?;

        tracing::info!("opening database {}", config.database_path.display());
        let db = Database::open(&config.database_path)
            .with_context(|| format!("could not open {}", config.database_path.display()))?;
        db.migrate().context("migration failed")?;

        Ok(Self::with_database(db, config))
    }

    /// In-memory league, used by tests and dry runs
    pub fn open_in_memory(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let db = Database::open_in_memory()?;
        Ok(Self::with_database(db, config))
    }

    fn with_database(db: Database, config: AppConfig) -> Self {
        let recomputer = Recomputer::new(db.clone(), config.recompute_max_attempts);
        let worker = match config.recompute_mode {
            RecomputeMode::Deferred => Some(RecomputeWorker::spawn(recomputer.clone(), config.debounce())),
            RecomputeMode::Immediate => None,
        };

        Self {
            db,
            config,
            recomputer,
            worker,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn recomputer(&self) -> &Recomputer {
        &self.recomputer
    }

    pub fn study(&self) -> StudyService<'_> {
        StudyService::new(&self.db, &self.recomputer, self.config.recompute_mode)
    }

    pub fn purchases(&self) -> PurchaseService<'_> {
        PurchaseService::new(&self.db)
    }

    pub fn competition(&self) -> CompetitionService<'_> {
        CompetitionService::new(&self.db, &self.recomputer, self.config.medal_cutoff)
    }

    pub fn school_admin(&self) -> SchoolAdminService<'_> {
        SchoolAdminService::new(&self.db, &self.recomputer, self.config.school_deletion)
    }

    /// Stop the background worker, running any pending pass first
    pub fn shutdown(mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{School, StudyDuration, User};
    use chrono::NaiveDate;

    #[test]
    fn test_open_file_league() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            database_path: dir.path().join("league.db"),
            ..AppConfig::default()
        };

        let league = StudyLeague::open(config.clone()).unwrap();
        league.db().schools().create(&mut School::new("Ulsan High", None)).unwrap();
        drop(league);

        let reopened = StudyLeague::open(config).unwrap();
        assert_eq!(reopened.db().schools().count().unwrap(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AppConfig {
            recompute_max_attempts: 0,
            ..AppConfig::default()
        };
        assert!(StudyLeague::open_in_memory(config).is_err());
    }

    #[test]
    fn test_deferred_league_flushes_on_shutdown() {
        let config = AppConfig {
            recompute_mode: RecomputeMode::Deferred,
            debounce_ms: 60_000,
            ..AppConfig::default()
        };
        let league = StudyLeague::open_in_memory(config).unwrap();
        let db = league.db().clone();

        let school = db.schools().create(&mut School::new("Gwangju High", None)).unwrap();
        let user = db
            .users()
            .create(&mut User::new("seo@example.com", "hash", "seo").with_school(school))
            .unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 11, 5).unwrap();
        league
            .study()
            .submit(user, StudyDuration::from_minutes(20).unwrap(), day)
            .unwrap();
        assert_eq!(db.schools().find_by_id(school).unwrap().unwrap().total_rank, None);

        league.shutdown();
        assert_eq!(db.schools().find_by_id(school).unwrap().unwrap().total_rank, Some(1));
    }
}
