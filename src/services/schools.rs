//! School removal under the configured deletion policy

use tracing::info;

use crate::db::{school_repo, user_repo, Database};
use crate::models::SchoolDeletionPolicy;
use crate::services::ranking::{run_pass, PassReport, Recomputer};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct SchoolRemoval {
    pub school_id: i64,
    pub policy: SchoolDeletionPolicy,
    /// Students detached or deleted, depending on the policy
    pub students_affected: usize,
    pub pass: PassReport,
}

pub struct SchoolAdminService<'a> {
    db: &'a Database,
    recomputer: &'a Recomputer,
    policy: SchoolDeletionPolicy,
}

impl<'a> SchoolAdminService<'a> {
    pub fn new(db: &'a Database, recomputer: &'a Recomputer, policy: SchoolDeletionPolicy) -> Self {
        Self {
            db,
            recomputer,
            policy,
        }
    }

    /// Remove a school and re-rank the remaining ones.
    ///
    /// Medals keep their name and region snapshots; their school link is
    /// cleared by the schema.
    pub fn remove_school(&self, school_id: i64) -> AppResult<SchoolRemoval> {
        let _pass_guard = self.recomputer.lock_pass();
        let policy = self.policy;

        let removal = self.recomputer.retry_busy("school removal", || {
            self.db.transaction(|tx| {
                let students_affected = match policy {
                    SchoolDeletionPolicy::Detach => user_repo::detach_school(tx, school_id)?,
                    SchoolDeletionPolicy::Cascade => user_repo::delete_by_school(tx, school_id)?,
                };

                if !school_repo::delete(tx, school_id)? {
                    return Err(AppError::validation(format!("unknown school {}", school_id)));
                }

                let pass = run_pass(tx)?;

                Ok(SchoolRemoval {
                    school_id,
                    policy,
                    students_affected,
                    pass,
                })
            })
        })?;

        info!(
            school_id,
            policy = %removal.policy,
            students = removal.students_affected,
            "school removed"
        );

        Ok(removal)
    }
}
