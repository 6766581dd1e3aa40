//! Study submission and point accrual

use chrono::{Local, NaiveDate};
use tracing::info;

use crate::db::{notification_repo, school_repo, study_repo, user_repo, Database};
use crate::models::{RecomputeMode, StudyDuration, StudyTimeRecord};
use crate::services::ranking::{run_pass, PassReport, Recomputer};
use crate::utils::{AppError, AppResult};

/// What a submission changed
#[derive(Debug, Clone)]
pub struct StudySubmission {
    pub record: StudyTimeRecord,
    pub minutes: i64,
    pub points: i64,
    /// School credited with the minutes, if the user has one
    pub school_id: Option<i64>,
    /// Pass run inside the submission (immediate mode only)
    pub pass: Option<PassReport>,
}

pub struct StudyService<'a> {
    db: &'a Database,
    recomputer: &'a Recomputer,
    mode: RecomputeMode,
}

impl<'a> StudyService<'a> {
    pub fn new(db: &'a Database, recomputer: &'a Recomputer, mode: RecomputeMode) -> Self {
        Self {
            db,
            recomputer,
            mode,
        }
    }

    /// Submit a session for today (local date)
    pub fn submit_today(&self, user_id: i64, duration: StudyDuration) -> AppResult<StudySubmission> {
        self.submit(user_id, duration, Local::now().date_naive())
    }

    /// Credit a study session to the user, their day and their school.
    ///
    /// User counters are written before school counters, and school
    /// counters before any ranking pass reads them; everything commits or
    /// rolls back together.
    pub fn submit(
        &self,
        user_id: i64,
        duration: StudyDuration,
        date: NaiveDate,
    ) -> AppResult<StudySubmission> {
        let minutes = duration.whole_minutes();
        let points = duration.points();

        // Immediate mode runs a pass in this transaction, so take the pass lock first
        let _pass_guard = match self.mode {
            RecomputeMode::Immediate => Some(self.recomputer.lock_pass()),
            RecomputeMode::Deferred => None,
        };

        let submission = self.recomputer.retry_busy("study submission", || {
            self.db.transaction(|tx| {
                let user = user_repo::find_by_id(tx, user_id)?
                    .ok_or_else(|| AppError::validation(format!("unknown user {}", user_id)))?;

                let record = study_repo::add_to_day(tx, user_id, date, duration.seconds(), minutes, points)?;
                user_repo::credit_points(tx, user_id, points)?;

                let mut pass = None;
                if let Some(school_id) = user.school_id {
                    school_repo::add_study(tx, school_id, minutes, points)?;
                    if self.mode == RecomputeMode::Immediate {
                        pass = Some(run_pass(tx)?);
                    }
                }

                notification_repo::append(
                    tx,
                    user_id,
                    &format!("studied {} on {}, earned {} points", duration, date, points),
                )?;

                Ok(StudySubmission {
                    record,
                    minutes,
                    points,
                    school_id: user.school_id,
                    pass,
                })
            })
        })?;

        if submission.school_id.is_some() && self.mode == RecomputeMode::Deferred {
            self.recomputer.mark_dirty();
        }

        info!(
            user_id,
            minutes,
            points,
            school_id = ?submission.school_id,
            "study time submitted"
        );

        Ok(submission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{School, User};

    struct Fixture {
        db: Database,
        recomputer: Recomputer,
        school_id: i64,
        user_id: i64,
    }

    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let school_id = db.schools().create(&mut School::new("Incheon High", Some("Incheon".into()))).unwrap();
        let user_id = db
            .users()
            .create(&mut User::new("yoon@example.com", "hash", "yoon").with_school(school_id))
            .unwrap();
        let recomputer = Recomputer::new(db.clone(), 3);
        Fixture {
            db,
            recomputer,
            school_id,
            user_id,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, 4).unwrap()
    }

    #[test]
    fn test_submit_credits_user_and_school() {
        let f = fixture();
        let service = StudyService::new(&f.db, &f.recomputer, RecomputeMode::Immediate);

        let result = service
            .submit(f.user_id, StudyDuration::from_minutes(150).unwrap(), day())
            .unwrap();
        assert_eq!(result.minutes, 150);
        assert_eq!(result.points, 15_000);
        assert!(result.pass.is_some());

        let user = f.db.users().find_by_id(f.user_id).unwrap().unwrap();
        assert_eq!(user.points, 15_000);

        let school = f.db.schools().find_by_id(f.school_id).unwrap().unwrap();
        assert_eq!(school.total_minutes, 150);
        assert_eq!(school.monthly_minutes, 150);
        assert_eq!(school.total_points, 15_000);
        assert_eq!(school.total_rank, Some(1));
        assert_eq!(school.regional_rank, Some(1));

        assert_eq!(f.db.activity_log().list_for_user(f.user_id).unwrap().len(), 1);
    }

    #[test]
    fn test_truncates_to_whole_minutes() {
        let f = fixture();
        let service = StudyService::new(&f.db, &f.recomputer, RecomputeMode::Immediate);

        let result = service
            .submit(f.user_id, StudyDuration::from_seconds(119).unwrap(), day())
            .unwrap();
        assert_eq!(result.minutes, 1);
        assert_eq!(result.points, 100);
        assert_eq!(result.record.daily_seconds, 119);
    }

    #[test]
    fn test_split_submission_matches_single() {
        let split = fixture();
        let service = StudyService::new(&split.db, &split.recomputer, RecomputeMode::Immediate);
        service.submit(split.user_id, StudyDuration::from_minutes(40).unwrap(), day()).unwrap();
        let last = service.submit(split.user_id, StudyDuration::from_minutes(25).unwrap(), day()).unwrap();

        let whole = fixture();
        let service = StudyService::new(&whole.db, &whole.recomputer, RecomputeMode::Immediate);
        let once = service.submit(whole.user_id, StudyDuration::from_minutes(65).unwrap(), day()).unwrap();

        assert_eq!(last.record.total_minutes, once.record.total_minutes);
        assert_eq!(last.record.total_points, once.record.total_points);
        assert_eq!(last.record.daily_seconds, once.record.daily_seconds);

        let a = split.db.schools().find_by_id(split.school_id).unwrap().unwrap();
        let b = whole.db.schools().find_by_id(whole.school_id).unwrap().unwrap();
        assert_eq!((a.total_minutes, a.total_points), (b.total_minutes, b.total_points));

        let ua = split.db.users().find_by_id(split.user_id).unwrap().unwrap();
        let ub = whole.db.users().find_by_id(whole.user_id).unwrap().unwrap();
        assert_eq!(ua.points, ub.points);
    }

    #[test]
    fn test_user_without_school() {
        let f = fixture();
        let loner = f
            .db
            .users()
            .create(&mut User::new("solo@example.com", "hash", "solo"))
            .unwrap();
        let service = StudyService::new(&f.db, &f.recomputer, RecomputeMode::Immediate);

        let result = service.submit(loner, StudyDuration::from_minutes(30).unwrap(), day()).unwrap();
        assert_eq!(result.school_id, None);
        assert!(result.pass.is_none());
        assert_eq!(f.db.users().find_by_id(loner).unwrap().unwrap().points, 3000);

        let school = f.db.schools().find_by_id(f.school_id).unwrap().unwrap();
        assert_eq!(school.total_minutes, 0);
        assert!(!school.is_ranked());
    }

    #[test]
    fn test_unknown_user_leaves_nothing_behind() {
        let f = fixture();
        let service = StudyService::new(&f.db, &f.recomputer, RecomputeMode::Immediate);

        let result = service.submit(4242, StudyDuration::from_minutes(30).unwrap(), day());
        assert!(matches!(result, Err(AppError::Validation(_))));

        let count: i64 = f
            .db
            .with_connection(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM study_records", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_deferred_mode_marks_dirty() {
        let f = fixture();
        let service = StudyService::new(&f.db, &f.recomputer, RecomputeMode::Deferred);

        let result = service.submit(f.user_id, StudyDuration::from_minutes(10).unwrap(), day()).unwrap();
        assert!(result.pass.is_none());
        assert!(f.recomputer.is_dirty());

        let school = f.db.schools().find_by_id(f.school_id).unwrap().unwrap();
        assert_eq!(school.total_minutes, 10);
        assert_eq!(school.total_rank, None);

        f.recomputer.run_if_dirty().unwrap();
        let school = f.db.schools().find_by_id(f.school_id).unwrap().unwrap();
        assert_eq!(school.total_rank, Some(1));
    }

    #[test]
    fn test_backdated_session_keeps_latest_totals_in_step() {
        let f = fixture();
        let service = StudyService::new(&f.db, &f.recomputer, RecomputeMode::Immediate);

        service.submit(f.user_id, StudyDuration::from_minutes(60).unwrap(), day()).unwrap();
        let earlier = day().pred_opt().unwrap();
        service.submit(f.user_id, StudyDuration::from_minutes(30).unwrap(), earlier).unwrap();

        let user = f.db.users().find_by_id(f.user_id).unwrap().unwrap();
        let latest = f.db.study_records().latest_for_user(f.user_id).unwrap().unwrap();
        assert_eq!(latest.record_date, day());
        assert_eq!(latest.total_points, user.points);
        assert_eq!(latest.total_minutes, 90);
    }
}
