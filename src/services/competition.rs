//! Monthly competition close: medals and the monthly reset

use chrono::NaiveDate;
use tracing::info;

use crate::db::medal_repo::{self, MedalSnapshot};
use crate::db::{notification_repo, school_repo, user_repo, Database};
use crate::models::{MedalScope, NotificationType};
use crate::services::ranking::{run_pass, PassReport, Recomputer};
use crate::utils::AppResult;

/// Outcome of closing a competition period
#[derive(Debug, Clone)]
pub struct PeriodClose {
    pub awarded_on: NaiveDate,
    pub national_medals: usize,
    pub regional_medals: usize,
    /// Schools whose monthly minutes were reset
    pub schools_reset: usize,
    pub pass: PassReport,
}

pub struct CompetitionService<'a> {
    db: &'a Database,
    recomputer: &'a Recomputer,
    medal_cutoff: i64,
}

impl<'a> CompetitionService<'a> {
    pub fn new(db: &'a Database, recomputer: &'a Recomputer, medal_cutoff: i64) -> Self {
        Self {
            db,
            recomputer,
            medal_cutoff,
        }
    }

    /// Close the running monthly competition.
    ///
    /// Ranks are refreshed first, then every student of a school placed
    /// within the cutoff gets a medal per scope, monthly minutes go back to
    /// zero and a final pass ranks the new period. Schools without any
    /// monthly minutes are not awarded.
    pub fn close_period(&self, awarded_on: NaiveDate) -> AppResult<PeriodClose> {
        let _pass_guard = self.recomputer.lock_pass();
        let cutoff = self.medal_cutoff;

        let close = self.recomputer.retry_busy("period close", || {
            self.db.transaction(|tx| {
                run_pass(tx)?;

                let mut national_medals = 0;
                let mut regional_medals = 0;

                for school in school_repo::find_all(tx)? {
                    let Some(school_id) = school.id else { continue };
                    if school.monthly_minutes == 0 {
                        continue;
                    }

                    let national = school.monthly_rank.filter(|rank| *rank <= cutoff);
                    let regional = school
                        .regional_rank
                        .filter(|rank| *rank <= cutoff && school.region.is_some());
                    if national.is_none() && regional.is_none() {
                        continue;
                    }

                    for user_id in user_repo::ids_by_school(tx, school_id)? {
                        let award = |rank: i64, scope: MedalScope| -> AppResult<()> {
                            medal_repo::insert(
                                tx,
                                &MedalSnapshot {
                                    user_id,
                                    school_id,
                                    school_name: &school.name,
                                    rank,
                                    monthly_minutes: school.monthly_minutes,
                                    awarded_on,
                                    scope,
                                    region: school.region.as_deref(),
                                },
                            )?;
                            notification_repo::create(
                                tx,
                                user_id,
                                "Medal awarded",
                                &format!("{} placed #{} ({}) on {}", school.name, rank, scope, awarded_on),
                                NotificationType::Reward,
                            )?;
                            Ok(())
                        };

                        if let Some(rank) = national {
                            award(rank, MedalScope::National)?;
                            national_medals += 1;
                        }
                        if let Some(rank) = regional {
                            award(rank, MedalScope::Regional)?;
                            regional_medals += 1;
                        }
                    }
                }

                let schools_reset = school_repo::reset_monthly(tx)?;
                let pass = run_pass(tx)?;

                Ok(PeriodClose {
                    awarded_on,
                    national_medals,
                    regional_medals,
                    schools_reset,
                    pass,
                })
            })
        })?;

        info!(
            %awarded_on,
            national = close.national_medals,
            regional = close.regional_medals,
            schools = close.schools_reset,
            "competition period closed"
        );

        Ok(close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{School, User};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 31).unwrap()
    }

    fn school_with_student(db: &Database, name: &str, region: Option<&str>, monthly: i64) -> (i64, i64) {
        let school_id = db.schools().create(&mut School::new(name, region.map(String::from))).unwrap();
        let email = format!("{}@example.com", name.to_lowercase().replace(' ', "."));
        let user_id = db
            .users()
            .create(&mut User::new(&email, "hash", name).with_school(school_id))
            .unwrap();
        db.with_connection(|conn| school_repo::add_study(conn, school_id, monthly, monthly * 100))
            .unwrap();
        (school_id, user_id)
    }

    #[test]
    fn test_close_awards_and_resets() {
        let db = Database::open_in_memory().unwrap();
        let recomputer = Recomputer::new(db.clone(), 3);

        let (dong_a, s1) = school_with_student(&db, "Dong-A High", Some("Busan"), 1651);
        let (_, s2) = school_with_student(&db, "Changwon High", Some("Changwon"), 1650);
        let (_, s3) = school_with_student(&db, "Yongho High", Some("Changwon"), 1580);
        let (_, s4) = school_with_student(&db, "Quiet High", Some("Changwon"), 10);

        let close = CompetitionService::new(&db, &recomputer, 2).close_period(date()).unwrap();
        assert_eq!(close.national_medals, 2);
        // Dong-A and Changwon win their regions, Yongho is second in Changwon
        assert_eq!(close.regional_medals, 3);
        assert_eq!(close.schools_reset, 4);

        let medals = db.medals().list_for_user(s1).unwrap();
        assert_eq!(medals.len(), 2);
        let national = medals.iter().find(|m| m.scope == MedalScope::National).unwrap();
        assert_eq!(national.rank, 1);
        assert_eq!(national.monthly_minutes, 1651);
        assert_eq!(national.school_name, "Dong-A High");
        assert_eq!(national.region.as_deref(), Some("Busan"));

        let s2_scopes: Vec<_> = db.medals().list_for_user(s2).unwrap().iter().map(|m| m.scope).collect();
        assert_eq!(s2_scopes.len(), 2);
        let s3_medals = db.medals().list_for_user(s3).unwrap();
        assert_eq!(s3_medals.len(), 1);
        assert_eq!(s3_medals[0].scope, MedalScope::Regional);
        assert_eq!(s3_medals[0].rank, 2);
        assert!(db.medals().list_for_user(s4).unwrap().is_empty());

        // monthly counters restart, totals survive
        let school = db.schools().find_by_id(dong_a).unwrap().unwrap();
        assert_eq!(school.monthly_minutes, 0);
        assert_eq!(school.total_minutes, 1651);
        assert_eq!(school.total_rank, Some(1));

        assert_eq!(db.medals().list_awarded_on(date()).unwrap().len(), 5);
    }

    #[test]
    fn test_inactive_schools_get_nothing() {
        let db = Database::open_in_memory().unwrap();
        let recomputer = Recomputer::new(db.clone(), 3);
        let (_, student) = school_with_student(&db, "Empty High", None, 0);

        let close = CompetitionService::new(&db, &recomputer, 3).close_period(date()).unwrap();
        assert_eq!(close.national_medals + close.regional_medals, 0);
        assert!(db.medals().list_for_user(student).unwrap().is_empty());
    }
}
