//! End-to-end scenarios against a file-backed league

use std::sync::{Arc, Barrier};

use chrono::NaiveDate;
use tempfile::TempDir;

use study_league::models::{
    AppConfig, LeaderboardScope, MedalScope, NotificationType, RecomputeMode, School, SchoolDeletionPolicy,
    StoreItem, StudyDuration, User,
};
use study_league::{AppError, StudyLeague};

fn league(mode: RecomputeMode) -> (TempDir, StudyLeague) {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        database_path: dir.path().join("league.db"),
        recompute_mode: mode,
        debounce_ms: 60_000,
        ..AppConfig::default()
    };
    let league = StudyLeague::open(config).unwrap();
    (dir, league)
}

fn school(league: &StudyLeague, name: &str, region: Option<&str>) -> i64 {
    league
        .db()
        .schools()
        .create(&mut School::new(name, region.map(String::from)))
        .unwrap()
}

fn student(league: &StudyLeague, nick: &str, school_id: Option<i64>) -> i64 {
    let mut user = User::new(format!("{}@example.com", nick), "hash", nick);
    user.school_id = school_id;
    league.db().users().create(&mut user).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, d).unwrap()
}

fn minutes(m: i64) -> StudyDuration {
    StudyDuration::from_minutes(m).unwrap()
}

#[test]
fn test_study_session_moves_school_past_peers() {
    let (_dir, league) = league(RecomputeMode::Immediate);
    let leader = school(&league, "Haeundae High", Some("Busan"));
    let climber = school(&league, "Suyeong High", Some("Busan"));
    let a = student(&league, "ahn", Some(leader));
    let b = student(&league, "baek", Some(climber));

    league.study().submit(a, minutes(100), day(1)).unwrap();
    assert_eq!(league.db().schools().find_by_id(leader).unwrap().unwrap().total_rank, Some(1));

    league.study().submit(b, minutes(150), day(1)).unwrap();

    let user = league.db().users().find_by_id(b).unwrap().unwrap();
    assert_eq!(user.points, 15_000);
    let s = league.db().schools().find_by_id(climber).unwrap().unwrap();
    assert_eq!((s.total_minutes, s.total_points), (150, 15_000));
    assert_eq!((s.total_rank, s.monthly_rank, s.regional_rank), (Some(1), Some(1), Some(1)));

    let board = league.db().schools().leaderboard(&LeaderboardScope::Total, 10).unwrap();
    assert_eq!(board.iter().filter_map(|s| s.id).collect::<Vec<_>>(), vec![climber, leader]);

    // rerunning the pass changes nothing
    league.recomputer().recompute_now().unwrap();
    let again = league.db().schools().find_by_id(climber).unwrap().unwrap();
    assert_eq!(again.total_rank, s.total_rank);
    assert_eq!(again.level, s.level);
}

#[test]
fn test_regional_boards_are_independent() {
    let (_dir, league) = league(RecomputeMode::Immediate);
    let seoul_a = school(&league, "Gangnam High", Some("Seoul"));
    let seoul_b = school(&league, "Mapo High", Some("Seoul"));
    let daejeon = school(&league, "Yuseong High", Some("Daejeon"));
    let nowhere = school(&league, "Island High", None);

    for (school_id, nick, mins) in [
        (seoul_a, "go", 30),
        (seoul_b, "moon", 60),
        (daejeon, "yu", 10),
        (nowhere, "do", 90),
    ] {
        let user = student(&league, nick, Some(school_id));
        league.study().submit(user, minutes(mins), day(3)).unwrap();
    }

    let seoul = league
        .db()
        .schools()
        .leaderboard(&LeaderboardScope::Regional("Seoul".into()), 10)
        .unwrap();
    assert_eq!(seoul.iter().filter_map(|s| s.id).collect::<Vec<_>>(), vec![seoul_b, seoul_a]);
    assert_eq!(seoul[0].regional_rank, Some(1));

    let yuseong = league.db().schools().find_by_id(daejeon).unwrap().unwrap();
    assert_eq!(yuseong.regional_rank, Some(1));
    assert_eq!(yuseong.monthly_rank, Some(4));

    let island = league.db().schools().find_by_id(nowhere).unwrap().unwrap();
    assert_eq!(island.regional_rank, None);
    assert_eq!(island.monthly_rank, Some(1));

    assert_eq!(
        league.db().schools().regions().unwrap(),
        vec!["Daejeon".to_string(), "Seoul".to_string()]
    );
}

#[test]
fn test_reaching_a_tier_notifies_students() {
    let (_dir, league) = league(RecomputeMode::Immediate);
    let school_id = school(&league, "Bundang High", None);
    let user = student(&league, "nam", Some(school_id));

    // 5 x 20h = 6000 minutes = 600,000 points, the first threshold
    for d in 1..=5 {
        league.study().submit(user, minutes(1200), day(d)).unwrap();
    }

    let s = league.db().schools().find_by_id(school_id).unwrap().unwrap();
    assert_eq!(s.total_points, 600_000);
    assert_eq!(s.level.value(), 2);

    let rewards: Vec<_> = league
        .db()
        .notifications()
        .list_for_user(user)
        .unwrap()
        .into_iter()
        .filter(|n| n.kind == NotificationType::Reward)
        .collect();
    assert_eq!(rewards.len(), 1);

    let latest = league.db().study_records().latest_for_user(user).unwrap().unwrap();
    assert_eq!(latest.record_date, day(5));
    assert_eq!(latest.total_minutes, 6000);
}

#[test]
fn test_overlong_session_is_rejected_up_front() {
    assert!(StudyDuration::parse("24:00:01").is_err());
    assert!(StudyDuration::parse("1:75").is_err());
    assert_eq!(StudyDuration::parse("02:30").unwrap().whole_minutes(), 150);
}

#[test]
fn test_purchase_beyond_balance_changes_nothing() {
    let (_dir, league) = league(RecomputeMode::Immediate);
    let user = student(&league, "oh", None);
    league.study().submit(user, minutes(3), day(2)).unwrap();

    let item = league
        .db()
        .store()
        .create_item(&mut StoreItem::new("Bookshelf", "furniture", 500))
        .unwrap();

    let result = league.purchases().purchase(user, item, 500);
    assert!(matches!(result, Err(AppError::InsufficientFunds { balance: 300, price: 500 })));
    assert_eq!(league.db().users().find_by_id(user).unwrap().unwrap().points, 300);
    assert!(league.db().store().inventory_for_user(user).unwrap().is_empty());
}

#[test]
fn test_concurrent_submissions_all_count() {
    let (_dir, league) = league(RecomputeMode::Immediate);
    let league = Arc::new(league);
    let school_id = school(&league, "Suwon High", Some("Gyeonggi"));
    let users: Vec<i64> = (0..4)
        .map(|i| student(&league, &format!("kid{}", i), Some(school_id)))
        .collect();

    let barrier = Arc::new(Barrier::new(users.len()));
    let handles: Vec<_> = users
        .iter()
        .map(|&user| {
            let league = Arc::clone(&league);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                for _ in 0..5 {
                    league.study().submit(user, minutes(10), day(7)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let s = league.db().schools().find_by_id(school_id).unwrap().unwrap();
    assert_eq!(s.total_minutes, 200);
    assert_eq!(s.total_points, 20_000);
    for user in users {
        assert_eq!(league.db().users().find_by_id(user).unwrap().unwrap().points, 5000);
    }
}

#[test]
fn test_closing_a_period_hands_out_medals() {
    let (_dir, league) = league(RecomputeMode::Immediate);
    let winner = school(&league, "Jinju High", Some("Gyeongnam"));
    let runner_up = school(&league, "Tongyeong High", Some("Gyeongnam"));
    let w = student(&league, "ha", Some(winner));
    let r = student(&league, "ra", Some(runner_up));

    league.study().submit(w, minutes(300), day(28)).unwrap();
    league.study().submit(r, minutes(200), day(28)).unwrap();

    let closed_on = day(30);
    let close = league.competition().close_period(closed_on).unwrap();
    assert_eq!(close.national_medals, 2);
    assert_eq!(close.regional_medals, 2);

    let medals = league.db().medals().list_for_user(w).unwrap();
    assert!(medals.iter().all(|m| m.rank == 1 && m.title() == "Gold"));
    assert!(medals.iter().any(|m| m.scope == MedalScope::Regional));

    let s = league.db().schools().find_by_id(winner).unwrap().unwrap();
    assert_eq!(s.monthly_minutes, 0);
    assert_eq!(s.total_minutes, 300);

    // next month starts from zero for the student as well
    let next = league
        .study()
        .submit(w, minutes(15), NaiveDate::from_ymd_opt(2024, 12, 1).unwrap())
        .unwrap();
    assert_eq!(next.record.monthly_minutes, 15);
    assert_eq!(next.record.total_minutes, 315);
}

#[test]
fn test_removed_school_keeps_history_under_detach() {
    let (_dir, league) = league(RecomputeMode::Immediate);
    assert_eq!(league.config().school_deletion, SchoolDeletionPolicy::Detach);

    let gone = school(&league, "Old High", Some("Jeonju"));
    let stays = school(&league, "New High", Some("Jeonju"));
    let user = student(&league, "shin", Some(gone));
    league.study().submit(user, minutes(40), day(10)).unwrap();
    league.competition().close_period(day(30)).unwrap();

    league.school_admin().remove_school(gone).unwrap();

    let medals = league.db().medals().list_for_user(user).unwrap();
    assert!(!medals.is_empty());
    assert!(medals.iter().all(|m| m.school_id.is_none() && m.school_name == "Old High"));
    assert_eq!(league.db().study_records().list_for_user(user).unwrap().len(), 1);
    assert_eq!(league.db().users().find_by_id(user).unwrap().unwrap().school_id, None);

    let remaining = league.db().schools().find_by_id(stays).unwrap().unwrap();
    assert_eq!(remaining.total_rank, Some(1));
}

#[test]
fn test_deferred_mode_catches_up_on_demand() {
    let (_dir, league) = league(RecomputeMode::Deferred);
    let school_id = school(&league, "Chuncheon High", None);
    let user = student(&league, "kwon", Some(school_id));

    league.study().submit(user, minutes(45), day(12)).unwrap();
    assert!(league.recomputer().is_dirty());
    assert_eq!(league.db().schools().find_by_id(school_id).unwrap().unwrap().total_rank, None);

    league.recomputer().run_if_dirty().unwrap();
    assert_eq!(league.db().schools().find_by_id(school_id).unwrap().unwrap().total_rank, Some(1));
}
