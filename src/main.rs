//! Study League - command line entry point

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use study_league::models::{AppConfig, LeaderboardScope, StudyDuration};
use study_league::utils::date::parse_date;
use study_league::StudyLeague;

const USAGE: &str = "usage: study-league [recompute | leaderboard [n] [--json] | \
                     close-period <YYYY-MM-DD> | submit <user-id> <HH:MM[:SS]> [YYYY-MM-DD]]";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("study_league=info")),
        )
        .with_target(false)
        .init();

    tracing::info!("starting Study League v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load().context("could not load configuration")?;
    let league = StudyLeague::open(config)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("recompute");

    match command {
        "recompute" => {
            let report = league.recomputer().recompute_now()?;
            println!(
                "ranked {} schools in {} regions, {} level-ups",
                report.schools,
                report.regions,
                report.level_ups.len()
            );
        }
        "leaderboard" => {
            let json = args.iter().any(|a| a == "--json");
            let limit = match args.iter().skip(1).find(|a| !a.starts_with("--")) {
                Some(n) => n.parse().with_context(|| format!("invalid count: {}", n))?,
                None => 10,
            };

            let schools = league.db().schools().leaderboard(&LeaderboardScope::Total, limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&schools)?);
            } else {
                for school in &schools {
                    let rank = school
                        .total_rank
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:>4}  {:<30} {:>10} min  {}",
                        rank, school.name, school.total_minutes, school.level
                    );
                }
            }
        }
        "close-period" => {
            let Some(raw) = args.get(1) else { bail!(USAGE) };
            let date = parse_date(raw).with_context(|| format!("invalid date: {}", raw))?;
            let close = league.competition().close_period(date)?;
            println!(
                "closed period {}: {} national and {} regional medals",
                close.awarded_on, close.national_medals, close.regional_medals
            );
        }
        "submit" => {
            let (Some(user), Some(duration)) = (args.get(1), args.get(2)) else { bail!(USAGE) };
            let user_id: i64 = user.parse().with_context(|| format!("invalid user id: {}", user))?;
            let duration = StudyDuration::parse(duration)?;

            let submission = match args.get(3) {
                Some(raw) => {
                    let date = parse_date(raw).with_context(|| format!("invalid date: {}", raw))?;
                    league.study().submit(user_id, duration, date)?
                }
                None => league.study().submit_today(user_id, duration)?,
            };
            println!(
                "recorded {} minutes, {} points (day total {})",
                submission.minutes,
                submission.points,
                submission.record.daily_time_display()
            );
        }
        _ => bail!(USAGE),
    }

    league.shutdown();
    Ok(())
}
