//! School ranking and level recomputation
//!
//! A pass reads every school's aggregates, derives the total, monthly and
//! regional rankings plus each school's level, and writes all of them back
//! inside one transaction. Ranks are dense (1..N without gaps); ties on the
//! metric are broken by school id, lowest first.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::db::{notification_repo, school_repo, user_repo, Database};
use crate::models::{NotificationType, RankAssignment, SchoolLevel, SchoolStanding};
use crate::utils::AppResult;

/// Rank `standings` by `metric`, highest first, ties by id
fn rank_by<F>(standings: &[&SchoolStanding], metric: F) -> HashMap<i64, i64>
where
    F: Fn(&SchoolStanding) -> i64,
{
    let mut order: Vec<&SchoolStanding> = standings.to_vec();
    order.sort_by_key(|s| (Reverse(metric(*s)), s.id));

    order
        .into_iter()
        .enumerate()
        .map(|(index, s)| (s.id, index as i64 + 1))
        .collect()
}

/// Derive ranks and levels for every school from one snapshot
pub fn compute_assignments(standings: &[SchoolStanding]) -> Vec<RankAssignment> {
    let all: Vec<&SchoolStanding> = standings.iter().collect();
    let total = rank_by(&all, |s| s.total_minutes);
    let monthly = rank_by(&all, |s| s.monthly_minutes);

    let mut by_region: HashMap<&str, Vec<&SchoolStanding>> = HashMap::new();
    for standing in standings {
        if let Some(region) = standing.region.as_deref() {
            by_region.entry(region).or_default().push(standing);
        }
    }

    let mut regional: HashMap<i64, i64> = HashMap::new();
    for members in by_region.values() {
        regional.extend(rank_by(members, |s| s.monthly_minutes));
    }

    standings
        .iter()
        .map(|s| RankAssignment {
            school_id: s.id,
            total_rank: total[&s.id],
            monthly_rank: monthly[&s.id],
            regional_rank: regional.get(&s.id).copied(),
            level: SchoolLevel::from_points(s.total_points),
        })
        .collect()
}

/// A school that moved up a tier during a pass
#[derive(Debug, Clone, PartialEq)]
pub struct LevelUp {
    pub school_id: i64,
    pub from: SchoolLevel,
    pub to: SchoolLevel,
}

/// Outcome of one recomputation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassReport {
    pub schools: usize,
    pub regions: usize,
    pub level_ups: Vec<LevelUp>,
}

/// Run one full pass on `conn`, which should be inside a transaction
pub(crate) fn run_pass(conn: &Connection) -> AppResult<PassReport> {
    let standings = school_repo::load_standings(conn)?;
    let assignments = compute_assignments(&standings);
    school_repo::write_assignments(conn, &assignments)?;

    let mut level_ups = Vec::new();
    for (standing, assignment) in standings.iter().zip(&assignments) {
        if assignment.level > standing.level {
            level_ups.push(LevelUp {
                school_id: standing.id,
                from: standing.level,
                to: assignment.level,
            });
        }
    }

    for up in &level_ups {
        let message = format!("Your school reached {}!", up.to);
        for user_id in user_repo::ids_by_school(conn, up.school_id)? {
            notification_repo::create(conn, user_id, "School level up", &message, NotificationType::Reward)?;
        }
    }

    let mut regions: Vec<&str> = standings.iter().filter_map(|s| s.region.as_deref()).collect();
    regions.sort_unstable();
    regions.dedup();

    Ok(PassReport {
        schools: standings.len(),
        regions: regions.len(),
        level_ups,
    })
}

/// Serializes recomputation passes and coalesces concurrent requests.
///
/// Lock order is pass lock first, then the database mutex.
#[derive(Clone)]
pub struct Recomputer {
    db: Database,
    pass_lock: Arc<Mutex<()>>,
    requested: Arc<AtomicU64>,
    completed: Arc<AtomicU64>,
    dirty: Arc<AtomicBool>,
    max_attempts: u32,
}

impl Recomputer {
    pub fn new(db: Database, max_attempts: u32) -> Self {
        Self {
            db,
            pass_lock: Arc::new(Mutex::new(())),
            requested: Arc::new(AtomicU64::new(0)),
            completed: Arc::new(AtomicU64::new(0)),
            dirty: Arc::new(AtomicBool::new(false)),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Run a full pass now, waiting for any pass already in flight
    pub fn recompute_now(&self) -> AppResult<PassReport> {
        let _guard = self.lock_pass();
        let covers = self.requested.load(Ordering::SeqCst);
        let report = self.run_with_retry()?;
        self.completed.fetch_max(covers, Ordering::SeqCst);
        Ok(report)
    }

    /// Make sure a pass that started after this call has completed.
    ///
    /// Returns `None` when another caller's pass already covered the request.
    pub fn request_pass(&self) -> AppResult<Option<PassReport>> {
        let ticket = self.requested.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = self.lock_pass();

        if self.completed.load(Ordering::SeqCst) >= ticket {
            debug!(ticket, "recompute request coalesced");
            return Ok(None);
        }

        let covers = self.requested.load(Ordering::SeqCst);
        let report = self.run_with_retry()?;
        self.completed.fetch_max(covers, Ordering::SeqCst);
        Ok(Some(report))
    }

    /// Note that aggregates changed without recomputing yet
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Run a pass only if something changed since the last one
    pub fn run_if_dirty(&self) -> AppResult<Option<PassReport>> {
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }

        match self.request_pass() {
            Ok(report) => Ok(report),
            Err(e) => {
                // keep the work pending for the next tick
                self.dirty.store(true, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Hold the pass lock while doing writes that must not interleave with a pass
    pub(crate) fn lock_pass(&self) -> MutexGuard<'_, ()> {
        self.pass_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_with_retry(&self) -> AppResult<PassReport> {
        let started = Instant::now();
        let report = self.retry_busy("recomputation pass", || self.db.transaction(|tx| run_pass(tx)))?;
        info!(
            schools = report.schools,
            regions = report.regions,
            level_ups = report.level_ups.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "recomputation pass done"
        );
        Ok(report)
    }

    /// Re-run `op` while SQLite reports lock contention, up to the attempt limit.
    ///
    /// `op` must be a whole transaction so that every attempt starts clean.
    pub(crate) fn retry_busy<T, F>(&self, what: &str, mut op: F) -> AppResult<T>
    where
        F: FnMut() -> AppResult<T>,
    {
        let mut attempt = 1;
        loop {
            match op() {
                Err(e) if e.is_busy() && attempt < self.max_attempts => {
                    warn!(attempt, error = %e, "{} hit lock contention, retrying", what);
                    std::thread::sleep(Duration::from_millis(50 * attempt as u64));
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

/// Background thread running at most one pass per debounce interval
pub struct RecomputeWorker {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RecomputeWorker {
    pub fn spawn(recomputer: Recomputer, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::channel::<()>();

        let handle = std::thread::spawn(move || {
            info!(debounce_ms = debounce.as_millis() as u64, "recompute worker started");
            loop {
                match rx.recv_timeout(debounce) {
                    Err(RecvTimeoutError::Timeout) => {
                        if let Err(e) = recomputer.run_if_dirty() {
                            warn!(error = %e, "deferred recomputation failed");
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            // flush whatever arrived after the last tick
            if let Err(e) = recomputer.run_if_dirty() {
                warn!(error = %e, "final recomputation failed");
            }
            info!("recompute worker stopped");
        });

        Self {
            shutdown: Some(tx),
            handle: Some(handle),
        }
    }

    /// Stop the worker after a final pass
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("recompute worker panicked");
            }
        }
    }
}

impl Drop for RecomputeWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
