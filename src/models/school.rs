use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of seven ordinal tiers derived from a school's cumulative points
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchoolLevel(u8);

impl SchoolLevel {
    pub const MIN: SchoolLevel = SchoolLevel(1);
    pub const MAX: SchoolLevel = SchoolLevel(7);

    /// Lower bound (inclusive) of levels 2 through 7
    pub const THRESHOLDS: [i64; 6] = [
        600_000,
        3_000_000,
        15_000_000,
        62_500_000,
        255_000_000,
        510_000_000,
    ];

    /// Classify cumulative points into a level
    pub fn from_points(points: i64) -> Self {
        let passed = Self::THRESHOLDS
            .iter()
            .take_while(|&&threshold| points >= threshold)
            .count();
        Self(1 + passed as u8)
    }

    /// Read a stored level, clamping anything outside 1..=7
    pub fn from_db(value: i64) -> Self {
        Self(value.clamp(1, 7) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Points needed to reach the next level, `None` at the top tier
    pub fn next_threshold(&self) -> Option<i64> {
        Self::THRESHOLDS.get(self.0 as usize - 1).copied()
    }
}

impl Default for SchoolLevel {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for SchoolLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lv.{}", self.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct School {
    pub id: Option<i64>,
    pub name: String,
    pub region: Option<String>,
    pub total_minutes: i64,
    pub monthly_minutes: i64,
    pub total_points: i64,
    pub total_rank: Option<i64>,
    pub monthly_rank: Option<i64>,
    pub regional_rank: Option<i64>,
    pub level: SchoolLevel,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl School {
    pub fn new(name: impl Into<String>, region: Option<String>) -> Self {
        Self {
            name: name.into(),
            region,
            ..Default::default()
        }
    }

    pub fn with_window(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    /// Whether any recomputation pass has ranked this school yet
    pub fn is_ranked(&self) -> bool {
        self.total_rank.is_some()
    }

    /// Blank regions are treated as no region at all
    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.region = self
            .region
            .take()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
    }

    pub fn validate(&self) -> Result<(), SchoolValidationError> {
        if self.name.trim().is_empty() {
            return Err(SchoolValidationError::EmptyName);
        }

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(SchoolValidationError::WindowEndsBeforeStart);
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchoolValidationError {
    #[error("school name must not be empty")]
    EmptyName,
    #[error("competition window ends before it starts")]
    WindowEndsBeforeStart,
}

impl From<SchoolValidationError> for crate::utils::AppError {
    fn from(err: SchoolValidationError) -> Self {
        Self::validation(err.to_string())
    }
}

/// The aggregates a recomputation pass reads for one school
#[derive(Debug, Clone, PartialEq)]
pub struct SchoolStanding {
    pub id: i64,
    pub region: Option<String>,
    pub total_minutes: i64,
    pub monthly_minutes: i64,
    pub total_points: i64,
    pub level: SchoolLevel,
}

/// What a recomputation pass writes back for one school
#[derive(Debug, Clone, PartialEq)]
pub struct RankAssignment {
    pub school_id: i64,
    pub total_rank: i64,
    pub monthly_rank: i64,
    /// `None` for schools without a region, their column is left as is
    pub regional_rank: Option<i64>,
    pub level: SchoolLevel,
}

/// Which ranking a leaderboard read is ordered by
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaderboardScope {
    Total,
    Monthly,
    Regional(String),
}
