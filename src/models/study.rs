use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::date::format_hms;

/// Points awarded per whole minute of study
pub const POINTS_PER_MINUTE: i64 = 100;

/// A single submitted study session, at most one day long
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudyDuration {
    seconds: i64,
}

impl StudyDuration {
    pub const MAX_SECONDS: i64 = 24 * 60 * 60;

    pub fn from_seconds(seconds: i64) -> Result<Self, DurationError> {
        if seconds < 0 {
            return Err(DurationError::Negative);
        }
        if seconds > Self::MAX_SECONDS {
            return Err(DurationError::LongerThanADay);
        }
        Ok(Self { seconds })
    }

    pub fn from_minutes(minutes: i64) -> Result<Self, DurationError> {
        let seconds = minutes.checked_mul(60).ok_or(DurationError::LongerThanADay)?;
        Self::from_seconds(seconds)
    }

    /// Parse `HH:MM:SS` or `HH:MM`
    pub fn parse(s: &str) -> Result<Self, DurationError> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(DurationError::Malformed(s.to_string()));
        }

        let mut fields = [0i64; 3];
        for (slot, part) in fields.iter_mut().zip(&parts) {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(DurationError::Malformed(s.to_string()));
            }
            *slot = part
                .parse()
                .map_err(|_| DurationError::Malformed(s.to_string()))?;
        }

        let [hours, minutes, seconds] = fields;
        if minutes >= 60 || seconds >= 60 {
            return Err(DurationError::Malformed(s.to_string()));
        }
        if hours > 24 {
            return Err(DurationError::LongerThanADay);
        }

        Self::from_seconds(hours * 3600 + minutes * 60 + seconds)
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    /// Whole minutes, leftover seconds are dropped
    pub fn whole_minutes(&self) -> i64 {
        self.seconds / 60
    }

    pub fn points(&self) -> i64 {
        self.whole_minutes() * POINTS_PER_MINUTE
    }
}

impl fmt::Display for StudyDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_hms(self.seconds))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DurationError {
    #[error("study duration cannot be negative")]
    Negative,
    #[error("study duration cannot exceed 24 hours")]
    LongerThanADay,
    #[error("malformed study duration '{0}', expected HH:MM:SS")]
    Malformed(String),
}

impl From<DurationError> for crate::utils::AppError {
    fn from(err: DurationError) -> Self {
        Self::validation(err.to_string())
    }
}

/// One row per user per day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyTimeRecord {
    pub id: i64,
    pub user_id: i64,
    pub record_date: NaiveDate,
    /// Running sum of everything submitted that day
    pub daily_seconds: i64,
    /// User's cumulative points earned from study at the time of the last write
    pub total_points: i64,
    /// User's study minutes in the record's month at the time of the last write
    pub monthly_minutes: i64,
    /// User's cumulative study minutes at the time of the last write
    pub total_minutes: i64,
}

impl StudyTimeRecord {
    pub fn daily_time_display(&self) -> String {
        format_hms(self.daily_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_truncate() {
        let d = StudyDuration::from_seconds(179).unwrap();
        assert_eq!(d.whole_minutes(), 2);
        assert_eq!(d.points(), 200);
    }

    #[test]
    fn test_parse() {
        assert_eq!(StudyDuration::parse("02:30:00").unwrap().whole_minutes(), 150);
        assert_eq!(StudyDuration::parse("01:05").unwrap().seconds(), 3900);
        assert_eq!(StudyDuration::parse("24:00:00").unwrap().seconds(), 86_400);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(StudyDuration::parse("abc"), Err(DurationError::Malformed(_))));
        assert!(matches!(StudyDuration::parse("1:99:00"), Err(DurationError::Malformed(_))));
        assert!(matches!(StudyDuration::parse("-1:00:00"), Err(DurationError::Malformed(_))));
        assert!(matches!(StudyDuration::parse("1::00"), Err(DurationError::Malformed(_))));
        assert!(matches!(StudyDuration::parse("25:00:00"), Err(DurationError::LongerThanADay)));
    }

    #[test]
    fn test_bounds() {
        assert!(matches!(StudyDuration::from_seconds(-1), Err(DurationError::Negative)));
        assert!(StudyDuration::from_seconds(0).is_ok());
        assert!(matches!(
            StudyDuration::from_minutes(i64::MAX),
            Err(DurationError::LongerThanADay)
        ));
    }

    #[test]
    fn test_display() {
        let d = StudyDuration::from_minutes(150).unwrap();
        assert_eq!(d.to_string(), "02:30:00");
    }
}
