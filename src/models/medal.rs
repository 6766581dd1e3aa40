use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which competition a medal was won in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedalScope {
    National,
    Regional,
}

impl MedalScope {
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "regional" => Self::Regional,
            _ => Self::National,
        }
    }
}

impl fmt::Display for MedalScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::National => write!(f, "national"),
            Self::Regional => write!(f, "regional"),
        }
    }
}

/// Snapshot of a student's school standing when a competition period closed.
///
/// Medals are never recomputed; `school_id` becomes `None` if the school is
/// later removed, the name and region snapshots remain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medal {
    pub id: i64,
    pub user_id: i64,
    pub school_id: Option<i64>,
    pub school_name: String,
    pub rank: i64,
    pub monthly_minutes: i64,
    pub awarded_on: NaiveDate,
    pub scope: MedalScope,
    pub region: Option<String>,
}

impl Medal {
    pub fn title(&self) -> &'static str {
        match self.rank {
            1 => "Gold",
            2 => "Silver",
            3 => "Bronze",
            _ => "Finalist",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_roundtrip() {
        for scope in [MedalScope::National, MedalScope::Regional] {
            assert_eq!(MedalScope::from_db_str(&scope.to_string()), scope);
        }
    }
}
