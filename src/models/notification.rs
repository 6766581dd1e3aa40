use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    System,
    Reward,
    FriendRequest,
    #[default]
    Custom,
}

impl NotificationType {
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "system" => Self::System,
            "reward" => Self::Reward,
            "friend_request" => Self::FriendRequest,
            _ => Self::Custom,
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Reward => write!(f, "reward"),
            Self::FriendRequest => write!(f, "friend_request"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub kind: NotificationType,
    pub is_read: bool,
    pub created_at: Option<String>,
}

/// Append-only activity record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    pub created_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_roundtrip() {
        for kind in [
            NotificationType::System,
            NotificationType::Reward,
            NotificationType::FriendRequest,
            NotificationType::Custom,
        ] {
            assert_eq!(NotificationType::from_db_str(&kind.to_string()), kind);
        }
    }
}
