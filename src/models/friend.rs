use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendStatus {
    #[default]
    Requested,
    Accepted,
    Blocked,
}

impl FriendStatus {
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "accepted" => Self::Accepted,
            "blocked" => Self::Blocked,
            _ => Self::Requested,
        }
    }
}

impl fmt::Display for FriendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => write!(f, "requested"),
            Self::Accepted => write!(f, "accepted"),
            Self::Blocked => write!(f, "blocked"),
        }
    }
}

/// Directed friendship row, `user_id` is the side that acted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Friendship {
    pub id: i64,
    pub user_id: i64,
    pub friend_id: i64,
    pub status: FriendStatus,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Friendship {
    /// The other party as seen from `user_id`
    pub fn other(&self, user_id: i64) -> i64 {
        if self.user_id == user_id {
            self.friend_id
        } else {
            self.user_id
        }
    }
}
