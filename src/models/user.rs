use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Dormant,
    Disabled,
}

impl AccountStatus {
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "dormant" => Self::Dormant,
            "disabled" => Self::Disabled,
            _ => Self::Active,
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Dormant => write!(f, "dormant"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

/// A student account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub email: String,
    /// Opaque credential material, never interpreted here
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub nickname: String,
    pub school_id: Option<i64>,
    pub points: i64,
    pub account_status: AccountStatus,
    pub created_at: Option<String>,
    pub last_login: Option<String>,
}

impl User {
    pub fn new(
        email: impl Into<String>,
        password_hash: impl Into<String>,
        nickname: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password_hash: password_hash.into(),
            nickname: nickname.into(),
            ..Default::default()
        }
    }

    pub fn with_school(mut self, school_id: i64) -> Self {
        self.school_id = Some(school_id);
        self
    }

    pub fn validate(&self) -> Result<(), UserValidationError> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(UserValidationError::InvalidEmail);
        }

        if self.nickname.trim().is_empty() {
            return Err(UserValidationError::EmptyNickname);
        }

        if self.password_hash.is_empty() {
            return Err(UserValidationError::MissingCredential);
        }

        if self.points < 0 {
            return Err(UserValidationError::NegativePoints);
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UserValidationError {
    #[error("email address is not valid")]
    InvalidEmail,
    #[error("nickname must not be empty")]
    EmptyNickname,
    #[error("credential must not be empty")]
    MissingCredential,
    #[error("point balance cannot be negative")]
    NegativePoints,
}

impl From<UserValidationError> for crate::utils::AppError {
    fn from(err: UserValidationError) -> Self {
        Self::validation(err.to_string())
    }
}
