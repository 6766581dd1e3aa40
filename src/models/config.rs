use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::path::{get_config_path, get_database_path};
use crate::utils::{AppError, AppResult};

/// When school rankings are recomputed after a study submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecomputeMode {
    /// In the submission's own transaction
    #[default]
    Immediate,
    /// Marked dirty and picked up by the background worker
    Deferred,
}

/// What happens to students when their school is removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchoolDeletionPolicy {
    /// Students keep their accounts and history, school association is cleared
    #[default]
    Detach,
    /// Students are deleted together with their study records
    Cascade,
}

impl fmt::Display for SchoolDeletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detach => write!(f, "detach"),
            Self::Cascade => write!(f, "cascade"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub recompute_mode: RecomputeMode,
    /// Debounce interval of the deferred recompute worker
    pub debounce_ms: u64,
    pub recompute_max_attempts: u32,
    pub school_deletion: SchoolDeletionPolicy,
    /// Highest rank that still earns a medal when a period closes
    pub medal_cutoff: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: get_database_path(),
            recompute_mode: RecomputeMode::default(),
            debounce_ms: 2000,
            recompute_max_attempts: 3,
            school_deletion: SchoolDeletionPolicy::default(),
            medal_cutoff: 3,
        }
    }
}

impl AppConfig {
    /// Load from the default config location, falling back to defaults if absent
    pub fn load() -> AppResult<Self> {
        Self::load_from(&get_config_path())
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: Self = toml::from_str(&content)
            .map_err(|e| AppError::config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| AppError::config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.recompute_max_attempts == 0 {
            return Err(AppError::config("recompute_max_attempts must be at least 1"));
        }
        if self.medal_cutoff < 1 {
            return Err(AppError::config("medal_cutoff must be at least 1"));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
