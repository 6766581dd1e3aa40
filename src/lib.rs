//! Study League - study time tracking with school leaderboards
//!
//! Students log study sessions, earn points and spend them in a shop; their
//! minutes feed school rankings (total, monthly, regional), school levels and
//! end-of-month medals.

pub mod app;
pub mod db;
pub mod models;
pub mod services;
pub mod utils;

// Re-exports
pub use app::StudyLeague;
pub use db::Database;
pub use models::*;
pub use utils::{AppError, AppResult};
