//! League services
//!
//! Business rules that span several repositories and must commit together.

pub mod competition;
pub mod purchase;
pub mod ranking;
pub mod schools;
pub mod study;

pub use competition::{CompetitionService, PeriodClose};
pub use purchase::{Purchase, PurchaseService};
pub use ranking::{compute_assignments, LevelUp, PassReport, RecomputeWorker, Recomputer};
pub use schools::{SchoolAdminService, SchoolRemoval};
pub use study::{StudyService, StudySubmission};
