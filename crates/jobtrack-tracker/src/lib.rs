//! # JobTrack Tracker
//!
//! Request-side services. Each one is stateless apart from its store handle
//! and clock, and re-reads current state on every call.
//!
//! - `ApplicationManager`: CRUD with ownership isolation, star toggling
//! - `StatisticsAggregator`: totals, per-status counts, starred, per-month
//! - `UserDirectory`: registration and login stamps
//! - `ResumeManager` / `TemplateManager`: per-user documents

pub mod lifecycle;
pub mod resumes;
pub mod stats;
pub mod templates;
pub mod users;

pub use lifecycle::ApplicationManager;
pub use resumes::ResumeManager;
pub use stats::StatisticsAggregator;
pub use templates::TemplateManager;
pub use users::UserDirectory;

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

