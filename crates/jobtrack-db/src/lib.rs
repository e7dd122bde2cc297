//! # JobTrack DB
//!
//! SQLite-backed record store. One `TrackerDb` implements every store trait
//! from `jobtrack_core::traits::store`:
//!
//! ```text
//! TrackerDb (Mutex<Connection>)
//!   ├── users            UserStore
//!   ├── applications     ApplicationStore
//!   ├── resumes          ResumeStore
//!   ├── templates        TemplateStore
//!   └── reminders        ReminderLog
//! ```

mod applications;
mod db;
mod reminders;
mod resumes;
mod templates;
mod users;

pub use db::TrackerDb;
