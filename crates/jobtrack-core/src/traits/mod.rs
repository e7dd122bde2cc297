//! Seams between the core and its collaborators.

pub mod clock;
pub mod dispatcher;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatcher::Dispatcher;
pub use store::{ApplicationStore, ReminderLog, ReminderSource, ResumeStore, TemplateStore, UserStore};
