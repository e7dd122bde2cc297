//! # JobTrack Scheduler
//!
//! Interview reminders. A pass looks `lead_time` ahead of the clock, picks
//! every interview strictly inside that window and hands each one to a
//! [`Dispatcher`](jobtrack_core::Dispatcher). Passes are driven by a
//! [`Ticker`]: `tokio::time::interval` in production, a channel in tests.
//!
//! Delivery targets live in [`dispatch`]: log, SMTP email, HTTP webhook and
//! a fan-out over any of them.

pub mod dispatch;
pub mod engine;
pub mod notify;
pub mod ticker;

pub use dispatch::{
    EmailDispatcher, FanoutDispatcher, LogDispatcher, WebhookDispatcher, dispatcher_from_config,
};
pub use engine::{ReminderReport, ReminderScheduler, SchedulerHandle};
pub use notify::ReminderMessage;
pub use ticker::{IntervalTicker, ManualTicker, TickHandle, Ticker};
