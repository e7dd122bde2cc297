//! # JobTrack Core
//!
//! Shared building blocks for every JobTrack crate:
//! - `types`: applications, users, resumes, templates, paging and statistics
//! - `error`: the `JobTrackError` taxonomy
//! - `config`: `~/.jobtrack/config.toml`
//! - `traits`: record store, dispatcher and clock seams

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::JobTrackConfig;
pub use error::{JobTrackError, Result};
pub use traits::{Clock, Dispatcher, ManualClock, SystemClock};
pub use types::{Application, ApplicationFields, Priority, User};
