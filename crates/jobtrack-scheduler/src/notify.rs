//! Reminder message rendering, shared by every delivery target.

use jobtrack_core::types::{Application, User};
use serde::{Deserialize, Serialize};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Rendered reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderMessage {
    pub subject: String,
    pub body: String,
}

impl ReminderMessage {
    pub fn render(user: &User, application: &Application) -> Self {
        let when = application
            .interview_time
            .map(|at| at.format(TIME_FORMAT).to_string())
            .unwrap_or_else(|| "(not scheduled)".into());
        let notes = application
            .notes
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("none");

        let subject = format!("[JobTrack] Interview reminder - {}", application.company_name);
        let body = format!(
            "Dear {},\n\n\
             You have an interview coming up. Time to prepare!\n\n\
             📌 Company: {}\n\
             💼 Position: {}\n\
             🕐 Time: {}\n\
             📊 Status: {}\n\
             📝 Notes: {}\n\n\
             Good luck!\n\n\
             JobTrack",
            user.greeting_name(),
            application.company_name,
            application.position_name,
            when,
            application.status,
            notes,
        );
        Self { subject, body }
    }
}
