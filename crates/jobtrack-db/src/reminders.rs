//! Delivered-reminder log.

use chrono::{DateTime, Utc};
use jobtrack_core::error::Result;
use jobtrack_core::traits::ReminderLog;
use rusqlite::params;

use crate::db::{TrackerDb, db_err, ts};

impl ReminderLog for TrackerDb {
    fn reminder_sent(&self, application_id: &str, interview_time: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM reminders WHERE application_id=?1 AND interview_time=?2",
                params![application_id, ts(&interview_time)],
                |row| row.get(0),
            )
            .map_err(db_err("Check reminder"))?;
        Ok(count > 0)
    }

    fn record_reminder(
        &self,
        application_id: &str,
        interview_time: DateTime<Utc>,
        sent_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO reminders (application_id, interview_time, sent_at) VALUES (?1,?2,?3)",
            params![application_id, ts(&interview_time), ts(&sent_at)],
        )
        .map_err(db_err("Record reminder"))?;
        Ok(())
    }
}
