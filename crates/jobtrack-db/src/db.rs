//! Connection handling, schema and column codecs.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use jobtrack_core::error::{JobTrackError, Result};
use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// JobTrack database, the single shared record store.
///
/// Every call takes the connection lock once, so each operation is atomic
/// with respect to the others.
pub struct TrackerDb {
    conn: Mutex<Connection>,
}

impl TrackerDb {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| JobTrackError::Database(format!("DB open error: {e}")))?;
        Self::init(conn)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| JobTrackError::Database(format!("DB open error: {e}")))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(|e| JobTrackError::Database(format!("DB pragma error: {e}")))?;

        // SQLite's own lower() and LIKE only fold ASCII.
        conn.create_scalar_function(
            "unicode_lower",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|s| s.to_lowercase())),
        )
        .map_err(|e| JobTrackError::Database(format!("DB function error: {e}")))?;

        let db = Self { conn: Mutex::new(conn) };
        db.migrate()?;
        Ok(db)
    }

    /// Run schema migrations.
    fn migrate(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                email TEXT UNIQUE NOT NULL,
                display_name TEXT,
                phone TEXT,
                target_position TEXT,
                created_at TEXT NOT NULL,
                last_login TEXT,
                active INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS applications (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id),
                company_name TEXT NOT NULL,
                position_name TEXT NOT NULL,
                apply_date TEXT NOT NULL,            -- YYYY-MM-DD
                status TEXT NOT NULL DEFAULT 'applied',
                notes TEXT,
                salary_min INTEGER,
                salary_max INTEGER,
                work_location TEXT,
                apply_channel TEXT,
                referrer TEXT,
                interview_time TEXT,                 -- RFC 3339, UTC
                company_website TEXT,
                hr_contact TEXT,
                hr_phone TEXT,
                priority TEXT NOT NULL DEFAULT 'MEDIUM',
                starred INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_applications_user
                ON applications(user_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_applications_interview
                ON applications(interview_time) WHERE interview_time IS NOT NULL;

            CREATE TABLE IF NOT EXISTS resumes (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id),
                name TEXT NOT NULL,
                description TEXT,
                file_path TEXT NOT NULL,
                file_type TEXT,
                file_size INTEGER,
                is_default INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS templates (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id),
                name TEXT NOT NULL,
                company_name TEXT,
                position_name TEXT,
                work_location TEXT,
                apply_channel TEXT,
                salary_min INTEGER,
                salary_max INTEGER,
                company_website TEXT,
                notes TEXT,
                created_at TEXT NOT NULL
            );

            -- Delivered interview reminders
            CREATE TABLE IF NOT EXISTS reminders (
                application_id TEXT NOT NULL,
                interview_time TEXT NOT NULL,
                sent_at TEXT NOT NULL,
                PRIMARY KEY (application_id, interview_time)
            );
        ",
        )
        .map_err(|e| JobTrackError::Database(format!("Migration error: {e}")))?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| JobTrackError::Database(format!("Lock: {e}")))
    }
}

/// Fixed-width UTC timestamps so text order matches time order.
pub(crate) fn ts(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn opt_ts(at: &Option<DateTime<Utc>>) -> Option<String> {
    at.as_ref().map(ts)
}

pub(crate) fn date(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub(crate) fn conversion_error(idx: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

pub(crate) fn get_ts(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

pub(crate) fn get_opt_ts(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

pub(crate) fn get_date(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| conversion_error(idx, e))
}

pub(crate) fn db_err(context: &str) -> impl Fn(rusqlite::Error) -> JobTrackError + '_ {
    move |e| JobTrackError::Database(format!("{context}: {e}"))
}
