//! Resume metadata and the one-default-per-user rule.

use chrono::{DateTime, Utc};
use jobtrack_core::error::{JobTrackError, Result};
use jobtrack_core::traits::ResumeStore;
use jobtrack_core::types::Resume;
use rusqlite::{OptionalExtension, params};

use crate::db::{TrackerDb, db_err, get_ts, ts};

const RESUME_SELECT: &str = "SELECT id,user_id,name,description,file_path,file_type,file_size,is_default,created_at,updated_at FROM resumes";

fn row_to_resume(row: &rusqlite::Row) -> rusqlite::Result<Resume> {
    Ok(Resume {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        file_path: row.get(4)?,
        file_type: row.get(5)?,
        file_size: row.get(6)?,
        is_default: row.get::<_, i32>(7)? != 0,
        created_at: get_ts(row, 8)?,
        updated_at: get_ts(row, 9)?,
    })
}

impl ResumeStore for TrackerDb {
    fn list_resumes(&self, user_id: &str) -> Result<Vec<Resume>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("{RESUME_SELECT} WHERE user_id=?1 ORDER BY created_at DESC, rowid DESC"))
            .map_err(db_err("Prepare"))?;
        let rows = stmt
            .query_map(params![user_id], row_to_resume)
            .map_err(db_err("Query"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("Read resume"))
    }

    fn find_owned_resume(&self, id: &str, user_id: &str) -> Result<Option<Resume>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("{RESUME_SELECT} WHERE id=?1 AND user_id=?2"),
            params![id, user_id],
            row_to_resume,
        )
        .optional()
        .map_err(db_err("Get resume"))
    }

    /// The user's first resume becomes the default; `is_default` on the input is ignored.
    fn insert_resume(&self, resume: &Resume) -> Result<Resume> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO resumes (id,user_id,name,description,file_path,file_type,file_size,is_default,created_at,updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,
                     (SELECT COUNT(*) = 0 FROM resumes WHERE user_id=?2),
                     ?8,?9)",
            params![
                resume.id,
                resume.user_id,
                resume.name,
                resume.description,
                resume.file_path,
                resume.file_type,
                resume.file_size,
                ts(&resume.created_at),
                ts(&resume.updated_at),
            ],
        )
        .map_err(db_err("Insert resume"))?;

        conn.query_row(&format!("{RESUME_SELECT} WHERE id=?1"), params![resume.id], row_to_resume)
            .map_err(db_err("Get resume"))
    }

    fn delete_resume(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn
            .execute("DELETE FROM resumes WHERE id=?1", params![id])
            .map_err(db_err("Delete resume"))?;
        Ok(removed > 0)
    }

    fn set_default_resume(&self, id: &str, user_id: &str, at: DateTime<Utc>) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err("Begin"))?;

        let owned: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM resumes WHERE id=?1 AND user_id=?2",
                params![id, user_id],
                |row| row.get(0),
            )
            .map_err(db_err("Check resume owner"))?;
        if owned == 0 {
            return Ok(false);
        }

        // Rewrite every flag of this user's set; only rows that change get a new stamp.
        tx.execute(
            "UPDATE resumes SET is_default = (id = ?1), updated_at = ?3
             WHERE user_id = ?2 AND is_default != (id = ?1)",
            params![id, user_id, ts(&at)],
        )
        .map_err(db_err("Set default resume"))?;

        let defaults: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM resumes WHERE user_id=?1 AND is_default=1",
                params![user_id],
                |row| row.get(0),
            )
            .map_err(db_err("Count defaults"))?;
        if defaults != 1 {
            return Err(JobTrackError::Database(format!(
                "Default resume invariant broken for user {user_id}: {defaults} defaults"
            )));
        }

        tx.commit().map_err(db_err("Commit"))?;
        Ok(true)
    }
}
