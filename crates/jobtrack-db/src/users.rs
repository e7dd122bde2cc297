//! Users.

use chrono::{DateTime, Utc};
use jobtrack_core::error::{JobTrackError, Result};
use jobtrack_core::traits::UserStore;
use jobtrack_core::types::User;
use rusqlite::{OptionalExtension, params};

use crate::db::{TrackerDb, db_err, get_opt_ts, get_ts, opt_ts, ts};

const USER_SELECT: &str = "SELECT id,username,email,display_name,phone,target_position,created_at,last_login,active FROM users";

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        display_name: row.get(3)?,
        phone: row.get(4)?,
        target_position: row.get(5)?,
        created_at: get_ts(row, 6)?,
        last_login: get_opt_ts(row, 7)?,
        active: row.get::<_, i32>(8)? != 0,
    })
}

/// Map a UNIQUE violation to the column that collided.
fn insert_error(user: &User, e: rusqlite::Error) -> JobTrackError {
    if let rusqlite::Error::SqliteFailure(err, msg) = &e
        && err.code == rusqlite::ErrorCode::ConstraintViolation
    {
        let msg = msg.as_deref().unwrap_or_default();
        return if msg.contains("users.email") {
            JobTrackError::Conflict(format!("email '{}' is already registered", user.email))
        } else {
            JobTrackError::Conflict(format!("username '{}' is already taken", user.username))
        };
    }
    JobTrackError::Database(format!("Create user: {e}"))
}

impl UserStore for TrackerDb {
    fn create_user(&self, user: &User) -> Result<User> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (id,username,email,display_name,phone,target_position,created_at,last_login,active)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            params![
                user.id,
                user.username,
                user.email,
                user.display_name,
                user.phone,
                user.target_position,
                ts(&user.created_at),
                opt_ts(&user.last_login),
                user.active as i32,
            ],
        )
        .map_err(|e| insert_error(user, e))?;

        conn.query_row(&format!("{USER_SELECT} WHERE id=?1"), params![user.id], row_to_user)
            .map_err(db_err("Get user"))
    }

    fn find_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        conn.query_row(&format!("{USER_SELECT} WHERE id=?1"), params![id], row_to_user)
            .optional()
            .map_err(db_err("Get user"))
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("{USER_SELECT} WHERE username=?1"),
            params![username],
            row_to_user,
        )
        .optional()
        .map_err(db_err("Get user by username"))
    }

    fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn()?;
        let updated = conn
            .execute("UPDATE users SET last_login=?1 WHERE id=?2", params![ts(&at), id])
            .map_err(db_err("Update last login"))?;
        Ok(updated > 0)
    }
}
