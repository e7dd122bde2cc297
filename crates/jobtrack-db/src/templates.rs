//! Application templates.

use jobtrack_core::error::Result;
use jobtrack_core::traits::TemplateStore;
use jobtrack_core::types::Template;
use rusqlite::{OptionalExtension, params};

use crate::db::{TrackerDb, db_err, get_ts, ts};

const TEMPLATE_SELECT: &str = "SELECT id,user_id,name,company_name,position_name,work_location,apply_channel,salary_min,salary_max,company_website,notes,created_at FROM templates";

fn row_to_template(row: &rusqlite::Row) -> rusqlite::Result<Template> {
    Ok(Template {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        company_name: row.get(3)?,
        position_name: row.get(4)?,
        work_location: row.get(5)?,
        apply_channel: row.get(6)?,
        salary_min: row.get(7)?,
        salary_max: row.get(8)?,
        company_website: row.get(9)?,
        notes: row.get(10)?,
        created_at: get_ts(row, 11)?,
    })
}

impl TemplateStore for TrackerDb {
    fn list_templates(&self, user_id: &str) -> Result<Vec<Template>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("{TEMPLATE_SELECT} WHERE user_id=?1 ORDER BY created_at DESC, rowid DESC"))
            .map_err(db_err("Prepare"))?;
        let rows = stmt
            .query_map(params![user_id], row_to_template)
            .map_err(db_err("Query"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("Read template"))
    }

    fn find_owned_template(&self, id: &str, user_id: &str) -> Result<Option<Template>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("{TEMPLATE_SELECT} WHERE id=?1 AND user_id=?2"),
            params![id, user_id],
            row_to_template,
        )
        .optional()
        .map_err(db_err("Get template"))
    }

    fn insert_template(&self, t: &Template) -> Result<Template> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO templates (id,user_id,name,company_name,position_name,work_location,apply_channel,salary_min,salary_max,company_website,notes,created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
            params![
                t.id,
                t.user_id,
                t.name,
                t.company_name,
                t.position_name,
                t.work_location,
                t.apply_channel,
                t.salary_min,
                t.salary_max,
                t.company_website,
                t.notes,
                ts(&t.created_at),
            ],
        )
        .map_err(db_err("Insert template"))?;

        conn.query_row(&format!("{TEMPLATE_SELECT} WHERE id=?1"), params![t.id], row_to_template)
            .map_err(db_err("Get template"))
    }

    fn delete_template(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn
            .execute("DELETE FROM templates WHERE id=?1", params![id])
            .map_err(db_err("Delete template"))?;
        Ok(removed > 0)
    }
}
