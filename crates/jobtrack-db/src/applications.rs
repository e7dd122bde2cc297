//! Application records.

use jobtrack_core::error::{JobTrackError, Result};
use jobtrack_core::traits::ApplicationStore;
use jobtrack_core::types::{
    Application, ApplicationFilter, ListCriterion, MonthlyCount, Page, PageRequest, Priority,
};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::collections::BTreeMap;

use crate::db::{TrackerDb, conversion_error, date, db_err, get_date, get_opt_ts, get_ts, opt_ts, ts};

/// Shared SELECT column list for application queries.
const APPLICATION_SELECT: &str = "SELECT id,user_id,company_name,position_name,apply_date,status,notes,salary_min,salary_max,work_location,apply_channel,referrer,interview_time,company_website,hr_contact,hr_phone,priority,starred,created_at,updated_at FROM applications";

fn row_to_application(row: &rusqlite::Row) -> rusqlite::Result<Application> {
    let priority: Priority = row
        .get::<_, String>(16)?
        .parse()
        .map_err(|e| conversion_error(16, e))?;
    Ok(Application {
        id: row.get(0)?,
        user_id: row.get(1)?,
        company_name: row.get(2)?,
        position_name: row.get(3)?,
        apply_date: get_date(row, 4)?,
        status: row.get(5)?,
        notes: row.get(6)?,
        salary_min: row.get(7)?,
        salary_max: row.get(8)?,
        work_location: row.get(9)?,
        apply_channel: row.get(10)?,
        referrer: row.get(11)?,
        interview_time: get_opt_ts(row, 12)?,
        company_website: row.get(13)?,
        hr_contact: row.get(14)?,
        hr_phone: row.get(15)?,
        priority,
        starred: row.get::<_, i32>(17)? != 0,
        created_at: get_ts(row, 18)?,
        updated_at: get_ts(row, 19)?,
    })
}

fn get_application(conn: &Connection, id: &str) -> Result<Option<Application>> {
    conn.query_row(
        &format!("{APPLICATION_SELECT} WHERE id=?1"),
        params![id],
        row_to_application,
    )
    .optional()
    .map_err(db_err("Get application"))
}

fn query_applications(
    conn: &Connection,
    sql: &str,
    args: &[&str],
) -> Result<Vec<Application>> {
    let mut stmt = conn.prepare(sql).map_err(db_err("Prepare"))?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), row_to_application)
        .map_err(db_err("Query"))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err("Read application"))
}

fn upsert_application(conn: &Connection, app: &Application) -> Result<Application> {
    conn.execute(
        "INSERT INTO applications (id,user_id,company_name,position_name,apply_date,status,notes,salary_min,salary_max,work_location,apply_channel,referrer,interview_time,company_website,hr_contact,hr_phone,priority,starred,created_at,updated_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20)
         ON CONFLICT(id) DO UPDATE SET
            company_name=excluded.company_name, position_name=excluded.position_name,
            apply_date=excluded.apply_date, status=excluded.status, notes=excluded.notes,
            salary_min=excluded.salary_min, salary_max=excluded.salary_max,
            work_location=excluded.work_location, apply_channel=excluded.apply_channel,
            referrer=excluded.referrer, interview_time=excluded.interview_time,
            company_website=excluded.company_website, hr_contact=excluded.hr_contact,
            hr_phone=excluded.hr_phone, priority=excluded.priority, starred=excluded.starred,
            updated_at=excluded.updated_at",
        params![
            app.id,
            app.user_id,
            app.company_name,
            app.position_name,
            date(&app.apply_date),
            app.status,
            app.notes,
            app.salary_min,
            app.salary_max,
            app.work_location,
            app.apply_channel,
            app.referrer,
            opt_ts(&app.interview_time),
            app.company_website,
            app.hr_contact,
            app.hr_phone,
            app.priority.as_str(),
            app.starred as i32,
            ts(&app.created_at),
            ts(&app.updated_at),
        ],
    )
    .map_err(db_err("Save application"))?;

    tracing::debug!("💾 Saved application {} ({})", app.id, app.company_name);
    get_application(conn, &app.id)?
        .ok_or_else(|| JobTrackError::Database(format!("Application {} vanished after save", app.id)))
}

impl ApplicationStore for TrackerDb {
    fn save(&self, app: &Application) -> Result<Application> {
        let conn = self.conn()?;
        upsert_application(&conn, app)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Application>> {
        let conn = self.conn()?;
        get_application(&conn, id)
    }

    fn find_owned(&self, id: &str, user_id: &str) -> Result<Option<Application>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("{APPLICATION_SELECT} WHERE id=?1 AND user_id=?2"),
            params![id, user_id],
            row_to_application,
        )
        .optional()
        .map_err(db_err("Get owned application"))
    }

    fn update_owned(
        &self,
        id: &str,
        user_id: &str,
        mutate: &mut dyn FnMut(&mut Application) -> Result<()>,
    ) -> Result<Option<Application>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err("Begin"))?;

        let current = tx
            .query_row(
                &format!("{APPLICATION_SELECT} WHERE id=?1 AND user_id=?2"),
                params![id, user_id],
                row_to_application,
            )
            .optional()
            .map_err(db_err("Get owned application"))?;
        let Some(mut app) = current else {
            return Ok(None);
        };

        // Dropping the transaction on error rolls it back.
        mutate(&mut app)?;
        let saved = upsert_application(&tx, &app)?;
        tx.commit().map_err(db_err("Commit"))?;
        Ok(Some(saved))
    }

    fn find_by_user(
        &self,
        user_id: &str,
        filter: &ApplicationFilter,
        page: &PageRequest,
    ) -> Result<Page<Application>> {
        let (clause, arg) = match filter.criterion() {
            ListCriterion::All => ("", None),
            ListCriterion::Status(status) => (" AND status=?2", Some(status.to_string())),
            // Literal substring, case folded on both sides.
            ListCriterion::Keyword(keyword) => (
                " AND (instr(unicode_lower(company_name), ?2) > 0 OR instr(unicode_lower(position_name), ?2) > 0)",
                Some(keyword.to_lowercase()),
            ),
        };
        let mut args: Vec<&str> = vec![user_id];
        if let Some(arg) = arg.as_deref() {
            args.push(arg);
        }

        let conn = self.conn()?;
        let total: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM applications WHERE user_id=?1{clause}"),
                params_from_iter(args.iter()),
                |row| row.get(0),
            )
            .map_err(db_err("Count applications"))?;

        let order = if page.newest_first { "DESC" } else { "ASC" };
        let sql = format!(
            "{APPLICATION_SELECT} WHERE user_id=?1{clause} ORDER BY created_at {order}, rowid {order} LIMIT {} OFFSET {}",
            page.page_size,
            page.offset()
        );
        let items = query_applications(&conn, &sql, &args)?;

        Ok(Page {
            items,
            total: total as u64,
            page: page.page,
            page_size: page.page_size,
        })
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM reminders WHERE application_id=?1", params![id])
            .map_err(db_err("Delete reminders"))?;
        let removed = conn
            .execute("DELETE FROM applications WHERE id=?1", params![id])
            .map_err(db_err("Delete application"))?;
        Ok(removed > 0)
    }

    fn count_by_user(&self, user_id: &str) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM applications WHERE user_id=?1",
                params![user_id],
                |row| row.get(0),
            )
            .map_err(db_err("Count applications"))?;
        Ok(count as u64)
    }

    fn group_count_by_status(&self, user_id: &str) -> Result<BTreeMap<String, u64>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT status, COUNT(*) FROM applications WHERE user_id=?1 GROUP BY status")
            .map_err(db_err("Prepare"))?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })
            .map_err(db_err("Query"))?;
        rows.collect::<rusqlite::Result<BTreeMap<_, _>>>()
            .map_err(db_err("Read status counts"))
    }

    fn find_starred_by_user(&self, user_id: &str) -> Result<Vec<Application>> {
        let conn = self.conn()?;
        query_applications(
            &conn,
            &format!("{APPLICATION_SELECT} WHERE user_id=?1 AND starred=1 ORDER BY created_at DESC, rowid DESC"),
            &[user_id],
        )
    }

    fn find_all_with_interview_time(&self) -> Result<Vec<Application>> {
        let conn = self.conn()?;
        query_applications(
            &conn,
            &format!("{APPLICATION_SELECT} WHERE interview_time IS NOT NULL ORDER BY interview_time"),
            &[],
        )
    }

    fn count_by_month(&self, user_id: &str) -> Result<Vec<MonthlyCount>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT substr(apply_date, 1, 7) AS month, COUNT(*) FROM applications
                 WHERE user_id=?1 GROUP BY month ORDER BY month DESC",
            )
            .map_err(db_err("Prepare"))?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok(MonthlyCount {
                    month: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                })
            })
            .map_err(db_err("Query"))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err("Read monthly counts"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{add_user, temp_db};
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use jobtrack_core::types::status;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
    }

    fn app(user_id: &str, company: &str, position: &str, status: &str, created: DateTime<Utc>) -> Application {
        Application {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            company_name: company.to_string(),
            position_name: position.to_string(),
            apply_date: created.date_naive(),
            status: status.to_string(),
            notes: None,
            salary_min: None,
            salary_max: None,
            work_location: None,
            apply_channel: None,
            referrer: None,
            interview_time: None,
            company_website: None,
            hr_contact: None,
            hr_phone: None,
            priority: Priority::Medium,
            starred: false,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_save_and_find() {
        let db = temp_db();
        let user = add_user(&db, "alice");
        let mut a = app(&user.id, "Acme", "Engineer", status::APPLIED, t0());
        a.interview_time = Some(t0() + Duration::days(3));
        a.priority = Priority::High;
        a.salary_min = Some(20);

        let saved = db.save(&a).unwrap();
        assert_eq!(saved, a);
        assert_eq!(db.find_by_id(&a.id).unwrap(), Some(a.clone()));
        assert!(db.find_by_id("missing").unwrap().is_none());
    }

    #[test]
    fn test_update_keeps_owner_and_created_at() {
        let db = temp_db();
        let alice = add_user(&db, "alice");
        let bob = add_user(&db, "bob");
        let a = db.save(&app(&alice.id, "Acme", "Engineer", status::APPLIED, t0())).unwrap();

        let mut changed = a.clone();
        changed.user_id = bob.id.clone();
        changed.created_at = t0() + Duration::days(9);
        changed.updated_at = t0() + Duration::hours(1);
        changed.status = status::OFFER.into();
        let saved = db.save(&changed).unwrap();

        assert_eq!(saved.user_id, alice.id);
        assert_eq!(saved.created_at, t0());
        assert_eq!(saved.updated_at, t0() + Duration::hours(1));
        assert_eq!(saved.status, "offer");
    }

    #[test]
    fn test_find_owned_isolation() {
        let db = temp_db();
        let alice = add_user(&db, "alice");
        let bob = add_user(&db, "bob");
        let a = db.save(&app(&alice.id, "Acme", "Engineer", status::APPLIED, t0())).unwrap();

        assert!(db.find_owned(&a.id, &alice.id).unwrap().is_some());
        assert!(db.find_owned(&a.id, &bob.id).unwrap().is_none());
        assert!(db.find_owned("missing", &alice.id).unwrap().is_none());
    }

    #[test]
    fn test_list_filters_and_pagination() {
        let db = temp_db();
        let alice = add_user(&db, "alice");
        let bob = add_user(&db, "bob");
        db.save(&app(&alice.id, "Acme Corp", "Engineer", status::APPLIED, t0())).unwrap();
        db.save(&app(&alice.id, "Globex", "Data ENGINEER", status::OFFER, t0() + Duration::hours(1))).unwrap();
        db.save(&app(&alice.id, "Initech", "Designer", status::APPLIED, t0() + Duration::hours(2))).unwrap();
        db.save(&app(&bob.id, "Acme Corp", "Engineer", status::APPLIED, t0())).unwrap();

        let all = db.find_by_user(&alice.id, &ApplicationFilter::default(), &PageRequest::new(0, 10)).unwrap();
        assert_eq!(all.total, 3);
        let companies: Vec<_> = all.items.iter().map(|a| a.company_name.as_str()).collect();
        assert_eq!(companies, ["Initech", "Globex", "Acme Corp"]);

        let applied = db.find_by_user(&alice.id, &ApplicationFilter::by_status("applied"), &PageRequest::new(0, 10)).unwrap();
        assert_eq!(applied.total, 2);

        // Keyword hits company or position, case-insensitively.
        let engineers = db.find_by_user(&alice.id, &ApplicationFilter::by_keyword("engineer"), &PageRequest::new(0, 10)).unwrap();
        assert_eq!(engineers.total, 2);
        let acme = db.find_by_user(&alice.id, &ApplicationFilter::by_keyword("ACME"), &PageRequest::new(0, 10)).unwrap();
        assert_eq!(acme.total, 1);

        // Keyword wins over status.
        let both = ApplicationFilter { status: Some("offer".into()), keyword: Some("acme".into()) };
        let hits = db.find_by_user(&alice.id, &both, &PageRequest::new(0, 10)).unwrap();
        assert_eq!(hits.items[0].company_name, "Acme Corp");

        let second = db.find_by_user(&alice.id, &ApplicationFilter::default(), &PageRequest::new(1, 2)).unwrap();
        assert_eq!(second.total, 3);
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].company_name, "Acme Corp");

        let mut oldest_first = PageRequest::new(0, 1);
        oldest_first.newest_first = false;
        let first = db.find_by_user(&alice.id, &ApplicationFilter::default(), &oldest_first).unwrap();
        assert_eq!(first.items[0].company_name, "Acme Corp");
    }

    #[test]
    fn test_keyword_wildcards_are_literal() {
        let db = temp_db();
        let alice = add_user(&db, "alice");
        db.save(&app(&alice.id, "100% Remote", "Engineer", status::APPLIED, t0())).unwrap();
        db.save(&app(&alice.id, "Acme", "Engineer", status::APPLIED, t0())).unwrap();

        let hits = db.find_by_user(&alice.id, &ApplicationFilter::by_keyword("%"), &PageRequest::new(0, 10)).unwrap();
        assert_eq!(hits.total, 1);
        let none = db.find_by_user(&alice.id, &ApplicationFilter::by_keyword("_cme"), &PageRequest::new(0, 10)).unwrap();
        assert_eq!(none.total, 0);
    }

    #[test]
    fn test_keyword_folds_non_ascii_case() {
        let db = temp_db();
        let alice = add_user(&db, "alice");
        db.save(&app(&alice.id, "Société Générale", "Analyste", status::APPLIED, t0())).unwrap();
        db.save(&app(&alice.id, "Acme", "INGÉNIEUR Logiciel", status::APPLIED, t0())).unwrap();

        let page = PageRequest::new(0, 10);
        let societe = db.find_by_user(&alice.id, &ApplicationFilter::by_keyword("SOCIÉTÉ"), &page).unwrap();
        assert_eq!(societe.total, 1);
        assert_eq!(societe.items[0].company_name, "Société Générale");

        let ingenieur = db.find_by_user(&alice.id, &ApplicationFilter::by_keyword("ingénieur"), &page).unwrap();
        assert_eq!(ingenieur.total, 1);
        assert_eq!(ingenieur.items[0].company_name, "Acme");
    }

    #[test]
    fn test_corrupt_priority_is_an_error() {
        let db = temp_db();
        let alice = add_user(&db, "alice");
        let a = db.save(&app(&alice.id, "Acme", "Engineer", status::APPLIED, t0())).unwrap();
        db.conn()
            .unwrap()
            .execute("UPDATE applications SET priority='URGENT' WHERE id=?1", params![a.id])
            .unwrap();

        let err = db.find_by_id(&a.id).unwrap_err();
        assert!(matches!(err, JobTrackError::Database(_)));
    }

    #[test]
    fn test_update_owned() {
        let db = temp_db();
        let alice = add_user(&db, "alice");
        let bob = add_user(&db, "bob");
        let a = db.save(&app(&alice.id, "Acme", "Engineer", status::APPLIED, t0())).unwrap();

        let updated = db
            .update_owned(&a.id, &alice.id, &mut |app| {
                app.status = status::OFFER.into();
                app.updated_at = t0() + Duration::hours(1);
                Ok(())
            })
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, "offer");
        assert_eq!(db.find_by_id(&a.id).unwrap(), Some(updated.clone()));

        let mut called = false;
        let foreign = db
            .update_owned(&a.id, &bob.id, &mut |_| {
                called = true;
                Ok(())
            })
            .unwrap();
        assert!(foreign.is_none());
        assert!(!called);

        // A failing mutation writes nothing.
        let err = db
            .update_owned(&a.id, &alice.id, &mut |app| {
                app.status = status::REJECTED.into();
                Err(JobTrackError::validation("status", "rejected on purpose"))
            })
            .unwrap_err();
        assert!(matches!(err, JobTrackError::Validation { .. }));
        assert_eq!(db.find_by_id(&a.id).unwrap(), Some(updated));
    }

    #[test]
    fn test_update_owned_serializes_concurrent_writers() {
        let db = temp_db();
        let alice = add_user(&db, "alice");
        let a = db.save(&app(&alice.id, "Acme", "Engineer", status::APPLIED, t0())).unwrap();

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..25 {
                        db.update_owned(&a.id, &alice.id, &mut |app| {
                            app.salary_min = Some(app.salary_min.unwrap_or(0) + 1);
                            Ok(())
                        })
                        .unwrap();
                    }
                });
            }
        });

        let stored = db.find_by_id(&a.id).unwrap().unwrap();
        assert_eq!(stored.salary_min, Some(200));
    }

    #[test]
    fn test_counts_starred_and_months() {
        let db = temp_db();
        let alice = add_user(&db, "alice");
        let mut starred = app(&alice.id, "Acme", "Engineer", status::APPLIED, t0());
        starred.starred = true;
        db.save(&starred).unwrap();
        db.save(&app(&alice.id, "Globex", "Engineer", status::APPLIED, t0())).unwrap();
        let mut july = app(&alice.id, "Initech", "Engineer", status::OFFER, t0());
        july.apply_date = NaiveDate::from_ymd_opt(2026, 7, 3).unwrap();
        db.save(&july).unwrap();

        assert_eq!(db.count_by_user(&alice.id).unwrap(), 3);
        let by_status = db.group_count_by_status(&alice.id).unwrap();
        assert_eq!(by_status.len(), 2);
        assert_eq!(by_status["applied"], 2);
        assert_eq!(by_status["offer"], 1);

        let stars = db.find_starred_by_user(&alice.id).unwrap();
        assert_eq!(stars.len(), 1);
        assert_eq!(stars[0].id, starred.id);

        let months = db.count_by_month(&alice.id).unwrap();
        assert_eq!(months, vec![
            MonthlyCount { month: "2026-07".into(), count: 1 },
            MonthlyCount { month: "2026-06".into(), count: 2 },
        ]);
    }

    #[test]
    fn test_interview_scan_spans_users() {
        let db = temp_db();
        let alice = add_user(&db, "alice");
        let bob = add_user(&db, "bob");
        let mut a = app(&alice.id, "Acme", "Engineer", status::INTERVIEW_1, t0());
        a.interview_time = Some(t0() + Duration::hours(5));
        let mut b = app(&bob.id, "Globex", "Engineer", status::INTERVIEW_2, t0());
        b.interview_time = Some(t0() + Duration::hours(2));
        db.save(&a).unwrap();
        db.save(&b).unwrap();
        db.save(&app(&alice.id, "Initech", "Engineer", status::APPLIED, t0())).unwrap();

        let scheduled = db.find_all_with_interview_time().unwrap();
        let ids: Vec<_> = scheduled.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, [b.id.as_str(), a.id.as_str()]);
    }

    #[test]
    fn test_delete() {
        let db = temp_db();
        let alice = add_user(&db, "alice");
        let a = db.save(&app(&alice.id, "Acme", "Engineer", status::APPLIED, t0())).unwrap();
        assert!(db.delete(&a.id).unwrap());
        assert!(!db.delete(&a.id).unwrap());
        assert_eq!(db.count_by_user(&alice.id).unwrap(), 0);
    }
}
