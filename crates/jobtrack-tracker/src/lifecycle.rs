//! Application lifecycle, always scoped to the owning user.

use chrono::{DateTime, NaiveDate, Utc};
use jobtrack_core::error::{JobTrackError, Result};
use jobtrack_core::traits::{ApplicationStore, Clock, UserStore};
use jobtrack_core::types::{
    Application, ApplicationFields, ApplicationFilter, MAX_PAGE_SIZE, Page, PageRequest, Priority,
};
use std::sync::Arc;

/// Application lifecycle manager.
pub struct ApplicationManager {
    applications: Arc<dyn ApplicationStore>,
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
}

impl ApplicationManager {
    pub fn new<S>(store: Arc<S>, clock: Arc<dyn Clock>) -> Self
    where
        S: ApplicationStore + UserStore + 'static,
    {
        Self {
            applications: store.clone(),
            users: store,
            clock,
        }
    }

    /// One page of the user's applications. A keyword beats a status filter.
    pub fn list(
        &self,
        user_id: &str,
        filter: &ApplicationFilter,
        page: &PageRequest,
    ) -> Result<Page<Application>> {
        if page.page_size == 0 || page.page_size > MAX_PAGE_SIZE {
            return Err(JobTrackError::validation(
                "page_size",
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }
        self.applications.find_by_user(user_id, filter, page)
    }

    pub fn get(&self, id: &str, user_id: &str) -> Result<Application> {
        self.owned(id, user_id)
    }

    pub fn create(&self, user_id: &str, fields: ApplicationFields) -> Result<Application> {
        let apply_date = validate(&fields)?;
        if self.users.find_user(user_id)?.is_none() {
            return Err(JobTrackError::NotFound("User".into()));
        }

        let now = self.clock.now();
        let mut app = Application {
            id: crate::new_id(),
            user_id: user_id.to_string(),
            company_name: String::new(),
            position_name: String::new(),
            apply_date,
            status: String::new(),
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
            priority: Priority::default(),
            starred: false,
            created_at: now,
            updated_at: now,
        };
        app.apply_fields(fields, apply_date);

        let saved = self.applications.save(&app)?;
        tracing::info!(
            "📝 Application created: {} / {} ({})",
            saved.company_name,
            saved.position_name,
            saved.id
        );
        Ok(saved)
    }

    /// Full replace of every mutable field.
    pub fn update(&self, id: &str, user_id: &str, fields: ApplicationFields) -> Result<Application> {
        let apply_date = validate(&fields)?;
        let mut fields = Some(fields);
        let saved = self.modify(id, user_id, |app| {
            if let Some(fields) = fields.take() {
                app.apply_fields(fields, apply_date);
            }
        })?;
        tracing::info!("✏️ Application updated: {} [{}] ({})", saved.company_name, saved.status, saved.id);
        Ok(saved)
    }

    pub fn delete(&self, id: &str, user_id: &str) -> Result<()> {
        let app = self.owned(id, user_id)?;
        if !self.applications.delete(&app.id)? {
            return Err(JobTrackError::NotFound("Application".into()));
        }
        tracing::info!("🗑️ Application deleted: {} ({})", app.company_name, app.id);
        Ok(())
    }

    pub fn toggle_star(&self, id: &str, user_id: &str) -> Result<Application> {
        self.modify(id, user_id, |app| app.starred = !app.starred)
    }

    /// Atomic read-modify-write of an owned record. The stamp is taken while
    /// the record is held, so stamps follow the order writes land in.
    fn modify(
        &self,
        id: &str,
        user_id: &str,
        mut change: impl FnMut(&mut Application),
    ) -> Result<Application> {
        self.applications
            .update_owned(id, user_id, &mut |app| {
                change(app);
                app.updated_at = self.stamp_after(app.updated_at);
                Ok(())
            })?
            .ok_or_else(|| JobTrackError::NotFound("Application".into()))
    }

    fn owned(&self, id: &str, user_id: &str) -> Result<Application> {
        self.applications
            .find_owned(id, user_id)?
            .ok_or_else(|| JobTrackError::NotFound("Application".into()))
    }

    /// Never earlier than the previous stamp, even if the clock steps back.
    fn stamp_after(&self, previous: DateTime<Utc>) -> DateTime<Utc> {
        self.clock.now().max(previous)
    }
}

/// Checks shared by create and update. Returns the apply date.
fn validate(fields: &ApplicationFields) -> Result<NaiveDate> {
    if fields.company_name.trim().is_empty() {
        return Err(JobTrackError::validation("company_name", "must not be empty"));
    }
    if fields.position_name.trim().is_empty() {
        return Err(JobTrackError::validation("position_name", "must not be empty"));
    }
    let apply_date = fields
        .apply_date
        .ok_or_else(|| JobTrackError::validation("apply_date", "is required"))?;
    if let (Some(min), Some(max)) = (fields.salary_min, fields.salary_max)
        && min > max
    {
        return Err(JobTrackError::validation(
            "salary_min",
            format!("{min} is greater than salary_max {max}"),
        ));
    }
    Ok(apply_date)
}
