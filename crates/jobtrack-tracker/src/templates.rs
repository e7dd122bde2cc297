//! Application templates.

use jobtrack_core::error::{JobTrackError, Result};
use jobtrack_core::traits::{Clock, TemplateStore};
use jobtrack_core::types::{NewTemplate, Template};
use std::sync::Arc;

pub struct TemplateManager {
    store: Arc<dyn TemplateStore>,
    clock: Arc<dyn Clock>,
}

impl TemplateManager {
    pub fn new(store: Arc<dyn TemplateStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn list(&self, user_id: &str) -> Result<Vec<Template>> {
        self.store.list_templates(user_id)
    }

    pub fn create(&self, user_id: &str, new: NewTemplate) -> Result<Template> {
        if new.name.trim().is_empty() {
            return Err(JobTrackError::validation("name", "must not be empty"));
        }
        let template = Template {
            id: crate::new_id(),
            user_id: user_id.to_string(),
            name: new.name,
            company_name: new.company_name,
            position_name: new.position_name,
            work_location: new.work_location,
            apply_channel: new.apply_channel,
            salary_min: new.salary_min,
            salary_max: new.salary_max,
            company_website: new.company_website,
            notes: new.notes,
            created_at: self.clock.now(),
        };
        let saved = self.store.insert_template(&template)?;
        tracing::info!("📋 Template created: {} ({})", saved.name, saved.id);
        Ok(saved)
    }

    pub fn get(&self, id: &str, user_id: &str) -> Result<Template> {
        self.store
            .find_owned_template(id, user_id)?
            .ok_or_else(|| JobTrackError::NotFound("Template".into()))
    }

    pub fn delete(&self, id: &str, user_id: &str) -> Result<()> {
        let template = self.get(id, user_id)?;
        self.store.delete_template(&template.id)?;
        Ok(())
    }
}
