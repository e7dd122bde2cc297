//! Resume metadata. Exactly one resume per user is the default once any exist.

use jobtrack_core::error::{JobTrackError, Result};
use jobtrack_core::traits::{Clock, ResumeStore};
use jobtrack_core::types::{NewResume, Resume};
use std::sync::Arc;

pub struct ResumeManager {
    store: Arc<dyn ResumeStore>,
    clock: Arc<dyn Clock>,
}

impl ResumeManager {
    pub fn new(store: Arc<dyn ResumeStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Newest first.
    pub fn list(&self, user_id: &str) -> Result<Vec<Resume>> {
        self.store.list_resumes(user_id)
    }

    /// The user's first resume becomes the default.
    pub fn add(&self, user_id: &str, new: NewResume) -> Result<Resume> {
        if new.name.trim().is_empty() {
            return Err(JobTrackError::validation("name", "must not be empty"));
        }
        if new.file_path.trim().is_empty() {
            return Err(JobTrackError::validation("file_path", "must not be empty"));
        }
        if let Some(size) = new.file_size
            && size < 0
        {
            return Err(JobTrackError::validation("file_size", "must not be negative"));
        }

        let now = self.clock.now();
        let resume = Resume {
            id: crate::new_id(),
            user_id: user_id.to_string(),
            name: new.name,
            description: new.description,
            file_path: new.file_path,
            file_type: new.file_type,
            file_size: new.file_size,
            is_default: false,
            created_at: now,
            updated_at: now,
        };
        let saved = self.store.insert_resume(&resume)?;
        tracing::info!(
            "📄 Resume added: {} ({}){}",
            saved.name,
            saved.id,
            if saved.is_default { " [default]" } else { "" }
        );
        Ok(saved)
    }

    /// Removing the default leaves the user without one until they pick another.
    pub fn delete(&self, id: &str, user_id: &str) -> Result<()> {
        let resume = self
            .store
            .find_owned_resume(id, user_id)?
            .ok_or_else(|| JobTrackError::NotFound("Resume".into()))?;
        self.store.delete_resume(&resume.id)?;
        tracing::info!("🗑️ Resume deleted: {} ({})", resume.name, resume.id);
        Ok(())
    }

    pub fn set_default(&self, id: &str, user_id: &str) -> Result<Resume> {
        if !self.store.set_default_resume(id, user_id, self.clock.now())? {
            return Err(JobTrackError::NotFound("Resume".into()));
        }
        self.store
            .find_owned_resume(id, user_id)?
            .ok_or_else(|| JobTrackError::NotFound("Resume".into()))
    }
}
