//! User directory.

use jobtrack_core::error::{JobTrackError, Result};
use jobtrack_core::traits::{Clock, UserStore};
use jobtrack_core::types::{NewUser, User};
use std::sync::Arc;

pub struct UserDirectory {
    store: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn UserStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Fails with `Conflict` when the username or email is taken.
    pub fn register(&self, new: NewUser) -> Result<User> {
        if new.username.trim().is_empty() {
            return Err(JobTrackError::validation("username", "must not be empty"));
        }
        if new.email.trim().is_empty() {
            return Err(JobTrackError::validation("email", "must not be empty"));
        }
        if !new.email.contains('@') {
            return Err(JobTrackError::validation("email", format!("'{}' is not an email address", new.email)));
        }

        let user = User {
            id: crate::new_id(),
            username: new.username,
            email: new.email,
            display_name: new.display_name,
            phone: new.phone,
            target_position: new.target_position,
            created_at: self.clock.now(),
            last_login: None,
            active: true,
        };
        let user = self.store.create_user(&user)?;
        tracing::info!("👤 User registered: {} ({})", user.username, user.id);
        Ok(user)
    }

    pub fn get(&self, user_id: &str) -> Result<User> {
        self.store
            .find_user(user_id)?
            .ok_or_else(|| JobTrackError::NotFound("User".into()))
    }

    pub fn find_by_username(&self, username: &str) -> Result<User> {
        self.store
            .find_user_by_username(username)?
            .ok_or_else(|| JobTrackError::NotFound(format!("User '{username}'")))
    }

    pub fn record_login(&self, user_id: &str) -> Result<User> {
        if !self.store.touch_last_login(user_id, self.clock.now())? {
            return Err(JobTrackError::NotFound("User".into()));
        }
        self.get(user_id)
    }
}
