//! Record store traits.
//!
//! Implementations must give read-your-writes within a process and serialize
//! concurrent mutations of the same record.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::types::{
    Application, ApplicationFilter, MonthlyCount, Page, PageRequest, Resume, Template, User,
};

pub trait ApplicationStore: Send + Sync {
    /// Insert or replace. An existing row keeps its `user_id` and `created_at`.
    fn save(&self, application: &Application) -> Result<Application>;

    fn find_by_id(&self, id: &str) -> Result<Option<Application>>;

    /// `None` when the record is missing or owned by someone else.
    fn find_owned(&self, id: &str, user_id: &str) -> Result<Option<Application>>;

    /// Read, mutate and write back one owned record as a single step, so
    /// concurrent read-modify-writes of the same record never interleave.
    /// `None` when the record is missing or owned by someone else. Nothing is
    /// written when `mutate` fails.
    fn update_owned(
        &self,
        id: &str,
        user_id: &str,
        mutate: &mut dyn FnMut(&mut Application) -> Result<()>,
    ) -> Result<Option<Application>>;

    fn find_by_user(
        &self,
        user_id: &str,
        filter: &ApplicationFilter,
        page: &PageRequest,
    ) -> Result<Page<Application>>;

    /// Returns whether a row was removed.
    fn delete(&self, id: &str) -> Result<bool>;

    fn count_by_user(&self, user_id: &str) -> Result<u64>;

    fn group_count_by_status(&self, user_id: &str) -> Result<BTreeMap<String, u64>>;

    fn find_starred_by_user(&self, user_id: &str) -> Result<Vec<Application>>;

    /// Every user's records that carry an interview time.
    fn find_all_with_interview_time(&self) -> Result<Vec<Application>>;

    /// Apply-date months, newest first.
    fn count_by_month(&self, user_id: &str) -> Result<Vec<MonthlyCount>>;
}

pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` on a duplicate username or email.
    fn create_user(&self, user: &User) -> Result<User>;

    fn find_user(&self, id: &str) -> Result<Option<User>>;

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Returns false when no such user exists.
    fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> Result<bool>;
}

pub trait ResumeStore: Send + Sync {
    fn list_resumes(&self, user_id: &str) -> Result<Vec<Resume>>;

    fn find_owned_resume(&self, id: &str, user_id: &str) -> Result<Option<Resume>>;

    fn insert_resume(&self, resume: &Resume) -> Result<Resume>;

    fn delete_resume(&self, id: &str) -> Result<bool>;

    /// Atomically make `id` the only default among the user's resumes.
    /// Returns false (and changes nothing) when `id` is not the user's.
    fn set_default_resume(&self, id: &str, user_id: &str, at: DateTime<Utc>) -> Result<bool>;
}

pub trait TemplateStore: Send + Sync {
    fn list_templates(&self, user_id: &str) -> Result<Vec<Template>>;

    fn find_owned_template(&self, id: &str, user_id: &str) -> Result<Option<Template>>;

    fn insert_template(&self, template: &Template) -> Result<Template>;

    fn delete_template(&self, id: &str) -> Result<bool>;
}

/// Delivered reminders, keyed by application and the interview time they announced.
pub trait ReminderLog: Send + Sync {
    fn reminder_sent(&self, application_id: &str, interview_time: DateTime<Utc>) -> Result<bool>;

    fn record_reminder(
        &self,
        application_id: &str,
        interview_time: DateTime<Utc>,
        sent_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Everything the reminder scheduler reads and writes.
pub trait ReminderSource: ApplicationStore + UserStore + ReminderLog {}

impl<T: ApplicationStore + UserStore + ReminderLog> ReminderSource for T {}
