//! Notification dispatcher trait: delivers an interview reminder.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Application, User};

/// Delivers one reminder for `application` to `user`.
///
/// The scheduler only distinguishes success from failure; the error text is
/// logged and otherwise ignored.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Dispatcher name for logs (e.g., "email", "webhook").
    fn name(&self) -> &str;

    async fn send(&self, user: &User, application: &Application) -> Result<()>;
}
