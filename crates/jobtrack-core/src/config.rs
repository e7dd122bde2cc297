//! JobTrack configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{JobTrackError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JobTrackConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub reminder: ReminderConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl JobTrackConfig {
    /// Load config from the default path (~/.jobtrack/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default().with_env_overrides())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| JobTrackError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| JobTrackError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config.with_env_overrides())
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| JobTrackError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the JobTrack home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".jobtrack")
    }

    /// Secrets may come from the environment instead of the file.
    fn with_env_overrides(mut self) -> Self {
        if let Ok(password) = std::env::var("JOBTRACK_SMTP_PASSWORD")
            && let Some(email) = self.notify.email.as_mut()
        {
            email.password = password;
        }
        self
    }

    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        let r = &self.reminder;
        if r.poll_interval_secs == 0 {
            return Err(JobTrackError::Config("reminder.poll_interval_secs must be > 0".into()));
        }
        if r.lead_time_hours == 0 || r.lead_time_hours > MAX_LEAD_TIME_HOURS {
            return Err(JobTrackError::Config(format!(
                "reminder.lead_time_hours must be between 1 and {MAX_LEAD_TIME_HOURS}"
            )));
        }
        if r.dispatch_timeout_secs == 0 {
            return Err(JobTrackError::Config("reminder.dispatch_timeout_secs must be > 0".into()));
        }
        if !r.dedupe && r.poll_interval_secs < r.lead_time_hours * 3600 {
            tracing::warn!(
                "⚠️ reminder.dedupe is off and poll interval ({}s) is shorter than lead time ({}h): \
                 interviews will be reminded on every pass inside the window",
                r.poll_interval_secs,
                r.lead_time_hours
            );
        }
        if let Some(email) = &self.notify.email
            && email.enabled
            && email.smtp_host.is_empty()
        {
            return Err(JobTrackError::Config("notify.email.smtp_host is empty".into()));
        }
        if let Some(webhook) = &self.notify.webhook
            && webhook.enabled
            && webhook.url.is_empty()
        {
            return Err(JobTrackError::Config("notify.webhook.url is empty".into()));
        }
        Ok(())
    }
}

fn bool_true() -> bool { true }

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String { "~/.jobtrack/jobtrack.db".into() }

impl DatabaseConfig {
    /// Database path with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).to_string())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

/// Interview reminder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_lead_time_hours")]
    pub lead_time_hours: u64,
    #[serde(default = "default_dispatch_timeout")]
    pub dispatch_timeout_secs: u64,
    /// Remember delivered reminders so a later pass does not repeat them.
    #[serde(default = "bool_true")]
    pub dedupe: bool,
}

fn default_poll_interval() -> u64 { 3600 }
fn default_lead_time_hours() -> u64 { 24 }

/// One year.
pub const MAX_LEAD_TIME_HOURS: u64 = 8760;
fn default_dispatch_timeout() -> u64 { 30 }

impl ReminderConfig {
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs)
    }

    pub fn lead_time(&self) -> chrono::Duration {
        chrono::Duration::hours(self.lead_time_hours.min(MAX_LEAD_TIME_HOURS) as i64)
    }

    pub fn dispatch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.dispatch_timeout_secs)
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: default_poll_interval(),
            lead_time_hours: default_lead_time_hours(),
            dispatch_timeout_secs: default_dispatch_timeout(),
            dedupe: true,
        }
    }
}

/// Notification targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Always log reminders through tracing.
    #[serde(default = "bool_true")]
    pub log: bool,
    #[serde(default)]
    pub email: Option<EmailNotifyConfig>,
    #[serde(default)]
    pub webhook: Option<WebhookNotifyConfig>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            log: true,
            email: None,
            webhook: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailNotifyConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Sender address; falls back to `username`.
    #[serde(default)]
    pub from: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

fn default_smtp_port() -> u16 { 587 }
fn default_from_name() -> String { "JobTrack".into() }

impl EmailNotifyConfig {
    pub fn sender(&self) -> &str {
        if self.from.is_empty() { &self.username } else { &self.from }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookNotifyConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}
