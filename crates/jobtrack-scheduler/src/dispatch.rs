//! Reminder delivery targets: tracing log, SMTP email and HTTP webhook,
//! plus a fan-out over any combination of them.

use async_trait::async_trait;
use jobtrack_core::config::{EmailNotifyConfig, NotifyConfig, WebhookNotifyConfig};
use jobtrack_core::error::{JobTrackError, Result};
use jobtrack_core::traits::Dispatcher;
use jobtrack_core::types::{Application, User};
use std::sync::Arc;

use crate::notify::ReminderMessage;

/// Writes the reminder to the log. Always succeeds.
pub struct LogDispatcher;

#[async_trait]
impl Dispatcher for LogDispatcher {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, user: &User, application: &Application) -> Result<()> {
        let msg = ReminderMessage::render(user, application);
        tracing::info!("📣 [{}] {}", user.username, msg.subject);
        tracing::debug!("{}", msg.body);
        Ok(())
    }
}

/// Sends the reminder to the user's address over SMTP (STARTTLS).
pub struct EmailDispatcher {
    config: EmailNotifyConfig,
}

impl EmailDispatcher {
    pub fn new(config: EmailNotifyConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Dispatcher for EmailDispatcher {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, user: &User, application: &Application) -> Result<()> {
        use lettre::{
            AsyncSmtpTransport, AsyncTransport, Message, message::Mailbox,
            message::header::ContentType, transport::smtp::authentication::Credentials,
        };

        let sender = self.config.sender();
        if sender.is_empty() || user.email.trim().is_empty() {
            return Err(JobTrackError::Dispatch(format!(
                "Email not sent for {}: sender or recipient address missing",
                user.username
            )));
        }

        let from: Mailbox = format!("{} <{}>", self.config.from_name, sender)
            .parse()
            .map_err(|e| JobTrackError::Dispatch(format!("Invalid from: {e}")))?;
        let to: Mailbox = user
            .email
            .parse()
            .map_err(|e| JobTrackError::Dispatch(format!("Invalid to '{}': {e}", user.email)))?;

        let msg = ReminderMessage::render(user, application);
        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(msg.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(msg.body)
            .map_err(|e| JobTrackError::Dispatch(format!("Build email: {e}")))?;

        let creds = Credentials::new(self.config.username.clone(), self.config.password.clone());
        let mailer = AsyncSmtpTransport::<lettre::Tokio1Executor>::starttls_relay(&self.config.smtp_host)
            .map_err(|e| JobTrackError::Dispatch(format!("SMTP relay: {e}")))?
            .port(self.config.smtp_port)
            .credentials(creds)
            .build();

        mailer
            .send(email)
            .await
            .map_err(|e| JobTrackError::Dispatch(format!("SMTP send: {e}")))?;

        tracing::info!("📤 Reminder email sent to: {}", user.email);
        Ok(())
    }
}

/// POSTs the reminder as JSON.
pub struct WebhookDispatcher {
    url: String,
    headers: Vec<(String, String)>,
    client: reqwest::Client,
}

impl WebhookDispatcher {
    pub fn new(config: &WebhookNotifyConfig) -> Self {
        Self {
            url: config.url.clone(),
            headers: config.headers.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn payload(user: &User, application: &Application) -> serde_json::Value {
        let msg = ReminderMessage::render(user, application);
        serde_json::json!({
            "title": msg.subject,
            "body": msg.body,
            "source": "jobtrack-reminder",
            "user": user.username,
            "email": user.email,
            "application_id": application.id,
            "company": application.company_name,
            "position": application.position_name,
            "interview_time": application.interview_time.map(|at| at.to_rfc3339()),
        })
    }
}

#[async_trait]
impl Dispatcher for WebhookDispatcher {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, user: &User, application: &Application) -> Result<()> {
        let mut req = self
            .client
            .post(&self.url)
            .json(&Self::payload(user, application))
            .timeout(std::time::Duration::from_secs(10));

        for (key, value) in &self.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| JobTrackError::Dispatch(format!("Webhook send failed: {e}")))?;

        if resp.status().is_success() {
            tracing::info!("✅ Webhook reminder sent: {}", application.company_name);
            Ok(())
        } else {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            Err(JobTrackError::Dispatch(format!("Webhook error {status}: {body}")))
        }
    }
}

/// Tries every delivery target in order. Delivered when at least one
/// delivery target succeeds.
///
/// Echo targets (the log, when something else does the delivering) see every
/// reminder but never count as a delivery, so a failed email is still a failure.
pub struct FanoutDispatcher {
    targets: Vec<Arc<dyn Dispatcher>>,
    echoes: Vec<Arc<dyn Dispatcher>>,
}

impl FanoutDispatcher {
    pub fn new(targets: Vec<Arc<dyn Dispatcher>>) -> Self {
        Self { targets, echoes: Vec::new() }
    }

    pub fn with_echo(mut self, echo: Arc<dyn Dispatcher>) -> Self {
        self.echoes.push(echo);
        self
    }

    pub fn target_names(&self) -> Vec<&str> {
        self.targets.iter().map(|t| t.name()).collect()
    }

    pub fn echo_names(&self) -> Vec<&str> {
        self.echoes.iter().map(|t| t.name()).collect()
    }
}

#[async_trait]
impl Dispatcher for FanoutDispatcher {
    fn name(&self) -> &str {
        "fanout"
    }

    async fn send(&self, user: &User, application: &Application) -> Result<()> {
        if self.targets.is_empty() {
            return Err(JobTrackError::Dispatch("No notification targets configured".into()));
        }

        for echo in &self.echoes {
            if let Err(e) = echo.send(user, application).await {
                tracing::warn!("⚠️ {} echo failed: {e}", echo.name());
            }
        }

        let mut delivered = 0;
        let mut errors = Vec::new();
        for target in &self.targets {
            match target.send(user, application).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!("⚠️ {} target failed: {e}", target.name());
                    errors.push(format!("{}: {e}", target.name()));
                }
            }
        }

        if delivered > 0 {
            Ok(())
        } else {
            Err(JobTrackError::Dispatch(errors.join("; ")))
        }
    }
}

/// Build the dispatcher described by `[notify]`. The log only counts as a
/// delivery when it is the sole target.
pub fn dispatcher_from_config(config: &NotifyConfig) -> FanoutDispatcher {
    let mut targets: Vec<Arc<dyn Dispatcher>> = Vec::new();

    if let Some(email) = &config.email
        && email.enabled
        && !email.smtp_host.is_empty()
    {
        targets.push(Arc::new(EmailDispatcher::new(email.clone())));
    }
    if let Some(webhook) = &config.webhook
        && webhook.enabled
        && !webhook.url.is_empty()
    {
        targets.push(Arc::new(WebhookDispatcher::new(webhook)));
    }

    match (config.log, targets.is_empty()) {
        (true, true) => FanoutDispatcher::new(vec![Arc::new(LogDispatcher)]),
        (true, false) => FanoutDispatcher::new(targets).with_echo(Arc::new(LogDispatcher)),
        (false, _) => FanoutDispatcher::new(targets),
    }
}
