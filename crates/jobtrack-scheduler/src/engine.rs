//! Reminder scheduler engine. One pass scans the store for interviews inside
//! the lead window and dispatches a reminder for each.
//!
//! Records are copied out of the store before any dispatch is awaited, so no
//! store lock is ever held across an `.await`. Every dispatch is isolated: a
//! failure, a timeout or a missing owner is logged and the pass carries on.

use chrono::{DateTime, Duration, Utc};
use jobtrack_core::config::ReminderConfig;
use jobtrack_core::error::Result;
use jobtrack_core::traits::{Clock, Dispatcher, ReminderSource};
use jobtrack_core::types::{Application, User};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::ticker::Ticker;

/// Outcome of one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderReport {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// Interviews strictly inside the window.
    pub eligible: usize,
    /// Dispatcher invocations.
    pub attempted: usize,
    pub sent: usize,
    /// Dispatch errors, timeouts and records whose owner could not be resolved.
    pub failed: usize,
    /// Already reminded for this interview time.
    pub skipped: usize,
}

pub struct ReminderScheduler {
    source: Arc<dyn ReminderSource>,
    dispatcher: Arc<dyn Dispatcher>,
    clock: Arc<dyn Clock>,
    lead_time: Duration,
    dispatch_timeout: std::time::Duration,
    dedupe: bool,
}

impl ReminderScheduler {
    /// Scheduler with the default `[reminder]` settings.
    pub fn new(
        source: Arc<dyn ReminderSource>,
        dispatcher: Arc<dyn Dispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let defaults = ReminderConfig::default();
        Self {
            source,
            dispatcher,
            clock,
            lead_time: defaults.lead_time(),
            dispatch_timeout: defaults.dispatch_timeout(),
            dedupe: defaults.dedupe,
        }
    }

    pub fn with_config(mut self, config: &ReminderConfig) -> Self {
        self.lead_time = config.lead_time();
        self.dispatch_timeout = config.dispatch_timeout();
        self.dedupe = config.dedupe;
        self
    }

    pub fn with_lead_time(mut self, lead_time: Duration) -> Self {
        self.lead_time = lead_time;
        self
    }

    pub fn with_dispatch_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    /// Run exactly one pass. Only a failed scan of the store is an error;
    /// per-record problems end up in the report.
    pub async fn run_pass(&self) -> Result<ReminderReport> {
        let now = self.clock.now();
        let window_end = now
            .checked_add_signed(self.lead_time)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let eligible: Vec<Application> = self
            .source
            .find_all_with_interview_time()?
            .into_iter()
            .filter(|app| app.interview_within(now, window_end))
            .collect();

        let mut report = ReminderReport {
            window_start: now,
            window_end,
            eligible: eligible.len(),
            attempted: 0,
            sent: 0,
            failed: 0,
            skipped: 0,
        };
        tracing::debug!("🔎 {} interview(s) between {now} and {window_end}", eligible.len());

        for app in &eligible {
            let Some(interview_time) = app.interview_time else {
                continue;
            };

            if self.dedupe {
                match self.source.reminder_sent(&app.id, interview_time) {
                    Ok(true) => {
                        report.skipped += 1;
                        continue;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!("⚠️ Reminder log lookup failed for {}: {e}", app.id);
                        report.failed += 1;
                        continue;
                    }
                }
            }

            let Some(user) = self.owner(app) else {
                report.failed += 1;
                continue;
            };

            report.attempted += 1;
            if self.dispatch(&user, app).await {
                report.sent += 1;
                if self.dedupe {
                    if let Err(e) = self.source.record_reminder(&app.id, interview_time, self.clock.now()) {
                        tracing::warn!("⚠️ Failed to record reminder for {}: {e}", app.id);
                    }
                }
            } else {
                report.failed += 1;
            }
        }

        tracing::info!(
            "⏰ Reminder pass: {} eligible, {} sent, {} failed, {} skipped",
            report.eligible,
            report.sent,
            report.failed,
            report.skipped
        );
        Ok(report)
    }

    fn owner(&self, app: &Application) -> Option<User> {
        match self.source.find_user(&app.user_id) {
            Ok(Some(user)) => Some(user),
            Ok(None) => {
                tracing::warn!("⚠️ Owner {} of application {} not found", app.user_id, app.id);
                None
            }
            Err(e) => {
                tracing::warn!("⚠️ Owner lookup failed for application {}: {e}", app.id);
                None
            }
        }
    }

    /// True when the dispatcher reported success within the timeout.
    async fn dispatch(&self, user: &User, app: &Application) -> bool {
        let sent = tokio::time::timeout(self.dispatch_timeout, self.dispatcher.send(user, app)).await;
        match sent {
            Ok(Ok(())) => {
                tracing::info!(
                    "📣 Reminder sent to {} for {} ({})",
                    user.username,
                    app.company_name,
                    app.id
                );
                true
            }
            Ok(Err(e)) => {
                tracing::warn!("⚠️ {} dispatch failed for {}: {e}", self.dispatcher.name(), app.id);
                false
            }
            Err(_) => {
                tracing::warn!(
                    "⚠️ {} dispatch timed out after {:?} for {}",
                    self.dispatcher.name(),
                    self.dispatch_timeout,
                    app.id
                );
                false
            }
        }
    }

    /// Run passes on a background task until the ticker runs dry or the
    /// handle asks for shutdown.
    pub fn spawn<T: Ticker + 'static>(self: Arc<Self>, mut ticker: T) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            tracing::info!(
                "⏰ Reminder scheduler started (lead time {}h, dedupe {})",
                self.lead_time.num_hours(),
                self.dedupe
            );
            let mut passes = 0u64;

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    more = ticker.tick() => {
                        if !more {
                            break;
                        }
                    }
                }
                if *shutdown_rx.borrow() {
                    break;
                }

                if let Err(e) = self.run_pass().await {
                    tracing::warn!("⚠️ Reminder pass failed: {e}");
                }
                passes += 1;
            }

            tracing::info!("🛑 Reminder scheduler stopped after {passes} pass(es)");
            passes
        });

        SchedulerHandle { shutdown: shutdown_tx, task }
    }
}

/// Handle to a spawned scheduler loop.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<u64>,
}

impl SchedulerHandle {
    /// Stop issuing passes and wait for an in-flight pass to finish.
    /// Returns the number of passes that ran.
    pub async fn shutdown(self) -> u64 {
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(passes) => passes,
            Err(e) => {
                tracing::warn!("⚠️ Reminder scheduler task ended abnormally: {e}");
                0
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticker::ManualTicker;
    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};
    use jobtrack_core::error::JobTrackError;
    use jobtrack_core::traits::{ApplicationStore, ManualClock, ReminderLog, UserStore};
    use crate::dispatch::{FanoutDispatcher, LogDispatcher};
    use jobtrack_core::types::Priority;
    use jobtrack_db::TrackerDb;
    use std::sync::Mutex;

    /// Records every call; fails or stalls for chosen companies.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        fail: Vec<String>,
        stall: Vec<String>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Dispatcher for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn send(&self, _user: &User, application: &Application) -> Result<()> {
            let company = application.company_name.clone();
            self.calls.lock().unwrap().push(company.clone());
            if self.stall.contains(&company) {
                tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            }
            if self.fail.contains(&company) {
                return Err(JobTrackError::Dispatch(format!("{company} bounced")));
            }
            Ok(())
        }
    }

    struct Fixture {
        db: Arc<TrackerDb>,
        clock: Arc<ManualClock>,
        user: User,
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
    }

    fn setup() -> Fixture {
        let db = Arc::new(TrackerDb::open_in_memory().unwrap());
        let user = db
            .create_user(&User {
                id: "u-alice".into(),
                username: "alice".into(),
                email: "alice@example.com".into(),
                display_name: None,
                phone: None,
                target_position: None,
                created_at: t0(),
                last_login: None,
                active: true,
            })
            .unwrap();
        Fixture { db, clock: Arc::new(ManualClock::new(t0())), user }
    }

    fn interview(f: &Fixture, company: &str, at: Option<DateTime<Utc>>) -> Application {
        f.db.save(&Application {
            id: format!("app-{company}"),
            user_id: f.user.id.clone(),
            company_name: company.into(),
            position_name: "Engineer".into(),
            apply_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            status: "interview-1".into(),
            notes: None,
            salary_min: None,
            salary_max: None,
            work_location: None,
            apply_channel: None,
            referrer: None,
            interview_time: at,
            company_website: None,
            hr_contact: None,
            hr_phone: None,
            priority: Priority::Medium,
            starred: false,
            created_at: t0(),
            updated_at: t0(),
        })
        .unwrap()
    }

    fn scheduler(f: &Fixture, recorder: Arc<Recorder>) -> ReminderScheduler {
        ReminderScheduler::new(f.db.clone(), recorder, f.clock.clone())
    }

    fn sorted(mut v: Vec<String>) -> Vec<String> {
        v.sort();
        v
    }

    #[tokio::test]
    async fn test_window_is_exclusive_on_both_ends() {
        let f = setup();
        interview(&f, "Soon", Some(t0() + Duration::hours(1)));
        interview(&f, "Edge", Some(t0() + Duration::hours(24)));
        interview(&f, "Past", Some(t0() - Duration::minutes(1)));
        interview(&f, "Now", Some(t0()));
        interview(&f, "Later", Some(t0() + Duration::hours(30)));
        interview(&f, "None", None);

        let recorder = Arc::new(Recorder::default());
        let report = scheduler(&f, recorder.clone()).run_pass().await.unwrap();

        assert_eq!(recorder.calls(), vec!["Soon".to_string()]);
        assert_eq!(report.eligible, 1);
        assert_eq!(report.sent, 1);
        assert_eq!(report.window_start, t0());
        assert_eq!(report.window_end, t0() + Duration::hours(24));
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_pass() {
        let f = setup();
        for company in ["A", "B", "C"] {
            interview(&f, company, Some(t0() + Duration::hours(2)));
        }
        let recorder = Arc::new(Recorder { fail: vec!["A".into()], ..Default::default() });
        let report = scheduler(&f, recorder.clone()).run_pass().await.unwrap();

        assert_eq!(sorted(recorder.calls()), vec!["A", "B", "C"]);
        assert_eq!(report.attempted, 3);
        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_dedupe_skips_delivered_and_retries_failed() {
        let f = setup();
        interview(&f, "Delivered", Some(t0() + Duration::hours(3)));
        interview(&f, "Bounced", Some(t0() + Duration::hours(4)));

        let first = Arc::new(Recorder { fail: vec!["Bounced".into()], ..Default::default() });
        let report = scheduler(&f, first.clone()).run_pass().await.unwrap();
        assert_eq!((report.sent, report.failed), (1, 1));

        f.clock.advance(Duration::hours(1));
        let second = Arc::new(Recorder::default());
        let report = scheduler(&f, second.clone()).run_pass().await.unwrap();
        assert_eq!(second.calls(), vec!["Bounced".to_string()]);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.sent, 1);

        // Rescheduling makes the record eligible again.
        let mut moved = f.db.find_by_id("app-Delivered").unwrap().unwrap();
        moved.interview_time = Some(t0() + Duration::hours(6));
        f.db.save(&moved).unwrap();
        let third = Arc::new(Recorder::default());
        scheduler(&f, third.clone()).run_pass().await.unwrap();
        assert_eq!(third.calls(), vec!["Delivered".to_string()]);
    }

    #[tokio::test]
    async fn test_logged_but_undelivered_reminder_is_retried() {
        let f = setup();
        let at = t0() + Duration::hours(3);
        interview(&f, "Acme", Some(at));

        let bounced = Arc::new(Recorder { fail: vec!["Acme".into()], ..Default::default() });
        let fanout = FanoutDispatcher::new(vec![bounced.clone() as Arc<dyn Dispatcher>])
            .with_echo(Arc::new(LogDispatcher));
        let engine = ReminderScheduler::new(f.db.clone(), Arc::new(fanout), f.clock.clone());

        let report = engine.run_pass().await.unwrap();
        assert_eq!((report.sent, report.failed), (0, 1));
        assert!(!f.db.reminder_sent("app-Acme", at).unwrap());

        let report = engine.run_pass().await.unwrap();
        assert_eq!((report.attempted, report.skipped), (1, 0));
        assert_eq!(bounced.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_without_dedupe_every_pass_reminds() {
        let f = setup();
        interview(&f, "Acme", Some(t0() + Duration::hours(5)));
        let recorder = Arc::new(Recorder::default());
        let engine = scheduler(&f, recorder.clone()).with_dedupe(false);
        engine.run_pass().await.unwrap();
        engine.run_pass().await.unwrap();
        assert_eq!(recorder.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_slow_dispatch_times_out() {
        let f = setup();
        interview(&f, "Slow", Some(t0() + Duration::hours(1)));
        interview(&f, "Fast", Some(t0() + Duration::hours(2)));
        let recorder = Arc::new(Recorder { stall: vec!["Slow".into()], ..Default::default() });
        let engine = scheduler(&f, recorder.clone())
            .with_dispatch_timeout(std::time::Duration::from_millis(50));

        let report = engine.run_pass().await.unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);
        // A timed-out reminder is not logged as delivered.
        assert!(!f.db.reminder_sent("app-Slow", t0() + Duration::hours(1)).unwrap());
    }

    #[tokio::test]
    async fn test_custom_lead_time() {
        let f = setup();
        interview(&f, "Tomorrow", Some(t0() + Duration::hours(20)));
        let recorder = Arc::new(Recorder::default());
        let report = scheduler(&f, recorder.clone())
            .with_lead_time(Duration::hours(2))
            .run_pass()
            .await
            .unwrap();
        assert_eq!(report.eligible, 0);
        assert!(recorder.calls().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_stops_further_passes() {
        let f = setup();
        interview(&f, "Acme", Some(t0() + Duration::hours(1)));
        let recorder = Arc::new(Recorder::default());
        let engine = Arc::new(scheduler(&f, recorder.clone()).with_dedupe(false));

        let (ticker, ticks) = ManualTicker::new();
        let handle = engine.spawn(ticker);

        assert!(ticks.tick());
        for _ in 0..200 {
            if !recorder.calls().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(recorder.calls().len(), 1);

        let passes = handle.shutdown().await;
        assert_eq!(passes, 1);
        // Loop is gone: nothing consumes ticks any more.
        assert!(!ticks.tick());
        assert_eq!(recorder.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_loop_ends_when_ticker_runs_dry() {
        let f = setup();
        let engine = Arc::new(scheduler(&f, Arc::new(Recorder::default())));
        let (ticker, ticks) = ManualTicker::new();
        let handle = engine.spawn(ticker);
        ticks.tick();
        ticks.tick();
        drop(ticks);
        for _ in 0..200 {
            if handle.is_finished() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(handle.is_finished());
        assert_eq!(handle.shutdown().await, 2);
    }
}
