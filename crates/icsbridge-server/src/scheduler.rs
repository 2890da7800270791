//! Periodic export scheduler.
//!
//! Runs an export once at start, then on every interval tick. Failed runs
//! back off exponentially up to a cap; the next success restores the normal
//! interval. A [`SchedulerHandle`] sends "export now", pause, resume and stop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use icsbridge_core::ExportReport;
use tokio::sync::{RwLock, mpsc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::JobResult;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between exports.
    pub export_interval: Duration,
    /// Delay after the first failure.
    pub initial_backoff: Duration,
    /// Upper bound for the failure delay.
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            export_interval: Duration::from_secs(3600),
            initial_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(1800),
            backoff_multiplier: 2.0,
        }
    }
}

impl SchedulerConfig {
    pub fn new(export_interval: Duration) -> Self {
        Self {
            export_interval,
            ..Default::default()
        }
    }

    /// Builder method to set the backoff parameters.
    #[must_use]
    pub fn with_backoff(mut self, initial: Duration, max: Duration, multiplier: f64) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self.backoff_multiplier = multiplier;
        self
    }

    /// Delay before the next attempt after `consecutive_failures` failures.
    pub fn backoff_delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(consecutive_failures - 1).unwrap_or(i32::MAX);
        let delay = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(delay.min(self.max_backoff.as_secs_f64()))
    }
}

/// Commands accepted by a running scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Export immediately, even while paused.
    ExportNow,
    Pause,
    Resume,
    Stop,
}

/// Scheduler state, shared with handles.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    pub paused: bool,
    pub consecutive_failures: u32,
    /// Last successful export.
    pub last_export: Option<DateTime<Utc>>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Report of the last successful export.
    pub last_report: Option<ExportReport>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, report: ExportReport) {
        let now = Utc::now();
        self.consecutive_failures = 0;
        self.last_export = Some(now);
        self.last_attempt = Some(now);
        self.last_error = None;
        self.last_report = Some(report);
    }

    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_attempt = Some(Utc::now());
        self.last_error = Some(error.into());
    }
}

pub type SharedSchedulerState = Arc<RwLock<SchedulerState>>;

/// Drives periodic exports.
pub struct Scheduler {
    config: SchedulerConfig,
    state: SharedSchedulerState,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: mpsc::Receiver<SchedulerCommand>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        Self {
            config,
            state: Arc::new(RwLock::new(SchedulerState::new())),
            command_tx,
            command_rx,
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            command_tx: self.command_tx.clone(),
            state: Arc::clone(&self.state),
        }
    }

    pub fn state(&self) -> SharedSchedulerState {
        Arc::clone(&self.state)
    }

    /// Runs the loop until [`SchedulerCommand::Stop`] or until every handle
    /// and the scheduler's own sender are gone.
    pub async fn run<F, Fut>(self, export_fn: F)
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = JobResult<ExportReport>> + Send,
    {
        let Self {
            config,
            state,
            command_tx,
            mut command_rx,
        } = self;
        // Handles alone keep the channel open.
        drop(command_tx);

        info!(
            interval_secs = config.export_interval.as_secs(),
            "scheduler started"
        );

        run_export(&state, &export_fn).await;
        let mut next_run = Instant::now() + next_delay(&config, &state).await;

        loop {
            debug!(
                delay_secs = next_run.saturating_duration_since(Instant::now()).as_secs(),
                "next export scheduled"
            );

            tokio::select! {
                _ = tokio::time::sleep_until(next_run) => {
                    if state.read().await.paused {
                        debug!("scheduler paused, skipping export");
                    } else {
                        run_export(&state, &export_fn).await;
                    }
                    next_run = Instant::now() + next_delay(&config, &state).await;
                }
                command = command_rx.recv() => match command {
                    Some(SchedulerCommand::ExportNow) => {
                        debug!("export requested");
                        run_export(&state, &export_fn).await;
                        // A failure may call for an earlier retry; success keeps the deadline.
                        next_run = next_run.min(Instant::now() + next_delay(&config, &state).await);
                    }
                    Some(SchedulerCommand::Pause) => {
                        info!("scheduler paused");
                        state.write().await.paused = true;
                    }
                    Some(SchedulerCommand::Resume) => {
                        info!("scheduler resumed");
                        state.write().await.paused = false;
                    }
                    Some(SchedulerCommand::Stop) | None => {
                        info!("scheduler stopping");
                        break;
                    }
                },
            }
        }
    }
}

async fn next_delay(config: &SchedulerConfig, state: &SharedSchedulerState) -> Duration {
    let failures = state.read().await.consecutive_failures;
    if failures > 0 {
        config.backoff_delay(failures)
    } else {
        config.export_interval
    }
}

async fn run_export<F, Fut>(state: &SharedSchedulerState, export_fn: &F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = JobResult<ExportReport>>,
{
    match export_fn().await {
        Ok(report) => {
            debug!(bytes = report.bytes, "export succeeded");
            state.write().await.record_success(report);
        }
        Err(e) => {
            warn!(error = %e, retryable = e.is_retryable(), "export failed");
            state.write().await.record_failure(e.to_string());
        }
    }
}

/// Handle for sending commands to a running scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    state: SharedSchedulerState,
}

type SendResult = Result<(), mpsc::error::SendError<SchedulerCommand>>;

impl SchedulerHandle {
    pub async fn export_now(&self) -> SendResult {
        self.command_tx.send(SchedulerCommand::ExportNow).await
    }

    pub async fn pause(&self) -> SendResult {
        self.command_tx.send(SchedulerCommand::Pause).await
    }

    pub async fn resume(&self) -> SendResult {
        self.command_tx.send(SchedulerCommand::Resume).await
    }

    pub async fn stop(&self) -> SendResult {
        self.command_tx.send(SchedulerCommand::Stop).await
    }

    /// A snapshot of the current state.
    pub async fn state(&self) -> SchedulerState {
        self.state.read().await.clone()
    }

    pub async fn is_paused(&self) -> bool {
        self.state.read().await.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn report() -> ExportReport {
        ExportReport {
            path: None,
            bytes: 42,
            appointments: 1,
            event_blocks: 1,
            skipped: Vec::new(),
        }
    }

    #[test]
    fn backoff_grows_and_caps() {
        let config = SchedulerConfig::default().with_backoff(
            Duration::from_secs(5),
            Duration::from_secs(60),
            2.0,
        );

        assert_eq!(config.backoff_delay(0), Duration::ZERO);
        assert_eq!(config.backoff_delay(1), Duration::from_secs(5));
        assert_eq!(config.backoff_delay(2), Duration::from_secs(10));
        assert_eq!(config.backoff_delay(3), Duration::from_secs(20));
        assert_eq!(config.backoff_delay(10), Duration::from_secs(60));
    }

    #[test]
    fn state_records_outcomes() {
        let mut state = SchedulerState::new();
        state.record_failure("offline");
        state.record_failure("offline");
        assert_eq!(state.consecutive_failures, 2);
        assert_eq!(state.last_error.as_deref(), Some("offline"));
        assert!(state.last_export.is_none());

        state.record_success(report());
        assert_eq!(state.consecutive_failures, 0);
        assert!(state.last_error.is_none());
        assert_eq!(state.last_report.map(|r| r.bytes), Some(42));
    }

    #[tokio::test]
    async fn scheduler_commands() {
        let scheduler = Scheduler::new(SchedulerConfig::new(Duration::from_secs(60)));
        let handle = scheduler.handle();

        let runs = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&runs);
        let task = tokio::spawn(async move {
            scheduler
                .run(move || {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(report())
                    }
                })
                .await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        handle.pause().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(handle.is_paused().await);

        handle.export_now().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        handle.resume().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_paused().await);
        assert!(handle.state().await.last_export.is_some());

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn failures_back_off_then_recover() {
        let config = SchedulerConfig::new(Duration::from_secs(60)).with_backoff(
            Duration::from_millis(10),
            Duration::from_millis(40),
            2.0,
        );
        let scheduler = Scheduler::new(config);
        let handle = scheduler.handle();

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let task = tokio::spawn(async move {
            scheduler
                .run(move || {
                    let counter = Arc::clone(&counter);
                    async move {
                        if counter.fetch_add(1, Ordering::SeqCst) < 3 {
                            Err(JobError::task("simulated"))
                        } else {
                            Ok(report())
                        }
                    }
                })
                .await;
        });

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        let state = handle.state().await;
        assert_eq!(state.consecutive_failures, 0);
        assert!(state.last_report.is_some());

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn commands_keep_the_export_deadline() {
        let scheduler = Scheduler::new(SchedulerConfig::new(Duration::from_secs(60)));
        let handle = scheduler.handle();

        let runs = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&runs);
        let task = tokio::spawn(scheduler.run(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(report())
            }
        }));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        handle.pause().await.unwrap();
        handle.resume().await.unwrap();
        handle.export_now().await.unwrap();

        // Due at 60s from start, not 60s from the last command.
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        handle.stop().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn dropping_handles_stops_scheduler() {
        let scheduler = Scheduler::new(SchedulerConfig::new(Duration::from_secs(60)));
        let handle = scheduler.handle();
        let task = tokio::spawn(scheduler.run(|| async { Ok(report()) }));

        drop(handle);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
