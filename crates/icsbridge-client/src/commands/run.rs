//! Scheduled export command.

use std::sync::Arc;

use icsbridge_server::Scheduler;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Exports on the configured schedule until Ctrl-C.
pub async fn run(config: &ClientConfig) -> ClientResult<()> {
    config.validate().map_err(ClientError::Config)?;

    let job = Arc::new(config.export_job());
    // Refuse to start against a destination that can never be written.
    job.check_destination()?;

    let notifier = Arc::new(config.notifier());
    let scheduler = Scheduler::new(config.scheduler_config());
    let handle = scheduler.handle();

    info!(
        path = %job.destination().display(),
        interval_secs = config.scheduler_config().export_interval.as_secs(),
        "starting scheduled export"
    );

    let task = tokio::spawn(scheduler.run(move || {
        let job = Arc::clone(&job);
        let notifier = Arc::clone(&notifier);
        async move {
            let result = job.run_once().await;
            notifier.notify(&result);
            result
        }
    }));

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, stopping");

    if handle.stop().await.is_err() {
        warn!("scheduler already stopped");
    }
    task.await
        .map_err(|e| ClientError::Io(std::io::Error::other(e)))?;

    if let Some(error) = handle.state().await.last_error {
        warn!(error = %error, "last export failed");
    }
    Ok(())
}
