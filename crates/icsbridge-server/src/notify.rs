//! Desktop notifications for export outcomes.
//!
//! A destination that cannot be written is always reported. Successful
//! exports and other failures are reported only when `on_change` is set.

use std::time::Duration;

use icsbridge_core::ExportReport;
use notify_rust::Notification;
#[cfg(target_os = "linux")]
use notify_rust::Urgency;
use tracing::{debug, error, info};

use crate::error::{JobError, JobResult};

/// Configuration for export notifications.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Notify after every export, not only unwritable destinations.
    pub on_change: bool,
    /// Notify when the destination cannot be written.
    pub on_unwritable: bool,
    pub app_name: String,
    pub timeout_secs: u32,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            on_change: false,
            on_unwritable: true,
            app_name: "icsbridge".to_string(),
            timeout_secs: 5,
        }
    }
}

impl NotifyConfig {
    /// Builder: notify after every export.
    #[must_use]
    pub fn with_on_change(mut self, on_change: bool) -> Self {
        self.on_change = on_change;
        self
    }

    /// Builder: notify when the destination cannot be written.
    #[must_use]
    pub fn with_on_unwritable(mut self, on_unwritable: bool) -> Self {
        self.on_unwritable = on_unwritable;
        self
    }
}

/// A notification ready to be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub summary: String,
    pub body: String,
    pub is_error: bool,
}

/// Shows a desktop notification after each export run.
#[derive(Debug, Clone, Default)]
pub struct ChangeNotifier {
    config: NotifyConfig,
}

impl ChangeNotifier {
    pub fn new(config: NotifyConfig) -> Self {
        Self { config }
    }

    /// The notice for an export outcome, if one should be shown.
    pub fn notice_for(&self, result: &JobResult<ExportReport>) -> Option<Notice> {
        match result {
            Ok(report) if self.config.on_change => Some(Notice {
                summary: "Calendar updated".to_string(),
                body: format!("{} events written", report.event_blocks),
                is_error: false,
            }),
            Ok(_) => None,
            Err(JobError::NotWritable { .. }) if self.config.on_unwritable => Some(Notice {
                summary: "Calendar not updated".to_string(),
                body: "No permissions to file or file doesn't exist".to_string(),
                is_error: true,
            }),
            Err(JobError::NotWritable { .. }) => None,
            Err(e) if self.config.on_change => Some(Notice {
                summary: "Calendar not updated".to_string(),
                body: e.to_string(),
                is_error: true,
            }),
            Err(_) => None,
        }
    }

    /// Shows the notice for `result`. Returns true if one was shown.
    pub fn notify(&self, result: &JobResult<ExportReport>) -> bool {
        match self.notice_for(result) {
            Some(notice) => self.show(&notice),
            None => false,
        }
    }

    fn show(&self, notice: &Notice) -> bool {
        debug!(summary = %notice.summary, "Sending notification");

        let mut notification = Notification::new();
        notification
            .appname(&self.config.app_name)
            .summary(&notice.summary)
            .body(&notice.body)
            .timeout(Duration::from_secs(u64::from(self.config.timeout_secs)));

        #[cfg(target_os = "linux")]
        notification.urgency(if notice.is_error {
            Urgency::Critical
        } else {
            Urgency::Low
        });

        match notification.show() {
            Ok(_) => {
                info!(summary = %notice.summary, "Notification sent");
                true
            }
            Err(e) => {
                error!(error = %e, summary = %notice.summary, "Failed to send notification");
                false
            }
        }
    }
}
