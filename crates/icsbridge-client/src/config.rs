//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/icsbridge/config.toml` by default. Every section and key is
//! optional:
//!
//! ```toml
//! [output]
//! directory = "/srv/calendars"
//! name = "work"
//! calendar_name = "Work"
//!
//! [schedule]
//! update_frequency = "every_30_minutes"
//!
//! [window]
//! lookbehind_days = 30
//! lookahead_days = 90
//!
//! [source]
//! snapshot = "/var/lib/icsbridge/snapshot.json"
//!
//! [export]
//! region_hint = "NL"
//! distinct_occurrence_uids = false
//!
//! [notify]
//! on_change = true
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use icsbridge_core::ics::DEFAULT_PRODUCT_ID;
use icsbridge_core::{DocumentOptions, UidStrategy, WindowsZoneTable};
use icsbridge_providers::SnapshotSource;
use icsbridge_server::{
    ChangeNotifier, ExportJob, ExportWindow, NotifyConfig, SchedulerConfig, destination_path,
};
use serde::{Deserialize, Serialize};

/// Configuration for the icsbridge client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub output: OutputSettings,
    pub schedule: ScheduleSettings,
    pub window: WindowSettings,
    pub source: SourceSettings,
    pub export: ExportSettings,
    pub notify: NotifySettings,
}

/// Where the calendar file goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub directory: PathBuf,
    /// File name without the `.ics` extension.
    pub name: String,
    /// `X-WR-CALNAME` value.
    pub calendar_name: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: ClientConfig::default_data_dir(),
            name: "calendar".to_string(),
            calendar_name: "Calendar".to_string(),
        }
    }
}

/// How often `icsbridge run` exports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateFrequency {
    #[serde(rename = "every_5_minutes")]
    Every5Minutes,
    #[serde(rename = "every_10_minutes")]
    Every10Minutes,
    #[serde(rename = "every_30_minutes")]
    Every30Minutes,
    #[default]
    EveryHour,
    #[serde(rename = "every_6_hours")]
    Every6Hours,
    EveryDay,
}

impl UpdateFrequency {
    pub fn as_duration(&self) -> Duration {
        let minutes = match self {
            Self::Every5Minutes => 5,
            Self::Every10Minutes => 10,
            Self::Every30Minutes => 30,
            Self::EveryHour => 60,
            Self::Every6Hours => 6 * 60,
            Self::EveryDay => 24 * 60,
        };
        Duration::from_secs(minutes * 60)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    pub update_frequency: UpdateFrequency,
}

/// Days around today covered by each export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub lookbehind_days: u32,
    pub lookahead_days: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        let window = ExportWindow::default();
        Self {
            lookbehind_days: window.lookbehind_days,
            lookahead_days: window.lookahead_days,
        }
    }
}

/// Appointment source settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// JSON snapshot written by the calendar host. Defaults to
    /// `snapshot.json` in the data directory.
    pub snapshot: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Region used to pick a zone when a Windows zone spans several.
    pub region_hint: String,
    pub product_id: String,
    /// Give each changed occurrence its own `UID` instead of the master's.
    pub distinct_occurrence_uids: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            region_hint: icsbridge_core::ics::DEFAULT_REGION.to_string(),
            product_id: DEFAULT_PRODUCT_ID.to_string(),
            distinct_occurrence_uids: false,
        }
    }
}

/// Desktop notifications from `icsbridge run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifySettings {
    /// Notify after every scheduled export.
    pub on_change: bool,
    pub on_unwritable: bool,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            on_change: false,
            on_unwritable: true,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("icsbridge")
    }

    /// Returns the default data directory path.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("icsbridge")
    }

    /// Checks values the TOML parser cannot.
    pub fn validate(&self) -> Result<(), String> {
        let name = self.output.name.as_str();
        if name.is_empty() {
            return Err("output.name must not be empty".to_string());
        }
        if name.contains(['/', '\\']) {
            return Err(format!("output.name must be a file name, got {:?}", name));
        }
        if self.output.calendar_name.is_empty() {
            return Err("output.calendar_name must not be empty".to_string());
        }
        if self.export.region_hint.is_empty() {
            return Err("export.region_hint must not be empty".to_string());
        }
        if self.export.product_id.is_empty() {
            return Err("export.product_id must not be empty".to_string());
        }
        Ok(())
    }

    /// `<directory>/<name>.ics`.
    pub fn destination(&self) -> PathBuf {
        destination_path(&self.output.directory, &self.output.name)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.source
            .snapshot
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("snapshot.json"))
    }

    pub fn export_window(&self) -> ExportWindow {
        ExportWindow {
            lookbehind_days: self.window.lookbehind_days,
            lookahead_days: self.window.lookahead_days,
        }
    }

    pub fn document_options(&self) -> DocumentOptions {
        let strategy = if self.export.distinct_occurrence_uids {
            UidStrategy::DistinctOccurrence
        } else {
            UidStrategy::SharedMaster
        };
        DocumentOptions::default()
            .with_product_id(&self.export.product_id)
            .with_region(&self.export.region_hint)
            .with_uid_strategy(strategy)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::new(self.schedule.update_frequency.as_duration())
    }

    pub fn notifier(&self) -> ChangeNotifier {
        ChangeNotifier::new(
            NotifyConfig::default()
                .with_on_change(self.notify.on_change)
                .with_on_unwritable(self.notify.on_unwritable),
        )
    }

    /// Builds the export job described by this configuration.
    pub fn export_job(&self) -> ExportJob {
        ExportJob::new(
            Arc::new(SnapshotSource::new(self.snapshot_path())),
            Arc::new(WindowsZoneTable::new()),
            self.destination(),
        )
        .with_options(self.document_options())
        .with_calendar_name(&self.output.calendar_name)
        .with_window(self.export_window())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config: ClientConfig = toml::from_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.window.lookbehind_days, 30);
        assert_eq!(config.window.lookahead_days, 90);
        assert_eq!(config.export.region_hint, "NL");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_all_sections() {
        let toml_content = r#"
[output]
directory = "/srv/calendars"
name = "work"
calendar_name = "Work"

[schedule]
update_frequency = "every_30_minutes"

[window]
lookahead_days = 14

[source]
snapshot = "/var/lib/icsbridge/snapshot.json"

[export]
region_hint = "BE"
distinct_occurrence_uids = true

[notify]
on_change = true
"#;
        let config: ClientConfig = toml::from_str(toml_content).unwrap();

        assert_eq!(config.destination(), PathBuf::from("/srv/calendars/work.ics"));
        assert_eq!(
            config.scheduler_config().export_interval,
            Duration::from_secs(30 * 60)
        );
        assert_eq!(config.export_window().lookbehind_days, 30);
        assert_eq!(config.export_window().lookahead_days, 14);
        assert_eq!(
            config.snapshot_path(),
            PathBuf::from("/var/lib/icsbridge/snapshot.json")
        );

        let options = config.document_options();
        assert_eq!(options.region, "BE");
        assert_eq!(options.uid_strategy, UidStrategy::DistinctOccurrence);
        assert_eq!(options.product_id, DEFAULT_PRODUCT_ID);

        assert!(config.notify.on_change);
        assert!(config.notify.on_unwritable);
    }

    #[test]
    fn notifier_follows_notify_section() {
        let report = icsbridge_core::ExportReport {
            path: None,
            bytes: 0,
            appointments: 0,
            event_blocks: 0,
            skipped: Vec::new(),
        };

        let quiet = ClientConfig::default();
        assert!(quiet.notifier().notice_for(&Ok(report.clone())).is_none());

        let config: ClientConfig = toml::from_str("[notify]\non_change = true\n").unwrap();
        let notice = config.notifier().notice_for(&Ok(report)).unwrap();
        assert_eq!(notice.summary, "Calendar updated");
    }

    #[test]
    fn unknown_frequency_is_rejected() {
        let result: Result<ClientConfig, _> =
            toml::from_str("[schedule]\nupdate_frequency = \"every_minute\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn frequencies_map_to_intervals() {
        assert_eq!(UpdateFrequency::Every5Minutes.as_duration(), Duration::from_secs(300));
        assert_eq!(UpdateFrequency::Every6Hours.as_duration(), Duration::from_secs(21_600));
        assert_eq!(UpdateFrequency::EveryDay.as_duration(), Duration::from_secs(86_400));
    }

    #[test]
    fn rejects_name_with_separator() {
        let mut config = ClientConfig::default();
        config.output.name = "../work".to_string();
        assert!(config.validate().unwrap_err().contains("file name"));

        config.output.name = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[output]\nname = \"team\"\n").unwrap();

        let config = ClientConfig::load_from(&path).unwrap();
        assert_eq!(config.output.name, "team");
        assert_eq!(config.output.calendar_name, "Calendar");

        let missing = ClientConfig::load_from(&dir.path().join("absent.toml"));
        assert!(missing.unwrap_err().contains("failed to read config"));
    }

    #[test]
    fn job_uses_configured_destination() {
        let mut config = ClientConfig::default();
        config.output.directory = PathBuf::from("/srv/calendars");
        config.output.name = "team".to_string();

        let job = config.export_job();
        assert_eq!(job.destination(), Path::new("/srv/calendars/team.ics"));
        assert_eq!(job.source_name(), "snapshot");
    }

    #[test]
    fn dump_round_trips() {
        let config = ClientConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: ClientConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
