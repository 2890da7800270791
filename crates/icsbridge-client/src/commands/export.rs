//! One-shot export command.

use icsbridge_core::ExportReport;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Runs one export and prints its report.
pub async fn run(config: &ClientConfig, json: bool) -> ClientResult<()> {
    let report = export(config).await?;

    if json {
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| ClientError::Io(std::io::Error::other(e)))?;
        println!("{}", text);
    } else {
        print!("{}", summary(&report));
    }
    Ok(())
}

/// Validates the configuration and runs one export.
pub async fn export(config: &ClientConfig) -> ClientResult<ExportReport> {
    config.validate().map_err(ClientError::Config)?;
    Ok(config.export_job().run_once().await?)
}

/// Human-readable report: one summary line, then one line per skipped
/// occurrence.
pub fn summary(report: &ExportReport) -> String {
    let path = report
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let mut out = format!(
        "wrote {} ({} appointments, {} events, {} bytes)\n",
        path, report.appointments, report.event_blocks, report.bytes
    );
    for skipped in &report.skipped {
        out.push_str(&format!("skipped {}\n", skipped));
    }
    out
}
