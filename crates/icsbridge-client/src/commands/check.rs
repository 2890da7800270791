//! Write pre-check command.

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Reports whether the destination directory accepts the calendar file.
pub fn run(config: &ClientConfig) -> ClientResult<()> {
    let job = config.export_job();
    job.check_destination()?;
    println!("{} is writable", job.destination().display());
    Ok(())
}
