//! Atomic file replacement and per-destination locking.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tempfile::NamedTempFile;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use crate::error::{ExportError, ExportResult};

type DestinationMutex = Arc<tokio::sync::Mutex<()>>;

static DESTINATION_LOCKS: OnceLock<Mutex<HashMap<PathBuf, DestinationMutex>>> = OnceLock::new();

fn lock_key(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Returns the process-wide lock for a destination path.
///
/// Every call with the same path (after making it absolute) returns the same
/// mutex while anyone still holds or waits on it. Idle entries are dropped
/// from the registry on each call.
pub fn destination_lock(path: &Path) -> DestinationMutex {
    let registry = DESTINATION_LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut locks = registry.lock().unwrap_or_else(PoisonError::into_inner);
    locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    Arc::clone(locks.entry(lock_key(path)).or_default())
}

/// Exclusive ownership of a destination for one export run.
///
/// Held from before the fetch until the file is replaced, so runs against
/// the same path read and write in the same order.
#[derive(Debug)]
pub struct DestinationGuard {
    path: PathBuf,
    _guard: OwnedMutexGuard<()>,
}

impl DestinationGuard {
    /// Waits for the destination to be free.
    pub async fn acquire(path: &Path) -> Self {
        let guard = destination_lock(path).lock_owned().await;
        Self {
            path: path.to_path_buf(),
            _guard: guard,
        }
    }

    /// Blocking variant of [`acquire`](Self::acquire).
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async runtime; use `acquire` there.
    pub fn acquire_blocking(path: &Path) -> Self {
        let guard = destination_lock(path).blocking_lock_owned();
        Self {
            path: path.to_path_buf(),
            _guard: guard,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Directory the temporary file is created in.
fn staging_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Replaces `path` with `contents`.
///
/// The bytes go to a temporary file next to the destination, which is synced
/// and then renamed over it. Readers see either the old file or the new one.
///
/// # Errors
///
/// Returns [`ExportError::Io`] if any step fails; the destination is then
/// unchanged and the temporary file is removed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> ExportResult<()> {
    let dir = staging_dir(path);
    let io_err = |source| ExportError::io(path, source);

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(contents).map_err(io_err)?;
    tmp.flush().map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    debug!(path = %path.display(), bytes = contents.len(), "replaced file");
    Ok(())
}

/// Checks that a file can be created in the directory of `path`.
///
/// Creates and removes a scratch file; the destination itself is not touched.
///
/// # Errors
///
/// Returns [`ExportError::Io`] when the directory is missing or not writable.
pub fn check_writable(path: &Path) -> ExportResult<()> {
    let dir = staging_dir(path);
    NamedTempFile::new_in(dir)
        .and_then(|scratch| scratch.close())
        .map_err(|source| ExportError::io(path, source))
}
