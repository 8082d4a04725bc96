// lpad-aio/src/lock.rs
//! Advisory, cross-process lock on an install root.
//!
//! Two installs into the same prefix would otherwise interleave writes. The
//! lock is held for the whole mirror-and-install call and released on drop.
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fs4::fs_std::FileExt;
use lpad_common::error::{LpadError, Result};
use tracing::debug;

const STARTING_BACKOFF: Duration = Duration::from_millis(10);
const MAX_BACKOFF: Duration = Duration::from_millis(500);
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug)]
pub struct InstallLock {
    // Lock is released when this handle closes.
    file: Arc<File>,
    path: PathBuf,
}

impl InstallLock {
    /// Waits up to `timeout` for an exclusive lock on `lock_path`.
    pub async fn acquire(lock_path: &Path, timeout: Duration) -> Result<Self> {
        debug!(lock = %lock_path.display(), "Waiting for install lock");

        let path = lock_path.to_path_buf();
        let open_path = path.clone();
        let file = tokio::task::spawn_blocking(move || crate::fs::open_or_create(&open_path))
            .await
            .map_err(|e| LpadError::Lock(format!("lock task panicked: {e}")))??;
        let file = Arc::new(file);

        let start = Instant::now();
        let mut delay = STARTING_BACKOFF;
        loop {
            let attempt = Arc::clone(&file);
            let locked = tokio::task::spawn_blocking(move || attempt.try_lock_exclusive())
                .await
                .map_err(|e| LpadError::Lock(format!("lock task panicked: {e}")))?;

            if let Ok(true) = locked {
                debug!(
                    lock = %path.display(),
                    wait_ms = start.elapsed().as_millis() as u64,
                    "Install lock acquired"
                );
                return Ok(Self { file, path });
            }

            let remaining = timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                return Err(LpadError::Lock(format!(
                    "timed out after {:?} waiting for {} (another install running?)",
                    timeout,
                    path.display()
                )));
            }
            tokio::time::sleep(delay.min(remaining)).await;
            delay = (delay * 2).min(MAX_BACKOFF);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(self.file.as_ref()) {
            debug!(lock = %self.path.display(), error = %e, "Failed to unlock install lock");
        } else {
            debug!(lock = %self.path.display(), "Install lock released");
        }
    }
}
