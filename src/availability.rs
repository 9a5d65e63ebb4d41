use std::{
    io::ErrorKind,
    path::Path,
    time::{Duration, Instant},
};

use tokio_util::sync::CancellationToken;

use crate::error::WaitError;

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Delay between two polls.
    pub interval: Duration,
    /// Give up after this long. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            timeout: None,
        }
    }
}

/// Whether another process still holds `path`.
///
/// Opening for read and write is the probe. This only catches mandatory locks and missing
/// permissions; a writer with an advisory lock goes unnoticed. A path that does not exist is
/// reported as free, the uploader deals with it.
pub async fn is_in_use<P: AsRef<Path>>(path: P) -> bool {
    match tokio::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(path.as_ref())
        .await
    {
        Ok(_) => false,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(_) => true,
    }
}

/// Block until [`is_in_use`] turns false, the timeout elapses or `cancel` fires.
pub async fn wait_until_available<P: AsRef<Path>>(
    path: P,
    opts: &WaitOptions,
    cancel: &CancellationToken,
) -> Result<(), WaitError> {
    let path = path.as_ref();
    let started = Instant::now();

    while is_in_use(path).await {
        if let Some(timeout) = opts.timeout {
            let waited = started.elapsed();
            if waited >= timeout {
                return Err(WaitError::TimedOut {
                    path: path.to_path_buf(),
                    waited,
                });
            }
        }

        tracing::info!("Waiting for the file to become available...");
        tokio::select! {
            _ = cancel.cancelled() => return Err(WaitError::Cancelled(path.to_path_buf())),
            _ = tokio::time::sleep(opts.interval) => {}
        }
    }

    Ok(())
}
