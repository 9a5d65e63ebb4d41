use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A default config file was written; the user has to fill in the secret.
    #[error("configuration file created: {}", .0.display())]
    Created(PathBuf),
    #[error("missing upload secret in {}", .0.display())]
    MissingSecret(PathBuf),
    #[error("parse {}, err: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("timed out after {waited:?} waiting for {}", .path.display())]
    TimedOut {
        path: PathBuf,
        waited: std::time::Duration,
    },
    #[error("cancelled while waiting for {}", .0.display())]
    Cancelled(PathBuf),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed server response: {0}")]
    Json(#[from] serde_json::Error),
}
