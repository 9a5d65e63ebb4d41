use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Working-directory relative location used when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "monarch_config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    /// The secret sent with every chunk.
    #[serde(default)]
    upload_secret: String,
}

impl Config {
    #[cfg(test)]
    pub fn new(upload_secret: impl Into<String>) -> Self {
        Self {
            upload_secret: upload_secret.into(),
        }
    }

    pub fn upload_secret(&self) -> &str {
        &self.upload_secret
    }

    /// Load the config at `path`.
    ///
    /// A missing file is replaced by a default document with an empty secret and reported as
    /// [`ConfigError::Created`], so the caller can stop and let the user fill it in.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            Self::write_default(path)?;
            tracing::info!("Configuration file created: {}", path.display());
            tracing::info!("Please update the configuration file with your upload secret.");
            return Err(ConfigError::Created(path.to_path_buf()));
        }

        let content = std::fs::read(path)?;
        let config: Config =
            serde_json::from_slice(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if config.upload_secret.is_empty() {
            tracing::error!("Missing upload secret in {}.", path.display());
            return Err(ConfigError::MissingSecret(path.to_path_buf()));
        }

        Ok(config)
    }

    fn write_default(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        Self::default()
            .serialize(&mut ser)
            .map_err(std::io::Error::from)?;
        std::fs::write(path, buf)?;
        Ok(())
    }
}

/// Resolve the config location, falling back to [`DEFAULT_CONFIG_FILE`].
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}
