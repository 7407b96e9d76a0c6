use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const ENV_PREFIX: &str = "SHUTTERFEED_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
}

/// Limits and policies for [`DbClient`](crate::client::DbClient).
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_upload_timeout_ms")]
    pub upload_timeout_ms: u64,
    /// Applies to document and subdocument writes as well as reads.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    #[serde(default = "default_link_timeout_ms")]
    pub link_timeout_ms: u64,
    /// Delete an uploaded image again when the post document cannot be written.
    #[serde(default = "default_cleanup_orphaned_images")]
    pub cleanup_orphaned_images: bool,
}

fn default_upload_timeout_ms() -> u64 {
    30_000
}

fn default_write_timeout_ms() -> u64 {
    10_000
}

fn default_link_timeout_ms() -> u64 {
    10_000
}

fn default_cleanup_orphaned_images() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            upload_timeout_ms: default_upload_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            link_timeout_ms: default_link_timeout_ms(),
            cleanup_orphaned_images: default_cleanup_orphaned_images(),
        }
    }
}

impl ClientConfig {
    /// Reads `SHUTTERFEED_*` variables, loading a `.env` file first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if e.not_found() {
                debug!("No .dotenv file found");
            } else {
                return Err(e.into());
            }
        }

        Self::from_vars(std::env::vars())
    }

    /// Reads the configuration from `(name, value)` pairs using the
    /// `SHUTTERFEED_` prefix.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .map_err(ConfigError::from)
    }

    #[must_use]
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload_timeout_ms)
    }

    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    #[must_use]
    pub fn link_timeout(&self) -> Duration {
        Duration::from_millis(self.link_timeout_ms)
    }
}
