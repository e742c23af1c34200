//! Client configuration.

use crate::error::{Error, Result};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Development default; real deployments configure `server_url` via the
/// config file or `LABREC_SERVER_URL`.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Client configuration, merged from a TOML file and `LABREC_`-prefixed
/// environment variables (env wins).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base address of the record service.
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Fixed per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Where the bearer credential is persisted. Defaults to
    /// `$XDG_CONFIG_HOME/labrec/credentials.toml`.
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            timeout_secs: default_timeout_secs(),
            credentials_path: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration, merging the file (if any) with the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("LABREC_"));
        figment
            .extract()
            .map_err(|e| Error::Config(format!("failed to load client configuration: {e}")))
    }

    /// The request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve where the credential file lives.
    pub fn credentials_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.credentials_path {
            return Ok(path.clone());
        }
        let base = match std::env::var_os("XDG_CONFIG_HOME") {
            Some(path) => PathBuf::from(path),
            None => {
                let home = std::env::var_os("HOME").ok_or_else(|| {
                    Error::Config("HOME not set; set credentials_path explicitly".to_string())
                })?;
                PathBuf::from(home).join(".config")
            }
        };
        Ok(base.join("labrec").join("credentials.toml"))
    }

    /// Configuration pointed at a test server with an isolated credential
    /// file.
    ///
    /// **For testing only.**
    pub fn for_testing(server_url: &str, credentials_path: &Path) -> Self {
        Self {
            server_url: server_url.to_string(),
            timeout_secs: default_timeout_secs(),
            credentials_path: Some(credentials_path.to_path_buf()),
        }
    }
}
