//! TOML file configuration.
//!
//! These structs directly map to the `odc-config.toml` file format.

use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Root URL of the dispatch server (e.g., "https://dispatch.example.com/").
    pub base_url: Url,
}

/// Authentication configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Name of the environment variable holding the staff bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
        }
    }
}

fn default_token_env() -> String {
    "ODC_TOKEN".to_string()
}

/// Console behaviour section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Seconds between fleet summary log lines.
    #[serde(default = "default_summary_interval")]
    pub summary_interval_secs: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            summary_interval_secs: default_summary_interval(),
        }
    }
}

fn default_summary_interval() -> u64 {
    30
}

impl FileConfig {
    /// Load and parse the configuration file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}
