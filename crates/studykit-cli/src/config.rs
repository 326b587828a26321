//! Client configuration at `~/.studykit/config.toml`.
//!
//! Every field is optional. CLI flags always override config file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use studykit_client::{SessionConfig, SyncConfig};
use tracing::debug;

/// Top-level config file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub terminal: TerminalSection,
    #[serde(default)]
    pub sync: SyncSection,
}

/// `[terminal]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalSection {
    /// WebSocket endpoint of the sandbox terminal.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

impl Default for TerminalSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

/// `[sync]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSection {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_health_path")]
    pub health_path: String,

    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,

    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Where the pending queue is persisted (default `~/.studykit/data`).
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Bearer token. When unset, the `auth_token` entry in the data
    /// directory is used.
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            health_path: default_health_path(),
            probe_interval_secs: default_probe_interval_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            data_dir: None,
            token: None,
        }
    }
}

fn default_reconnect_delay_ms() -> u64 {
    100
}

fn default_api_base() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_probe_interval_secs() -> u64 {
    30
}

fn default_probe_timeout_secs() -> u64 {
    5
}

/// `~/.studykit`
pub fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".studykit")
}

impl Config {
    /// Load configuration from a TOML file, returning defaults if the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;

        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn session_config(&self, endpoint: Option<String>) -> SessionConfig {
        SessionConfig {
            endpoint: endpoint.or_else(|| self.terminal.endpoint.clone()),
            reconnect_delay: Duration::from_millis(self.terminal.reconnect_delay_ms),
            ..Default::default()
        }
    }

    pub fn sync_config(&self, api_base: Option<String>) -> SyncConfig {
        SyncConfig {
            api_base: api_base.unwrap_or_else(|| self.sync.api_base.clone()),
            health_path: self.sync.health_path.clone(),
            probe_interval: Duration::from_secs(self.sync.probe_interval_secs),
            probe_timeout: Duration::from_secs(self.sync.probe_timeout_secs),
            ..Default::default()
        }
    }

    pub fn data_dir(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.sync.data_dir.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| home_dir().join("data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = Config::default();
        assert_eq!(cfg.terminal.endpoint, None);
        assert_eq!(cfg.terminal.reconnect_delay_ms, 100);
        assert_eq!(cfg.sync.api_base, "http://localhost:3000/api");
        assert_eq!(cfg.sync.probe_interval_secs, 30);
        assert_eq!(cfg.sync.probe_timeout_secs, 5);
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[terminal]
endpoint = "wss://study.example/terminal"
reconnect_delay_ms = 250

[sync]
api_base = "https://study.example/api"
probe_interval_secs = 10
data_dir = "/var/lib/studykit"
token = "abc"
"#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(
            cfg.terminal.endpoint.as_deref(),
            Some("wss://study.example/terminal")
        );
        let session = cfg.session_config(None);
        assert_eq!(session.reconnect_delay, Duration::from_millis(250));

        let sync = cfg.sync_config(None);
        assert_eq!(sync.api_base, "https://study.example/api");
        assert_eq!(sync.probe_interval, Duration::from_secs(10));
        assert_eq!(sync.probe_timeout, Duration::from_secs(5));
        assert_eq!(cfg.data_dir(None), PathBuf::from("/var/lib/studykit"));
        assert_eq!(cfg.sync.token.as_deref(), Some("abc"));
    }

    #[test]
    fn flags_override_config() {
        let cfg: Config = toml::from_str("[terminal]\nendpoint = \"ws://a\"\n").unwrap();
        let session = cfg.session_config(Some("ws://b".into()));
        assert_eq!(session.endpoint.as_deref(), Some("ws://b"));
        let sync = cfg.sync_config(Some("http://c".into()));
        assert_eq!(sync.api_base, "http://c");
        assert_eq!(cfg.data_dir(Some("/tmp/x".into())), PathBuf::from("/tmp/x"));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = Config::load(Path::new("/definitely/not/here.toml")).unwrap();
        assert_eq!(cfg.sync.health_path, "/health");
    }
}
