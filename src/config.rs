//! Fleet configuration loading.
//!
//! Loads the host table from `fleet.toml` (or `$FLEETWATCH_CONFIG`).
//! The loaded collection is immutable and explicitly injected into the
//! orchestrator; nothing in this crate reads configuration through
//! module-level state.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// One TCP connectivity target.
#[derive(Debug, Clone, Deserialize)]
pub struct TcpTarget {
    /// Address to connect to (IP or resolvable name).
    pub address: String,
    /// TCP port.
    pub port: u16,
}

/// Static configuration for one monitored host.
#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    /// Short host identifier used on the CLI and as the state-map key.
    pub id: String,
    /// Human-readable role description.
    #[serde(default)]
    pub name: String,
    /// Connection aliases tried in order; first is the preferred route.
    pub ssh_aliases: Vec<String>,
    /// HTTP check URLs; empty means the HTTP layer is skipped.
    #[serde(default)]
    pub http_urls: Vec<String>,
    /// TCP connectivity targets.
    #[serde(default)]
    pub tcp_checks: Vec<TcpTarget>,
    /// Baseline timeout in seconds, kept for operator reference; live
    /// timeouts come from the adaptive calculator.
    #[serde(default = "default_base_timeout")]
    pub base_timeout_secs: u64,
}

fn default_base_timeout() -> u64 {
    5
}

/// Top-level fleet configuration loaded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Monitored hosts, in CLI/report order.
    pub hosts: Vec<HostConfig>,
    /// Optional state-file override; defaults to the platform data dir.
    pub state_path: Option<PathBuf>,
}

impl FleetConfig {
    /// Load configuration from `path` when given, else `$FLEETWATCH_CONFIG`,
    /// else `./fleet.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error when the file is missing, unreadable, or not
    /// valid TOML. Monitoring without a host table is meaningless, so a
    /// missing config file does not degrade to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path_with(|key| std::env::var(key).ok()),
        };
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read fleet config {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse fleet config {}", path.display()))?;
        tracing::info!(path = %path.display(), hosts = config.hosts.len(), "fleet config loaded");
        Ok(config)
    }

    /// Resolve the config path using a custom env resolver (for testing).
    fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        env("FLEETWATCH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("fleet.toml"))
    }

    /// Look up a host by identifier.
    pub fn host(&self, id: &str) -> Option<&HostConfig> {
        self.hosts.iter().find(|h| h.id == id)
    }

    /// Resolve the state-file path: CLI override, then config, then
    /// `$FLEETWATCH_STATE`, then the platform data directory.
    pub fn resolve_state_path(&self, override_path: Option<&Path>) -> PathBuf {
        if let Some(p) = override_path {
            return p.to_path_buf();
        }
        if let Some(ref p) = self.state_path {
            return p.clone();
        }
        if let Ok(p) = std::env::var("FLEETWATCH_STATE") {
            return PathBuf::from(p);
        }
        directories::ProjectDirs::from("", "", "fleetwatch")
            .map(|dirs| dirs.data_dir().join("health-state.json"))
            .unwrap_or_else(|| PathBuf::from("health-state.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [[hosts]]
        id = "s61"
        name = "Gateway"
        ssh_aliases = ["s61-vpn", "s61-pub"]
        http_urls = ["https://gateway.example.org"]
        tcp_checks = [{ address = "100.64.0.2", port = 20 }]
        base_timeout_secs = 8

        [[hosts]]
        id = "s60"
        ssh_aliases = ["s60-vpn"]
    "#;

    #[test]
    fn parses_host_table() {
        let config: FleetConfig = toml::from_str(SAMPLE).expect("parse");
        assert_eq!(config.hosts.len(), 2);
        let s61 = config.host("s61").expect("s61 present");
        assert_eq!(s61.ssh_aliases, vec!["s61-vpn", "s61-pub"]);
        assert_eq!(s61.tcp_checks[0].port, 20);
        assert_eq!(s61.base_timeout_secs, 8);
    }

    #[test]
    fn omitted_fields_get_defaults() {
        let config: FleetConfig = toml::from_str(SAMPLE).expect("parse");
        let s60 = config.host("s60").expect("s60 present");
        assert!(s60.http_urls.is_empty());
        assert!(s60.tcp_checks.is_empty());
        assert_eq!(s60.base_timeout_secs, 5);
        assert!(s60.name.is_empty());
    }

    #[test]
    fn unknown_host_lookup_is_none() {
        let config: FleetConfig = toml::from_str(SAMPLE).expect("parse");
        assert!(config.host("s99").is_none());
    }

    #[test]
    fn env_override_wins_for_config_path() {
        let path = FleetConfig::config_path_with(|key| {
            (key == "FLEETWATCH_CONFIG").then(|| "/etc/fleetwatch/fleet.toml".to_owned())
        });
        assert_eq!(path, PathBuf::from("/etc/fleetwatch/fleet.toml"));
        let fallback = FleetConfig::config_path_with(|_| None);
        assert_eq!(fallback, PathBuf::from("fleet.toml"));
    }

    #[test]
    fn explicit_state_path_beats_config() {
        let config: FleetConfig = toml::from_str(
            r#"
            state_path = "/var/lib/fleetwatch/state.json"
            "#,
        )
        .expect("parse");
        let explicit = config.resolve_state_path(Some(Path::new("/tmp/override.json")));
        assert_eq!(explicit, PathBuf::from("/tmp/override.json"));
        let from_config = config.resolve_state_path(None);
        assert_eq!(from_config, PathBuf::from("/var/lib/fleetwatch/state.json"));
    }
}
