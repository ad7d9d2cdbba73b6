use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub vm: VmConfig,
    pub agent: AgentSettings,
    pub timeouts: TimeoutConfig,
    /// Seconds between refreshes in `lantern watch`.
    pub refresh_interval_secs: u64,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vm: VmConfig::default(),
            agent: AgentSettings::default(),
            timeouts: TimeoutConfig::default(),
            refresh_interval_secs: 5,
            log_level: "warn".to_string(),
            log_json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    pub name: String,
    pub multipass: String,
    pub cpus: Option<u32>,
    pub memory: Option<String>,
    pub disk: Option<String>,
    pub image: Option<String>,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            name: "agent".to_string(),
            multipass: "multipass".to_string(),
            cpus: None,
            memory: None,
            disk: None,
            image: None,
        }
    }
}

/// Where the agent keeps its files, inside the VM and on the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Name of the agent CLI inside the VM.
    pub cli: String,
    pub config_path: String,
    pub auth_path: String,
    pub host_config_path: PathBuf,
    pub service_unit: String,
    /// VM directory that `mount add` uses when no target is given.
    pub default_mount_dir: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
        Self {
            cli: "agent".to_string(),
            config_path: "/home/ubuntu/.agent/config.json".to_string(),
            auth_path: "/home/ubuntu/.agent/auth.json".to_string(),
            host_config_path: home.join(".agent").join("config.json"),
            service_unit: "agent-gateway".to_string(),
            default_mount_dir: "/home/ubuntu/mnt".to_string(),
        }
    }
}

/// Per-operation timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub info_secs: u64,
    pub read_secs: u64,
    pub probe_secs: u64,
    pub action_secs: u64,
    pub lifecycle_secs: u64,
    pub interactive_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            info_secs: 10,
            read_secs: 5,
            probe_secs: 3,
            action_secs: 30,
            lifecycle_secs: 120,
            interactive_secs: 120,
        }
    }
}

impl TimeoutConfig {
    pub fn info(&self) -> Duration {
        Duration::from_secs(self.info_secs)
    }

    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }

    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }

    pub fn action(&self) -> Duration {
        Duration::from_secs(self.action_secs)
    }

    pub fn lifecycle(&self) -> Duration {
        Duration::from_secs(self.lifecycle_secs)
    }

    pub fn interactive(&self) -> Duration {
        Duration::from_secs(self.interactive_secs)
    }
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("could not determine config directory")?;
        Ok(config_dir.join("lantern").join("config.yaml"))
    }
}

/// Load config: defaults, then the YAML file (if present), then `LANTERN_*` env vars.
pub fn load(custom_path: Option<&Path>) -> Result<Config> {
    let path = match custom_path {
        Some(p) => p.to_path_buf(),
        None => Config::path()?,
    };
    load_from(&path)
}

fn load_from(path: &Path) -> Result<Config> {
    Figment::from(Serialized::defaults(Config::default()))
        .merge(Yaml::file(path))
        .merge(Env::prefixed("LANTERN_").split("__"))
        .extract()
        .with_context(|| format!("loading config from {}", path.display()))
}
