//! Gathers VM and agent state into a [`VmSnapshot`].
//!
//! Collection never fails. Each probe that cannot complete degrades its own
//! field to a default and emits a tracing event naming the field.
//!
//! Order of work:
//! 1. `multipass info` (the state gate; nothing runs in the VM unless it is Running)
//! 2. in-VM config, in-VM auth store, host config and version probe, concurrently
//! 3. workspace directory probe (needs the decoded workspace path)
//! 4. service unit probes, concurrently

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::config::{AgentSettings, Config, TimeoutConfig};
use crate::multipass::{shell_quote, ToolError, VmTool};

use super::agent_config::{decode_auth, decode_config, AgentConfig, AuthStore};
use super::channel::{classify_channel, Channel};
use super::provider::Provider;
use super::snapshot::VmSnapshot;
use super::vm_info::{parse_info, VmInfo, VmState};

pub struct SnapshotCollector<T> {
    tool: T,
    vm_name: String,
    agent: AgentSettings,
    timeouts: TimeoutConfig,
}

impl<T: VmTool> SnapshotCollector<T> {
    pub fn new(tool: T, vm_name: &str, agent: AgentSettings, timeouts: TimeoutConfig) -> Self {
        Self {
            tool,
            vm_name: vm_name.to_string(),
            agent,
            timeouts,
        }
    }

    pub fn from_config(tool: T, cfg: &Config) -> Self {
        Self::new(tool, &cfg.vm.name, cfg.agent.clone(), cfg.timeouts.clone())
    }

    /// Collect a complete snapshot of the VM and its agent.
    pub async fn collect(&self) -> VmSnapshot {
        let info = fetch_info(&self.tool).await;
        let mut snapshot = VmSnapshot::from_info(&self.vm_name, info, Utc::now());

        if !snapshot.state.is_running() {
            debug!(vm = %self.vm_name, state = %snapshot.state, "VM not running, skipping in-VM probes");
            return snapshot;
        }

        let (vm_config, auth, host_config, version) = tokio::join!(
            self.read_remote("config", &self.agent.config_path),
            self.read_remote("auth_store", &self.agent.auth_path),
            read_host(&self.agent.host_config_path),
            self.probe_version(),
        );

        snapshot.agent_version = version;
        snapshot.config_exists = vm_config.is_some();
        snapshot.auth_store_exists = auth.is_some();
        snapshot.host_config_exists = host_config.is_some();

        let config = vm_config
            .map(|content| {
                decode_config(&content).unwrap_or_else(|e| {
                    warn!(path = %self.agent.config_path, error = %e, "failed to decode agent config");
                    AgentConfig::default()
                })
            })
            .unwrap_or_default();

        let auth = auth
            .map(|content| {
                decode_auth(&content).unwrap_or_else(|e| {
                    warn!(path = %self.agent.auth_path, error = %e, "failed to decode credential store");
                    AuthStore::default()
                })
            })
            .unwrap_or_default();

        let host_config = host_config.and_then(|content| match decode_config(&content) {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                warn!(
                    path = %self.agent.host_config_path.display(),
                    error = %e,
                    "failed to decode host agent config"
                );
                None
            }
        });

        snapshot.workspace_path = config.workspace().to_string();
        if !snapshot.workspace_path.is_empty() {
            snapshot.workspace_exists = self.probe_dir(&snapshot.workspace_path).await;
        }

        snapshot.openai = Provider::OpenAi.classify(&config, &auth);
        snapshot.anthropic = Provider::Anthropic.classify(&config, &auth);
        snapshot.discord = classify_channel(Channel::Discord.config(&config));
        snapshot.telegram = classify_channel(Channel::Telegram.config(&config));

        if let Some(host) = &host_config {
            snapshot.host_discord = classify_channel(Channel::Discord.config(host));
            snapshot.host_telegram = classify_channel(Channel::Telegram.config(host));
        }

        let (installed, running) = tokio::join!(self.probe_unit_file(), self.probe_unit_active());
        snapshot.service_installed = installed;
        snapshot.service_running = running;

        snapshot
    }

    /// `cat` a file inside the VM. `None` when unreadable or blank.
    async fn read_remote(&self, field: &'static str, path: &str) -> Option<String> {
        let content = self
            .probe(field, &["cat", path], self.timeouts.read())
            .await?;
        if content.trim().is_empty() {
            debug!(field, path, "file is blank, treating as absent");
            return None;
        }
        Some(content)
    }

    async fn probe_version(&self) -> String {
        self.probe(
            "agent_version",
            &[self.agent.cli.as_str(), "--version"],
            self.timeouts.read(),
        )
        .await
        .and_then(|out| {
            out.lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "unknown".into())
    }

    async fn probe_dir(&self, path: &str) -> bool {
        let script = format!("test -d {}", vm_shell_path(path));
        self.probe("workspace", &["sh", "-c", &script], self.timeouts.probe())
            .await
            .is_some()
    }

    async fn probe_unit_file(&self) -> bool {
        let unit_file = format!("/etc/systemd/system/{}.service", self.agent.service_unit);
        self.probe("service_installed", &["test", "-f", &unit_file], self.timeouts.probe())
            .await
            .is_some()
    }

    async fn probe_unit_active(&self) -> bool {
        self.probe(
            "service_running",
            &["systemctl", "is-active", &self.agent.service_unit],
            self.timeouts.probe(),
        )
        .await
        .is_some_and(|out| out.trim() == "active")
    }

    /// Run a probe in the VM, logging the failure against `field`.
    async fn probe(&self, field: &'static str, argv: &[&str], timeout: Duration) -> Option<String> {
        match self.tool.exec(argv, timeout).await {
            Ok(out) => Some(out),
            // A non-zero exit is the normal "no" answer for test/cat/is-active.
            Err(e @ ToolError::Failed { .. }) => {
                debug!(field, error = %e, "probe returned non-zero");
                None
            }
            Err(e) => {
                warn!(field, error = %e, "probe failed");
                None
            }
        }
    }
}

/// Fetch and parse `multipass info`. Any failure reads as NotFound.
pub async fn fetch_info<T: VmTool>(tool: &T) -> VmInfo {
    match tool.info().await {
        Ok(output) => parse_info(&output),
        Err(e) => {
            debug!(error = %e, "multipass info failed, reporting VM as not found");
            VmInfo::not_found()
        }
    }
}

/// Just the VM state, for lifecycle actions.
pub async fn vm_state<T: VmTool>(tool: &T) -> VmState {
    fetch_info(tool).await.state
}

/// Read the host-side config. `None` when unreadable or blank.
async fn read_host(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) if content.trim().is_empty() => {
            debug!(path = %path.display(), "host config is blank, treating as absent");
            None
        }
        Ok(content) => Some(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no host config");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read host config");
            None
        }
    }
}

/// Shell form of a VM path, expanding a leading `~` to `$HOME`.
fn vm_shell_path(path: &str) -> String {
    if path == "~" {
        "\"$HOME\"".to_string()
    } else if let Some(rest) = path.strip_prefix("~/") {
        format!("\"$HOME\"/{}", shell_quote(rest))
    } else {
        shell_quote(path)
    }
}
