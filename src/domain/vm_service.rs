use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::config::{Config, VmConfig};
use crate::multipass::{Multipass, VmTool};

use super::channel::Channel;
use super::config_editor::{ConfigEditor, ConfigMutation};
use super::provider::Provider;
use super::snapshot_collector::vm_state;
use super::vm_info::VmState;

/// One-shot actions against the VM. Each returns a message for the operator.
pub struct VmService {
    multipass: Multipass,
    config: Config,
}

impl VmService {
    pub fn new(config: Config) -> Self {
        Self {
            multipass: Multipass::from_config(&config),
            config,
        }
    }

    fn name(&self) -> &str {
        &self.config.vm.name
    }

    /// Launch the VM if it does not exist, start it if stopped.
    pub async fn up(&self) -> Result<String> {
        let state = vm_state(&self.multipass).await;
        let timeout = self.config.timeouts.lifecycle();

        if state.is_running() {
            return Ok(format!("VM '{}' is already running", self.name()));
        }

        if state.is_absent() {
            let args = launch_args(&self.config.vm);
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            self.multipass
                .run(&args, timeout)
                .await
                .with_context(|| format!("failed to launch VM '{}'", self.name()))?;
            info!(vm = self.name(), "VM launched");
            return Ok(format!("Launched VM '{}'", self.name()));
        }

        self.multipass
            .run(&["start", self.name()], timeout)
            .await
            .with_context(|| format!("failed to start VM '{}'", self.name()))?;
        info!(vm = self.name(), previous = %state, "VM started");
        Ok(format!("Started VM '{}'", self.name()))
    }

    pub async fn stop(&self) -> Result<String> {
        match vm_state(&self.multipass).await {
            state if state.is_absent() => bail!("VM '{}' does not exist", self.name()),
            VmState::Stopped => Ok(format!("VM '{}' is already stopped", self.name())),
            _ => {
                self.multipass
                    .run(&["stop", self.name()], self.config.timeouts.lifecycle())
                    .await
                    .with_context(|| format!("failed to stop VM '{}'", self.name()))?;
                info!(vm = self.name(), "VM stopped");
                Ok(format!("Stopped VM '{}'", self.name()))
            }
        }
    }

    /// Mount a host folder. Without `vm_path`, it goes under the default mount dir.
    pub async fn mount_add(&self, host: &Path, vm_path: Option<&str>) -> Result<String> {
        let host = tokio::fs::canonicalize(host)
            .await
            .with_context(|| format!("host folder {} not found", host.display()))?;
        if !host.is_dir() {
            bail!("{} is not a directory", host.display());
        }

        let vm_path = match vm_path {
            Some(p) => p.to_string(),
            None => default_mount_target(&host, &self.config.agent.default_mount_dir)?,
        };
        let host_str = host.to_string_lossy();
        let target = self.multipass.vm_target(&vm_path);

        self.multipass
            .run(&["mount", &host_str, &target], self.config.timeouts.action())
            .await
            .with_context(|| format!("failed to mount {}", host.display()))?;
        info!(host = %host.display(), vm_path = %vm_path, "folder mounted");
        Ok(format!("Mounted {} at {}", host.display(), vm_path))
    }

    pub async fn mount_remove(&self, vm_path: &str) -> Result<String> {
        let target = self.multipass.vm_target(vm_path);
        self.multipass
            .run(&["umount", &target], self.config.timeouts.action())
            .await
            .with_context(|| format!("failed to unmount {}", vm_path))?;
        info!(vm_path, "folder unmounted");
        Ok(format!("Unmounted {}", vm_path))
    }

    /// Interactive provider login. The agent CLI owns the terminal until it exits.
    pub async fn login(&self, provider: Provider) -> Result<String> {
        self.ensure_running().await?;
        let cli = self.config.agent.cli.as_str();
        self.multipass
            .exec_interactive(
                &[cli, "auth", "login", "--provider", provider.key()],
                self.config.timeouts.interactive(),
            )
            .await
            .with_context(|| format!("{} login failed", provider))?;
        Ok(format!("Logged in to {}", provider))
    }

    pub async fn logout(&self, provider: Provider) -> Result<String> {
        self.ensure_running().await?;
        let cli = self.config.agent.cli.as_str();
        self.multipass
            .exec_interactive(
                &[cli, "auth", "logout", "--provider", provider.key()],
                self.config.timeouts.interactive(),
            )
            .await
            .with_context(|| format!("{} logout failed", provider))?;
        Ok(format!("Logged out of {}", provider))
    }

    pub async fn channel(&self, channel: Channel, mutation: ConfigMutation) -> Result<String> {
        self.ensure_running().await?;
        ConfigEditor::from_config(&self.multipass, &self.config)
            .apply(channel, mutation)
            .await
    }

    /// Copy the host agent config into the VM.
    pub async fn push(&self) -> Result<String> {
        self.ensure_running().await?;
        let host = &self.config.agent.host_config_path;
        if !host.is_file() {
            bail!("no host config at {}", host.display());
        }

        let target = self.multipass.vm_target(&self.config.agent.config_path);
        let host_str = host.to_string_lossy();
        self.multipass
            .run(&["transfer", &host_str, &target], self.config.timeouts.action())
            .await
            .context("failed to copy config into the VM")?;
        info!(from = %host.display(), to = %target, "config pushed");
        Ok(format!("Copied {} to {}", host.display(), target))
    }

    /// Copy the VM agent config to the host, creating its folder if needed.
    pub async fn pull(&self) -> Result<String> {
        self.ensure_running().await?;
        let host = &self.config.agent.host_config_path;
        if let Some(parent) = host.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let source = self.multipass.vm_target(&self.config.agent.config_path);
        let host_str = host.to_string_lossy();
        self.multipass
            .run(&["transfer", &source, &host_str], self.config.timeouts.action())
            .await
            .context("failed to copy config out of the VM")?;
        info!(from = %source, to = %host.display(), "config pulled");
        Ok(format!("Copied {} to {}", source, host.display()))
    }

    pub async fn service_install(&self) -> Result<String> {
        self.ensure_running().await?;
        let cli = self.config.agent.cli.as_str();
        self.multipass
            .exec_interactive(&[cli, "service", "install"], self.config.timeouts.interactive())
            .await
            .context("service install failed")?;
        Ok(format!("Installed {} service", self.config.agent.service_unit))
    }

    pub async fn service_start(&self) -> Result<String> {
        self.ensure_running().await?;
        let unit = self.config.agent.service_unit.as_str();
        self.multipass
            .exec(&["sudo", "systemctl", "start", unit], self.config.timeouts.action())
            .await
            .with_context(|| format!("failed to start {}", unit))?;
        info!(unit, "service started");
        Ok(format!("Started {} service", unit))
    }

    async fn ensure_running(&self) -> Result<()> {
        let state = vm_state(&self.multipass).await;
        if state.is_running() {
            return Ok(());
        }
        if state.is_absent() {
            bail!("VM '{}' does not exist; run `lantern up` first", self.name());
        }
        bail!(
            "VM '{}' is not running (state: {}); run `lantern up` first",
            self.name(),
            state
        )
    }
}

/// `multipass launch` arguments from the VM config.
pub fn launch_args(vm: &VmConfig) -> Vec<String> {
    let mut args = vec!["launch".to_string(), "--name".to_string(), vm.name.clone()];
    if let Some(cpus) = vm.cpus {
        args.extend(["--cpus".to_string(), cpus.to_string()]);
    }
    if let Some(memory) = &vm.memory {
        args.extend(["--memory".to_string(), memory.clone()]);
    }
    if let Some(disk) = &vm.disk {
        args.extend(["--disk".to_string(), disk.clone()]);
    }
    if let Some(image) = &vm.image {
        args.push(image.clone());
    }
    args
}

/// `<default_dir>/<host folder name>`.
pub fn default_mount_target(host: &Path, default_dir: &str) -> Result<String> {
    let name = host
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("cannot derive a mount name from {}", host.display()))?;
    Ok(format!("{}/{}", default_dir.trim_end_matches('/'), name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_args_include_only_configured_resources() {
        let vm = VmConfig::default();
        assert_eq!(launch_args(&vm), vec!["launch", "--name", "agent"]);

        let vm = VmConfig {
            name: "box".into(),
            cpus: Some(4),
            memory: Some("8G".into()),
            disk: Some("40G".into()),
            image: Some("24.04".into()),
            ..Default::default()
        };
        assert_eq!(
            launch_args(&vm),
            vec![
                "launch", "--name", "box", "--cpus", "4", "--memory", "8G", "--disk", "40G",
                "24.04"
            ]
        );
    }

    #[test]
    fn default_mount_target_uses_folder_name() {
        assert_eq!(
            default_mount_target(Path::new("/Users/me/code"), "/home/ubuntu/mnt/").unwrap(),
            "/home/ubuntu/mnt/code"
        );
        assert!(default_mount_target(Path::new("/"), "/home/ubuntu/mnt").is_err());
    }
}
