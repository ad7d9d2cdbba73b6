//! VM snapshot: the read-model the dashboard renders.
//!
//! A snapshot is rebuilt wholesale on every refresh and never patched in
//! place. Fields that could not be probed keep their defaults.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::channel::ChannelSnapshot;
use super::provider::ProviderStatus;
use super::vm_info::{MountInfo, VmInfo, VmState};

#[derive(Debug, Clone, Serialize)]
pub struct VmSnapshot {
    pub name: String,
    pub state: VmState,
    pub ipv4: String,
    pub load: String,
    pub memory: String,

    pub agent_version: String,

    pub config_exists: bool,
    pub workspace_exists: bool,
    pub auth_store_exists: bool,
    pub host_config_exists: bool,
    pub workspace_path: String,

    pub openai: ProviderStatus,
    pub anthropic: ProviderStatus,

    pub discord: ChannelSnapshot,
    pub telegram: ChannelSnapshot,
    pub host_discord: ChannelSnapshot,
    pub host_telegram: ChannelSnapshot,

    pub service_installed: bool,
    pub service_running: bool,

    pub mounts: Vec<MountInfo>,
    pub fetched_at: DateTime<Utc>,
}

impl VmSnapshot {
    /// A snapshot holding only the VM identity fields.
    pub fn from_info(name: &str, info: VmInfo, fetched_at: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            state: info.state,
            ipv4: info.ipv4,
            load: info.load,
            memory: info.memory,
            agent_version: "unknown".into(),
            config_exists: false,
            workspace_exists: false,
            auth_store_exists: false,
            host_config_exists: false,
            workspace_path: String::new(),
            openai: ProviderStatus::Missing,
            anthropic: ProviderStatus::Missing,
            discord: ChannelSnapshot::default(),
            telegram: ChannelSnapshot::default(),
            host_discord: ChannelSnapshot::default(),
            host_telegram: ChannelSnapshot::default(),
            service_installed: false,
            service_running: false,
            mounts: info.mounts,
            fetched_at,
        }
    }

    pub fn any_provider_ready(&self) -> bool {
        self.openai.is_ready() || self.anthropic.is_ready()
    }

    pub fn any_channel_ready(&self) -> bool {
        use super::channel::ChannelStatus;
        self.discord.status == ChannelStatus::Ready || self.telegram.status == ChannelStatus::Ready
    }

    /// Seconds since the snapshot was taken.
    pub fn age_secs(&self) -> i64 {
        Utc::now().signed_duration_since(self.fetched_at).num_seconds()
    }
}
