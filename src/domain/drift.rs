//! Drift between the host copy of the agent config and the one in the VM.
//!
//! The host file is the one the operator edits and pushes; the VM file is
//! what the agent actually runs with. Token values are never reported, only
//! whether one is present.

use serde::Serialize;

use super::channel::{Channel, ChannelSnapshot, ChannelStatus};
use super::snapshot::VmSnapshot;

/// One difference between host (expected) and VM (actual).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftItem {
    pub category: String,
    pub field: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub severity: DriftSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DriftSeverity {
    Info,
    Warning,
    Critical,
}

/// Compare host and VM channel config. Empty unless the host config was read.
pub fn config_drift(snapshot: &VmSnapshot) -> Vec<DriftItem> {
    if !snapshot.host_config_exists {
        return Vec::new();
    }

    let mut items = Vec::new();
    for channel in Channel::ALL {
        let (host, vm) = match channel {
            Channel::Discord => (&snapshot.host_discord, &snapshot.discord),
            Channel::Telegram => (&snapshot.host_telegram, &snapshot.telegram),
        };
        channel_drift(channel, host, vm, &mut items);
    }
    items
}

fn channel_drift(
    channel: Channel,
    host: &ChannelSnapshot,
    vm: &ChannelSnapshot,
    items: &mut Vec<DriftItem>,
) {
    let mut push = |field: &str, expected: String, actual: String, severity| {
        items.push(DriftItem {
            category: channel.key().to_string(),
            field: field.to_string(),
            expected: Some(expected),
            actual: Some(actual),
            severity,
        });
    };

    if host.status != vm.status {
        let severity = if vm.status == ChannelStatus::Broken {
            DriftSeverity::Critical
        } else {
            DriftSeverity::Warning
        };
        push("status", host.status.to_string(), vm.status.to_string(), severity);
    }

    if host.enabled != vm.enabled {
        push(
            "enabled",
            host.enabled.to_string(),
            vm.enabled.to_string(),
            DriftSeverity::Info,
        );
    }

    if host.has_token != vm.has_token {
        push(
            "token",
            presence(host.has_token),
            presence(vm.has_token),
            DriftSeverity::Info,
        );
    }

    let host_users: Vec<&str> = host.approved_users.iter().map(|u| u.raw.as_str()).collect();
    let vm_users: Vec<&str> = vm.approved_users.iter().map(|u| u.raw.as_str()).collect();
    if host_users != vm_users {
        push(
            "allow_from",
            host_users.join(", "),
            vm_users.join(", "),
            DriftSeverity::Info,
        );
    }
}

fn presence(present: bool) -> String {
    let label = if present { "set" } else { "unset" };
    label.to_string()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::agent_config::ChannelConfig;
    use crate::domain::channel::classify_channel;
    use crate::domain::vm_info::{VmInfo, VmState};

    fn running() -> VmSnapshot {
        let info = VmInfo {
            state: VmState::Running,
            ..Default::default()
        };
        VmSnapshot::from_info("agent", info, Utc::now())
    }

    fn classify(enabled: bool, token: &str, users: &[&str]) -> ChannelSnapshot {
        classify_channel(Some(&ChannelConfig {
            enabled,
            token: token.to_string(),
            allow_from: users.iter().map(|s| s.to_string()).collect(),
        }))
    }

    #[test]
    fn no_host_config_means_no_drift() {
        let mut s = running();
        s.host_discord = classify(true, "t", &["1"]);
        assert!(config_drift(&s).is_empty());
    }

    #[test]
    fn matching_configs_have_no_drift() {
        let mut s = running();
        s.host_config_exists = true;
        s.discord = classify(true, "a", &["1|x"]);
        s.host_discord = classify(true, "b", &["1|x"]);
        assert!(config_drift(&s).is_empty());
    }

    #[test]
    fn missing_token_in_vm_is_critical() {
        let mut s = running();
        s.host_config_exists = true;
        s.host_telegram = classify(true, "t", &["42"]);
        s.telegram = classify(true, "", &["42"]);

        let items = config_drift(&s);
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].category, "telegram");
        assert_eq!(items[0].field, "status");
        assert_eq!(items[0].expected.as_deref(), Some("ready"));
        assert_eq!(items[0].actual.as_deref(), Some("broken"));
        assert_eq!(items[0].severity, DriftSeverity::Critical);

        assert_eq!(items[1].field, "token");
        assert_eq!(items[1].actual.as_deref(), Some("unset"));
    }

    #[test]
    fn allowlist_and_enabled_differences_are_reported() {
        let mut s = running();
        s.host_config_exists = true;
        s.host_discord = classify(true, "t", &["1", "2"]);
        s.discord = classify(false, "t", &["1"]);

        let items = config_drift(&s);
        let fields: Vec<&str> = items.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["status", "enabled", "allow_from"]);
        assert_eq!(items[0].severity, DriftSeverity::Warning);
        assert_eq!(items[2].expected.as_deref(), Some("1, 2"));
        assert_eq!(items[2].actual.as_deref(), Some("1"));
    }
}
