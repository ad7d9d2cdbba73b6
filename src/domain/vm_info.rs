//! Parsing of `multipass info <name>` text output.
//!
//! The output is a list of `Key:   Value` lines. `Mounts:` is followed by an
//! indented block where each mount is a `host => vm` line plus nested
//! UID/GID map lines:
//!
//! ```text
//! Name:           agent
//! State:          Running
//! IPv4:           192.168.64.5
//! Load:           0.08 0.03 0.01
//! Memory usage:   412.3MiB out of 3.8GiB
//! Mounts:         /Users/me/code => /home/ubuntu/code
//!                     UID map: 501:default
//!                     GID map: 20:default
//! ```

use std::fmt;

use serde::{Serialize, Serializer};

/// Lifecycle state as reported by multipass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VmState {
    Running,
    Stopped,
    NotFound,
    #[default]
    Unknown,
    /// Transitional states multipass reports verbatim (Starting, Suspended, ...).
    Other(String),
}

impl VmState {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" => VmState::Unknown,
            "Running" => VmState::Running,
            "Stopped" => VmState::Stopped,
            other => VmState::Other(other.to_string()),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, VmState::Running)
    }

    /// True when there is no VM to start: it does not exist or its state is unknown.
    pub fn is_absent(&self) -> bool {
        matches!(self, VmState::NotFound | VmState::Unknown)
    }
}

impl fmt::Display for VmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmState::Running => write!(f, "Running"),
            VmState::Stopped => write!(f, "Stopped"),
            VmState::NotFound => write!(f, "NotFound"),
            VmState::Unknown => write!(f, ""),
            VmState::Other(s) => write!(f, "{}", s),
        }
    }
}

impl Serialize for VmState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One live bind mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountInfo {
    pub host_path: String,
    pub vm_path: String,
}

/// Fields extracted from `multipass info`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmInfo {
    pub state: VmState,
    pub ipv4: String,
    pub load: String,
    pub memory: String,
    pub mounts: Vec<MountInfo>,
}

impl VmInfo {
    pub fn not_found() -> Self {
        Self {
            state: VmState::NotFound,
            ..Default::default()
        }
    }
}

pub fn parse_info(output: &str) -> VmInfo {
    let mut info = VmInfo {
        mounts: parse_mounts(output),
        ..Default::default()
    };

    for line in output.lines() {
        if line.starts_with(char::is_whitespace) {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "State" => info.state = VmState::parse(&value),
            "IPv4" => info.ipv4 = value,
            "Load" => info.load = value,
            "Memory usage" => info.memory = value,
            _ => {}
        }
    }

    info
}

/// Scan the `Mounts:` block. Order follows the tool output.
pub fn parse_mounts(output: &str) -> Vec<MountInfo> {
    let mut mounts = Vec::new();
    let mut in_mounts = false;

    for line in output.lines() {
        if let Some(rest) = line.strip_prefix("Mounts:") {
            in_mounts = true;
            push_mount(&mut mounts, rest);
            continue;
        }
        if !in_mounts {
            continue;
        }
        if !line.starts_with(char::is_whitespace) {
            if line.contains(':') {
                in_mounts = false;
            }
            continue;
        }
        push_mount(&mut mounts, line);
    }

    mounts
}

fn push_mount(mounts: &mut Vec<MountInfo>, line: &str) {
    if let Some((host, vm)) = line.split_once(" => ") {
        let (host, vm) = (host.trim(), vm.trim());
        if !host.is_empty() && !vm.is_empty() {
            mounts.push(MountInfo {
                host_path: host.to_string(),
                vm_path: vm.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUNNING: &str = "\
Name:           agent
State:          Running
Snapshots:      0
IPv4:           192.168.64.5
Release:        Ubuntu 24.04.1 LTS
Image hash:     b9fd3f5a8a1b (Ubuntu 24.04 LTS)
CPU(s):         2
Load:           0.08 0.03 0.01
Disk usage:     2.4GiB out of 19.3GiB
Memory usage:   412.3MiB out of 3.8GiB
Mounts:         /Users/me/code => /home/ubuntu/code
                    UID map: 501:default
                    GID map: 20:default
                /Users/me/notes => /home/ubuntu/notes
                    UID map: 501:default
                    GID map: 20:default
";

    #[test]
    fn parses_identity_fields() {
        let info = parse_info(RUNNING);
        assert_eq!(info.state, VmState::Running);
        assert_eq!(info.ipv4, "192.168.64.5");
        assert_eq!(info.load, "0.08 0.03 0.01");
        assert_eq!(info.memory, "412.3MiB out of 3.8GiB");
    }

    #[test]
    fn parses_every_mount_in_order() {
        let info = parse_info(RUNNING);
        assert_eq!(
            info.mounts,
            vec![
                MountInfo {
                    host_path: "/Users/me/code".into(),
                    vm_path: "/home/ubuntu/code".into(),
                },
                MountInfo {
                    host_path: "/Users/me/notes".into(),
                    vm_path: "/home/ubuntu/notes".into(),
                },
            ]
        );
    }

    #[test]
    fn mount_block_ends_at_next_top_level_key() {
        let text = "Mounts:\n  host => vm\n    UID map: 1:default\n    GID map: 1:default\nOther: value\n  late => mount\n";
        assert_eq!(
            parse_mounts(text),
            vec![MountInfo {
                host_path: "host".into(),
                vm_path: "vm".into(),
            }]
        );
    }

    #[test]
    fn stopped_vm_has_empty_fields() {
        let text = "Name:           agent\nState:          Stopped\nIPv4:           --\nMounts:         --\n";
        let info = parse_info(text);
        assert_eq!(info.state, VmState::Stopped);
        assert_eq!(info.ipv4, "--");
        assert!(info.load.is_empty());
        assert!(info.memory.is_empty());
        assert!(info.mounts.is_empty());
    }

    #[test]
    fn indented_lines_are_not_top_level_keys() {
        let text = "State:   Running\nMounts:  a => b\n    State: bogus\n";
        let info = parse_info(text);
        assert_eq!(info.state, VmState::Running);
    }

    #[test]
    fn unknown_and_transitional_states() {
        assert_eq!(parse_info("Name: x\n").state, VmState::Unknown);
        let suspended = parse_info("State: Suspended\n").state;
        assert_eq!(suspended, VmState::Other("Suspended".into()));
        assert_eq!(suspended.to_string(), "Suspended");
        assert!(!suspended.is_running());
        assert!(!suspended.is_absent());
        assert!(VmState::NotFound.is_absent());
    }
}
