//! Channel config mutations inside the VM.
//!
//! Edits go through a small Python script run with `python3 -c`, so the
//! read-modify-write happens next to the file. The script writes a temp file
//! in the same directory and renames it over the original.

use anyhow::{bail, Context, Result};
use tokio::sync::Mutex;
use tracing::info;

use crate::config::{Config, TimeoutConfig};
use crate::multipass::VmTool;

use super::channel::Channel;

/// argv: <path> <op> <channel> [arg]
const MUTATE_SCRIPT: &str = r#"
import json, os, sys, tempfile

path, op, channel = sys.argv[1], sys.argv[2], sys.argv[3]
arg = sys.argv[4] if len(sys.argv) > 4 else ""

try:
    with open(path) as f:
        text = f.read()
except FileNotFoundError:
    text = ""
data = json.loads(text) if text.strip() else {}
if data is None:
    data = {}
if not isinstance(data, dict):
    sys.exit("config root is not a JSON object")

channels = data.get("channels")
if not isinstance(channels, dict):
    channels = {}
data["channels"] = channels
cfg = channels.get(channel)
if not isinstance(cfg, dict):
    cfg = {}
channels[channel] = cfg

allow = cfg.pop("allowFrom", None)
if cfg.get("allow_from") is not None:
    allow = cfg["allow_from"]
if isinstance(allow, str):
    allow = [allow] if allow.strip() else []
elif isinstance(allow, list):
    allow = [a for a in allow if isinstance(a, str)]
else:
    allow = []

if op == "setup":
    cfg["enabled"] = True
    cfg["token"] = arg
elif op == "add":
    if arg not in allow:
        allow.append(arg)
elif op == "remove":
    idx = int(arg)
    if idx < 0 or idx >= len(allow):
        sys.exit("no approved user at index %d" % idx)
    print(allow.pop(idx))
else:
    sys.exit("unknown op %r" % op)
cfg["allow_from"] = allow

folder = os.path.dirname(path) or "."
os.makedirs(folder, exist_ok=True)
fd, tmp = tempfile.mkstemp(dir=folder, prefix=".config-")
try:
    with os.fdopen(fd, "w") as f:
        json.dump(data, f, indent=2)
        f.write("\n")
    os.chmod(tmp, 0o600)
    os.replace(tmp, path)
except BaseException:
    os.unlink(tmp)
    raise
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigMutation {
    /// Enable the channel with a bot token.
    Setup { token: String },
    /// Append an allowlist entry unless already present.
    AddUser { entry: String },
    /// Drop the allowlist entry at a 0-based index.
    RemoveUser { index: usize },
}

impl ConfigMutation {
    fn op(&self) -> &'static str {
        match self {
            ConfigMutation::Setup { .. } => "setup",
            ConfigMutation::AddUser { .. } => "add",
            ConfigMutation::RemoveUser { .. } => "remove",
        }
    }

    fn arg(&self) -> String {
        match self {
            ConfigMutation::Setup { token } => token.trim().to_string(),
            ConfigMutation::AddUser { entry } => entry.trim().to_string(),
            ConfigMutation::RemoveUser { index } => index.to_string(),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            ConfigMutation::Setup { token } if token.trim().is_empty() => {
                bail!("token must not be empty")
            }
            ConfigMutation::AddUser { entry } if entry.trim().is_empty() => {
                bail!("user entry must not be empty")
            }
            _ => Ok(()),
        }
    }
}

pub struct ConfigEditor<T> {
    tool: T,
    config_path: String,
    timeouts: TimeoutConfig,
    write_lock: Mutex<()>,
}

impl<T: VmTool> ConfigEditor<T> {
    pub fn new(tool: T, config_path: &str, timeouts: TimeoutConfig) -> Self {
        Self {
            tool,
            config_path: config_path.to_string(),
            timeouts,
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_config(tool: T, cfg: &Config) -> Self {
        Self::new(tool, &cfg.agent.config_path, cfg.timeouts.clone())
    }

    /// Apply one mutation and return a message describing it.
    pub async fn apply(&self, channel: Channel, mutation: ConfigMutation) -> Result<String> {
        mutation.validate()?;

        let _lock = self.write_lock.lock().await;
        let arg = mutation.arg();
        let argv = [
            "python3",
            "-c",
            MUTATE_SCRIPT,
            self.config_path.as_str(),
            mutation.op(),
            channel.key(),
            arg.as_str(),
        ];

        let out = self
            .tool
            .exec(&argv, self.timeouts.action())
            .await
            .with_context(|| format!("failed to update {} config", channel))?;

        info!(channel = channel.key(), op = mutation.op(), "agent config updated");

        Ok(match mutation {
            ConfigMutation::Setup { .. } => format!("{} enabled with new token", channel),
            ConfigMutation::AddUser { .. } => format!("Approved {} on {}", arg, channel),
            ConfigMutation::RemoveUser { .. } => {
                format!("Removed {} from {}", out.trim(), channel)
            }
        })
    }
}
