//! Process plumbing for the `multipass` CLI.
//!
//! Every invocation carries a timeout. Children are spawned with
//! `kill_on_drop(true)`, so a timed-out wait drops the child and kills it.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::config::{Config, TimeoutConfig};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {secs}s")]
    Timeout { program: String, secs: u64 },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// The operations the snapshot collector needs from the VM tool.
#[allow(async_fn_in_trait)] // only used with concrete types, never boxed
pub trait VmTool {
    /// Raw `info` output for the configured VM.
    async fn info(&self) -> Result<String, ToolError>;

    /// Run `argv` inside the VM and return its stdout.
    async fn exec(&self, argv: &[&str], timeout: Duration) -> Result<String, ToolError>;
}

pub struct Multipass {
    binary: String,
    vm_name: String,
    timeouts: TimeoutConfig,
}

impl Multipass {
    pub fn new(binary: &str, vm_name: &str, timeouts: TimeoutConfig) -> Self {
        Self {
            binary: binary.to_string(),
            vm_name: vm_name.to_string(),
            timeouts,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(&cfg.vm.multipass, &cfg.vm.name, cfg.timeouts.clone())
    }

    /// `<name>:<path>` target syntax used by mount, umount and transfer.
    pub fn vm_target(&self, path: &str) -> String {
        format!("{}:{}", self.vm_name, path)
    }

    /// Run a multipass subcommand, capturing its output.
    pub async fn run(&self, args: &[&str], timeout: Duration) -> Result<String, ToolError> {
        run_captured(&self.binary, args, timeout).await
    }

    /// `exec <name> -- argv...` attached to the current terminal.
    pub async fn exec_interactive(&self, argv: &[&str], timeout: Duration) -> Result<(), ToolError> {
        let args = self.exec_args(argv);
        run_attached(&self.binary, &args, timeout).await
    }

    fn exec_args<'a>(&'a self, argv: &[&'a str]) -> Vec<&'a str> {
        let mut args = vec!["exec", self.vm_name.as_str(), "--"];
        args.extend_from_slice(argv);
        args
    }
}

impl VmTool for Multipass {
    async fn info(&self) -> Result<String, ToolError> {
        let timeout = self.timeouts.info();
        run_captured(&self.binary, &["info", &self.vm_name], timeout).await
    }

    async fn exec(&self, argv: &[&str], timeout: Duration) -> Result<String, ToolError> {
        let args = self.exec_args(argv);
        run_captured(&self.binary, &args, timeout).await
    }
}

impl<T: VmTool> VmTool for &T {
    async fn info(&self) -> Result<String, ToolError> {
        (**self).info().await
    }

    async fn exec(&self, argv: &[&str], timeout: Duration) -> Result<String, ToolError> {
        (**self).exec(argv, timeout).await
    }
}

/// Run a program with piped output and return stdout on success.
pub async fn run_captured(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<String, ToolError> {
    debug!(program, ?args, timeout_secs = timeout.as_secs(), "running command");

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ToolError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| ToolError::Timeout {
            program: program.to_string(),
            secs: timeout.as_secs(),
        })?
        .map_err(|source| ToolError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        Err(ToolError::Failed {
            program: program.to_string(),
            status: exit_label(output.status),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Run a program inheriting the terminal's stdio.
pub async fn run_attached(program: &str, args: &[&str], timeout: Duration) -> Result<(), ToolError> {
    debug!(program, ?args, timeout_secs = timeout.as_secs(), "running attached command");

    let mut child = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ToolError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let status = tokio::time::timeout(timeout, child.wait())
        .await
        .map_err(|_| ToolError::Timeout {
            program: program.to_string(),
            secs: timeout.as_secs(),
        })?
        .map_err(|source| ToolError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(ToolError::Failed {
            program: program.to_string(),
            status: exit_label(status),
            stderr: String::new(),
        })
    }
}

fn exit_label(status: std::process::ExitStatus) -> String {
    status
        .code()
        .map(|code| format!("status {}", code))
        .unwrap_or_else(|| "signal".to_string())
}

/// Quote a string for a POSIX shell command line.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
