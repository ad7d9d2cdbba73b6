//! `lantern status`: collect a snapshot and render it as a table or JSON.

use anyhow::Result;
use colored::{ColoredString, Colorize};
use serde::Serialize;

use crate::config::Config;
use crate::domain::channel::{ChannelSnapshot, ChannelStatus};
use crate::domain::drift::{config_drift, DriftItem, DriftSeverity};
use crate::domain::provider::ProviderStatus;
use crate::domain::snapshot::VmSnapshot;
use crate::domain::snapshot_collector::SnapshotCollector;
use crate::domain::suggestion::{suggested_step, SuggestedStep};
use crate::domain::vm_info::VmState;
use crate::multipass::Multipass;

/// Everything `status --format json` prints.
#[derive(Debug, Serialize)]
pub struct StatusView<'a> {
    pub snapshot: &'a VmSnapshot,
    pub next_step: SuggestedStep,
    pub next_tab_index: i32,
    pub drift: Vec<DriftItem>,
}

impl<'a> StatusView<'a> {
    pub fn new(snapshot: &'a VmSnapshot) -> Self {
        let next_step = suggested_step(snapshot);
        Self {
            snapshot,
            next_tab_index: next_step.target_index(),
            next_step,
            drift: config_drift(snapshot),
        }
    }
}

pub fn run(cfg: Config, format: &str) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_async(cfg, format))
}

async fn run_async(cfg: Config, format: &str) -> Result<()> {
    let collector = SnapshotCollector::from_config(Multipass::from_config(&cfg), &cfg);
    let snapshot = collector.collect().await;
    let view = StatusView::new(&snapshot);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&view)?),
        _ => print_table(&view),
    }
    Ok(())
}

pub fn print_table(view: &StatusView<'_>) {
    let s = view.snapshot;

    println!("{}", format!("═══ VM {} ═══", s.name).cyan().bold());
    println!("  State:           {}", state_label(&s.state));
    if !s.ipv4.is_empty() {
        println!("  IPv4:            {}", s.ipv4);
    }
    if !s.load.is_empty() {
        println!("  Load:            {}", s.load);
    }
    if !s.memory.is_empty() {
        println!("  Memory:          {}", s.memory);
    }

    if s.state.is_running() {
        println!();
        println!("{}", "── Agent ──".yellow());
        println!("  Version:         {}", s.agent_version);
        println!("  Config:          {}", yes_no(s.config_exists));
        println!("  Credentials:     {}", yes_no(s.auth_store_exists));
        if s.workspace_path.is_empty() {
            println!("  Workspace:       {}", "not configured".dimmed());
        } else {
            println!("  Workspace:       {} {}", s.workspace_path, yes_no(s.workspace_exists));
        }

        println!();
        println!("{}", "── Providers ──".yellow());
        println!("  OpenAI:          {}", provider_label(s.openai));
        println!("  Anthropic:       {}", provider_label(s.anthropic));

        println!();
        println!("{}", "── Channels ──".yellow());
        print_channel("Discord", &s.discord);
        print_channel("Telegram", &s.telegram);
        if s.host_config_exists {
            println!("  {}", "Host copy:".dimmed());
            print_channel("Discord", &s.host_discord);
            print_channel("Telegram", &s.host_telegram);
        }

        println!();
        println!("{}", "── Service ──".yellow());
        println!("  Installed:       {}", yes_no(s.service_installed));
        println!("  Running:         {}", yes_no(s.service_running));
    }

    if !s.mounts.is_empty() {
        println!();
        println!("{}", "── Mounts ──".yellow());
        for m in &s.mounts {
            println!("  {} → {}", m.host_path, m.vm_path);
        }
    }

    if !view.drift.is_empty() {
        println!();
        println!("{}", "── Host/VM drift ──".yellow());
        for d in &view.drift {
            println!(
                "  {} {}.{}: host {} / vm {}",
                severity_label(d.severity),
                d.category,
                d.field,
                d.expected.as_deref().unwrap_or("-"),
                d.actual.as_deref().unwrap_or("-"),
            );
        }
    }

    println!();
    let step = &view.next_step;
    println!("{} {}", "Next:".bold(), step.message.bold());
    println!("  {}", step.detail.dimmed());
    if let Some(hint) = step.command_hint() {
        println!("  Run: {}", hint.cyan());
    }
    println!(
        "  {} {}  {} {}s",
        "Fetched:".dimmed(),
        s.fetched_at.format("%H:%M:%S"),
        "Age:".dimmed(),
        s.age_secs()
    );
}

fn print_channel(name: &str, ch: &ChannelSnapshot) {
    let users = match ch.approved_users.len() {
        0 => String::new(),
        1 => " (1 approved user)".to_string(),
        n => format!(" ({} approved users)", n),
    };
    println!("    {:<15}{}{}", format!("{}:", name), channel_label(ch.status), users);
}

fn state_label(state: &VmState) -> ColoredString {
    match state {
        VmState::Running => "Running".green().bold(),
        VmState::Stopped => "Stopped".yellow(),
        VmState::NotFound => "not found".red(),
        VmState::Unknown => "unknown".red(),
        VmState::Other(raw) => raw.as_str().yellow(),
    }
}

fn channel_label(status: ChannelStatus) -> ColoredString {
    match status {
        ChannelStatus::Ready => "ready".green(),
        ChannelStatus::Open => "open (no allowlist)".yellow(),
        ChannelStatus::Broken => "broken (no token)".red(),
        ChannelStatus::Off => "off".dimmed(),
    }
}

fn provider_label(status: ProviderStatus) -> ColoredString {
    match status {
        ProviderStatus::Ready => "ready".green(),
        ProviderStatus::Missing => "missing".dimmed(),
    }
}

fn severity_label(severity: DriftSeverity) -> ColoredString {
    match severity {
        DriftSeverity::Info => "::".blue().bold(),
        DriftSeverity::Warning => "!!".yellow().bold(),
        DriftSeverity::Critical => "!!".red().bold(),
    }
}

fn yes_no(value: bool) -> ColoredString {
    if value {
        "yes".green()
    } else {
        "no".red()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::vm_info::VmInfo;

    #[test]
    fn json_view_carries_snapshot_step_and_drift() {
        let info = VmInfo {
            state: VmState::Stopped,
            ..Default::default()
        };
        let snapshot = VmSnapshot::from_info("agent", info, Utc::now());
        let value = serde_json::to_value(StatusView::new(&snapshot)).unwrap();

        assert_eq!(value["snapshot"]["name"], "agent");
        assert_eq!(value["snapshot"]["state"], "Stopped");
        assert_eq!(value["snapshot"]["discord"]["status"], "off");
        assert_eq!(value["snapshot"]["openai"], "missing");
        assert_eq!(value["next_step"]["kind"], "start_vm");
        assert_eq!(value["next_step"]["message"], "Start the VM");
        assert_eq!(value["next_step"]["tab"], serde_json::Value::Null);
        assert_eq!(value["next_tab_index"], -1);
        assert_eq!(value["drift"], serde_json::json!([]));
    }
}
