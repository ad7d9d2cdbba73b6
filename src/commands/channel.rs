//! `lantern channel ...`: messaging channel setup and allowlists.

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;

use crate::config::Config;
use crate::domain::channel::{format_entry, Channel, ChannelSnapshot};
use crate::domain::config_editor::ConfigMutation;
use crate::domain::snapshot_collector::SnapshotCollector;
use crate::multipass::Multipass;

use super::run_action;

#[derive(Subcommand)]
pub enum ChannelCommands {
    /// Show channel status and numbered approved users
    List {
        /// Only this channel (discord or telegram)
        channel: Option<Channel>,
    },
    /// Enable a channel with a bot token
    Setup {
        channel: Channel,
        token: String,
    },
    /// Approve a user: numeric ID or username, with an optional display name
    AddUser {
        channel: Channel,
        user: String,
        /// Username to store next to a numeric ID (`id|name`)
        #[arg(long)]
        name: Option<String>,
    },
    /// Remove an approved user by its position in `channel list`
    RemoveUser {
        channel: Channel,
        position: usize,
    },
}

pub fn run(cfg: Config, command: ChannelCommands) -> Result<()> {
    match command {
        ChannelCommands::List { channel } => list(cfg, channel),
        ChannelCommands::Setup { channel, token } => run_action(cfg, |svc| async move {
            svc.channel(channel, ConfigMutation::Setup { token }).await
        }),
        ChannelCommands::AddUser {
            channel,
            user,
            name,
        } => {
            let entry = format_entry(&user, name.as_deref().unwrap_or_default());
            run_action(cfg, |svc| async move {
                svc.channel(channel, ConfigMutation::AddUser { entry }).await
            })
        }
        ChannelCommands::RemoveUser { channel, position } => {
            let index = list_index(position)?;
            run_action(cfg, |svc| async move {
                svc.channel(channel, ConfigMutation::RemoveUser { index }).await
            })
        }
    }
}

/// `channel list` numbers from 1; the config editor indexes from 0.
fn list_index(position: usize) -> Result<usize> {
    match position.checked_sub(1) {
        Some(index) => Ok(index),
        None => bail!("positions start at 1 (see `lantern channel list`)"),
    }
}

fn list(cfg: Config, only: Option<Channel>) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let snapshot = rt.block_on(async {
        SnapshotCollector::from_config(Multipass::from_config(&cfg), &cfg)
            .collect()
            .await
    });

    if !snapshot.state.is_running() {
        bail!(
            "VM '{}' is not running; channel config is only readable while it runs",
            snapshot.name
        );
    }
    if !snapshot.config_exists {
        println!("{} No agent config in the VM yet", "::".blue().bold());
        return Ok(());
    }

    for channel in Channel::ALL {
        if only.is_some_and(|c| c != channel) {
            continue;
        }
        let ch = match channel {
            Channel::Discord => &snapshot.discord,
            Channel::Telegram => &snapshot.telegram,
        };
        print_channel(channel, ch);
    }
    Ok(())
}

fn print_channel(channel: Channel, ch: &ChannelSnapshot) {
    println!(
        "{} {} ({})",
        "──".yellow(),
        channel.to_string().bold(),
        ch.status
    );
    println!(
        "  Enabled: {}  Token: {}",
        if ch.enabled { "yes" } else { "no" },
        if ch.has_token { "set" } else { "unset" }
    );
    if ch.approved_users.is_empty() {
        println!("  {}", "No approved users".dimmed());
    }
    for (i, user) in ch.approved_users.iter().enumerate() {
        println!("  {:>3}. {}", i + 1, user.label());
    }
}
