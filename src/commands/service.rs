use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

use super::run_action;

#[derive(Subcommand)]
pub enum ServiceCommands {
    /// Install the agent's system service (interactive)
    Install,
    /// Start the installed service
    Start,
}

pub fn run(cfg: Config, command: &ServiceCommands) -> Result<()> {
    match command {
        ServiceCommands::Install => run_action(cfg, |svc| async move { svc.service_install().await }),
        ServiceCommands::Start => run_action(cfg, |svc| async move { svc.service_start().await }),
    }
}
