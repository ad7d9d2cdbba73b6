mod commands;
mod config;
mod domain;
mod multipass;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::domain::provider::Provider;

#[derive(Parser)]
#[command(name = "lantern", version, about = "Dashboard and control CLI for an agent running in a multipass VM")]
struct Cli {
    /// Path to config file (default: ~/.config/lantern/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show VM, agent, provider and channel status with the next suggested step
    Status {
        /// Output format (table or json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Redraw the status panel periodically
    Watch {
        /// Seconds between refreshes (overrides config)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Create the VM if missing, start it if stopped
    Up,

    /// Stop the VM
    Stop,

    /// Share host folders with the VM
    Mount {
        #[command(subcommand)]
        command: MountCommands,
    },

    /// Log in to an AI provider inside the VM (interactive)
    Login {
        /// openai or anthropic
        provider: Provider,
    },

    /// Remove stored credentials for a provider
    Logout {
        /// openai or anthropic
        provider: Provider,
    },

    /// Configure messaging channels
    Channel {
        #[command(subcommand)]
        command: commands::channel::ChannelCommands,
    },

    /// Copy the host agent config into the VM
    Push,

    /// Copy the VM agent config to the host
    Pull,

    /// Manage the agent's system service
    Service {
        #[command(subcommand)]
        command: commands::service::ServiceCommands,
    },
}

#[derive(Subcommand)]
enum MountCommands {
    /// Mount a host folder into the VM
    Add {
        /// Host folder
        host: PathBuf,
        /// Target path in the VM (default: <default_mount_dir>/<folder name>)
        vm_path: Option<String>,
    },
    /// Unmount a folder by its VM path
    Remove {
        vm_path: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "!!".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = config::load(cli.config.as_deref())?;
    init_tracing(&cfg);

    match cli.command {
        Commands::Status { format } => commands::status::run(cfg, &format),
        Commands::Watch { interval } => commands::watch::run(cfg, interval),
        Commands::Up => commands::vm::up(cfg),
        Commands::Stop => commands::vm::stop(cfg),
        Commands::Mount { command } => match command {
            MountCommands::Add { host, vm_path } => commands::mount::add(cfg, host, vm_path),
            MountCommands::Remove { vm_path } => commands::mount::remove(cfg, vm_path),
        },
        Commands::Login { provider } => commands::auth::login(cfg, provider),
        Commands::Logout { provider } => commands::auth::logout(cfg, provider),
        Commands::Channel { command } => commands::channel::run(cfg, command),
        Commands::Push => commands::sync::push(cfg),
        Commands::Pull => commands::sync::pull(cfg),
        Commands::Service { command } => commands::service::run(cfg, &command),
    }
}

/// `RUST_LOG` wins over the configured level. Logs go to stderr so
/// `status --format json` stays parseable.
fn init_tracing(cfg: &config::Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if cfg.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}
