pub mod auth;
pub mod channel;
pub mod mount;
pub mod service;
pub mod status;
pub mod sync;
pub mod vm;
pub mod watch;

use std::future::Future;

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::domain::vm_service::VmService;

/// Run one action on a fresh runtime and print its one-line result.
pub(crate) fn run_action<F, Fut>(cfg: Config, action: F) -> Result<()>
where
    F: FnOnce(VmService) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let rt = tokio::runtime::Runtime::new()?;
    let message = rt.block_on(action(VmService::new(cfg)))?;
    println!("{} {}", "ok".green().bold(), message);
    Ok(())
}
