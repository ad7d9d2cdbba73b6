//! `lantern login <provider>` / `lantern logout <provider>`
//!
//! Both hand the terminal to the agent CLI inside the VM, so device-code
//! prompts reach the operator directly.

use anyhow::Result;

use crate::config::Config;
use crate::domain::provider::Provider;

use super::run_action;

pub fn login(cfg: Config, provider: Provider) -> Result<()> {
    run_action(cfg, |svc| async move { svc.login(provider).await })
}

pub fn logout(cfg: Config, provider: Provider) -> Result<()> {
    run_action(cfg, |svc| async move { svc.logout(provider).await })
}
