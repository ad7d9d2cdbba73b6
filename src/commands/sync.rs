//! `lantern push` / `lantern pull`: copy the agent config between host and VM.

use anyhow::Result;

use crate::config::Config;

use super::run_action;

pub fn push(cfg: Config) -> Result<()> {
    run_action(cfg, |svc| async move { svc.push().await })
}

pub fn pull(cfg: Config) -> Result<()> {
    run_action(cfg, |svc| async move { svc.pull().await })
}
