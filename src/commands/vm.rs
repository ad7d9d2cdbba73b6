//! `lantern up` / `lantern stop`

use anyhow::Result;

use crate::config::Config;

use super::run_action;

pub fn up(cfg: Config) -> Result<()> {
    run_action(cfg, |svc| async move { svc.up().await })
}

pub fn stop(cfg: Config) -> Result<()> {
    run_action(cfg, |svc| async move { svc.stop().await })
}
