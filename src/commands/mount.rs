//! `lantern mount add|remove`

use std::path::PathBuf;

use anyhow::Result;

use crate::config::Config;

use super::run_action;

pub fn add(cfg: Config, host: PathBuf, vm_path: Option<String>) -> Result<()> {
    run_action(cfg, |svc| async move { svc.mount_add(&host, vm_path.as_deref()).await })
}

pub fn remove(cfg: Config, vm_path: String) -> Result<()> {
    run_action(cfg, |svc| async move { svc.mount_remove(&vm_path).await })
}
