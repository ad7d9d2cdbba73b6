pub mod agent_config;
pub mod channel;
pub mod config_editor;
pub mod drift;
pub mod provider;
pub mod snapshot;
pub mod snapshot_collector;
pub mod suggestion;
pub mod vm_info;
pub mod vm_service;
