//! Agent config and credential store documents.
//!
//! Both schemas are permissive: unknown fields are ignored and every field
//! has a default, so a partially written file still decodes.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// `config.json`, the same shape inside the VM and on the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub agents: AgentsSection,
    #[serde(default, deserialize_with = "null_as_default")]
    pub providers: ProvidersSection,
    #[serde(default, deserialize_with = "null_as_default")]
    pub channels: ChannelsSection,
}

impl AgentConfig {
    pub fn workspace(&self) -> &str {
        self.agents.defaults.workspace.trim()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentsSection {
    #[serde(default, deserialize_with = "null_as_default")]
    pub defaults: AgentDefaults,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentDefaults {
    #[serde(default, deserialize_with = "null_as_default")]
    pub workspace: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersSection {
    #[serde(default)]
    pub openai: Option<ProviderConfig>,
    #[serde(default)]
    pub anthropic: Option<ProviderConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, alias = "apiKey", deserialize_with = "null_as_default")]
    pub api_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsSection {
    #[serde(default)]
    pub discord: Option<ChannelConfig>,
    #[serde(default)]
    pub telegram: Option<ChannelConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub token: String,
    #[serde(default, alias = "allowFrom", deserialize_with = "allow_from_list")]
    pub allow_from: Vec<String>,
}

/// `auth.json`: one credential record per provider name.
///
/// Top-level entries that are not credential records (`"version": 1`, ...)
/// are skipped instead of failing the whole store.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct AuthStore {
    pub providers: BTreeMap<String, CredentialRecord>,
}

impl<'de> Deserialize<'de> for AuthStore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let providers = raw
            .into_iter()
            .filter_map(|(name, value)| {
                serde_json::from_value::<CredentialRecord>(value)
                    .ok()
                    .map(|record| (name, record))
            })
            .collect();
        Ok(Self { providers })
    }
}

impl AuthStore {
    pub fn get(&self, provider: &str) -> Option<&CredentialRecord> {
        self.providers.get(provider)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(default, alias = "accessToken", deserialize_with = "null_as_default")]
    pub access_token: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub token: String,
    #[serde(default, alias = "apiKey", deserialize_with = "null_as_default")]
    pub api_key: String,
}

/// Normalise the `allow_from` field to an ordered list.
///
/// An array keeps its string elements in order, a single string becomes a
/// one-element list (none if blank), anything else is an empty list.
pub fn normalize_allow_from(raw: &serde_json::Value) -> Vec<String> {
    match raw {
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(|s| s.to_string())
            .collect(),
        serde_json::Value::String(s) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// `null` reads the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn allow_from_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(normalize_allow_from(&raw))
}

pub fn decode_config(content: &str) -> Result<AgentConfig> {
    serde_json::from_str(content).context("parsing agent config")
}

pub fn decode_auth(content: &str) -> Result<AuthStore> {
    serde_json::from_str(content).context("parsing credential store")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn allow_from_accepts_array_string_or_nothing() {
        assert_eq!(
            normalize_allow_from(&json!(["123|alice", "bob"])),
            vec!["123|alice", "bob"]
        );
        assert_eq!(normalize_allow_from(&json!("987")), vec!["987"]);
        assert!(normalize_allow_from(&json!("  ")).is_empty());
        assert!(normalize_allow_from(&json!(null)).is_empty());
        assert!(normalize_allow_from(&json!(42)).is_empty());
        assert_eq!(normalize_allow_from(&json!(["a", 7, "b"])), vec!["a", "b"]);
    }

    #[test]
    fn decodes_full_config() {
        let cfg = decode_config(
            r#"{
                "agents": {"defaults": {"workspace": " /home/ubuntu/ws "}},
                "providers": {"openai": {"api_key": "sk-1"}, "anthropic": {"apiKey": "sk-2"}},
                "channels": {
                    "discord": {"enabled": true, "token": "t", "allow_from": ["1|a"]},
                    "telegram": {"enabled": false, "allowFrom": "42"}
                },
                "tools": {"ignored": true}
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.workspace(), "/home/ubuntu/ws");
        assert_eq!(cfg.providers.openai.unwrap().api_key, "sk-1");
        assert_eq!(cfg.providers.anthropic.unwrap().api_key, "sk-2");
        let discord = cfg.channels.discord.unwrap();
        assert!(discord.enabled);
        assert_eq!(discord.allow_from, vec!["1|a"]);
        assert_eq!(cfg.channels.telegram.unwrap().allow_from, vec!["42"]);
    }

    #[test]
    fn missing_allow_from_is_empty() {
        let cfg = decode_config(r#"{"channels": {"discord": {"enabled": true}}}"#).unwrap();
        assert!(cfg.channels.discord.unwrap().allow_from.is_empty());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(decode_config("{\"channels\": ").is_err());
        assert!(decode_auth("[1, 2]").is_err());
    }

    #[test]
    fn null_fields_read_as_defaults() {
        let cfg = decode_config(
            r#"{
                "agents": {"defaults": {"workspace": null}},
                "providers": {"openai": {"api_key": "sk"}, "anthropic": {"apiKey": null}},
                "channels": {
                    "discord": {"enabled": true, "token": null, "allow_from": ["1"]},
                    "telegram": {"enabled": null, "token": "t", "allowFrom": null}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.workspace(), "");
        assert_eq!(cfg.providers.openai.unwrap().api_key, "sk");
        assert_eq!(cfg.providers.anthropic.unwrap().api_key, "");
        let discord = cfg.channels.discord.unwrap();
        assert!(discord.enabled);
        assert_eq!(discord.token, "");
        assert_eq!(discord.allow_from, vec!["1"]);
        let telegram = cfg.channels.telegram.unwrap();
        assert!(!telegram.enabled);
        assert!(telegram.allow_from.is_empty());
    }

    #[test]
    fn null_sections_read_as_empty() {
        let cfg = decode_config(r#"{"agents": null, "providers": null, "channels": null}"#).unwrap();
        assert!(cfg.channels.discord.is_none());
        assert!(cfg.providers.openai.is_none());

        let cfg = decode_config(r#"{"channels": {"discord": null}}"#).unwrap();
        assert!(cfg.channels.discord.is_none());
    }

    #[test]
    fn auth_store_skips_entries_that_are_not_records() {
        let auth = decode_auth(
            r#"{"version": 1, "openai": {"access_token": "at", "api_key": null}, "gemini": "x"}"#,
        )
        .unwrap();
        assert_eq!(auth.get("openai").unwrap().access_token, "at");
        assert_eq!(auth.get("openai").unwrap().api_key, "");
        assert!(auth.get("version").is_none());
        assert!(auth.get("gemini").is_none());
    }

    #[test]
    fn decodes_auth_store_by_provider() {
        let auth = decode_auth(
            r#"{"openai": {"access_token": "at"}, "anthropic": {"token": "tk", "expires": 0}}"#,
        )
        .unwrap();
        assert_eq!(auth.get("openai").unwrap().access_token, "at");
        assert_eq!(auth.get("anthropic").unwrap().token, "tk");
        assert!(auth.get("gemini").is_none());
    }
}
