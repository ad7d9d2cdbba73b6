use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::Serialize;

use super::agent_config::{AgentConfig, AuthStore, CredentialRecord, ProviderConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Anthropic,
}

impl Provider {
    /// Key in both the config's `providers` section and the credential store.
    pub fn key(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
        }
    }

    pub fn config(self, cfg: &AgentConfig) -> Option<&ProviderConfig> {
        match self {
            Provider::OpenAi => cfg.providers.openai.as_ref(),
            Provider::Anthropic => cfg.providers.anthropic.as_ref(),
        }
    }

    pub fn classify(self, cfg: &AgentConfig, auth: &AuthStore) -> ProviderStatus {
        classify_provider(self.config(cfg), auth.get(self.key()))
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "anthropic" => Ok(Provider::Anthropic),
            other => bail!("unknown provider '{}' (expected 'openai' or 'anthropic')", other),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "OpenAI"),
            Provider::Anthropic => write!(f, "Anthropic"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Ready,
    #[default]
    Missing,
}

impl ProviderStatus {
    pub fn is_ready(self) -> bool {
        self == ProviderStatus::Ready
    }
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderStatus::Ready => write!(f, "ready"),
            ProviderStatus::Missing => write!(f, "missing"),
        }
    }
}

/// Ready when the config carries an API key or the credential store holds any token.
pub fn classify_provider(
    config: Option<&ProviderConfig>,
    credential: Option<&CredentialRecord>,
) -> ProviderStatus {
    let configured = config.is_some_and(|c| !c.api_key.trim().is_empty());
    let stored = credential.is_some_and(|c| {
        [&c.access_token, &c.token, &c.api_key]
            .iter()
            .any(|v| !v.trim().is_empty())
    });

    if configured || stored {
        ProviderStatus::Ready
    } else {
        ProviderStatus::Missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(api_key: &str) -> ProviderConfig {
        ProviderConfig {
            api_key: api_key.to_string(),
        }
    }

    #[test]
    fn api_key_in_config_is_ready() {
        assert_eq!(classify_provider(Some(&key("x")), None), ProviderStatus::Ready);
        let cred = CredentialRecord::default();
        assert_eq!(
            classify_provider(Some(&key("x")), Some(&cred)),
            ProviderStatus::Ready
        );
    }

    #[test]
    fn stored_token_is_ready() {
        let cred = CredentialRecord {
            token: "y".into(),
            ..Default::default()
        };
        assert_eq!(
            classify_provider(Some(&ProviderConfig::default()), Some(&cred)),
            ProviderStatus::Ready
        );

        let cred = CredentialRecord {
            access_token: "z".into(),
            ..Default::default()
        };
        assert_eq!(classify_provider(None, Some(&cred)), ProviderStatus::Ready);
    }

    #[test]
    fn blank_everything_is_missing() {
        assert_eq!(classify_provider(None, None), ProviderStatus::Missing);
        let cred = CredentialRecord {
            api_key: "   ".into(),
            ..Default::default()
        };
        assert_eq!(
            classify_provider(Some(&key(" ")), Some(&cred)),
            ProviderStatus::Missing
        );
    }

    #[test]
    fn classify_reads_the_matching_store_entry() {
        let cfg = AgentConfig::default();
        let auth: AuthStore =
            serde_json::from_str(r#"{"anthropic": {"api_key": "k"}}"#).unwrap();
        assert_eq!(Provider::Anthropic.classify(&cfg, &auth), ProviderStatus::Ready);
        assert_eq!(Provider::OpenAi.classify(&cfg, &auth), ProviderStatus::Missing);
    }
}
