//! Messaging channels: allowlist entries and channel readiness.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::Serialize;

use super::agent_config::{AgentConfig, ChannelConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Discord,
    Telegram,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Discord, Channel::Telegram];

    /// Key under `channels` in the agent config.
    pub fn key(self) -> &'static str {
        match self {
            Channel::Discord => "discord",
            Channel::Telegram => "telegram",
        }
    }

    pub fn config(self, cfg: &AgentConfig) -> Option<&ChannelConfig> {
        match self {
            Channel::Discord => cfg.channels.discord.as_ref(),
            Channel::Telegram => cfg.channels.telegram.as_ref(),
        }
    }
}

impl FromStr for Channel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "discord" => Ok(Channel::Discord),
            "telegram" => Ok(Channel::Telegram),
            other => bail!("unknown channel '{}' (expected 'discord' or 'telegram')", other),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Discord => write!(f, "Discord"),
            Channel::Telegram => write!(f, "Telegram"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    /// Enabled, has a token and an allowlist.
    Ready,
    /// Enabled with a token but anyone may talk to the bot.
    Open,
    /// Enabled without a token.
    Broken,
    #[default]
    Off,
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelStatus::Ready => write!(f, "ready"),
            ChannelStatus::Open => write!(f, "open"),
            ChannelStatus::Broken => write!(f, "broken"),
            ChannelStatus::Off => write!(f, "off"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelSnapshot {
    pub status: ChannelStatus,
    pub enabled: bool,
    pub has_token: bool,
    pub approved_users: Vec<ApprovedUser>,
}

/// One allowlist entry: a numeric ID, a name, or `id|name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApprovedUser {
    pub raw: String,
    pub user_id: String,
    pub username: String,
}

impl ApprovedUser {
    /// Short label for display: `name (id)`, or whichever part is set.
    pub fn label(&self) -> String {
        match (self.user_id.is_empty(), self.username.is_empty()) {
            (false, false) => format!("{} ({})", self.username, self.user_id),
            (false, true) => self.user_id.clone(),
            (true, false) => self.username.clone(),
            (true, true) => self.raw.clone(),
        }
    }
}

pub fn parse_approved_user(entry: &str) -> ApprovedUser {
    let raw = entry.trim();
    let mut user = ApprovedUser {
        raw: raw.to_string(),
        ..Default::default()
    };

    if raw.is_empty() {
        return user;
    }

    if let Some((id, name)) = raw.split_once('|') {
        user.user_id = id.trim().to_string();
        user.username = name.trim().to_string();
    } else if is_numeric_id(raw) {
        user.user_id = raw.to_string();
    } else {
        user.username = raw.to_string();
    }

    user
}

/// Inverse of [`parse_approved_user`] for non-blank parts.
pub fn format_entry(user_id: &str, username: &str) -> String {
    let (id, name) = (user_id.trim(), username.trim());
    match (id.is_empty(), name.is_empty()) {
        (false, false) => format!("{}|{}", id, name),
        (false, true) => id.to_string(),
        (true, false) => name.to_string(),
        (true, true) => String::new(),
    }
}

/// Digits, optionally negative (Telegram group chats use negative IDs).
fn is_numeric_id(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

pub fn classify_channel(config: Option<&ChannelConfig>) -> ChannelSnapshot {
    let Some(config) = config else {
        return ChannelSnapshot::default();
    };

    let approved_users: Vec<ApprovedUser> = config
        .allow_from
        .iter()
        .map(|entry| parse_approved_user(entry))
        .collect();
    let has_token = !config.token.trim().is_empty();

    let status = match (config.enabled, has_token, !approved_users.is_empty()) {
        (true, true, true) => ChannelStatus::Ready,
        (true, true, false) => ChannelStatus::Open,
        (true, false, _) => ChannelStatus::Broken,
        (false, _, _) => ChannelStatus::Off,
    };

    ChannelSnapshot {
        status,
        enabled: config.enabled,
        has_token,
        approved_users,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(enabled: bool, token: &str, allow_from: &[&str]) -> ChannelConfig {
        ChannelConfig {
            enabled,
            token: token.to_string(),
            allow_from: allow_from.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn pair_entry_splits_id_and_name() {
        let user = parse_approved_user("123|alice");
        assert_eq!(user.user_id, "123");
        assert_eq!(user.username, "alice");
        assert_eq!(user.raw, "123|alice");
    }

    #[test]
    fn numeric_entry_is_an_id() {
        let user = parse_approved_user("987654321");
        assert_eq!(user.user_id, "987654321");
        assert!(user.username.is_empty());

        assert_eq!(parse_approved_user("-100200").user_id, "-100200");
    }

    #[test]
    fn plain_entry_is_a_username() {
        let user = parse_approved_user("alice");
        assert_eq!(user.username, "alice");
        assert!(user.user_id.is_empty());

        assert_eq!(parse_approved_user("12a").username, "12a");
        assert_eq!(parse_approved_user("-").username, "-");
    }

    #[test]
    fn blank_entry_is_preserved_empty() {
        let user = parse_approved_user("   ");
        assert_eq!(user, ApprovedUser::default());
    }

    #[test]
    fn format_entry_round_trips() {
        assert_eq!(format_entry("123", "alice"), "123|alice");
        assert_eq!(format_entry("123", ""), "123");
        assert_eq!(format_entry("", "alice"), "alice");
        assert_eq!(format_entry(" ", " "), "");

        let user = parse_approved_user(&format_entry("123", "alice"));
        assert_eq!(user.user_id, "123");
        assert_eq!(user.username, "alice");
    }

    #[test]
    fn classification_table() {
        let cases = [
            (true, true, true, ChannelStatus::Ready),
            (true, true, false, ChannelStatus::Open),
            (true, false, true, ChannelStatus::Broken),
            (true, false, false, ChannelStatus::Broken),
            (false, true, true, ChannelStatus::Off),
            (false, true, false, ChannelStatus::Off),
            (false, false, true, ChannelStatus::Off),
            (false, false, false, ChannelStatus::Off),
        ];

        for (enabled, has_token, has_users, expected) in cases {
            let token = if has_token { "tok" } else { "  " };
            let users: &[&str] = if has_users { &["1|a"] } else { &[] };
            let snapshot = classify_channel(Some(&channel(enabled, token, users)));
            assert_eq!(
                snapshot.status, expected,
                "enabled={enabled} token={has_token} users={has_users}"
            );
            assert_eq!(snapshot.enabled, enabled);
            assert_eq!(snapshot.has_token, has_token);
        }
    }

    #[test]
    fn missing_config_is_off() {
        let snapshot = classify_channel(None);
        assert_eq!(snapshot.status, ChannelStatus::Off);
        assert!(!snapshot.enabled);
        assert!(snapshot.approved_users.is_empty());
    }

    #[test]
    fn approved_users_keep_order() {
        let snapshot = classify_channel(Some(&channel(true, "t", &["bob", "1|a", "22"])));
        let labels: Vec<String> = snapshot.approved_users.iter().map(|u| u.label()).collect();
        assert_eq!(labels, vec!["bob", "a (1)", "22"]);
    }

    #[test]
    fn channel_names_parse() {
        assert_eq!("Discord".parse::<Channel>().unwrap(), Channel::Discord);
        assert_eq!("telegram".parse::<Channel>().unwrap(), Channel::Telegram);
        assert!("slack".parse::<Channel>().is_err());
    }
}
