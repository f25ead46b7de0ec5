//! Process configuration read from the environment (and `.env`, if present)

use crate::auth::PolicyKind;
use poise::serenity_prelude::{GuildId, UserId};
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_PREFIX: &str = "!";
pub const DEFAULT_DATA_DIR: &str = "discord";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DISCORD_BOT_TOKEN is not set")]
    MissingToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub token: String,
    pub prefix: String,
    pub admin_ids: Vec<UserId>,
    pub test_guilds: Vec<GuildId>,
    pub data_dir: PathBuf,
    pub policy: PolicyKind,
}

impl BotConfig {
    /// Load `.env` into the process environment, then read the variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env is normal in production
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let token = non_empty("DISCORD_BOT_TOKEN").ok_or(ConfigError::MissingToken)?;
        let prefix = non_empty("BOT_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string());

        let admin_ids: Vec<UserId> = parse_id_list("ADMIN_USER_IDS", non_empty("ADMIN_USER_IDS"))
            .into_iter()
            .map(UserId::new)
            .collect();
        if admin_ids.is_empty() {
            warn!("ADMIN_USER_IDS is empty; operator commands are unavailable");
        }

        let test_guilds = parse_id_list("TEST_GUILD_ID", non_empty("TEST_GUILD_ID"))
            .into_iter()
            .map(GuildId::new)
            .collect();

        let data_dir = PathBuf::from(
            non_empty("BOT_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()),
        );

        let policy = match non_empty("BOT_AUTH_POLICY") {
            None => PolicyKind::default(),
            Some(name) => name.parse().unwrap_or_else(|_| {
                warn!(policy = %name, "Unknown BOT_AUTH_POLICY, using permissions");
                PolicyKind::default()
            }),
        };

        Ok(Self {
            token,
            prefix,
            admin_ids,
            test_guilds,
            data_dir,
            policy,
        })
    }
}

/// Comma-separated non-zero IDs; malformed entries are skipped with a warning
fn parse_id_list(variable: &str, raw: Option<String>) -> Vec<u64> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| match entry.parse::<u64>() {
            Ok(id) if id != 0 => Some(id),
            _ => {
                warn!(variable, entry, "Skipping malformed ID");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_missing_token_is_fatal() {
        assert_eq!(
            BotConfig::from_lookup(lookup(&[("BOT_PREFIX", "?")])),
            Err(ConfigError::MissingToken)
        );
        assert_eq!(
            BotConfig::from_lookup(lookup(&[("DISCORD_BOT_TOKEN", "  ")])),
            Err(ConfigError::MissingToken)
        );
    }

    #[test]
    fn test_defaults() {
        let config = BotConfig::from_lookup(lookup(&[("DISCORD_BOT_TOKEN", "abc")])).unwrap();
        assert_eq!(config.prefix, "!");
        assert!(config.admin_ids.is_empty());
        assert!(config.test_guilds.is_empty());
        assert_eq!(config.data_dir, PathBuf::from("discord"));
        assert_eq!(config.policy, PolicyKind::Permissions);
    }

    #[test]
    fn test_malformed_ids_are_skipped() {
        let config = BotConfig::from_lookup(lookup(&[
            ("DISCORD_BOT_TOKEN", "abc"),
            ("ADMIN_USER_IDS", "123, nope,,0, 456"),
            ("TEST_GUILD_ID", "789"),
        ]))
        .unwrap();
        assert_eq!(config.admin_ids, vec![UserId::new(123), UserId::new(456)]);
        assert_eq!(config.test_guilds, vec![GuildId::new(789)]);
    }

    #[test]
    fn test_policy_selection() {
        let config = BotConfig::from_lookup(lookup(&[
            ("DISCORD_BOT_TOKEN", "abc"),
            ("BOT_AUTH_POLICY", "allowlist"),
        ]))
        .unwrap();
        assert_eq!(config.policy, PolicyKind::AllowList);

        let config = BotConfig::from_lookup(lookup(&[
            ("DISCORD_BOT_TOKEN", "abc"),
            ("BOT_AUTH_POLICY", "chaos"),
        ]))
        .unwrap();
        assert_eq!(config.policy, PolicyKind::Permissions);
    }
}
