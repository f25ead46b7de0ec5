//! Per-guild settings keyed by guild ID.

use crate::store::{JsonStore, ids};
use derive_more::Display;
use poise::serenity_prelude::{ChannelId, GuildId, RoleId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File name of the guild configuration store inside the data directory
pub const CONFIG_FILE: &str = "config.json";

/// Guild configuration. Absent fields mean "not configured".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildConfig {
    #[serde(default, with = "ids::optional", skip_serializing_if = "Option::is_none")]
    pub log_channel_id: Option<u64>,
    #[serde(default, with = "ids::optional", skip_serializing_if = "Option::is_none")]
    pub autorole_id: Option<u64>,
    #[serde(default, with = "ids::optional", skip_serializing_if = "Option::is_none")]
    pub mute_role_id: Option<u64>,
}

impl GuildConfig {
    #[must_use]
    pub fn log_channel(&self) -> Option<ChannelId> {
        self.log_channel_id.map(ChannelId::new)
    }

    #[must_use]
    pub fn autorole(&self) -> Option<RoleId> {
        self.autorole_id.map(RoleId::new)
    }

    #[must_use]
    pub fn mute_role(&self) -> Option<RoleId> {
        self.mute_role_id.map(RoleId::new)
    }
}

/// The individually settable configuration fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ConfigField {
    #[display("log channel")]
    LogChannel,
    #[display("auto-role")]
    Autorole,
    #[display("muted role")]
    MuteRole,
}

impl ConfigField {
    /// Name used in audit entries
    #[must_use]
    pub fn audit_name(self) -> &'static str {
        match self {
            Self::LogChannel => "set_log_channel",
            Self::Autorole => "set_autorole",
            Self::MuteRole => "set_mute_role",
        }
    }

    /// Set this field on `config`
    pub fn apply(self, config: &mut GuildConfig, id: u64) {
        let slot = match self {
            Self::LogChannel => &mut config.log_channel_id,
            Self::Autorole => &mut config.autorole_id,
            Self::MuteRole => &mut config.mute_role_id,
        };
        *slot = Some(id);
    }
}

/// Guild configurations. An entry is created the first time a field is set
/// and is never deleted.
#[derive(Debug)]
pub struct GuildConfigStore {
    inner: JsonStore<GuildConfig>,
}

impl GuildConfigStore {
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: JsonStore::load(path).await,
        }
    }

    /// Configuration for `guild_id`; an unconfigured guild reads as empty
    #[must_use]
    pub fn get(&self, guild_id: GuildId) -> GuildConfig {
        self.inner.get(&guild_id.to_string())
    }

    /// Set one field, creating the guild's entry if needed
    pub fn set_field(&self, guild_id: GuildId, field: ConfigField, id: u64) {
        self.inner
            .update(guild_id.to_string(), |config| field.apply(config, id));
    }

    /// Number of guilds with a stored configuration
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub async fn save(&self) -> bool {
        self.inner.save().await
    }

    #[must_use]
    pub fn raw(&self) -> &JsonStore<GuildConfig> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::keyed::tests::temp_dir;

    #[tokio::test]
    async fn test_unconfigured_guild_reads_empty_without_creating_entry() {
        let store = GuildConfigStore::load(temp_dir().join(CONFIG_FILE)).await;
        assert_eq!(store.get(GuildId::new(5)), GuildConfig::default());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_set_field_only_touches_that_field() {
        let store = GuildConfigStore::load(temp_dir().join(CONFIG_FILE)).await;
        let guild = GuildId::new(5);
        store.set_field(guild, ConfigField::MuteRole, 77);
        store.set_field(guild, ConfigField::LogChannel, 88);
        let config = store.get(guild);
        assert_eq!(config.mute_role(), Some(RoleId::new(77)));
        assert_eq!(config.log_channel(), Some(ChannelId::new(88)));
        assert_eq!(config.autorole(), None);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_file_omits_unset_fields() {
        let path = temp_dir().join(CONFIG_FILE);
        let store = GuildConfigStore::load(&path).await;
        store.set_field(GuildId::new(5), ConfigField::Autorole, 42);
        assert!(store.save().await);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"5": {"autorole_id": "42"}}));
    }

    #[tokio::test]
    async fn test_round_trip_with_legacy_numbers() {
        let path = temp_dir().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"5": {"log_channel_id": 10, "mute_role_id": "11"}, "6": {}}"#)
            .unwrap();
        let store = GuildConfigStore::load(&path).await;
        assert_eq!(store.get(GuildId::new(5)).log_channel_id, Some(10));
        assert_eq!(store.get(GuildId::new(5)).mute_role_id, Some(11));
        assert_eq!(store.len(), 2);

        assert!(store.save().await);
        let reloaded = GuildConfigStore::load(&path).await;
        assert_eq!(reloaded.raw().snapshot(), store.raw().snapshot());
    }

    #[tokio::test]
    async fn test_zero_id_file_loads_without_panicking_accessors() {
        let path = temp_dir().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"1": {"log_channel_id": "0", "mute_role_id": 0}}"#).unwrap();
        let store = GuildConfigStore::load(&path).await;
        let config = store.get(GuildId::new(1));
        assert_eq!(config.log_channel(), None);
        assert_eq!(config.mute_role(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_config_field_display() {
        assert_eq!(ConfigField::LogChannel.to_string(), "log channel");
        assert_eq!(ConfigField::MuteRole.audit_name(), "set_mute_role");
    }
}
