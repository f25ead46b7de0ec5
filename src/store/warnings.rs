//! Warning records keyed by `"<guild_id>:<user_id>"`.

use crate::store::{JsonStore, ids};
use chrono::{DateTime, SubsecRound, Utc};
use poise::serenity_prelude::{GuildId, UserId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File name of the warning store inside the data directory
pub const WARNINGS_FILE: &str = "warnings.json";

/// Timestamp layout used in the warnings file and the audit log
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// A single warning. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningRecord {
    pub reason: String,
    #[serde(rename = "mod_id", with = "ids::required")]
    pub moderator_id: u64,
    #[serde(rename = "mod_tag")]
    pub moderator_display: String,
    #[serde(rename = "timestamp", with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl WarningRecord {
    /// Create a warning stamped with the current time (second precision)
    pub fn new(
        reason: impl Into<String>,
        moderator_id: UserId,
        moderator_display: impl Into<String>,
    ) -> Self {
        Self {
            reason: reason.into(),
            moderator_id: moderator_id.get(),
            moderator_display: moderator_display.into(),
            created_at: Utc::now().trunc_subsecs(0),
        }
    }
}

mod timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&at.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(naive) = NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT) {
            return Ok(naive.and_utc());
        }
        DateTime::parse_from_rfc3339(&raw)
            .map(|at| at.with_timezone(&Utc))
            .map_err(|_| de::Error::custom(format!("invalid timestamp: {raw:?}")))
    }
}

/// Composite store key for a member's warnings
#[must_use]
pub fn warning_key(guild_id: GuildId, user_id: UserId) -> String {
    format!("{guild_id}:{user_id}")
}

/// Append-only warning lists per `(guild, user)`.
///
/// A key is present only while its list is non-empty: clearing removes the
/// key rather than leaving an empty list behind.
#[derive(Debug)]
pub struct WarningStore {
    inner: JsonStore<Vec<WarningRecord>>,
}

impl WarningStore {
    /// Load from `path`, dropping any empty lists found on disk
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let inner: JsonStore<Vec<WarningRecord>> = JsonStore::load(path).await;
        inner.retain(|_, list| !list.is_empty());
        Self { inner }
    }

    /// Append a warning and return the member's total after the append
    pub fn append(&self, guild_id: GuildId, user_id: UserId, record: WarningRecord) -> usize {
        self.inner.update(warning_key(guild_id, user_id), |list| {
            list.push(record);
            list.len()
        })
    }

    /// Warnings in insertion order (empty if none)
    #[must_use]
    pub fn list(&self, guild_id: GuildId, user_id: UserId) -> Vec<WarningRecord> {
        self.inner.get(&warning_key(guild_id, user_id))
    }

    #[must_use]
    pub fn count(&self, guild_id: GuildId, user_id: UserId) -> usize {
        self.list(guild_id, user_id).len()
    }

    /// Remove every warning for the member, returning how many were removed.
    /// Zero means nothing was stored and nothing changed.
    pub fn clear(&self, guild_id: GuildId, user_id: UserId) -> usize {
        self.inner
            .delete(&warning_key(guild_id, user_id))
            .map_or(0, |list| list.len())
    }

    /// Total number of warnings across every guild and member
    #[must_use]
    pub fn total(&self) -> usize {
        self.inner.snapshot().values().map(Vec::len).sum()
    }

    /// Persist the whole store; see [`JsonStore::save`]
    pub async fn save(&self) -> bool {
        self.inner.save().await
    }

    #[must_use]
    pub fn raw(&self) -> &JsonStore<Vec<WarningRecord>> {
        &self.inner
    }
}
