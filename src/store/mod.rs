//! Persistent stores
//!
//! Two JSON files live in the data directory: the warning lists and the
//! per-guild configuration. Both are loaded once at startup and rewritten in
//! full after every mutation.

mod guild_config;
pub mod ids;
pub(crate) mod keyed;
mod warnings;

pub use guild_config::{CONFIG_FILE, ConfigField, GuildConfig, GuildConfigStore};
pub use keyed::{JsonStore, StoreError};
pub use warnings::{TIMESTAMP_FORMAT, WARNINGS_FILE, WarningRecord, WarningStore, warning_key};

use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Both persisted stores, opened from one data directory
#[derive(Debug)]
pub struct Storage {
    pub data_dir: PathBuf,
    pub warnings: WarningStore,
    pub guild_configs: GuildConfigStore,
}

impl Storage {
    /// Create the data directory and empty store files where missing, then
    /// load both stores. Never fails; problems are logged and the affected
    /// store starts empty.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        ensure_files(&data_dir).await;

        let warnings = WarningStore::load(data_dir.join(WARNINGS_FILE)).await;
        let guild_configs = GuildConfigStore::load(data_dir.join(CONFIG_FILE)).await;
        info!(
            data_dir = %data_dir.display(),
            warning_keys = warnings.raw().len(),
            guild_configs = guild_configs.len(),
            "Stores loaded"
        );

        Self {
            data_dir,
            warnings,
            guild_configs,
        }
    }
}

async fn ensure_files(data_dir: &Path) {
    if let Err(e) = tokio::fs::create_dir_all(data_dir).await {
        warn!(data_dir = %data_dir.display(), error = %e, "Could not create data directory");
        return;
    }
    for name in [WARNINGS_FILE, CONFIG_FILE] {
        let path = data_dir.join(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            continue;
        }
        if let Err(e) = tokio::fs::write(&path, "{}").await {
            warn!(path = %path.display(), error = %e, "Could not create store file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::keyed::tests::temp_dir;

    #[tokio::test]
    async fn test_open_creates_empty_files() {
        let dir = temp_dir().join("nested").join("data");
        let storage = Storage::open(&dir).await;
        assert_eq!(std::fs::read_to_string(dir.join(WARNINGS_FILE)).unwrap(), "{}");
        assert_eq!(std::fs::read_to_string(dir.join(CONFIG_FILE)).unwrap(), "{}");
        assert_eq!(storage.warnings.total(), 0);
        assert!(storage.guild_configs.is_empty());
    }

    #[tokio::test]
    async fn test_open_keeps_existing_files() {
        let dir = temp_dir();
        std::fs::write(dir.join(CONFIG_FILE), r#"{"9": {"autorole_id": "1"}}"#).unwrap();
        let storage = Storage::open(&dir).await;
        assert_eq!(storage.guild_configs.len(), 1);
    }
}
