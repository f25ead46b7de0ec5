use crate::audit::{AUDIT_FILE, AuditLog};
use crate::auth::AuthorizationPolicy;
use crate::config::BotConfig;
use crate::store::Storage;
use std::{ops::Deref, sync::Arc, time::Instant};

/// Shared bot state, cheap to clone
#[derive(Clone)]
pub struct Data(pub Arc<DataInner>);

impl Deref for Data {
    type Target = DataInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("prefix", &self.config.prefix)
            .field("data_dir", &self.storage.data_dir)
            .field("policy", &self.policy.name())
            .finish_non_exhaustive()
    }
}

impl Data {
    /// Open the stores and audit log under the configured data directory
    pub async fn load(config: BotConfig) -> Self {
        let storage = Storage::open(&config.data_dir).await;
        let audit = AuditLog::new(storage.data_dir.join(AUDIT_FILE));
        audit.ensure_exists().await;
        let policy = config.policy.build(&config.admin_ids).into();

        Self(Arc::new(DataInner {
            config,
            storage,
            audit,
            policy,
            started_at: Instant::now(),
        }))
    }
}

pub struct DataInner {
    pub config: BotConfig,
    pub storage: Storage,
    pub audit: AuditLog,
    pub policy: Arc<dyn AuthorizationPolicy>,
    pub started_at: Instant,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PolicyKind;
    use crate::store::keyed::tests::temp_dir;
    use crate::store::{CONFIG_FILE, WARNINGS_FILE};
    use poise::serenity_prelude::UserId;

    fn config(data_dir: std::path::PathBuf, policy: PolicyKind) -> BotConfig {
        BotConfig {
            token: "token".into(),
            prefix: "?".into(),
            admin_ids: vec![UserId::new(7)],
            test_guilds: Vec::new(),
            data_dir,
            policy,
        }
    }

    #[tokio::test]
    async fn test_load_bootstraps_data_dir() {
        let dir = temp_dir().join("bot");
        let data = Data::load(config(dir.clone(), PolicyKind::AllowList)).await;

        assert!(dir.join(WARNINGS_FILE).exists());
        assert!(dir.join(CONFIG_FILE).exists());
        let audit = std::fs::read_to_string(dir.join(AUDIT_FILE)).unwrap();
        assert!(audit.starts_with("# Audit Log - created "));
        assert_eq!(data.policy.name(), "allowlist");
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let data = Data::load(config(temp_dir(), PolicyKind::Permissions)).await;
        let other = data.clone();
        assert!(Arc::ptr_eq(&data.0, &other.0));
        assert_eq!(other.policy.name(), "permissions");
    }
}
