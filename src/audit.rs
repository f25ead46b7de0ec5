//! Append-only audit log
//!
//! One line per event, mirrored to the tracing output. Writes never raise.

use crate::AUDIT_TARGET;
use crate::store::TIMESTAMP_FORMAT;
use chrono::{DateTime, Utc};
use poise::serenity_prelude::{GuildId, UserId};
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// File name of the audit log inside the data directory
pub const AUDIT_FILE: &str = "audit.log";

/// A single audit line. `action` carries the action name followed by its
/// details, e.g. `kick  target=42  reason="spam"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub guild_id: Option<GuildId>,
    pub user_id: Option<UserId>,
}

impl AuditEntry {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            action: action.into(),
            guild_id: None,
            user_id: None,
        }
    }

    #[must_use]
    pub fn guild(mut self, guild_id: GuildId) -> Self {
        self.guild_id = Some(guild_id);
        self
    }

    #[must_use]
    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

impl Display for AuditEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]  {}", self.timestamp.format(TIMESTAMP_FORMAT), self.action)?;
        if let Some(guild_id) = self.guild_id {
            write!(f, "  guild:{guild_id}")?;
        }
        if let Some(user_id) = self.user_id {
            write!(f, "  user:{user_id}")?;
        }
        Ok(())
    }
}

/// Append-only writer for [`AuditEntry`] lines
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Create the log file with a header line if it does not exist yet
    pub async fn ensure_exists(&self) {
        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return;
        }
        let header = format!(
            "# Audit Log - created {}\n\n",
            Utc::now().format(TIMESTAMP_FORMAT)
        );
        if let Err(e) = tokio::fs::write(&self.path, header).await {
            warn!(path = %self.path.display(), error = %e, "Could not create audit log");
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `entry`. Returns whether the line reached the file.
    pub async fn append(&self, entry: &AuditEntry) -> bool {
        let line = entry.to_string();
        info!(target: AUDIT_TARGET, "{line}");

        let _guard = self.write_lock.lock().await;
        let result = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            file.write_all(format!("{line}\n").as_bytes()).await?;
            file.flush().await
        }
        .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Audit log write failed");
                false
            }
        }
    }
}
