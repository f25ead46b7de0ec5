//! Notification fan-out
//!
//! After a command settles, in order: DM the target, reply to the invoker,
//! append the audit line, post to the guild's log channel. Each step is
//! attempted whatever happened to the previous one.

use crate::audit::{AuditEntry, AuditLog};
use crate::platform::{LogPost, ModerationPlatform, Reply, Responder, best_effort};
use crate::store::GuildConfigStore;
use poise::serenity_prelude::{GuildId, UserId};
use tracing::debug;

/// A direct message to the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectMessage {
    pub user_id: UserId,
    pub content: String,
}

/// Everything a settled command wants delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub dm: Option<DirectMessage>,
    pub reply: Reply,
    pub audit: Option<AuditEntry>,
    pub log_post: Option<LogPost>,
}

impl Notification {
    #[must_use]
    pub fn reply(reply: Reply) -> Self {
        Self {
            dm: None,
            reply,
            audit: None,
            log_post: None,
        }
    }

    #[must_use]
    pub fn dm(mut self, user_id: UserId, content: impl Into<String>) -> Self {
        self.dm = Some(DirectMessage {
            user_id,
            content: content.into(),
        });
        self
    }

    #[must_use]
    pub fn audit(mut self, entry: AuditEntry) -> Self {
        self.audit = Some(entry);
        self
    }

    #[must_use]
    pub fn log_post(mut self, post: LogPost) -> Self {
        self.log_post = Some(post);
        self
    }
}

/// Which fan-out steps went through. `None` means the step had nothing to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub dm: Option<bool>,
    pub replied: bool,
    pub audited: Option<bool>,
    pub logged: Option<bool>,
}

/// Deliver `notification` for a command run in `guild_id`
pub async fn fan_out(
    platform: &dyn ModerationPlatform,
    responder: &dyn Responder,
    audit_log: &AuditLog,
    configs: &GuildConfigStore,
    guild_id: GuildId,
    notification: Notification,
) -> Delivery {
    let Notification {
        dm,
        reply,
        audit,
        log_post,
    } = notification;
    let mut delivery = Delivery::default();

    if let Some(dm) = dm {
        delivery.dm = Some(best_effort("dm", platform.send_dm(dm.user_id, dm.content)).await);
    }

    delivery.replied = best_effort("reply", responder.respond(reply)).await;

    if let Some(entry) = audit {
        delivery.audited = Some(audit_log.append(&entry).await);
    }

    if let Some(post) = log_post {
        match configs.get(guild_id).log_channel() {
            Some(channel_id) => {
                delivery.logged =
                    Some(best_effort("log channel", platform.send_log(channel_id, post)).await);
            }
            None => debug!(guild_id = %guild_id, "No log channel configured"),
        }
    }

    delivery
}
