//! Platform seam
//!
//! Everything the moderation core needs from the chat platform goes through
//! [`ModerationPlatform`] (reads and mutations) and [`Responder`] (the reply in
//! the invoking context). The serenity-backed implementation lives in
//! [`discord`]; tests use the `mockall` mocks.

mod reply;
pub mod discord;

pub use reply::{LogPost, Reply, ReplyKind};
pub use discord::{ContextResponder, SerenityPlatform};

use crate::target::ResolvedTarget;
use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, GuildId, Permissions, RoleId, UserId};
use thiserror::Error;

/// Failure reported by a platform call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The bot itself lacks the rights for this call
    #[error("Missing permissions")]
    PermissionDenied,

    /// The addressed object (user, member, ban, channel) does not exist
    #[error("Not found")]
    NotFound,

    #[error("Platform error: {0}")]
    Other(String),
}

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Platform reads and mutations used by the moderation core
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModerationPlatform: Send + Sync {
    /// Look a user up by ID
    async fn fetch_user(&self, user_id: UserId) -> PlatformResult<ResolvedTarget>;

    /// Effective guild-level permission flags of a member
    async fn member_permissions(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> PlatformResult<Permissions>;

    async fn member_has_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> PlatformResult<bool>;

    async fn role_exists(&self, guild_id: GuildId, role_id: RoleId) -> PlatformResult<bool>;

    async fn send_dm(&self, user_id: UserId, content: String) -> PlatformResult<()>;

    /// Post a notification embed to a (log) channel
    async fn send_log(&self, channel_id: ChannelId, post: LogPost) -> PlatformResult<()>;

    async fn kick(&self, guild_id: GuildId, user_id: UserId, reason: String)
    -> PlatformResult<()>;

    async fn ban(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        delete_message_days: u8,
        reason: String,
    ) -> PlatformResult<()>;

    async fn unban(&self, guild_id: GuildId, user_id: UserId) -> PlatformResult<()>;

    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: String,
    ) -> PlatformResult<()>;

    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: String,
    ) -> PlatformResult<()>;

    /// Delete up to `amount` recent messages, returning how many went
    async fn purge(&self, channel_id: ChannelId, amount: u8) -> PlatformResult<usize>;

    async fn set_slowmode(&self, channel_id: ChannelId, seconds: u16) -> PlatformResult<()>;

    /// Deny (`locked = true`) or reset the everyone role's send-messages
    /// permission in a channel
    async fn set_channel_locked(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        locked: bool,
    ) -> PlatformResult<()>;
}

/// Sends the single reply to the context a command was invoked from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, reply: Reply) -> PlatformResult<()>;
}

/// Await a send whose failure is expected and acceptable.
///
/// Returns whether the send went through; the error is logged at debug level
/// and dropped.
pub async fn best_effort<F>(what: &str, send: F) -> bool
where
    F: std::future::Future<Output = PlatformResult<()>>,
{
    match send.await {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(what, error = %e, "Best-effort send failed");
            false
        }
    }
}
