use super::run;
use crate::moderation::ActionRequest;
use crate::target::TargetArg;
use crate::{Context, Error};

/// Kick a member
#[poise::command(slash_command, prefix_command, guild_only, category = "Moderation")]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "Member"] target: TargetArg,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    run(
        ctx,
        ActionRequest::Kick {
            target: target.into(),
            reason,
        },
    )
    .await
}

/// Ban a member
#[poise::command(slash_command, prefix_command, guild_only, category = "Moderation")]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "Member"] target: TargetArg,
    #[description = "Days of messages to delete (0-7)"] delete_message_days: Option<i64>,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    run(
        ctx,
        ActionRequest::Ban {
            target: target.into(),
            reason,
            delete_message_days,
        },
    )
    .await
}

/// Unban a user by ID
#[poise::command(slash_command, prefix_command, guild_only, category = "Moderation")]
pub async fn unban(
    ctx: Context<'_>,
    #[description = "ID of the banned user"] user_id: String,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    run(ctx, ActionRequest::Unban { user_id, reason }).await
}

/// Mute a member with the configured muted role
#[poise::command(slash_command, prefix_command, guild_only, category = "Moderation")]
pub async fn mute(
    ctx: Context<'_>,
    #[description = "Member"] target: TargetArg,
    #[description = "Reason"]
    #[rest]
    reason: Option<String>,
) -> Result<(), Error> {
    run(
        ctx,
        ActionRequest::Mute {
            target: target.into(),
            reason,
        },
    )
    .await
}

/// Unmute a member
#[poise::command(slash_command, prefix_command, guild_only, category = "Moderation")]
pub async fn unmute(
    ctx: Context<'_>,
    #[description = "Member"] target: TargetArg,
) -> Result<(), Error> {
    run(
        ctx,
        ActionRequest::Unmute {
            target: target.into(),
        },
    )
    .await
}

/// Bulk-delete recent messages in this channel (max 100)
#[poise::command(slash_command, prefix_command, guild_only, category = "Moderation")]
pub async fn purge(
    ctx: Context<'_>,
    #[description = "Number of messages (1-100)"] amount: i64,
) -> Result<(), Error> {
    run(ctx, ActionRequest::Purge { amount }).await
}

/// Set this channel's slowmode (0 disables)
#[poise::command(slash_command, prefix_command, guild_only, category = "Moderation")]
pub async fn slowmode(
    ctx: Context<'_>,
    #[description = "Seconds between messages (0-21600)"] seconds: i64,
) -> Result<(), Error> {
    run(ctx, ActionRequest::Slowmode { seconds }).await
}

/// Stop @everyone from sending messages here
#[poise::command(slash_command, prefix_command, guild_only, category = "Moderation")]
pub async fn lock(ctx: Context<'_>) -> Result<(), Error> {
    run(ctx, ActionRequest::Lock).await
}

/// Let @everyone send messages here again
#[poise::command(slash_command, prefix_command, guild_only, category = "Moderation")]
pub async fn unlock(ctx: Context<'_>) -> Result<(), Error> {
    run(ctx, ActionRequest::Unlock).await
}
