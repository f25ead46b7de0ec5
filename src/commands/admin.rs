use super::{Scope, run};
use crate::audit::AuditEntry;
use crate::auth::Requirement;
use crate::moderation::ActionRequest;
use crate::status::StatusReport;
use crate::store::ConfigField;
use crate::{Context, Error, logging};
use poise::serenity_prelude::{GuildChannel, Role};
use std::time::Duration;

/// Pause between closing the shards and exiting
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Set the channel moderation events are posted to
#[poise::command(slash_command, prefix_command, guild_only, category = "Admin Config")]
pub async fn set_log_channel(
    ctx: Context<'_>,
    #[description = "Log channel"] channel: GuildChannel,
) -> Result<(), Error> {
    run(
        ctx,
        ActionRequest::SetConfig {
            field: ConfigField::LogChannel,
            id: channel.id.get(),
        },
    )
    .await
}

/// Set the role given to members when they join
#[poise::command(slash_command, prefix_command, guild_only, category = "Admin Config")]
pub async fn set_autorole(
    ctx: Context<'_>,
    #[description = "Role assigned on join"] role: Role,
) -> Result<(), Error> {
    run(
        ctx,
        ActionRequest::SetConfig {
            field: ConfigField::Autorole,
            id: role.id.get(),
        },
    )
    .await
}

/// Set the role used by mute and unmute
#[poise::command(slash_command, prefix_command, guild_only, category = "Admin Config")]
pub async fn set_mute_role(
    ctx: Context<'_>,
    #[description = "Muted role"] role: Role,
) -> Result<(), Error> {
    run(
        ctx,
        ActionRequest::SetConfig {
            field: ConfigField::MuteRole,
            id: role.id.get(),
        },
    )
    .await
}

/// Show bot status and statistics (operators only)
#[poise::command(slash_command, prefix_command, guild_only, category = "Admin")]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let scope = Scope::new(ctx)?;
    if !scope.moderator().guard(&scope.inv, Requirement::Operator).await {
        return Ok(());
    }
    ctx.say(StatusReport::collect(ctx.data()).to_string()).await?;
    Ok(())
}

/// Shut the bot down (operators only)
#[poise::command(slash_command, prefix_command, guild_only, category = "Admin")]
pub async fn shutdown(ctx: Context<'_>) -> Result<(), Error> {
    let scope = Scope::new(ctx)?;
    if !scope.moderator().guard(&scope.inv, Requirement::Operator).await {
        return Ok(());
    }

    ctx.say("🔴  Shutting down...").await?;
    let entry = AuditEntry::new("admin_shutdown")
        .guild(scope.inv.guild_id)
        .user(scope.inv.actor_id);
    ctx.data().audit.append(&entry).await;
    logging::log_console(format!("Shutdown requested by {}", scope.inv.actor_display));

    ctx.framework().shard_manager().shutdown_all().await;
    tokio::time::sleep(SHUTDOWN_GRACE).await;
    std::process::exit(0);
}
