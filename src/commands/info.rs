use super::{invocation, platform};
use crate::moderation::ModerationError;
use crate::platform::{ContextResponder, Responder};
use crate::target::{ResolvedTarget, TargetArg, resolve};
use crate::{Context, Error};
use poise::CreateReply;
use poise::serenity_prelude::{
    Colour, CreateEmbed, CreateEmbedFooter, Mentionable, Role, Timestamp,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Command reference, grouped by section
#[must_use]
pub fn help_sections(prefix: &str) -> Vec<(&'static str, Vec<String>)> {
    let line = |usage: &str, what: &str| format!("`{prefix}{usage}`  -  {what}");
    vec![
        (
            "ℹ️  Information",
            vec![
                line("help", "This message"),
                line("ping", "Bot latency"),
                line("botinfo", "Bot statistics"),
                line("serverinfo", "Server details"),
                line("userinfo [member]", "User details"),
                line("avatar [member]", "Display avatar"),
                line("roleinfo <role>", "Role details"),
            ],
        ),
        (
            "⚠️  Warnings",
            vec![
                line("warn <member> <reason>", "Warn a member"),
                line("warnings <member>", "View a member's warnings"),
                line("clear_warnings <member>", "Remove all warnings"),
            ],
        ),
        (
            "🔨  Moderation",
            vec![
                line("kick <member> [reason]", "Kick a member"),
                line("ban <member> [days] [reason]", "Ban a member"),
                line("unban <user_id> [reason]", "Unban a user"),
                line("mute <member> [reason]", "Mute a member"),
                line("unmute <member>", "Unmute a member"),
                line("purge <amount>", "Bulk-delete messages (max 100)"),
                line("slowmode <seconds>", "Set channel slowmode"),
                line("lock", "Lock the current channel"),
                line("unlock", "Unlock the current channel"),
            ],
        ),
        (
            "⚙️  Admin Config",
            vec![
                line("set_log_channel <channel>", "Set the log channel"),
                line("set_autorole <role>", "Set the auto-role on join"),
                line("set_mute_role <role>", "Set the muted role"),
                line("status", "Bot status (operators)"),
                line("shutdown", "Stop the bot (operators)"),
            ],
        ),
    ]
}

fn yes_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

/// Resolve an optional target, defaulting to the invoker. Replies on failure.
async fn target_or_author(
    ctx: Context<'_>,
    target: Option<TargetArg>,
) -> Result<Option<ResolvedTarget>, Error> {
    let Some(target) = target else {
        return Ok(Some(ResolvedTarget::from(ctx.author())));
    };
    match resolve(&platform(ctx), target.into()).await {
        Ok(resolved) => Ok(Some(resolved)),
        Err(e) => {
            ContextResponder::new(ctx)
                .respond(ModerationError::from(e).reply())
                .await?;
            Ok(None)
        }
    }
}

/// Lists all available commands
#[poise::command(slash_command, prefix_command, category = "Information")]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let prefix = &ctx.data().config.prefix;
    let fields = help_sections(prefix)
        .into_iter()
        .map(|(section, lines)| (section, lines.join("\n"), false));
    let embed = CreateEmbed::new()
        .title("📖  Command Reference")
        .colour(Colour::BLURPLE)
        .fields(fields)
        .footer(CreateEmbedFooter::new(format!("Prefix: {prefix}")))
        .timestamp(Timestamp::now());
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Check the bot's latency
#[poise::command(slash_command, prefix_command, category = "Information")]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    let latency = ctx.ping().await;
    ctx.say(format!("🏓  Pong!  Latency: **{} ms**", latency.as_millis()))
        .await?;
    Ok(())
}

/// Display statistics about the bot
#[poise::command(slash_command, prefix_command, category = "Information")]
pub async fn botinfo(ctx: Context<'_>) -> Result<(), Error> {
    let (bot_id, avatar) = {
        let me = ctx.cache().current_user();
        (me.id, me.face())
    };
    let guilds = ctx.cache().guild_count();
    let latency = ctx.ping().await;
    let data = ctx.data();

    let embed = CreateEmbed::new()
        .title("🤖  Bot Info")
        .colour(Colour::BLURPLE)
        .thumbnail(avatar)
        .field("Guilds", guilds.to_string(), true)
        .field("Latency", format!("{} ms", latency.as_millis()), true)
        .field("Prefix", &data.config.prefix, true)
        .field("Admin IDs loaded", data.config.admin_ids.len().to_string(), true)
        .footer(CreateEmbedFooter::new(format!("ID: {bot_id}")))
        .timestamp(Timestamp::now());
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Display information about this server
#[poise::command(slash_command, prefix_command, guild_only, category = "Information")]
pub async fn serverinfo(ctx: Context<'_>) -> Result<(), Error> {
    let embed = {
        let guild = ctx
            .guild()
            .ok_or("This command can only be used in a server.")?;
        let mut embed = CreateEmbed::new()
            .title(format!("🏠  {}", guild.name))
            .colour(Colour::BLURPLE)
            .field("Owner", guild.owner_id.mention().to_string(), true)
            .field("Members", guild.member_count.to_string(), true)
            .field("Channels", guild.channels.len().to_string(), true)
            .field("Roles", guild.roles.len().to_string(), true)
            .field(
                "Boosts",
                guild.premium_subscription_count.unwrap_or(0).to_string(),
                true,
            )
            .field(
                "Created",
                guild.id.created_at().format(DATE_FORMAT).to_string(),
                true,
            )
            .footer(CreateEmbedFooter::new(format!("ID: {}", guild.id)))
            .timestamp(Timestamp::now());
        if let Some(icon) = guild.icon_url() {
            embed = embed.thumbnail(icon);
        }
        embed
    };
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Display information about a member
#[poise::command(slash_command, prefix_command, guild_only, category = "Information")]
pub async fn userinfo(
    ctx: Context<'_>,
    #[description = "Member (defaults to you)"] target: Option<TargetArg>,
) -> Result<(), Error> {
    let inv = invocation(ctx)?;
    let Some(target) = target_or_author(ctx, target).await? else {
        return Ok(());
    };
    let member = inv.guild_id.member(ctx, target.user_id).await.ok();
    let user = match &member {
        Some(member) => member.user.clone(),
        None => target.user_id.to_user(ctx).await?,
    };
    let warning_count = ctx
        .data()
        .storage
        .warnings
        .count(inv.guild_id, target.user_id);

    let roles: Vec<String> = member
        .as_ref()
        .map(|m| m.roles.iter().map(|r| r.mention().to_string()).collect())
        .unwrap_or_default();
    let nickname = member
        .as_ref()
        .and_then(|m| m.nick.clone())
        .unwrap_or_else(|| "None".to_string());
    let joined = member
        .as_ref()
        .and_then(|m| m.joined_at)
        .map_or_else(|| "?".to_string(), |t| t.format(DATE_FORMAT).to_string());

    let embed = CreateEmbed::new()
        .title(format!("👤  {}", user.tag()))
        .colour(user.accent_colour.unwrap_or(Colour::BLURPLE))
        .thumbnail(user.face())
        .field("ID", user.id.to_string(), true)
        .field("Nickname", nickname, true)
        .field("Bot", yes_no(user.bot), true)
        .field(
            "Account Created",
            user.created_at().format(DATE_FORMAT).to_string(),
            true,
        )
        .field("Joined Server", joined, true)
        .field(
            format!("Roles ({})", roles.len()),
            if roles.is_empty() {
                "None".to_string()
            } else {
                roles.join(" ")
            },
            false,
        )
        .field("Warnings", warning_count.to_string(), true)
        .footer(CreateEmbedFooter::new(format!("ID: {}", user.id)))
        .timestamp(Timestamp::now());
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Display a member's avatar
#[poise::command(slash_command, prefix_command, category = "Information")]
pub async fn avatar(
    ctx: Context<'_>,
    #[description = "Member (defaults to you)"] target: Option<TargetArg>,
) -> Result<(), Error> {
    let Some(target) = target_or_author(ctx, target).await? else {
        return Ok(());
    };
    let user = if target.user_id == ctx.author().id {
        ctx.author().clone()
    } else {
        target.user_id.to_user(ctx).await?
    };
    let embed = CreateEmbed::new()
        .title(format!("🖼️  {}'s Avatar", user.display_name()))
        .colour(Colour::BLURPLE)
        .image(user.face());
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Display information about a role
#[poise::command(slash_command, prefix_command, guild_only, category = "Information")]
pub async fn roleinfo(
    ctx: Context<'_>,
    #[description = "Role to describe"] role: Role,
) -> Result<(), Error> {
    let members = ctx.guild().map_or(0, |guild| {
        guild
            .members
            .values()
            .filter(|m| m.roles.contains(&role.id))
            .count()
    });

    let embed = CreateEmbed::new()
        .title(format!("🎭  Role: {}", role.name))
        .colour(role.colour)
        .field("ID", role.id.to_string(), true)
        .field("Members", members.to_string(), true)
        .field("Mentionable", yes_no(role.mentionable), true)
        .field("Hoisted", yes_no(role.hoist), true)
        .field("Position", role.position.to_string(), true)
        .field(
            "Created",
            role.id.created_at().format(DATE_FORMAT).to_string(),
            true,
        )
        .footer(CreateEmbedFooter::new(format!("ID: {}", role.id)))
        .timestamp(Timestamp::now());
    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}
