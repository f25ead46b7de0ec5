//! Serenity-backed platform implementation

use super::{LogPost, ModerationPlatform, PlatformError, PlatformResult, Reply, Responder};
use crate::target::ResolvedTarget;
use async_trait::async_trait;
use poise::CreateReply;
use poise::serenity_prelude::{
    self as serenity, ChannelId, CreateEmbed, CreateEmbedFooter, CreateMessage, EditChannel,
    GetMessages, GuildId, Http, HttpError, MessageId, PermissionOverwrite, PermissionOverwriteType,
    Permissions, RoleId, Timestamp, UserId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// HTTP status carried by a failed request, if any
fn status_of(error: &HttpError) -> Option<u16> {
    match error {
        HttpError::UnsuccessfulRequest(response) => Some(response.status_code.as_u16()),
        _ => None,
    }
}

impl From<serenity::Error> for PlatformError {
    fn from(error: serenity::Error) -> Self {
        let status = match &error {
            serenity::Error::Http(inner) => status_of(inner),
            _ => None,
        };
        match status {
            Some(403) => Self::PermissionDenied,
            Some(404) => Self::NotFound,
            _ => Self::Other(error.to_string()),
        }
    }
}

/// Effective guild-level permissions of a member from its role set.
///
/// The owner holds every permission; `ADMINISTRATOR` expands to every
/// permission as well. The everyone role shares the guild's ID and always
/// applies.
#[must_use]
pub fn permissions_from_roles(
    guild_id: GuildId,
    owner_id: UserId,
    role_permissions: &HashMap<RoleId, Permissions>,
    user_id: UserId,
    member_roles: &[RoleId],
) -> Permissions {
    if user_id == owner_id {
        return Permissions::all();
    }

    let everyone = RoleId::new(guild_id.get());
    let permissions = std::iter::once(&everyone)
        .chain(member_roles)
        .filter_map(|role| role_permissions.get(role))
        .fold(Permissions::empty(), |acc, &p| acc | p);

    if permissions.contains(Permissions::ADMINISTRATOR) {
        Permissions::all()
    } else {
        permissions
    }
}

/// Overwrite for the everyone role with SEND_MESSAGES denied (`locked`) or
/// returned to inherit, keeping the rest of the existing overwrite intact.
#[must_use]
pub fn send_messages_overwrite(
    existing: Option<&PermissionOverwrite>,
    role_id: RoleId,
    locked: bool,
) -> PermissionOverwrite {
    let (mut allow, mut deny) = existing.map_or((Permissions::empty(), Permissions::empty()), |o| {
        (o.allow, o.deny)
    });
    allow.remove(Permissions::SEND_MESSAGES);
    if locked {
        deny.insert(Permissions::SEND_MESSAGES);
    } else {
        deny.remove(Permissions::SEND_MESSAGES);
    }
    PermissionOverwrite {
        allow,
        deny,
        kind: PermissionOverwriteType::Role(role_id),
    }
}

/// [`ModerationPlatform`] over the Discord REST API
#[derive(Clone)]
pub struct SerenityPlatform {
    http: Arc<Http>,
}

impl SerenityPlatform {
    #[must_use]
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    fn http(&self) -> &Http {
        self.http.as_ref()
    }
}

#[async_trait]
impl ModerationPlatform for SerenityPlatform {
    async fn fetch_user(&self, user_id: UserId) -> PlatformResult<ResolvedTarget> {
        let user = self.http().get_user(user_id).await?;
        Ok(ResolvedTarget::from(&user))
    }

    async fn member_permissions(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> PlatformResult<Permissions> {
        let guild = guild_id.to_partial_guild(self.http()).await?;
        let member = guild_id.member(self.http(), user_id).await?;
        let role_permissions: HashMap<RoleId, Permissions> = guild
            .roles
            .iter()
            .map(|(id, role)| (*id, role.permissions))
            .collect();
        Ok(permissions_from_roles(
            guild_id,
            guild.owner_id,
            &role_permissions,
            user_id,
            &member.roles,
        ))
    }

    async fn member_has_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
    ) -> PlatformResult<bool> {
        let member = guild_id.member(self.http(), user_id).await?;
        Ok(member.roles.contains(&role_id))
    }

    async fn role_exists(&self, guild_id: GuildId, role_id: RoleId) -> PlatformResult<bool> {
        let roles = guild_id.roles(self.http()).await?;
        Ok(roles.contains_key(&role_id))
    }

    async fn send_dm(&self, user_id: UserId, content: String) -> PlatformResult<()> {
        let channel = user_id.create_dm_channel(self.http()).await?;
        channel
            .id
            .send_message(self.http(), CreateMessage::new().content(content))
            .await?;
        Ok(())
    }

    async fn send_log(&self, channel_id: ChannelId, post: LogPost) -> PlatformResult<()> {
        let mut embed = CreateEmbed::new()
            .title(post.title)
            .colour(post.colour)
            .fields(post.fields)
            .timestamp(Timestamp::now());
        if let Some(description) = post.description {
            embed = embed.description(description);
        }
        if let Some(footer) = post.footer {
            embed = embed.footer(CreateEmbedFooter::new(footer));
        }
        channel_id
            .send_message(self.http(), CreateMessage::new().embed(embed))
            .await?;
        Ok(())
    }

    async fn kick(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        reason: String,
    ) -> PlatformResult<()> {
        guild_id
            .kick_with_reason(self.http(), user_id, &reason)
            .await?;
        Ok(())
    }

    async fn ban(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        delete_message_days: u8,
        reason: String,
    ) -> PlatformResult<()> {
        guild_id
            .ban_with_reason(self.http(), user_id, delete_message_days, &reason)
            .await?;
        Ok(())
    }

    async fn unban(&self, guild_id: GuildId, user_id: UserId) -> PlatformResult<()> {
        guild_id.unban(self.http(), user_id).await?;
        Ok(())
    }

    async fn add_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: String,
    ) -> PlatformResult<()> {
        self.http()
            .add_member_role(guild_id, user_id, role_id, Some(&reason))
            .await?;
        Ok(())
    }

    async fn remove_role(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        reason: String,
    ) -> PlatformResult<()> {
        self.http()
            .remove_member_role(guild_id, user_id, role_id, Some(&reason))
            .await?;
        Ok(())
    }

    async fn purge(&self, channel_id: ChannelId, amount: u8) -> PlatformResult<usize> {
        let messages = channel_id
            .messages(self.http(), GetMessages::new().limit(amount))
            .await?;
        let message_ids: Vec<MessageId> = messages.iter().map(|m| m.id).collect();
        match message_ids.as_slice() {
            [] => {}
            [single] => channel_id.delete_message(self.http(), *single).await?,
            _ => channel_id.delete_messages(self.http(), &message_ids).await?,
        }
        debug!(channel_id = %channel_id, count = message_ids.len(), "Purged messages");
        Ok(message_ids.len())
    }

    async fn set_slowmode(&self, channel_id: ChannelId, seconds: u16) -> PlatformResult<()> {
        channel_id
            .edit(self.http(), EditChannel::new().rate_limit_per_user(seconds))
            .await?;
        Ok(())
    }

    async fn set_channel_locked(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        locked: bool,
    ) -> PlatformResult<()> {
        let everyone = guild_id.everyone_role();
        let channel = channel_id
            .to_channel(self.http())
            .await?
            .guild()
            .ok_or(PlatformError::NotFound)?;
        let existing = channel
            .permission_overwrites
            .iter()
            .find(|o| o.kind == PermissionOverwriteType::Role(everyone));
        let overwrite = send_messages_overwrite(existing, everyone, locked);
        channel_id.create_permission(self.http(), overwrite).await?;
        Ok(())
    }
}

/// Replies to a poise command context with a coloured embed
pub struct ContextResponder<'a> {
    ctx: crate::Context<'a>,
}

impl<'a> ContextResponder<'a> {
    #[must_use]
    pub fn new(ctx: crate::Context<'a>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Responder for ContextResponder<'_> {
    async fn respond(&self, reply: Reply) -> PlatformResult<()> {
        let embed = CreateEmbed::new()
            .description(reply.rendered())
            .colour(reply.colour());
        self.ctx
            .send(
                CreateReply::default()
                    .embed(embed)
                    .ephemeral(reply.ephemeral),
            )
            .await?;
        Ok(())
    }
}
