use crate::data::Data;
use crate::events::{EventRouter, LifecycleEvent};
use crate::platform::SerenityPlatform;
use crate::target::ResolvedTarget;
use crate::EVENT_TARGET;
use poise::serenity_prelude::{
    self as serenity, ActivityData, ChannelId, Context, EventHandler, GuildId, Member, Message,
    MessageId, MessageUpdateEvent, OnlineStatus, Ready, User,
};
use tracing::{debug, info, warn};

/// Messages kept per channel in serenity's cache
pub const MESSAGE_CACHE_CAPACITY: usize = 1000;

/// Date format for account-creation fields
const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct Handler {
    pub data: Data,
}

impl Handler {
    #[must_use]
    pub fn new(data: Data) -> Self {
        Self { data }
    }

    async fn route(&self, ctx: &Context, event: LifecycleEvent) {
        let platform = SerenityPlatform::new(ctx.http.clone());
        EventRouter::new(&platform, &self.data.storage, &self.data.audit)
            .route(event)
            .await;
    }
}

/// Cache settings that keep enough history for delete and edit log posts
#[must_use]
pub fn cache_settings() -> serenity::Settings {
    let mut settings = serenity::Settings::default();
    settings.max_messages = MESSAGE_CACHE_CAPACITY;
    settings
}

fn account_created(user: &User) -> String {
    user.created_at().format(DATE_FORMAT).to_string()
}

#[serenity::async_trait]
impl EventHandler for Handler {
    /// Called when the bot is ready, but the cache may not be fully populated yet.
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            target: EVENT_TARGET,
            "Connected as {}, shard {}", ready.user.name, ctx.shard_id
        );
        ctx.set_presence(
            Some(ActivityData::watching(format!("{}help", self.data.config.prefix))),
            OnlineStatus::Online,
        );

        let event = LifecycleEvent::Ready {
            bot_tag: ready.user.tag(),
            bot_id: ready.user.id,
            guild_count: ready.guilds.len(),
        };
        self.route(&ctx, event).await;
    }

    /// Called when the cache is fully populated.
    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        let guild_count_cache = ctx.cache.guild_count();
        let guild_count = guilds.len();
        if guild_count != guild_count_cache {
            warn!(
                target: EVENT_TARGET,
                "Cache guild count mismatch: {guild_count_cache} (cache) vs {guild_count} (actual)"
            );
        }
        info!(target: EVENT_TARGET, "Cache ready! The bot is in {guild_count} guild(s)");
    }

    async fn guild_member_addition(&self, ctx: Context, new_member: Member) {
        let event = LifecycleEvent::MemberJoined {
            guild_id: new_member.guild_id,
            member: ResolvedTarget::from(&new_member.user),
            account_created: account_created(&new_member.user),
        };
        self.route(&ctx, event).await;
    }

    async fn guild_member_removal(
        &self,
        ctx: Context,
        guild_id: GuildId,
        user: User,
        _member_data_if_available: Option<Member>,
    ) {
        let event = LifecycleEvent::MemberLeft {
            guild_id,
            member: ResolvedTarget::from(&user),
        };
        self.route(&ctx, event).await;
    }

    async fn message_delete(
        &self,
        ctx: Context,
        channel_id: ChannelId,
        deleted_message_id: MessageId,
        _guild_id: Option<GuildId>,
    ) {
        // A gateway delete does not evict the message from the cache
        let deleted = {
            let cached = ctx.cache.message(channel_id, deleted_message_id);
            LifecycleEvent::message_deleted(cached.as_deref())
        };
        let Some(event) = deleted else {
            debug!(target: EVENT_TARGET, message_id = %deleted_message_id, "Deleted message not cached");
            return;
        };
        self.route(&ctx, event).await;
    }

    async fn message_update(
        &self,
        ctx: Context,
        old_if_available: Option<Message>,
        _new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        let Some(edited) = LifecycleEvent::message_edited(old_if_available.as_ref(), event.content)
        else {
            debug!(target: EVENT_TARGET, message_id = %event.id, "Edited message not cached or has no content");
            return;
        };
        self.route(&ctx, edited).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_implements_event_handler() {
        fn assert_impl<T: EventHandler>() {}
        assert_impl::<Handler>();
    }

    #[test]
    fn test_cache_keeps_recent_messages() {
        assert_eq!(cache_settings().max_messages, MESSAGE_CACHE_CAPACITY);
        assert_eq!(serenity::Settings::default().max_messages, 0);
    }
}
