//! Event router
//!
//! Platform lifecycle events, converted to [`LifecycleEvent`] by the gateway
//! handler, each run through an independent handler here. Nothing a handler
//! does can fail the caller: every step is best-effort and logged.

use crate::audit::{AuditEntry, AuditLog};
use crate::platform::{LogPost, ModerationPlatform, best_effort};
use crate::store::Storage;
use crate::target::ResolvedTarget;
use crate::{EVENT_TARGET, Error};
use poise::serenity_prelude::{Colour, ChannelId, GuildId, Message, MessageId, UserId};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Longest deleted-message preview posted to the log channel
pub const DELETED_PREVIEW_CHARS: usize = 1024;
/// Longest before/after excerpt for an edit
pub const EDITED_PREVIEW_CHARS: usize = 512;

/// What the log channel needs to know about a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedMessage {
    pub id: MessageId,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub author_is_bot: bool,
    pub content: String,
}

impl From<&Message> for LoggedMessage {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            guild_id: message.guild_id,
            channel_id: message.channel_id,
            author_id: message.author.id,
            author_is_bot: message.author.bot,
            content: message.content.clone(),
        }
    }
}

/// A platform event relevant to moderation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Ready {
        bot_tag: String,
        bot_id: UserId,
        guild_count: usize,
    },
    MemberJoined {
        guild_id: GuildId,
        member: ResolvedTarget,
        account_created: String,
    },
    MemberLeft {
        guild_id: GuildId,
        member: ResolvedTarget,
    },
    MessageDeleted {
        message: LoggedMessage,
    },
    MessageEdited {
        before: LoggedMessage,
        after: String,
    },
}

impl LifecycleEvent {
    /// Delete event from the cached copy of the message, if it was cached
    #[must_use]
    pub fn message_deleted(cached: Option<&Message>) -> Option<Self> {
        cached.map(|message| Self::MessageDeleted {
            message: message.into(),
        })
    }

    /// Edit event from the pre-edit copy and the new content. Updates without
    /// content (embed resolution) and uncached messages yield nothing.
    #[must_use]
    pub fn message_edited(before: Option<&Message>, after: Option<String>) -> Option<Self> {
        Some(Self::MessageEdited {
            before: before?.into(),
            after: after?,
        })
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn or_empty(text: String) -> String {
    if text.is_empty() {
        "*(empty)*".to_string()
    } else {
        text
    }
}

/// Dispatches [`LifecycleEvent`]s to their handlers
pub struct EventRouter<'a> {
    platform: &'a dyn ModerationPlatform,
    storage: &'a Storage,
    audit: &'a AuditLog,
}

impl<'a> EventRouter<'a> {
    pub fn new(
        platform: &'a dyn ModerationPlatform,
        storage: &'a Storage,
        audit: &'a AuditLog,
    ) -> Self {
        Self {
            platform,
            storage,
            audit,
        }
    }

    /// Handle `event`. Returns whether a log-channel post went out.
    pub async fn route(&self, event: LifecycleEvent) -> bool {
        match event {
            LifecycleEvent::Ready {
                bot_tag,
                bot_id,
                guild_count,
            } => {
                info!(target: EVENT_TARGET, bot = %bot_tag, guilds = guild_count, "Bot online");
                self.audit
                    .append(&AuditEntry::new(format!("Bot online  tag={bot_tag}  id={bot_id}")))
                    .await;
                false
            }
            LifecycleEvent::MemberJoined {
                guild_id,
                member,
                account_created,
            } => self.member_joined(guild_id, &member, &account_created).await,
            LifecycleEvent::MemberLeft { guild_id, member } => {
                self.audit
                    .append(&AuditEntry::new("member_leave").guild(guild_id).user(member.user_id))
                    .await;
                let post = LogPost::new("📤  Member Left", Colour::ORANGE)
                    .description(format!("{}  (`{}`)", member.mention(), member.display))
                    .footer(format!("ID: {}", member.user_id));
                self.post_to_log(guild_id, post).await
            }
            LifecycleEvent::MessageDeleted { message } => self.message_deleted(message).await,
            LifecycleEvent::MessageEdited { before, after } => {
                self.message_edited(before, after).await
            }
        }
    }

    async fn member_joined(
        &self,
        guild_id: GuildId,
        member: &ResolvedTarget,
        account_created: &str,
    ) -> bool {
        self.audit
            .append(&AuditEntry::new("member_join").guild(guild_id).user(member.user_id))
            .await;

        if let Some(role_id) = self.storage.guild_configs.get(guild_id).autorole() {
            let assigned = self
                .platform
                .add_role(guild_id, member.user_id, role_id, "Auto-role on join".to_string())
                .await;
            if let Err(e) = assigned {
                warn!(
                    target: EVENT_TARGET,
                    guild_id = %guild_id,
                    role_id = %role_id,
                    error = %e,
                    "Cannot assign auto-role"
                );
            }
        }

        let post = LogPost::new("📥  Member Joined", Colour::DARK_GREEN)
            .description(format!("{}  (`{}`)", member.mention(), member.display))
            .field("Account Created", account_created, true)
            .footer(format!("ID: {}", member.user_id));
        self.post_to_log(guild_id, post).await
    }

    async fn message_deleted(&self, message: LoggedMessage) -> bool {
        let Some(guild_id) = message.guild_id else {
            return false;
        };
        if message.author_is_bot {
            return false;
        }

        let mut post = LogPost::new("🗑️  Message Deleted", Colour::RED)
            .description(format!(
                "In <#{}> by <@{}>",
                message.channel_id, message.author_id
            ))
            .footer(format!("Author ID: {}", message.author_id));
        if !message.content.is_empty() {
            post = post.field(
                "Content",
                preview(&message.content, DELETED_PREVIEW_CHARS),
                false,
            );
        }
        self.post_to_log(guild_id, post).await
    }

    async fn message_edited(&self, before: LoggedMessage, after: String) -> bool {
        let Some(guild_id) = before.guild_id else {
            return false;
        };
        if before.author_is_bot || before.content == after {
            return false;
        }

        let post = LogPost::new("✏️  Message Edited", Colour::GOLD)
            .description(format!(
                "In <#{}> by <@{}>",
                before.channel_id, before.author_id
            ))
            .field(
                "Before",
                or_empty(preview(&before.content, EDITED_PREVIEW_CHARS)),
                false,
            )
            .field("After", or_empty(preview(&after, EDITED_PREVIEW_CHARS)), false)
            .footer(format!("Author ID: {}", before.author_id));
        self.post_to_log(guild_id, post).await
    }

    async fn post_to_log(&self, guild_id: GuildId, post: LogPost) -> bool {
        let Some(channel_id) = self.storage.guild_configs.get(guild_id).log_channel() else {
            debug!(target: EVENT_TARGET, guild_id = %guild_id, "No log channel configured");
            return false;
        };
        best_effort("log channel", self.platform.send_log(channel_id, post)).await
    }
}

/// How a failed command invocation is reported back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandFailure {
    UnknownCommand,
    CheckFailed,
    MissingArgument(String),
    BadArgument(String),
    Cooldown(Duration),
    GuildOnly,
    Unexpected(String),
}

impl CommandFailure {
    /// Message shown to the invoker; `None` means stay silent
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::UnknownCommand => None,
            Self::CheckFailed => Some("❌  You don't have permission to use that command.".into()),
            Self::MissingArgument(detail) => {
                Some(format!("❌  Missing required argument: `{detail}`"))
            }
            Self::BadArgument(detail) => Some(format!("⚠️  Bad argument: {detail}")),
            Self::Cooldown(remaining) => Some(format!(
                "⏳  Cooldown, retry in {:.1}s.",
                remaining.as_secs_f64()
            )),
            Self::GuildOnly => Some("❌  This command can only be used in a server.".into()),
            Self::Unexpected(_) => Some("⚠️  An unexpected error occurred.".into()),
        }
    }
}

impl From<&poise::FrameworkError<'_, crate::Data, Error>> for CommandFailure {
    fn from(error: &poise::FrameworkError<'_, crate::Data, Error>) -> Self {
        use poise::FrameworkError as E;
        match error {
            E::UnknownCommand { .. } | E::UnknownInteraction { .. } => Self::UnknownCommand,
            E::CommandCheckFailed { .. }
            | E::MissingUserPermissions { .. }
            | E::NotAnOwner { .. } => Self::CheckFailed,
            E::ArgumentParse {
                input: None, ctx, ..
            } => Self::MissingArgument(
                ctx.command()
                    .parameters
                    .iter()
                    .map(|p| p.name.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            E::ArgumentParse { error, .. } => Self::BadArgument(error.to_string()),
            E::CooldownHit {
                remaining_cooldown, ..
            } => Self::Cooldown(*remaining_cooldown),
            E::GuildOnly { .. } => Self::GuildOnly,
            other => Self::Unexpected(other.to_string()),
        }
    }
}

/// Framework error hook: log, then tell the invoker what went wrong
pub async fn on_command_error(error: poise::FrameworkError<'_, crate::Data, Error>) {
    crate::logging::log_command_error(&error);

    let failure = CommandFailure::from(&error);
    let (Some(message), Some(ctx)) = (failure.user_message(), error.ctx()) else {
        return;
    };
    if let Err(e) = ctx.say(message).await {
        warn!(target: EVENT_TARGET, error = %e, "Could not report command error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AUDIT_FILE;
    use crate::platform::{MockModerationPlatform, PlatformError};
    use crate::store::ConfigField;
    use crate::store::keyed::tests::temp_dir;
    use poise::serenity_prelude::RoleId;

    const GUILD: GuildId = GuildId::new(1);
    const LOG_CHANNEL: u64 = 70;

    async fn setup(with_log_channel: bool) -> (Storage, AuditLog) {
        let dir = temp_dir();
        let storage = Storage::open(&dir).await;
        if with_log_channel {
            storage
                .guild_configs
                .set_field(GUILD, ConfigField::LogChannel, LOG_CHANNEL);
        }
        let audit = AuditLog::new(dir.join(AUDIT_FILE));
        audit.ensure_exists().await;
        (storage, audit)
    }

    fn member() -> ResolvedTarget {
        ResolvedTarget {
            user_id: UserId::new(5),
            display: "newbie".into(),
            is_bot: false,
        }
    }

    fn message(content: &str) -> LoggedMessage {
        LoggedMessage {
            id: MessageId::new(9),
            guild_id: Some(GUILD),
            channel_id: ChannelId::new(3),
            author_id: UserId::new(5),
            author_is_bot: false,
            content: content.into(),
        }
    }

    fn cached(content: &str) -> Message {
        let mut cached = Message::default();
        cached.id = MessageId::new(9);
        cached.guild_id = Some(GUILD);
        cached.channel_id = ChannelId::new(3);
        cached.author.id = UserId::new(5);
        cached.content = content.into();
        cached
    }

    #[test]
    fn test_events_from_cached_messages() {
        assert_eq!(
            LifecycleEvent::message_deleted(Some(&cached("gone"))),
            Some(LifecycleEvent::MessageDeleted {
                message: message("gone")
            })
        );
        assert_eq!(LifecycleEvent::message_deleted(None), None);

        assert_eq!(
            LifecycleEvent::message_edited(Some(&cached("old")), Some("new".into())),
            Some(LifecycleEvent::MessageEdited {
                before: message("old"),
                after: "new".into(),
            })
        );
        assert_eq!(LifecycleEvent::message_edited(None, Some("new".into())), None);
        assert_eq!(LifecycleEvent::message_edited(Some(&cached("old")), None), None);
    }

    #[test]
    fn test_logged_message_keeps_bot_flag() {
        let mut from_bot = cached("beep");
        from_bot.author.bot = true;
        assert!(LoggedMessage::from(&from_bot).author_is_bot);
    }

    #[tokio::test]
    async fn test_join_applies_autorole_and_posts() {
        let (storage, audit) = setup(true).await;
        storage
            .guild_configs
            .set_field(GUILD, ConfigField::Autorole, 44);
        let mut platform = MockModerationPlatform::new();
        platform
            .expect_add_role()
            .withf(|guild, user, role, _| {
                *guild == GUILD && *user == UserId::new(5) && *role == RoleId::new(44)
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        platform
            .expect_send_log()
            .withf(|channel, post| *channel == ChannelId::new(LOG_CHANNEL) && post.title.contains("Member Joined"))
            .times(1)
            .returning(|_, _| Ok(()));

        let router = EventRouter::new(&platform, &storage, &audit);
        let posted = router
            .route(LifecycleEvent::MemberJoined {
                guild_id: GUILD,
                member: member(),
                account_created: "2020-01-01".into(),
            })
            .await;
        assert!(posted);
        let log = std::fs::read_to_string(audit.path()).unwrap();
        assert!(log.contains("member_join  guild:1  user:5"));
    }

    #[tokio::test]
    async fn test_autorole_failure_does_not_block_post() {
        let (storage, audit) = setup(true).await;
        storage
            .guild_configs
            .set_field(GUILD, ConfigField::Autorole, 44);
        let mut platform = MockModerationPlatform::new();
        platform
            .expect_add_role()
            .returning(|_, _, _, _| Err(PlatformError::PermissionDenied));
        platform.expect_send_log().times(1).returning(|_, _| Ok(()));

        let router = EventRouter::new(&platform, &storage, &audit);
        assert!(
            router
                .route(LifecycleEvent::MemberJoined {
                    guild_id: GUILD,
                    member: member(),
                    account_created: "2020-01-01".into(),
                })
                .await
        );
    }

    #[tokio::test]
    async fn test_leave_without_log_channel_only_audits() {
        let (storage, audit) = setup(false).await;
        let platform = MockModerationPlatform::new();
        let router = EventRouter::new(&platform, &storage, &audit);
        let posted = router
            .route(LifecycleEvent::MemberLeft {
                guild_id: GUILD,
                member: member(),
            })
            .await;
        assert!(!posted);
        let log = std::fs::read_to_string(audit.path()).unwrap();
        assert!(log.contains("member_leave"));
    }

    #[tokio::test]
    async fn test_delete_skips_bots_and_dms() {
        let (storage, audit) = setup(true).await;
        let platform = MockModerationPlatform::new();
        let router = EventRouter::new(&platform, &storage, &audit);

        let bot_message = LoggedMessage {
            author_is_bot: true,
            ..message("beep")
        };
        assert!(!router.route(LifecycleEvent::MessageDeleted { message: bot_message }).await);

        let dm = LoggedMessage {
            guild_id: None,
            ..message("hi")
        };
        assert!(!router.route(LifecycleEvent::MessageDeleted { message: dm }).await);
    }

    #[tokio::test]
    async fn test_delete_posts_truncated_preview() {
        let (storage, audit) = setup(true).await;
        let mut platform = MockModerationPlatform::new();
        platform
            .expect_send_log()
            .withf(|_, post| {
                post.field_value("Content")
                    .is_some_and(|c| c.chars().count() == DELETED_PREVIEW_CHARS)
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let router = EventRouter::new(&platform, &storage, &audit);

        let long = "é".repeat(DELETED_PREVIEW_CHARS + 50);
        assert!(
            router
                .route(LifecycleEvent::MessageDeleted {
                    message: message(&long)
                })
                .await
        );
    }

    #[tokio::test]
    async fn test_edit_only_when_content_changed() {
        let (storage, audit) = setup(true).await;
        let mut platform = MockModerationPlatform::new();
        platform
            .expect_send_log()
            .withf(|_, post| {
                post.field_value("Before") == Some("old") && post.field_value("After") == Some("*(empty)*")
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let router = EventRouter::new(&platform, &storage, &audit);

        assert!(
            !router
                .route(LifecycleEvent::MessageEdited {
                    before: message("same"),
                    after: "same".into(),
                })
                .await
        );
        assert!(
            router
                .route(LifecycleEvent::MessageEdited {
                    before: message("old"),
                    after: String::new(),
                })
                .await
        );
    }

    #[test]
    fn test_command_failure_messages() {
        assert_eq!(CommandFailure::UnknownCommand.user_message(), None);
        assert_eq!(
            CommandFailure::CheckFailed.user_message().unwrap(),
            "❌  You don't have permission to use that command."
        );
        assert_eq!(
            CommandFailure::Cooldown(Duration::from_millis(2500))
                .user_message()
                .unwrap(),
            "⏳  Cooldown, retry in 2.5s."
        );
        assert!(
            CommandFailure::BadArgument("not a number".into())
                .user_message()
                .unwrap()
                .contains("not a number")
        );
        assert_eq!(
            CommandFailure::Unexpected("boom".into())
                .user_message()
                .unwrap(),
            "⚠️  An unexpected error occurred."
        );
    }
}
