//! Moderation action executor
//!
//! Every request goes through the same stages: authorize, resolve the
//! target, check preconditions, perform at most one platform mutation, then
//! hand the outcome to the fan-out. A failure at any stage stops the request
//! and produces exactly one error reply.

use super::action::{
    ActionRequest, Invocation, PURGE_AMOUNT, SLOWMODE_SECONDS, clamp_delete_days,
    reason_or_default,
};
use super::error::{ModerationError, ModerationResult};
use super::notify::{Delivery, Notification, fan_out};
use crate::ERROR_TARGET;
use crate::audit::{AuditEntry, AuditLog};
use crate::auth::{Actor, AuthorizationPolicy, Requirement};
use crate::platform::{
    LogPost, ModerationPlatform, PlatformError, PlatformResult, Reply, Responder, best_effort,
};
use crate::store::{ConfigField, Storage, WarningRecord};
use crate::target::{IdFormat, ResolvedTarget, TargetInput, extract_id, resolve};
use poise::serenity_prelude::{Colour, UserId};
use tracing::{error, info, warn};

const NOT_A_MEMBER: &str = "That user is not a member of this server.";
const USER_NOT_FOUND: &str = "Could not find that user.";
const MANAGE_ROLES_DENIED: &str = "I don't have permission to manage that member's roles.";
const NO_MUTE_ROLE_SET: &str = "No muted role configured.  Use `/set_mute_role` first.";
const MUTE_ROLE_GONE: &str = "The configured muted role no longer exists.";

/// Convert a failed mutation into the user-facing error
fn mutation_failed(error: PlatformError, forbidden: &str, missing: &str) -> ModerationError {
    match error {
        PlatformError::PermissionDenied => ModerationError::BotLacksPermission(forbidden.into()),
        PlatformError::NotFound => ModerationError::precondition(missing),
        PlatformError::Other(detail) => ModerationError::unexpected(detail),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Runs moderation requests against a platform, the stores and the audit log
pub struct Moderator<'a> {
    platform: &'a dyn ModerationPlatform,
    policy: &'a dyn AuthorizationPolicy,
    storage: &'a Storage,
    audit: &'a AuditLog,
    responder: &'a dyn Responder,
}

impl<'a> Moderator<'a> {
    pub fn new(
        platform: &'a dyn ModerationPlatform,
        policy: &'a dyn AuthorizationPolicy,
        storage: &'a Storage,
        audit: &'a AuditLog,
        responder: &'a dyn Responder,
    ) -> Self {
        Self {
            platform,
            policy,
            storage,
            audit,
            responder,
        }
    }

    /// Run `request` to completion, delivering its notification.
    ///
    /// # Errors
    ///
    /// Returns the [`ModerationError`] that stopped the request. Its reply
    /// has already been sent by the time this returns.
    pub async fn execute(&self, inv: &Invocation, request: ActionRequest) -> ModerationResult<()> {
        let name = request.name();
        match self.run(inv, request).await {
            Ok(notification) => {
                self.deliver(inv, notification).await;
                Ok(())
            }
            Err(e) => {
                self.log_failure(inv, name, &e);
                self.deliver(inv, Notification::reply(e.reply())).await;
                Err(e)
            }
        }
    }

    /// Check `required` for the invoking actor.
    ///
    /// Permission flags are fetched only when the policy needs them; a failed
    /// fetch counts as a denial.
    ///
    /// # Errors
    ///
    /// Returns [`ModerationError::Denied`] if the actor may not proceed.
    pub async fn authorize(&self, inv: &Invocation, required: Requirement) -> ModerationResult<()> {
        let mut actor = Actor::new(inv.actor_id);
        if self.policy.requires_permissions(required) {
            match self
                .platform
                .member_permissions(inv.guild_id, inv.actor_id)
                .await
            {
                Ok(permissions) => actor = actor.with_permissions(permissions),
                Err(e) => {
                    warn!(
                        guild_id = %inv.guild_id,
                        user_id = %inv.actor_id,
                        error = %e,
                        "Could not fetch actor permissions"
                    );
                    return Err(ModerationError::Denied);
                }
            }
        }

        if self.policy.is_authorized(&actor, required) {
            Ok(())
        } else {
            Err(ModerationError::Denied)
        }
    }

    /// Authorize, replying with the denial if it fails. Returns whether the
    /// caller may proceed.
    pub async fn guard(&self, inv: &Invocation, required: Requirement) -> bool {
        match self.authorize(inv, required).await {
            Ok(()) => true,
            Err(e) => {
                self.log_failure(inv, "guard", &e);
                self.deliver(inv, Notification::reply(e.reply())).await;
                false
            }
        }
    }

    /// Warnings of a member, in insertion order.
    ///
    /// Replies on its own when the request fails or there is nothing to
    /// show; `Some` is returned only for a non-empty list the caller should
    /// render.
    pub async fn view_warnings(
        &self,
        inv: &Invocation,
        target: TargetInput,
    ) -> Option<(ResolvedTarget, Vec<WarningRecord>)> {
        let viewed = async {
            self.authorize(inv, Requirement::ManageMessages).await?;
            let target = resolve(self.platform, target).await?;
            let warnings = self.storage.warnings.list(inv.guild_id, target.user_id);
            Ok::<_, ModerationError>((target, warnings))
        }
        .await;

        match viewed {
            Ok((target, warnings)) if warnings.is_empty() => {
                let reply = Reply::info(format!("{} has no warnings.", target.mention()));
                self.deliver(inv, Notification::reply(reply)).await;
                None
            }
            Ok(found) => Some(found),
            Err(e) => {
                self.log_failure(inv, "warnings", &e);
                self.deliver(inv, Notification::reply(e.reply())).await;
                None
            }
        }
    }

    async fn deliver(&self, inv: &Invocation, notification: Notification) -> Delivery {
        fan_out(
            self.platform,
            self.responder,
            self.audit,
            &self.storage.guild_configs,
            inv.guild_id,
            notification,
        )
        .await
    }

    fn log_failure(&self, inv: &Invocation, command: &str, err: &ModerationError) {
        match err {
            ModerationError::Unexpected { detail } => error!(
                target: ERROR_TARGET,
                command,
                guild_id = %inv.guild_id,
                user_id = %inv.actor_id,
                error = %detail,
                "Moderation command failed unexpectedly"
            ),
            ModerationError::BotLacksPermission(_) => warn!(
                command,
                guild_id = %inv.guild_id,
                user_id = %inv.actor_id,
                "Bot lacks permission for attempted action"
            ),
            other => info!(
                command,
                kind = other.kind(),
                guild_id = %inv.guild_id,
                user_id = %inv.actor_id,
                reason = %other,
                "Moderation command refused"
            ),
        }
    }

    async fn run(&self, inv: &Invocation, request: ActionRequest) -> ModerationResult<Notification> {
        self.authorize(inv, request.requirement()).await?;

        match request {
            ActionRequest::Warn { target, reason } => self.warn(inv, target, &reason).await,
            ActionRequest::ClearWarnings { target } => self.clear_warnings(inv, target).await,
            ActionRequest::Kick { target, reason } => self.kick(inv, target, reason).await,
            ActionRequest::Ban {
                target,
                reason,
                delete_message_days,
            } => self.ban(inv, target, reason, delete_message_days).await,
            ActionRequest::Unban { user_id, reason } => self.unban(inv, &user_id, reason).await,
            ActionRequest::Mute { target, reason } => self.mute(inv, target, reason).await,
            ActionRequest::Unmute { target } => self.unmute(inv, target).await,
            ActionRequest::Purge { amount } => self.purge(inv, amount).await,
            ActionRequest::Slowmode { seconds } => self.slowmode(inv, seconds).await,
            ActionRequest::Lock => self.set_locked(inv, true).await,
            ActionRequest::Unlock => self.set_locked(inv, false).await,
            ActionRequest::SetConfig { field, id } => self.set_config(inv, field, id).await,
        }
    }

    fn entry(&self, inv: &Invocation, action: String) -> AuditEntry {
        AuditEntry::new(action).guild(inv.guild_id).user(inv.actor_id)
    }

    /// Log-channel embed for an action against a member
    fn case_post(
        title: &str,
        colour: Colour,
        target: &ResolvedTarget,
        inv: &Invocation,
        reason: &str,
    ) -> LogPost {
        LogPost::new(title, colour)
            .field("Member", &target.display, true)
            .field("Mod", &inv.actor_display, true)
            .field("Reason", reason, false)
            .footer(format!("ID: {}", target.user_id))
    }

    async fn warn(
        &self,
        inv: &Invocation,
        target: TargetInput,
        reason: &str,
    ) -> ModerationResult<Notification> {
        let target = resolve(self.platform, target).await?;
        if target.is_bot {
            return Err(ModerationError::precondition("You cannot warn a bot."));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ModerationError::invalid("A reason is required to warn a member."));
        }

        let record = WarningRecord::new(reason, inv.actor_id, inv.actor_display.as_str());
        let total = self
            .storage
            .warnings
            .append(inv.guild_id, target.user_id, record);
        self.storage.warnings.save().await;

        Ok(Notification::reply(Reply::success(format!(
            "⚠️  {} warned.  Reason: {reason}  (Total: {total})",
            target.mention()
        )))
        .dm(
            target.user_id,
            format!(
                "⚠️  You have been warned in **{}**.\nReason: {reason}\nTotal warnings: {total}",
                inv.guild_name
            ),
        )
        .audit(self.entry(
            inv,
            format!("warn  target={}  reason={reason:?}", target.user_id),
        ))
        .log_post(
            Self::case_post("⚠️  Member Warned", Colour::GOLD, &target, inv, reason)
                .field("Total", total.to_string(), true),
        ))
    }

    async fn clear_warnings(
        &self,
        inv: &Invocation,
        target: TargetInput,
    ) -> ModerationResult<Notification> {
        let target = resolve(self.platform, target).await?;
        let removed = self.storage.warnings.clear(inv.guild_id, target.user_id);

        let (reply, action) = if removed == 0 {
            (
                Reply::info(format!("{} has no warnings to clear.", target.mention())),
                format!("clear_warnings  target={}  outcome=none", target.user_id),
            )
        } else {
            self.storage.warnings.save().await;
            (
                Reply::success(format!(
                    "✅  All warnings cleared for {}.",
                    target.mention()
                )),
                format!("clear_warnings  target={}  removed={removed}", target.user_id),
            )
        };
        Ok(Notification::reply(reply).audit(self.entry(inv, action)))
    }

    async fn kick(
        &self,
        inv: &Invocation,
        target: TargetInput,
        reason: Option<String>,
    ) -> ModerationResult<Notification> {
        let target = resolve(self.platform, target).await?;
        if target.user_id == inv.actor_id {
            return Err(ModerationError::precondition("You cannot kick yourself."));
        }
        let reason = reason_or_default(reason);

        self.notify_target(
            target.user_id,
            format!(
                "👢  You have been kicked from **{}**.\nReason: {reason}",
                inv.guild_name
            ),
        )
        .await;
        self.platform
            .kick(inv.guild_id, target.user_id, reason.clone())
            .await
            .map_err(|e| mutation_failed(e, "I don't have permission to kick that member.", NOT_A_MEMBER))?;

        Ok(Notification::reply(Reply::success(format!(
            "👢  **{}** has been kicked.  Reason: {reason}",
            target.display
        )))
        .audit(self.entry(
            inv,
            format!("kick  target={}  reason={reason:?}", target.user_id),
        ))
        .log_post(Self::case_post(
            "👢  Member Kicked",
            Colour::RED,
            &target,
            inv,
            &reason,
        )))
    }

    async fn ban(
        &self,
        inv: &Invocation,
        target: TargetInput,
        reason: Option<String>,
        delete_message_days: Option<i64>,
    ) -> ModerationResult<Notification> {
        let target = resolve(self.platform, target).await?;
        if target.user_id == inv.actor_id {
            return Err(ModerationError::precondition("You cannot ban yourself."));
        }
        let reason = reason_or_default(reason);
        let days = clamp_delete_days(delete_message_days);

        self.notify_target(
            target.user_id,
            format!(
                "🔨  You have been banned from **{}**.\nReason: {reason}",
                inv.guild_name
            ),
        )
        .await;
        self.platform
            .ban(inv.guild_id, target.user_id, days, reason.clone())
            .await
            .map_err(|e| mutation_failed(e, "I don't have permission to ban that member.", USER_NOT_FOUND))?;

        Ok(Notification::reply(Reply::success(format!(
            "🔨  **{}** has been banned.  Reason: {reason}",
            target.display
        )))
        .audit(self.entry(
            inv,
            format!(
                "ban  target={}  reason={reason:?}  delete_days={days}",
                target.user_id
            ),
        ))
        .log_post(Self::case_post(
            "🔨  Member Banned",
            Colour::DARK_RED,
            &target,
            inv,
            &reason,
        )))
    }

    async fn unban(
        &self,
        inv: &Invocation,
        raw_id: &str,
        reason: Option<String>,
    ) -> ModerationResult<Notification> {
        let user_id = extract_id(raw_id, IdFormat::Numeric)
            .ok()
            .and_then(|id| id.parse::<u64>().ok())
            .filter(|&id| id != 0)
            .map(UserId::new)
            .ok_or_else(|| ModerationError::invalid("Invalid user ID: must be a number."))?;
        let reason = reason_or_default(reason);
        let action = format!("unban  target={user_id}  reason={reason:?}");

        match self.platform.unban(inv.guild_id, user_id).await {
            Ok(()) => Ok(Notification::reply(Reply::success(format!(
                "✅  User `{user_id}` has been unbanned."
            )))
            .audit(self.entry(inv, action))
            .log_post(
                LogPost::new("✅  Member Unbanned", Colour::DARK_GREEN)
                    .field("User", format!("<@{user_id}>"), true)
                    .field("Mod", &inv.actor_display, true)
                    .field("Reason", &reason, false)
                    .footer(format!("ID: {user_id}")),
            )),
            Err(PlatformError::NotFound) => Ok(Notification::reply(Reply::error(
                "That user is not currently banned.",
            ))
            .audit(self.entry(inv, format!("{action}  outcome=not_banned")))),
            Err(PlatformError::PermissionDenied) => {
                warn!(guild_id = %inv.guild_id, user_id = %user_id, "Bot lacks permission to unban");
                Ok(Notification::reply(Reply::error("I don't have permission to unban users."))
                    .audit(self.entry(inv, format!("{action}  outcome=forbidden"))))
            }
            Err(PlatformError::Other(detail)) => Err(ModerationError::unexpected(detail)),
        }
    }

    async fn mute(
        &self,
        inv: &Invocation,
        target: TargetInput,
        reason: Option<String>,
    ) -> ModerationResult<Notification> {
        let target = resolve(self.platform, target).await?;
        let Some(role_id) = self.storage.guild_configs.get(inv.guild_id).mute_role() else {
            return Err(ModerationError::precondition(NO_MUTE_ROLE_SET));
        };

        let exists = self
            .platform
            .role_exists(inv.guild_id, role_id)
            .await
            .map_err(|e| mutation_failed(e, MANAGE_ROLES_DENIED, MUTE_ROLE_GONE))?;
        if !exists {
            return Err(ModerationError::precondition(MUTE_ROLE_GONE));
        }
        let already_muted = self
            .platform
            .member_has_role(inv.guild_id, target.user_id, role_id)
            .await
            .map_err(|e| mutation_failed(e, MANAGE_ROLES_DENIED, NOT_A_MEMBER))?;
        if already_muted {
            return Err(ModerationError::precondition(format!(
                "{} is already muted.",
                target.mention()
            )));
        }

        let reason = reason_or_default(reason);
        self.platform
            .add_role(inv.guild_id, target.user_id, role_id, reason.clone())
            .await
            .map_err(|e| mutation_failed(e, MANAGE_ROLES_DENIED, NOT_A_MEMBER))?;

        Ok(Notification::reply(Reply::success(format!(
            "🔇  {} has been muted.  Reason: {reason}",
            target.mention()
        )))
        .audit(self.entry(
            inv,
            format!("mute  target={}  reason={reason:?}", target.user_id),
        ))
        .log_post(Self::case_post(
            "🔇  Member Muted",
            Colour::LIGHT_GREY,
            &target,
            inv,
            &reason,
        )))
    }

    async fn unmute(&self, inv: &Invocation, target: TargetInput) -> ModerationResult<Notification> {
        let target = resolve(self.platform, target).await?;
        let Some(role_id) = self.storage.guild_configs.get(inv.guild_id).mute_role() else {
            return Err(ModerationError::precondition("No muted role configured."));
        };

        let muted = match self
            .platform
            .member_has_role(inv.guild_id, target.user_id, role_id)
            .await
        {
            Ok(muted) => muted,
            Err(PlatformError::NotFound) => false,
            Err(e) => return Err(mutation_failed(e, MANAGE_ROLES_DENIED, NOT_A_MEMBER)),
        };
        if !muted {
            return Err(ModerationError::precondition(format!(
                "{} is not currently muted.",
                target.mention()
            )));
        }

        self.platform
            .remove_role(inv.guild_id, target.user_id, role_id, "Unmuted".to_string())
            .await
            .map_err(|e| mutation_failed(e, MANAGE_ROLES_DENIED, NOT_A_MEMBER))?;

        Ok(Notification::reply(Reply::success(format!(
            "🔊  {} has been unmuted.",
            target.mention()
        )))
        .audit(self.entry(inv, format!("unmute  target={}", target.user_id)))
        .log_post(
            LogPost::new("🔊  Member Unmuted", Colour::DARK_GREEN)
                .field("Member", &target.display, true)
                .field("Mod", &inv.actor_display, true)
                .footer(format!("ID: {}", target.user_id)),
        ))
    }

    async fn purge(&self, inv: &Invocation, amount: i64) -> ModerationResult<Notification> {
        let amount = Some(amount)
            .filter(|a| PURGE_AMOUNT.contains(a))
            .and_then(|a| u8::try_from(a).ok())
            .ok_or_else(|| ModerationError::invalid("Amount must be between 1 and 100."))?;

        let deleted = self
            .platform
            .purge(inv.channel_id, amount)
            .await
            .map_err(|e| {
                mutation_failed(
                    e,
                    "I don't have permission to delete messages here.",
                    "This channel no longer exists.",
                )
            })?;

        Ok(Notification::reply(
            Reply::success(format!("🗑️  Deleted {deleted} message(s).")).ephemeral(),
        )
        .audit(self.entry(inv, format!("purge  count={deleted}")))
        .log_post(
            LogPost::new("🗑️  Messages Purged", Colour::ORANGE)
                .field("Channel", format!("<#{}>", inv.channel_id), true)
                .field("Count", deleted.to_string(), true)
                .field("Mod", &inv.actor_display, true),
        ))
    }

    async fn slowmode(&self, inv: &Invocation, seconds: i64) -> ModerationResult<Notification> {
        let delay = Some(seconds)
            .filter(|s| SLOWMODE_SECONDS.contains(s))
            .and_then(|s| u16::try_from(s).ok())
            .ok_or_else(|| {
                ModerationError::invalid("Slowmode must be between 0 and 21600 seconds.")
            })?;

        let channel = format!("<#{}>", inv.channel_id);
        let success = if delay == 0 {
            format!("✅  Slowmode disabled in {channel}.")
        } else {
            format!("✅  Slowmode set to **{delay}s** in {channel}.")
        };
        let result = self.platform.set_slowmode(inv.channel_id, delay).await;
        self.channel_action(
            inv,
            format!("slowmode  seconds={delay}"),
            result,
            "I don't have permission to edit that channel.",
            success,
        )
    }

    async fn set_locked(&self, inv: &Invocation, locked: bool) -> ModerationResult<Notification> {
        let channel = format!("<#{}>", inv.channel_id);
        let (action, success) = if locked {
            ("lock_channel", format!("🔒  {channel} is now locked."))
        } else {
            ("unlock_channel", format!("🔓  {channel} is now unlocked."))
        };
        let result = self
            .platform
            .set_channel_locked(inv.guild_id, inv.channel_id, locked)
            .await;
        self.channel_action(
            inv,
            action.to_string(),
            result,
            "I don't have permission to manage that channel.",
            success,
        )
    }

    /// Channel actions are audited whether or not the bot was allowed to
    /// perform them.
    fn channel_action(
        &self,
        inv: &Invocation,
        action: String,
        result: PlatformResult<()>,
        forbidden: &str,
        success: String,
    ) -> ModerationResult<Notification> {
        match result {
            Ok(()) => Ok(Notification::reply(Reply::success(success)).audit(self.entry(inv, action))),
            Err(PlatformError::PermissionDenied) => {
                warn!(
                    guild_id = %inv.guild_id,
                    channel_id = %inv.channel_id,
                    action = %action,
                    "Bot lacks permission for channel action"
                );
                Ok(Notification::reply(Reply::error(forbidden))
                    .audit(self.entry(inv, format!("{action}  outcome=forbidden"))))
            }
            Err(e) => Err(ModerationError::unexpected(e)),
        }
    }

    async fn set_config(
        &self,
        inv: &Invocation,
        field: ConfigField,
        id: u64,
    ) -> ModerationResult<Notification> {
        self.storage.guild_configs.set_field(inv.guild_id, field, id);
        self.storage.guild_configs.save().await;

        let (mention, key) = match field {
            ConfigField::LogChannel => (format!("<#{id}>"), "channel"),
            ConfigField::Autorole | ConfigField::MuteRole => (format!("<@&{id}>"), "role"),
        };
        Ok(Notification::reply(Reply::success(format!(
            "✅  {} set to {mention}.",
            capitalize(&field.to_string())
        )))
        .audit(self.entry(inv, format!("{}  {key}={id}", field.audit_name()))))
    }

    async fn notify_target(&self, user_id: UserId, content: String) -> bool {
        best_effort("dm", self.platform.send_dm(user_id, content)).await
    }
}
