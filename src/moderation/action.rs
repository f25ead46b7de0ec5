//! Moderation requests and their invocation context

use crate::auth::Requirement;
use crate::store::ConfigField;
use crate::target::TargetInput;
use poise::serenity_prelude::{ChannelId, GuildId, UserId};

/// Reason recorded when the moderator gives none
pub const DEFAULT_REASON: &str = "No reason provided.";

/// Accepted range for a ban's message-deletion window, in days
pub const BAN_DELETE_DAYS: std::ops::RangeInclusive<i64> = 0..=7;
/// Accepted range for a purge
pub const PURGE_AMOUNT: std::ops::RangeInclusive<i64> = 1..=100;
/// Accepted range for a channel slowmode, in seconds
pub const SLOWMODE_SECONDS: std::ops::RangeInclusive<i64> = 0..=21_600;

/// Where and by whom a command was invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub guild_name: String,
    pub actor_id: UserId,
    pub actor_display: String,
}

/// A single moderation command with its raw arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    Warn {
        target: TargetInput,
        reason: String,
    },
    ClearWarnings {
        target: TargetInput,
    },
    Kick {
        target: TargetInput,
        reason: Option<String>,
    },
    Ban {
        target: TargetInput,
        reason: Option<String>,
        delete_message_days: Option<i64>,
    },
    /// Banned users are usually not resolvable as members, so unban takes
    /// the raw ID
    Unban {
        user_id: String,
        reason: Option<String>,
    },
    Mute {
        target: TargetInput,
        reason: Option<String>,
    },
    Unmute {
        target: TargetInput,
    },
    Purge {
        amount: i64,
    },
    Slowmode {
        seconds: i64,
    },
    Lock,
    Unlock,
    SetConfig {
        field: ConfigField,
        id: u64,
    },
}

impl ActionRequest {
    /// Command name, as used in logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Warn { .. } => "warn",
            Self::ClearWarnings { .. } => "clear_warnings",
            Self::Kick { .. } => "kick",
            Self::Ban { .. } => "ban",
            Self::Unban { .. } => "unban",
            Self::Mute { .. } => "mute",
            Self::Unmute { .. } => "unmute",
            Self::Purge { .. } => "purge",
            Self::Slowmode { .. } => "slowmode",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::SetConfig { field, .. } => field.audit_name(),
        }
    }

    /// What the actor must hold to run this request
    #[must_use]
    pub fn requirement(&self) -> Requirement {
        match self {
            Self::Warn { .. } | Self::Purge { .. } => Requirement::ManageMessages,
            Self::ClearWarnings { .. } | Self::SetConfig { .. } => Requirement::Administrator,
            Self::Kick { .. } => Requirement::KickMembers,
            Self::Ban { .. } | Self::Unban { .. } => Requirement::BanMembers,
            Self::Mute { .. } | Self::Unmute { .. } => Requirement::ManageRoles,
            Self::Slowmode { .. } | Self::Lock | Self::Unlock => Requirement::ManageChannels,
        }
    }
}

/// The supplied reason, or [`DEFAULT_REASON`] when absent or blank
#[must_use]
pub fn reason_or_default(reason: Option<String>) -> String {
    reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_REASON.to_string())
}

/// Clamp a requested ban deletion window into [`BAN_DELETE_DAYS`]
#[must_use]
pub fn clamp_delete_days(days: Option<i64>) -> u8 {
    let days = days
        .unwrap_or(0)
        .clamp(*BAN_DELETE_DAYS.start(), *BAN_DELETE_DAYS.end());
    u8::try_from(days).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_delete_days() {
        assert_eq!(clamp_delete_days(None), 0);
        assert_eq!(clamp_delete_days(Some(3)), 3);
        assert_eq!(clamp_delete_days(Some(9)), 7);
        assert_eq!(clamp_delete_days(Some(-4)), 0);
        assert_eq!(clamp_delete_days(Some(i64::MAX)), 7);
    }

    #[test]
    fn test_reason_defaults_when_blank() {
        assert_eq!(reason_or_default(None), DEFAULT_REASON);
        assert_eq!(reason_or_default(Some("   ".into())), DEFAULT_REASON);
        assert_eq!(reason_or_default(Some(" spam ".into())), "spam");
    }

    #[test]
    fn test_requirements() {
        assert_eq!(ActionRequest::Lock.requirement(), Requirement::ManageChannels);
        assert_eq!(
            ActionRequest::SetConfig {
                field: ConfigField::MuteRole,
                id: 1
            }
            .requirement(),
            Requirement::Administrator
        );
        assert_eq!(
            ActionRequest::Purge { amount: 5 }.requirement(),
            Requirement::ManageMessages
        );
        assert_eq!(
            ActionRequest::SetConfig {
                field: ConfigField::LogChannel,
                id: 1
            }
            .name(),
            "set_log_channel"
        );
    }
}
