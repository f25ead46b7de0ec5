//! Authorization gate
//!
//! Two interchangeable policies behind [`AuthorizationPolicy`]: a fixed
//! allow-list of elevated user IDs, and the guild's own permission flags.

use derive_more::Display;
use poise::serenity_prelude::{Permissions, UserId};
use std::collections::HashSet;
use std::str::FromStr;

/// What a command needs from the invoking actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Requirement {
    #[display("kick members")]
    KickMembers,
    #[display("ban members")]
    BanMembers,
    #[display("manage roles")]
    ManageRoles,
    #[display("manage messages")]
    ManageMessages,
    #[display("manage channels")]
    ManageChannels,
    #[display("administrator")]
    Administrator,
    /// Process-wide operations such as status and shutdown
    #[display("bot operator")]
    Operator,
}

impl Requirement {
    /// Guild permission flag backing this requirement. `Operator` has none:
    /// it is only ever satisfied through the allow-list.
    #[must_use]
    pub fn permission(self) -> Option<Permissions> {
        match self {
            Self::KickMembers => Some(Permissions::KICK_MEMBERS),
            Self::BanMembers => Some(Permissions::BAN_MEMBERS),
            Self::ManageRoles => Some(Permissions::MANAGE_ROLES),
            Self::ManageMessages => Some(Permissions::MANAGE_MESSAGES),
            Self::ManageChannels => Some(Permissions::MANAGE_CHANNELS),
            Self::Administrator => Some(Permissions::ADMINISTRATOR),
            Self::Operator => None,
        }
    }
}

/// The invoking user as seen by a policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    /// Guild permission flags, if they were fetched
    pub permissions: Option<Permissions>,
}

impl Actor {
    #[must_use]
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            permissions: None,
        }
    }

    #[must_use]
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }
}

/// Decides whether an actor may run a command
pub trait AuthorizationPolicy: Send + Sync {
    fn is_authorized(&self, actor: &Actor, required: Requirement) -> bool;

    /// Whether [`Actor::permissions`] must be fetched before asking
    fn requires_permissions(&self, required: Requirement) -> bool;

    /// Short name for logs and the status report
    fn name(&self) -> &'static str;
}

/// Elevated user IDs loaded once at startup
#[derive(Debug, Clone, Default)]
pub struct AllowListPolicy {
    admins: HashSet<UserId>,
}

impl AllowListPolicy {
    pub fn new(admins: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, user_id: UserId) -> bool {
        self.admins.contains(&user_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.admins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }
}

impl AuthorizationPolicy for AllowListPolicy {
    fn is_authorized(&self, actor: &Actor, _required: Requirement) -> bool {
        self.contains(actor.id)
    }

    fn requires_permissions(&self, _required: Requirement) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "allowlist"
    }
}

/// Checks the guild permission flag each command needs.
///
/// `Operator` falls through to the wrapped allow-list.
#[derive(Debug, Clone, Default)]
pub struct PermissionFlagPolicy {
    operators: AllowListPolicy,
}

impl PermissionFlagPolicy {
    #[must_use]
    pub fn new(operators: AllowListPolicy) -> Self {
        Self { operators }
    }
}

impl AuthorizationPolicy for PermissionFlagPolicy {
    fn is_authorized(&self, actor: &Actor, required: Requirement) -> bool {
        let Some(flag) = required.permission() else {
            return self.operators.is_authorized(actor, required);
        };
        actor.permissions.is_some_and(|held| {
            held.contains(Permissions::ADMINISTRATOR) || held.contains(flag)
        })
    }

    fn requires_permissions(&self, required: Requirement) -> bool {
        required.permission().is_some()
    }

    fn name(&self) -> &'static str {
        "permissions"
    }
}

/// Which policy guards guild commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum PolicyKind {
    #[default]
    #[display("permissions")]
    Permissions,
    #[display("allowlist")]
    AllowList,
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissions" | "flags" => Ok(Self::Permissions),
            "allowlist" | "allow-list" | "admins" => Ok(Self::AllowList),
            other => Err(format!("unknown authorization policy: {other}")),
        }
    }
}

impl PolicyKind {
    /// Build the policy, sharing the one admin list for operator checks
    #[must_use]
    pub fn build(self, admins: &[UserId]) -> Box<dyn AuthorizationPolicy> {
        let allow_list = AllowListPolicy::new(admins.iter().copied());
        match self {
            Self::Permissions => Box::new(PermissionFlagPolicy::new(allow_list)),
            Self::AllowList => Box::new(allow_list),
        }
    }
}
