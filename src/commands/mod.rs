//! Chat commands
//!
//! Every command is both a prefix and a slash command. Moderation commands
//! only translate their arguments into an [`ActionRequest`]; the
//! [`Moderator`] does the rest, including every reply.

mod admin;
mod info;
mod moderation;
mod warnings;

pub use admin::{set_autorole, set_log_channel, set_mute_role, shutdown, status};
pub use info::{avatar, botinfo, help, ping, roleinfo, serverinfo, userinfo};
pub use moderation::{ban, kick, lock, mute, purge, slowmode, unban, unlock, unmute};
pub use warnings::{clear_warnings, warn, warnings};

use crate::moderation::{ActionRequest, Invocation, Moderator};
use crate::platform::{ContextResponder, SerenityPlatform};
use crate::{COMMAND_TARGET, Context, Data, Error};
use tracing::debug;

/// Every registered command
#[must_use]
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![
        help(),
        ping(),
        botinfo(),
        serverinfo(),
        userinfo(),
        avatar(),
        roleinfo(),
        warn(),
        warnings(),
        clear_warnings(),
        kick(),
        ban(),
        unban(),
        mute(),
        unmute(),
        purge(),
        slowmode(),
        lock(),
        unlock(),
        set_log_channel(),
        set_autorole(),
        set_mute_role(),
        status(),
        shutdown(),
    ]
}

/// Where and by whom `ctx` was invoked. Fails outside a guild.
pub(crate) fn invocation(ctx: Context<'_>) -> Result<Invocation, Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or("This command can only be used in a server.")?;
    let guild_name = ctx
        .guild()
        .map(|guild| guild.name.clone())
        .unwrap_or_else(|| guild_id.to_string());

    Ok(Invocation {
        guild_id,
        channel_id: ctx.channel_id(),
        guild_name,
        actor_id: ctx.author().id,
        actor_display: ctx.author().tag(),
    })
}

pub(crate) fn platform(ctx: Context<'_>) -> SerenityPlatform {
    SerenityPlatform::new(ctx.serenity_context().http.clone())
}

/// Platform handles for one command invocation
pub(crate) struct Scope<'a> {
    pub inv: Invocation,
    data: &'a Data,
    platform: SerenityPlatform,
    responder: ContextResponder<'a>,
}

impl<'a> Scope<'a> {
    pub fn new(ctx: Context<'a>) -> Result<Self, Error> {
        Ok(Self {
            inv: invocation(ctx)?,
            data: ctx.data(),
            platform: platform(ctx),
            responder: ContextResponder::new(ctx),
        })
    }

    pub fn moderator(&self) -> Moderator<'_> {
        Moderator::new(
            &self.platform,
            self.data.policy.as_ref(),
            &self.data.storage,
            &self.data.audit,
            &self.responder,
        )
    }
}

/// Execute a moderation request. The outcome, failure included, has already
/// been reported to the invoker when this returns.
pub(crate) async fn run(ctx: Context<'_>, request: ActionRequest) -> Result<(), Error> {
    let scope = Scope::new(ctx)?;
    if let Err(e) = scope.moderator().execute(&scope.inv, request).await {
        debug!(target: COMMAND_TARGET, kind = e.kind(), "Moderation request settled with an error");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_command_names_are_unique() {
        let commands = all();
        let names: HashSet<_> = commands.iter().map(|c| c.name.clone()).collect();
        assert_eq!(names.len(), commands.len());
        assert_eq!(commands.len(), 24);
    }

    #[test]
    fn test_every_command_has_both_surfaces() {
        for command in all() {
            assert!(command.prefix_action.is_some(), "{} lacks prefix form", command.name);
            assert!(
                command.create_as_slash_command().is_some(),
                "{} lacks slash form",
                command.name
            );
        }
    }

    #[test]
    fn test_guild_commands_are_guild_only() {
        for command in all() {
            let global = matches!(command.name.as_str(), "help" | "ping" | "botinfo" | "avatar");
            assert_eq!(command.guild_only, !global, "{}", command.name);
        }
    }
}
