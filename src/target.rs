//! Target resolution
//!
//! Turns the loosely typed user argument of a command into a canonical
//! [`ResolvedTarget`], fetching from the platform only when all we have is an
//! ID.

use crate::platform::ModerationPlatform;
use poise::serenity_prelude::{self as serenity, UserId};
use thiserror::Error;
use tracing::debug;

/// The user a command acts upon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub user_id: UserId,
    pub display: String,
    pub is_bot: bool,
}

impl ResolvedTarget {
    /// Inline mention of the target
    #[must_use]
    pub fn mention(&self) -> String {
        format!("<@{}>", self.user_id)
    }
}

impl From<&serenity::User> for ResolvedTarget {
    fn from(user: &serenity::User) -> Self {
        Self {
            user_id: user.id,
            display: user.tag(),
            is_bot: user.bot,
        }
    }
}

/// Raw command input identifying a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetInput {
    /// Already resolved by the platform; no lookup needed
    Resolved(ResolvedTarget),
    /// A bare ID
    RawId(String),
    /// A mention token such as `<@123>` or `<@!123>`
    Mention(String),
}

impl TargetInput {
    /// Classify a textual argument
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("<@") && raw.ends_with('>') {
            Self::Mention(raw.to_string())
        } else {
            Self::RawId(raw.to_string())
        }
    }
}

impl From<ResolvedTarget> for TargetInput {
    fn from(target: ResolvedTarget) -> Self {
        Self::Resolved(target)
    }
}

/// User parameter of a command.
///
/// Slash invocations get a Discord user picker, so the platform hands over a
/// resolved user and no lookup follows. Prefix invocations take the next word
/// as a mention or ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetArg(pub TargetInput);

impl From<&serenity::User> for TargetArg {
    fn from(user: &serenity::User) -> Self {
        Self(TargetInput::Resolved(user.into()))
    }
}

impl From<TargetArg> for TargetInput {
    fn from(arg: TargetArg) -> Self {
        arg.0
    }
}

#[poise::async_trait]
impl poise::SlashArgument for TargetArg {
    async fn extract(
        _ctx: &serenity::Context,
        _interaction: &serenity::CommandInteraction,
        value: &serenity::ResolvedValue<'_>,
    ) -> Result<Self, poise::SlashArgError> {
        match *value {
            serenity::ResolvedValue::User(user, _) => Ok(Self::from(user)),
            _ => Err(poise::SlashArgError::new_command_structure_mismatch(
                "expected User",
            )),
        }
    }

    fn create(builder: serenity::CreateCommandOption) -> serenity::CreateCommandOption {
        builder.kind(serenity::CommandOptionType::User)
    }
}

#[poise::async_trait]
impl<'a> poise::PopArgument<'a> for TargetArg {
    async fn pop_from(
        args: &'a str,
        attachment_index: usize,
        ctx: &serenity::Context,
        msg: &serenity::Message,
    ) -> Result<(&'a str, usize, Self), (crate::Error, Option<String>)> {
        let (rest, attachment_index, raw) =
            poise::pop_prefix_argument!(String, args, attachment_index, ctx, msg).await?;
        Ok((rest, attachment_index, Self(TargetInput::parse(&raw))))
    }
}

/// Accepted ID syntax. Discord snowflakes are numeric; other platforms use
/// alphanumeric IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdFormat {
    #[default]
    Numeric,
    Alphanumeric,
}

impl IdFormat {
    fn accepts(self, id: &str) -> bool {
        !id.is_empty()
            && match self {
                Self::Numeric => id.chars().all(|c| c.is_ascii_digit()),
                Self::Alphanumeric => id.chars().all(|c| c.is_ascii_alphanumeric()),
            }
    }
}

/// Why a target could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The input is not a well-formed mention or ID
    #[error("Invalid user: `{0}` is not a valid mention or ID.")]
    InvalidInput(String),
    /// Well-formed, but the platform does not know the user
    #[error("Could not find a user with ID `{0}`.")]
    NotFound(String),
}

/// Strip mention decoration (`<@`, `<@!`, `>`) and surrounding whitespace
fn strip_mention(raw: &str) -> &str {
    let raw = raw.trim();
    raw.strip_prefix("<@")
        .and_then(|rest| rest.strip_suffix('>'))
        .map_or(raw, |inner| inner.strip_prefix('!').unwrap_or(inner))
}

/// Extract and validate the ID carried by a raw or mention input
pub fn extract_id(raw: &str, format: IdFormat) -> Result<String, ResolveError> {
    let id = strip_mention(raw);
    if format.accepts(id) {
        Ok(id.to_string())
    } else {
        Err(ResolveError::InvalidInput(raw.trim().to_string()))
    }
}

/// Resolve `input` to a canonical target.
///
/// An already-resolved input is returned without a platform call. Otherwise
/// the ID is validated first; only a well-formed ID reaches `fetch_user`.
pub async fn resolve(
    platform: &dyn ModerationPlatform,
    input: TargetInput,
) -> Result<ResolvedTarget, ResolveError> {
    let raw = match input {
        TargetInput::Resolved(target) => return Ok(target),
        TargetInput::RawId(raw) | TargetInput::Mention(raw) => raw,
    };

    let id = extract_id(&raw, IdFormat::Numeric)?;
    let user_id = id
        .parse::<u64>()
        .ok()
        .filter(|&id| id != 0)
        .map(UserId::new)
        .ok_or_else(|| ResolveError::InvalidInput(raw.trim().to_string()))?;

    platform.fetch_user(user_id).await.map_err(|e| {
        debug!(user_id = %user_id, error = %e, "User lookup failed");
        ResolveError::NotFound(id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{MockModerationPlatform, PlatformError};
    use poise::SlashArgument;
    use mockall::predicate::eq;

    fn target(id: u64) -> ResolvedTarget {
        ResolvedTarget {
            user_id: UserId::new(id),
            display: format!("user{id}"),
            is_bot: false,
        }
    }

    #[test]
    fn test_parse_classifies_input() {
        assert_eq!(TargetInput::parse("<@12>"), TargetInput::Mention("<@12>".into()));
        assert_eq!(TargetInput::parse(" 12 "), TargetInput::RawId("12".into()));
    }

    #[test]
    fn test_extract_id() {
        assert_eq!(extract_id("<@123>", IdFormat::Numeric).unwrap(), "123");
        assert_eq!(extract_id("<@!123>", IdFormat::Numeric).unwrap(), "123");
        assert_eq!(extract_id("123", IdFormat::Numeric).unwrap(), "123");
        assert_eq!(
            extract_id("01HXYZ", IdFormat::Alphanumeric).unwrap(),
            "01HXYZ"
        );
        assert!(extract_id("01HXYZ", IdFormat::Numeric).is_err());
        assert!(extract_id("<@>", IdFormat::Numeric).is_err());
        assert!(extract_id("", IdFormat::Alphanumeric).is_err());
        assert!(extract_id("12 34", IdFormat::Numeric).is_err());
        assert!(extract_id("<@#12>", IdFormat::Numeric).is_err());
    }

    #[tokio::test]
    async fn test_resolved_input_skips_platform() {
        // No expectations: any platform call would panic.
        let platform = MockModerationPlatform::new();
        let resolved = resolve(&platform, TargetInput::Resolved(target(5))).await;
        assert_eq!(resolved, Ok(target(5)));
    }

    #[tokio::test]
    async fn test_invalid_input_never_fetches() {
        let platform = MockModerationPlatform::new();
        for raw in ["abc", "<@abc>", "", "0", "99999999999999999999999"] {
            let err = resolve(&platform, TargetInput::parse(raw)).await.unwrap_err();
            assert!(matches!(err, ResolveError::InvalidInput(_)), "{raw}: {err:?}");
        }
    }

    #[tokio::test]
    async fn test_mention_fetches_by_id() {
        let mut platform = MockModerationPlatform::new();
        platform
            .expect_fetch_user()
            .with(eq(UserId::new(42)))
            .times(1)
            .returning(|_| Ok(target(42)));
        let resolved = resolve(&platform, TargetInput::parse("<@!42>")).await;
        assert_eq!(resolved, Ok(target(42)));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let mut platform = MockModerationPlatform::new();
        platform
            .expect_fetch_user()
            .times(1)
            .returning(|_| Err(PlatformError::NotFound));
        let err = resolve(&platform, TargetInput::parse("42")).await.unwrap_err();
        assert_eq!(err, ResolveError::NotFound("42".into()));
        assert_eq!(err.to_string(), "Could not find a user with ID `42`.");
    }

    #[tokio::test]
    async fn test_lookup_failures_are_not_found() {
        for failure in [PlatformError::PermissionDenied, PlatformError::Other("timeout".into())] {
            let mut platform = MockModerationPlatform::new();
            platform
                .expect_fetch_user()
                .times(1)
                .return_once(move |_| Err(failure));
            let err = resolve(&platform, TargetInput::parse("<@42>")).await.unwrap_err();
            assert_eq!(err, ResolveError::NotFound("42".into()));
        }
    }

    #[tokio::test]
    async fn test_picked_user_is_not_fetched_again() {
        let mut user = serenity::User::default();
        user.id = UserId::new(42);
        user.name = "picked".into();
        user.bot = true;
        let arg = TargetArg::from(&user);

        let mut platform = MockModerationPlatform::new();
        platform.expect_fetch_user().never();
        let resolved = resolve(&platform, arg.into()).await.unwrap();
        assert_eq!(resolved.user_id, UserId::new(42));
        assert_eq!(resolved.display, "picked");
        assert!(resolved.is_bot);
    }

    #[test]
    fn test_target_arg_is_a_user_option() {
        let option = TargetArg::create(serenity::CreateCommandOption::new(
            serenity::CommandOptionType::String,
            "target",
            "Member",
        ));
        let json = serde_json::to_value(&option).unwrap();
        assert_eq!(json["type"], 6);
    }

    #[test]
    fn test_mention_format() {
        assert_eq!(target(7).mention(), "<@7>");
    }
}
