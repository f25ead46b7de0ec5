//! Error types for the moderation pipeline
//!
//! Every non-success terminal state of a moderation command is one of these.
//! The `Display` text is exactly what the invoking user sees.

use crate::platform::Reply;
use crate::target::ResolveError;
use thiserror::Error;

/// Why a moderation command stopped before (or at) its mutation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModerationError {
    /// The actor may not run this command
    #[error("You don't have permission to use that command.")]
    Denied,

    /// Malformed or out-of-range argument
    #[error("{0}")]
    InvalidInput(String),

    /// The target could not be resolved
    #[error(transparent)]
    Resolution(#[from] ResolveError),

    /// A business rule refused the action
    #[error("{0}")]
    Precondition(String),

    /// The bot itself lacks the rights for the mutation
    #[error("{0}")]
    BotLacksPermission(String),

    #[error("An unexpected error occurred.")]
    Unexpected { detail: String },
}

impl ModerationError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    pub fn unexpected(detail: impl ToString) -> Self {
        Self::Unexpected {
            detail: detail.to_string(),
        }
    }

    /// Short machine-readable kind for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Denied => "denied",
            Self::InvalidInput(_) => "invalid_input",
            Self::Resolution(_) => "resolution",
            Self::Precondition(_) => "precondition",
            Self::BotLacksPermission(_) => "bot_lacks_permission",
            Self::Unexpected { .. } => "unexpected",
        }
    }

    /// The single reply sent for this error
    #[must_use]
    pub fn reply(&self) -> Reply {
        Reply::error(self.to_string())
    }
}

/// Result type for moderation operations
pub type ModerationResult<T> = Result<T, ModerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ModerationError::Denied.to_string(),
            "You don't have permission to use that command."
        );
        assert_eq!(
            ModerationError::unexpected("socket closed").to_string(),
            "An unexpected error occurred."
        );
        assert_eq!(
            ModerationError::from(ResolveError::NotFound("5".into())).to_string(),
            "Could not find a user with ID `5`."
        );
    }

    #[test]
    fn test_reply_is_error() {
        let reply = ModerationError::precondition("You cannot kick yourself.").reply();
        assert!(reply.is_error());
        assert_eq!(reply.content, "You cannot kick yourself.");
    }
}
