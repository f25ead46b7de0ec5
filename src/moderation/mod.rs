//! Moderation pipeline
//!
//! This module turns a command's raw arguments into at most one platform
//! mutation and delivers the outcome to the target, the invoker, the audit
//! log and the guild's log channel.

pub mod action;
pub mod error;
pub mod executor;
pub mod notify;

pub use action::{ActionRequest, DEFAULT_REASON, Invocation};
pub use error::{ModerationError, ModerationResult};
pub use executor::Moderator;
pub use notify::{Delivery, Notification};
