pub mod audit;
pub mod auth;
pub mod commands;
pub mod config;
pub mod data;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod moderation;
pub mod platform;
pub mod status;
pub mod store;
pub mod target;

pub const BOT_NAME: &str = "guild_warden";
pub const COMMAND_TARGET: &str = "guild_warden::command";
pub const ERROR_TARGET: &str = "guild_warden::error";
pub const EVENT_TARGET: &str = "guild_warden::handlers";
pub const AUDIT_TARGET: &str = "guild_warden::audit";
pub const CONSOLE_TARGET: &str = "guild_warden";

pub use data::{Data, DataInner};
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
