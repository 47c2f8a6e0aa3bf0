pub mod action;
pub mod assistant;
pub mod callback;
pub mod commands;
pub mod config;
pub mod data;
pub mod discord;
pub mod dispatcher;
pub mod duration;
pub mod error;
pub mod game;
pub mod handlers;
pub mod logging;
pub mod maintenance;
pub mod messenger;
pub mod moderation;
pub mod target;
pub mod types;

pub const BOT_NAME: &str = "chat_warden";
pub const COMMAND_TARGET: &str = "chat_warden::command";
pub const ERROR_TARGET: &str = "chat_warden::error";
pub const EVENT_TARGET: &str = "chat_warden::handlers";
pub const CONSOLE_TARGET: &str = "chat_warden";

pub use data::{Data, DataInner};
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
