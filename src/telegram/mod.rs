//! Telegram transport: Bot API payloads, a thin long-polling client, and
//! the update loop that connects chat traffic to the pipeline.

pub mod bot;
pub mod client;
pub mod types;

pub use bot::Bot;
pub use client::{TelegramClient, TelegramError};
