//! Telegram transport: update dispatch, commands and outbound delivery.

mod bot;
mod command;
mod error;
mod handler;
mod outbound;

pub use bot::TelegramBot;
pub use command::Command;
pub use error::{Error, Result};
pub use handler::{handle_command, handle_message, inbound_from, sender_display_name};
pub use outbound::TelegramOutbound;
pub use teloxide::Bot;
