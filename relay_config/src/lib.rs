//! Relay configuration: `~/chatrelay/config.json` plus environment overrides.

mod schema;

pub use schema::{
    Config, ConversationConfig, DispatchConfig, SupervisorConfig, TelegramConfig, UpstreamConfig,
};
