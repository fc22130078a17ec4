use crate::command::CommandStrategy;
use relay_config::Config;
use relay_core::Supervisor;
use relay_telegram::{Bot, TelegramBot, TelegramOutbound};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Input for the Telegram relay command.
pub struct TelegramInput {
    /// Optional config file path
    pub config: Option<PathBuf>,
    /// Optional bot token (overrides config)
    pub token: Option<String>,
}

/// Strategy for running the Telegram relay under the connection supervisor.
pub struct TelegramStrategy;

impl CommandStrategy for TelegramStrategy {
    type Input = TelegramInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let mut config = Config::load(input.config.as_deref())?;
        if let Some(token) = input.token.filter(|t| !t.trim().is_empty()) {
            config.telegram.token = token;
        }
        config.validate(true)?;

        info!("Starting Telegram relay...");

        let bot = Bot::new(config.telegram.token.clone());
        let outbound = Arc::new(TelegramOutbound::new(bot.clone()));
        let handler = super::build_handler(&config, outbound, true)?;

        let mut relay = TelegramBot::new(bot, handler);
        let mut supervisor = Supervisor::new(config.supervisor.policy());

        info!("Telegram relay is running. Press Ctrl+C to stop.");
        supervisor.run(&mut relay).await?;

        info!("Relay has stopped");
        Ok(())
    }
}
