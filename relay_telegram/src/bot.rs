use crate::{Command, Error};
use async_trait::async_trait;
use relay_conversation::MessageHandler;
use relay_core::Transport;
use std::sync::{Arc, Mutex};
use teloxide::prelude::*;
use teloxide::update_listeners::polling_default;
use tracing::{error, info, warn};

/// Telegram transport for the relay.
///
/// `connect` checks the token with `getMe`; `run` long-polls until Ctrl+C or a
/// polling error, which is handed back to the supervisor.
#[derive(Clone)]
pub struct TelegramBot {
    /// Teloxide bot instance
    pub bot: Bot,
    /// Conversation engine shared by every update
    pub handler: MessageHandler,
    /// Bot username, known after `connect`
    username: String,
}

impl TelegramBot {
    #[must_use]
    pub const fn new(bot: Bot, handler: MessageHandler) -> Self {
        Self {
            bot,
            handler,
            username: String::new(),
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

#[async_trait]
impl Transport for TelegramBot {
    async fn connect(&mut self) -> relay_core::Result<()> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(Error::from)?;

        self.username = me.user.username.clone().unwrap_or_default();
        self.handler.set_self_id(me.user.id.0);
        info!(
            "Connected to Telegram API: @{} (id: {})",
            if self.username.is_empty() {
                "no username"
            } else {
                self.username.as_str()
            },
            me.user.id
        );

        if let Err(e) = self.bot.set_my_commands(Command::bot_commands()).await {
            warn!("Failed to register bot commands: {e}");
        }
        Ok(())
    }

    async fn run(&mut self) -> relay_core::Result<()> {
        use teloxide::dispatching::{Dispatcher, UpdateFilterExt};
        use teloxide::dptree;
        use teloxide::types::Update;

        let bot = self.bot.clone();

        let schema = dptree::entry().branch(Update::filter_message().endpoint({
            let relay = self.clone();
            move |_bot: Bot, msg: teloxide::types::Message| {
                let relay = relay.clone();
                async move { crate::handler::handle_message(relay, msg).await }
            }
        }));

        let mut dispatcher = Dispatcher::builder(bot.clone(), schema)
            .enable_ctrlc_handler()
            .build();

        let failure: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let error_handler = {
            let failure = Arc::clone(&failure);
            let shutdown = dispatcher.shutdown_token();
            move |err: teloxide::RequestError| {
                let failure = Arc::clone(&failure);
                let shutdown = shutdown.clone();
                async move {
                    error!("Polling failed: {err}");
                    if let Ok(mut slot) = failure.lock() {
                        slot.get_or_insert_with(|| err.to_string());
                    }
                    // Ignoring the future: shutdown proceeds without waiting here.
                    let _ = shutdown.shutdown();
                }
            }
        };

        let listener = polling_default(bot).await;
        dispatcher
            .dispatch_with_listener(listener, Arc::new(error_handler))
            .await;

        let failed = failure.lock().ok().and_then(|mut slot| slot.take());
        match failed {
            Some(reason) => Err(relay_core::Error::TransportDisconnect(reason)),
            None => Ok(()),
        }
    }
}
