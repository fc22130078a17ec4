#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber, fmt::time::LocalTime};

mod command;

use command::{
    ChatInput, ChatStrategy, CommandStrategy, InitStrategy, TelegramInput, TelegramStrategy,
    VersionStrategy,
};

#[derive(Parser)]
#[command(name = "chatrelay")]
#[command(about = "Telegram relay to a chat-completion API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Telegram relay
    Run {
        /// Config file (defaults to ~/chatrelay/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Bot token (overrides config)
        #[arg(short, long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// Chat with the relay from the terminal
    Chat {
        /// Config file (defaults to ~/chatrelay/config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Name attributed to your messages
        #[arg(short, long, default_value = "User")]
        name: String,

        /// Skip the humanizing delay before each reply
        #[arg(long)]
        no_delay: bool,
    },
    /// Initialize configuration
    Init,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_timer(LocalTime::rfc_3339())
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, token } => {
            TelegramStrategy
                .execute(TelegramInput { config, token })
                .await
        }
        Commands::Chat {
            config,
            name,
            no_delay,
        } => {
            ChatStrategy
                .execute(ChatInput {
                    config,
                    name,
                    no_delay,
                })
                .await
        }
        Commands::Init => InitStrategy.execute(()).await,
        Commands::Version => VersionStrategy.execute(()).await,
    }
}
