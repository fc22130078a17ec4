use relay_core::{BackoffPolicy, DEFAULT_SYSTEM_PROMPT, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Highest numbered `GROQ_API_KEY_<n>` variable that is read.
const MAX_NUMBERED_KEYS: usize = 7;

/// Token written by `chatrelay init`; never a usable credential.
const TOKEN_PLACEHOLDER: &str = "your-telegram-bot-token-here";
/// Key placeholder written by earlier templates.
const KEY_PLACEHOLDER: &str = "your-groq-api-key-here";

fn is_usable_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && key != KEY_PLACEHOLDER
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: String,
    /// Only this user may run `/clear`, when set.
    #[serde(default)]
    pub owner_id: Option<u64>,
    /// Chat that receives failure reports.
    #[serde(default)]
    pub log_chat_id: Option<i64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UpstreamConfig {
    #[serde(default = "UpstreamConfig::default_model")]
    pub model: String,
    #[serde(default = "UpstreamConfig::default_base_url")]
    pub base_url: String,
    /// Failover order: the first key is the primary.
    #[serde(default)]
    pub api_keys: Vec<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            model: Self::default_model(),
            base_url: Self::default_base_url(),
            api_keys: Vec::new(),
        }
    }
}

impl UpstreamConfig {
    fn default_model() -> String {
        "llama-3.3-70b-versatile".to_string()
    }

    fn default_base_url() -> String {
        "https://api.groq.com/openai/v1".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConversationConfig {
    #[serde(default = "ConversationConfig::default_system_prompt")]
    pub system_prompt: String,
    /// Read the system prompt from this file instead, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_file: Option<PathBuf>,
    #[serde(default = "ConversationConfig::default_history_keep")]
    pub history_keep: usize,
    #[serde(default = "ConversationConfig::default_greeting_private")]
    pub greeting_private: String,
    #[serde(default = "ConversationConfig::default_greeting_group")]
    pub greeting_group: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            system_prompt: Self::default_system_prompt(),
            system_prompt_file: None,
            history_keep: Self::default_history_keep(),
            greeting_private: Self::default_greeting_private(),
            greeting_group: Self::default_greeting_group(),
        }
    }
}

impl ConversationConfig {
    fn default_system_prompt() -> String {
        DEFAULT_SYSTEM_PROMPT.to_string()
    }

    const fn default_history_keep() -> usize {
        10
    }

    fn default_greeting_private() -> String {
        "Hey! What's up?".to_string()
    }

    fn default_greeting_group() -> String {
        "Kya baat hai bolo yaar?".to_string()
    }

    /// The system prompt text, read from `system_prompt_file` when one is set.
    ///
    /// An unreadable or empty file falls back to the inline prompt.
    #[must_use]
    pub fn resolve_system_prompt(&self) -> String {
        let Some(path) = &self.system_prompt_file else {
            return self.system_prompt.clone();
        };
        match std::fs::read_to_string(path) {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("System prompt file {} is empty", path.display());
                self.system_prompt.clone()
            }
            Err(e) => {
                warn!("Cannot read system prompt file {}: {e}", path.display());
                self.system_prompt.clone()
            }
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct DispatchConfig {
    #[serde(default = "DispatchConfig::default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "DispatchConfig::default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: Self::default_min_delay_ms(),
            max_delay_ms: Self::default_max_delay_ms(),
        }
    }
}

impl DispatchConfig {
    const fn default_min_delay_ms() -> u64 {
        4000
    }

    const fn default_max_delay_ms() -> u64 {
        6000
    }

    #[must_use]
    pub const fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy)]
pub struct SupervisorConfig {
    #[serde(default = "SupervisorConfig::default_base_delay_secs")]
    pub base_delay_secs: u64,
    #[serde(default = "SupervisorConfig::default_max_delay_secs")]
    pub max_delay_secs: u64,
    #[serde(default = "SupervisorConfig::default_max_retries")]
    pub max_retries: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            base_delay_secs: Self::default_base_delay_secs(),
            max_delay_secs: Self::default_max_delay_secs(),
            max_retries: Self::default_max_retries(),
        }
    }
}

impl SupervisorConfig {
    const fn default_base_delay_secs() -> u64 {
        5
    }

    const fn default_max_delay_secs() -> u64 {
        300
    }

    const fn default_max_retries() -> u32 {
        10
    }

    #[must_use]
    pub const fn policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            base_delay: Duration::from_secs(self.base_delay_secs),
            max_delay: Duration::from_secs(self.max_delay_secs),
            max_retries: self.max_retries,
        }
    }
}

impl Config {
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join("chatrelay"))
    }

    pub fn default_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load `~/chatrelay/config.json` (or `path`), then apply environment overrides.
    ///
    /// A missing file is not an error: the environment alone may configure the relay.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        let mut config = if path.exists() {
            info!("Loading config from {}", path.display());
            Self::from_file(&path)?
        } else {
            info!(
                "No config file at {}, using defaults and environment",
                path.display()
            );
            Self::default()
        };

        config.apply_env_from(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Overlay values from environment-style variables.
    ///
    /// `GROQ_API_KEY` and `GROQ_API_KEY_1` .. `GROQ_API_KEY_7` are appended to the
    /// configured keys in that order, skipping duplicates. Blank and placeholder
    /// keys from the file are dropped first so they never lead the failover order.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let before = self.upstream.api_keys.len();
        self.upstream.api_keys.retain(|k| is_usable_key(k));
        if self.upstream.api_keys.len() < before {
            warn!(
                "Ignoring {} blank or placeholder API key(s) from config",
                before - self.upstream.api_keys.len()
            );
        }
        for key in &mut self.upstream.api_keys {
            *key = key.trim().to_string();
        }

        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.token = token;
        }
        if let Some(owner) = lookup("OWNER_ID") {
            match owner.trim().parse::<u64>() {
                Ok(0) => self.telegram.owner_id = None,
                Ok(id) => self.telegram.owner_id = Some(id),
                Err(e) => warn!("Ignoring invalid OWNER_ID {owner:?}: {e}"),
            }
        }
        if let Some(log_chat) = lookup("LOG_GROUP_ID") {
            match log_chat.trim().parse::<i64>() {
                Ok(id) => self.telegram.log_chat_id = Some(id),
                Err(e) => warn!("Ignoring invalid LOG_GROUP_ID {log_chat:?}: {e}"),
            }
        }

        let names = std::iter::once("GROQ_API_KEY".to_string())
            .chain((1..=MAX_NUMBERED_KEYS).map(|i| format!("GROQ_API_KEY_{i}")));
        for name in names {
            if let Some(key) = lookup(&name) {
                let key = key.trim().to_string();
                if !self.upstream.api_keys.contains(&key) {
                    self.upstream.api_keys.push(key);
                }
            }
        }
    }

    /// Fail fast on settings without which the relay must not start.
    pub fn validate(&self, require_token: bool) -> Result<(), Error> {
        let token = self.telegram.token.trim();
        if require_token && (token.is_empty() || token == TOKEN_PLACEHOLDER) {
            return Err(Error::ConfigMissing(
                "Telegram bot token (telegram.token or TELEGRAM_BOT_TOKEN)".to_string(),
            ));
        }
        if self.upstream.api_keys.is_empty() {
            return Err(Error::ConfigMissing(
                "upstream API key (upstream.api_keys or GROQ_API_KEY_1)".to_string(),
            ));
        }
        if let Some(pos) = self.upstream.api_keys.iter().position(|k| !is_usable_key(k)) {
            return Err(Error::ConfigMissing(format!(
                "usable upstream API key at position {} (blank or placeholder)",
                pos + 1
            )));
        }
        Ok(())
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<PathBuf> {
        let config_path = Self::ensure_config_dir()?.join("config.json");
        Self::write_template(&config_path)?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Add your Telegram bot token and Groq API keys (upstream.api_keys or GROQ_API_KEY_1)");
        println!("   2. Optionally set owner_id and log_chat_id");
        println!("   3. Run 'chatrelay run' to start the relay");
        println!();
        Ok(config_path)
    }

    pub fn write_template(config_path: &Path) -> anyhow::Result<()> {
        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        let mut template = Self::default();
        template.telegram.token = TOKEN_PLACEHOLDER.to_string();

        std::fs::write(config_path, serde_json::to_string_pretty(&template)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_relay_policy() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.upstream.model, "llama-3.3-70b-versatile");
        assert_eq!(config.conversation.history_keep, 10);
        assert_eq!(config.dispatch.min_delay(), Duration::from_secs(4));
        assert_eq!(config.dispatch.max_delay(), Duration::from_secs(6));
        assert_eq!(config.supervisor.policy(), BackoffPolicy::default());
    }

    #[test]
    fn env_overlays_token_owner_and_keys_in_order() {
        let mut config = Config::default();
        config.upstream.api_keys = vec!["from-file".to_string()];
        config.apply_env_from(env(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("OWNER_ID", "42"),
            ("LOG_GROUP_ID", "-1001234"),
            ("GROQ_API_KEY_2", "second"),
            ("GROQ_API_KEY_1", "first"),
            ("GROQ_API_KEY_3", "from-file"),
            ("GROQ_API_KEY_4", "  "),
        ]));

        assert_eq!(config.telegram.token, "123:abc");
        assert_eq!(config.telegram.owner_id, Some(42));
        assert_eq!(config.telegram.log_chat_id, Some(-1_001_234));
        assert_eq!(config.upstream.api_keys, vec!["from-file", "first", "second"]);
    }

    #[test]
    fn zero_owner_means_unrestricted() {
        let mut config = Config::default();
        config.telegram.owner_id = Some(7);
        config.apply_env_from(env(&[("OWNER_ID", "0")]));
        assert_eq!(config.telegram.owner_id, None);
    }

    #[test]
    fn validation_reports_missing_pieces() {
        let mut config = Config::default();
        assert!(matches!(config.validate(true), Err(Error::ConfigMissing(_))));

        config.telegram.token = "123:abc".to_string();
        let err = config.validate(true).unwrap_err();
        assert!(err.to_string().contains("API key"));
        assert!(err.is_fatal());

        config.upstream.api_keys.push("gsk".to_string());
        assert!(config.validate(true).is_ok());

        config.telegram.token.clear();
        assert!(config.validate(false).is_ok());
    }

    #[test]
    fn template_round_trips_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        Config::write_template(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        assert!(loaded.upstream.api_keys.is_empty());
        assert!(Config::write_template(&path).is_err());
    }

    #[test]
    fn template_with_env_keys_puts_real_key_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        Config::write_template(&path).unwrap();

        let mut config = Config::from_file(&path).unwrap();
        config.apply_env_from(env(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("GROQ_API_KEY_1", "gsk_real"),
        ]));

        assert_eq!(config.upstream.api_keys, vec!["gsk_real"]);
        assert!(config.validate(true).is_ok());
    }

    #[test]
    fn placeholder_and_blank_keys_from_file_are_dropped() {
        let mut config = Config::default();
        config.upstream.api_keys = vec![
            String::new(),
            KEY_PLACEHOLDER.to_string(),
            " gsk_real ".to_string(),
        ];
        config.apply_env_from(env(&[("GROQ_API_KEY_1", "gsk_backup")]));
        assert_eq!(config.upstream.api_keys, vec!["gsk_real", "gsk_backup"]);
    }

    #[test]
    fn validation_rejects_blank_or_placeholder_entries() {
        let mut config = Config::default();
        config.telegram.token = "123:abc".to_string();

        config.upstream.api_keys = vec![String::new(), "gsk_real".to_string()];
        let err = config.validate(true).unwrap_err();
        assert!(matches!(err, Error::ConfigMissing(ref m) if m.contains("position 1")));

        config.upstream.api_keys = vec!["gsk_real".to_string(), KEY_PLACEHOLDER.to_string()];
        assert!(matches!(config.validate(true), Err(Error::ConfigMissing(_))));

        config.upstream.api_keys = vec!["gsk_real".to_string()];
        config.telegram.token = TOKEN_PLACEHOLDER.to_string();
        assert!(matches!(config.validate(true), Err(Error::ConfigMissing(_))));
        assert!(config.validate(false).is_ok());
    }

    #[test]
    fn system_prompt_file_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let prompt_path = dir.path().join("system_prompt.txt");
        std::fs::write(&prompt_path, "  you are akane\n").unwrap();

        let mut conversation = ConversationConfig {
            system_prompt_file: Some(prompt_path),
            ..ConversationConfig::default()
        };
        assert_eq!(conversation.resolve_system_prompt(), "you are akane");

        conversation.system_prompt_file = Some(dir.path().join("missing.txt"));
        assert_eq!(conversation.resolve_system_prompt(), DEFAULT_SYSTEM_PROMPT);
    }
}
