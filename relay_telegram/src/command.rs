use teloxide::types::BotCommand;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Clear,
    Help,
}

impl Command {
    fn all() -> Vec<BotCommand> {
        vec![
            BotCommand {
                command: "start".to_string(),
                description: "Start a fresh conversation".to_string(),
            },
            BotCommand {
                command: "clear".to_string(),
                description: "Clear the conversation history".to_string(),
            },
            BotCommand {
                command: "help".to_string(),
                description: "Show the command list".to_string(),
            },
        ]
    }

    #[must_use]
    pub fn bot_commands() -> Vec<BotCommand> {
        Self::all()
    }

    /// Parse `/cmd`, `/cmd@botname` or `/cmd args`. Commands addressed to
    /// another bot are ignored.
    #[must_use]
    pub fn parse_from_text(text: &str, bot_name: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?.to_lowercase();
        let mut parts = first.splitn(2, '@');
        let name = parts.next()?;

        let addressed_elsewhere = parts
            .next()
            .is_some_and(|target| !bot_name.is_empty() && !target.eq_ignore_ascii_case(bot_name));
        if addressed_elsewhere {
            return None;
        }

        match name {
            "/start" => Some(Self::Start),
            "/clear" | "/reset" => Some(Self::Clear),
            "/help" => Some(Self::Help),
            _ => None,
        }
    }

    #[must_use]
    pub const fn help_text() -> &'static str {
        r"
Commands:
/start - start a fresh conversation
/clear - clear the conversation history
/help  - show this message

Just send a message to chat!
"
    }

    #[must_use]
    pub const fn cleared_text() -> &'static str {
        "History cleared!"
    }

    #[must_use]
    pub const fn refused_text() -> &'static str {
        "Sorry, only the owner can use this command."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_addressed_commands() {
        assert_eq!(Command::parse_from_text("/start", "akane_bot"), Some(Command::Start));
        assert_eq!(
            Command::parse_from_text("/START@Akane_Bot", "akane_bot"),
            Some(Command::Start)
        );
        assert_eq!(Command::parse_from_text("/reset now", ""), Some(Command::Clear));
        assert_eq!(Command::parse_from_text("  /help", ""), Some(Command::Help));
    }

    #[test]
    fn ignores_plain_text_and_other_bots() {
        assert_eq!(Command::parse_from_text("start", ""), None);
        assert_eq!(Command::parse_from_text("/clear@other_bot", "akane_bot"), None);
        assert_eq!(Command::parse_from_text("/unknown", ""), None);
        assert_eq!(Command::parse_from_text("", ""), None);
    }

    #[test]
    fn every_command_is_advertised() {
        let names: Vec<String> = Command::bot_commands()
            .into_iter()
            .map(|c| c.command)
            .collect();
        assert_eq!(names, vec!["start", "clear", "help"]);
    }
}
