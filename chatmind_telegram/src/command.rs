use teloxide::types::BotCommand;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Wipe,
    /// Explicit request for an answer; carries the prompt, possibly empty.
    Ai(String),
}

impl Command {
    fn all() -> Vec<BotCommand> {
        vec![
            BotCommand {
                command: "start".to_string(),
                description: "Introduce the bot".to_string(),
            },
            BotCommand {
                command: "help".to_string(),
                description: "Show available commands".to_string(),
            },
            BotCommand {
                command: "wipe".to_string(),
                description: "Forget everything said in this chat".to_string(),
            },
            BotCommand {
                command: "ai".to_string(),
                description: "Ask the bot directly: /ai <prompt>".to_string(),
            },
        ]
    }

    #[must_use]
    pub fn bot_commands() -> Vec<BotCommand> {
        Self::all()
    }

    /// Parse `/name[@bot] [args]`.
    ///
    /// A command addressed to a different bot (`/help@other_bot`) is not
    /// ours and yields `None`; so does any unknown command.
    #[must_use]
    pub fn parse_from_text(text: &str, bot_name: &str) -> Option<Self> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let (head, args) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, ""), |(head, args)| (head, args.trim()));

        let name = match head.split_once('@') {
            Some((name, target)) => {
                if !bot_name.is_empty() && !target.eq_ignore_ascii_case(bot_name) {
                    return None;
                }
                name
            }
            None => head,
        };

        match name.to_lowercase().as_str() {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "wipe" => Some(Self::Wipe),
            "ai" => Some(Self::Ai(args.to_string())),
            _ => None,
        }
    }

    #[must_use]
    pub const fn help_text() -> &'static str {
        r"
🤖 ChatMind

Commands:
/start - Introduce the bot
/help  - Show this message
/wipe  - Forget everything said in this chat
/ai <prompt> - Ask me directly

In groups I read along and answer when mentioned or replied to.
In private chats I answer every message.
"
    }

    #[must_use]
    pub const fn welcome_text() -> &'static str {
        r"
👋 Hi, I'm ChatMind!

I remember what is said in this chat and keep running notes,
so I can answer with context.

Send /help to see the commands.
"
    }

    #[must_use]
    pub const fn ai_usage_text() -> &'static str {
        "Usage: /ai <prompt>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_commands() {
        assert_eq!(Command::parse_from_text("/start", "bot"), Some(Command::Start));
        assert_eq!(Command::parse_from_text(" /HELP ", "bot"), Some(Command::Help));
        assert_eq!(Command::parse_from_text("/wipe", "bot"), Some(Command::Wipe));
    }

    #[test]
    fn ai_keeps_its_prompt() {
        assert_eq!(
            Command::parse_from_text("/ai  what is Rust?  ", "bot"),
            Some(Command::Ai("what is Rust?".to_string()))
        );
        assert_eq!(
            Command::parse_from_text("/ai", "bot"),
            Some(Command::Ai(String::new()))
        );
    }

    #[test]
    fn respects_bot_suffix() {
        assert_eq!(
            Command::parse_from_text("/ai@ChatMindBot hi", "chatmindbot"),
            Some(Command::Ai("hi".to_string()))
        );
        assert_eq!(Command::parse_from_text("/help@other_bot", "chatmindbot"), None);
        assert_eq!(
            Command::parse_from_text("/help@anyone", ""),
            Some(Command::Help)
        );
    }

    #[test]
    fn ignores_non_commands() {
        assert_eq!(Command::parse_from_text("hello /start", "bot"), None);
        assert_eq!(Command::parse_from_text("/unknown", "bot"), None);
        assert_eq!(Command::parse_from_text("", "bot"), None);
    }

    #[test]
    fn menu_lists_every_command() {
        let names: Vec<_> = Command::bot_commands()
            .into_iter()
            .map(|c| c.command)
            .collect();
        assert_eq!(names, vec!["start", "help", "wipe", "ai"]);
    }
}
