/// A message as seen in a chat.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub message_id: i64,
    /// Display name of the sender (first name on Telegram).
    pub author: String,
    /// `None` for stickers, photos without captions, service messages, etc.
    pub text: Option<String>,
    /// Sender is a bot account.
    pub is_bot: bool,
}

impl ChatMessage {
    /// Format as a `[author]: text` line, or `None` when the message
    /// should not be used as context.
    pub fn history_line(&self) -> Option<String> {
        if self.is_bot {
            return None;
        }
        match self.text.as_deref() {
            Some(text) if !text.is_empty() => Some(format!("[{}]: {}", self.author, text)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_msg(author: &str, text: Option<&str>, is_bot: bool) -> ChatMessage {
        ChatMessage {
            message_id: 1,
            author: author.to_string(),
            text: text.map(str::to_string),
            is_bot,
        }
    }

    #[test]
    fn test_human_text_line() {
        let msg = make_msg("Alice", Some("let's add a trading phase"), false);
        assert_eq!(msg.history_line().as_deref(), Some("[Alice]: let's add a trading phase"));
    }

    #[test]
    fn test_bot_message_skipped() {
        assert!(make_msg("GroupHelpBot", Some("welcome!"), true).history_line().is_none());
    }

    #[test]
    fn test_non_text_skipped() {
        assert!(make_msg("Bob", None, false).history_line().is_none());
        assert!(make_msg("Bob", Some(""), false).history_line().is_none());
    }

    #[test]
    fn test_multiline_text_kept_verbatim() {
        let msg = make_msg("Eve", Some("rule 1\nrule 2"), false);
        assert_eq!(msg.history_line().unwrap(), "[Eve]: rule 1\nrule 2");
    }
}
