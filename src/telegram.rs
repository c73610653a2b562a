//! Telegram client using teloxide.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatMemberKind, MessageId, ReplyParameters};
use tracing::{info, warn};

use crate::history::ChatMessage;

/// Telegram rejects messages longer than 4096 characters; stay below it.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Membership of the bot account in a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Owner,
    Administrator,
    Member,
    Restricted,
    Left,
    Banned,
}

impl MemberStatus {
    /// Only admins are guaranteed to receive every group message.
    pub fn can_read_history(self) -> bool {
        matches!(self, MemberStatus::Owner | MemberStatus::Administrator)
    }
}

impl From<&ChatMemberKind> for MemberStatus {
    fn from(kind: &ChatMemberKind) -> Self {
        match kind {
            ChatMemberKind::Owner(_) => MemberStatus::Owner,
            ChatMemberKind::Administrator(_) => MemberStatus::Administrator,
            ChatMemberKind::Member(_) => MemberStatus::Member,
            ChatMemberKind::Restricted(_) => MemberStatus::Restricted,
            ChatMemberKind::Left => MemberStatus::Left,
            ChatMemberKind::Banned(_) => MemberStatus::Banned,
        }
    }
}

/// The chat operations commands need.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Reply to a message, returning the new message's ID.
    async fn reply(&self, chat_id: i64, reply_to: i64, text: &str) -> Result<i64, PlatformError>;

    async fn edit(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), PlatformError>;

    /// The bot's own membership status in a chat.
    async fn bot_status(&self, chat_id: i64) -> Result<MemberStatus, PlatformError>;
}

/// Telegram API client.
pub struct TelegramClient {
    bot: Bot,
    bot_user_id: UserId,
}

impl TelegramClient {
    pub fn new(bot: Bot, bot_user_id: UserId) -> Self {
        Self { bot, bot_user_id }
    }
}

#[async_trait]
impl ChatPlatform for TelegramClient {
    async fn reply(&self, chat_id: i64, reply_to: i64, text: &str) -> Result<i64, PlatformError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .reply_parameters(ReplyParameters::new(MessageId(reply_to as i32)))
            .await
            .map(|msg| msg.id.0 as i64)
            .map_err(|e| {
                warn!("Failed to send to chat {}: {e}", chat_id);
                PlatformError::Send(e.to_string())
            })
    }

    async fn edit(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), PlatformError> {
        self.bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id as i32), text)
            .await
            .map(|_| ())
            .map_err(|e| {
                warn!("Failed to edit msg {} in chat {}: {e}", message_id, chat_id);
                PlatformError::Edit(e.to_string())
            })
    }

    async fn bot_status(&self, chat_id: i64) -> Result<MemberStatus, PlatformError> {
        info!("Checking own membership in chat {}", chat_id);

        let member = self
            .bot
            .get_chat_member(ChatId(chat_id), self.bot_user_id)
            .await
            .map_err(|e| {
                warn!("Failed to get chat member: {e}");
                PlatformError::Member(e.to_string())
            })?;

        Ok(MemberStatus::from(&member.kind))
    }
}

#[derive(Debug)]
pub enum PlatformError {
    Send(String),
    Edit(String),
    Member(String),
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformError::Send(e) => write!(f, "failed to send message: {e}"),
            PlatformError::Edit(e) => write!(f, "failed to edit message: {e}"),
            PlatformError::Member(e) => write!(f, "failed to get chat member: {e}"),
        }
    }
}

impl std::error::Error for PlatformError {}

/// Convert an incoming update into a loggable message.
///
/// Messages without a user sender (channel posts, anonymous admins) are
/// skipped.
pub fn to_chat_message(msg: &Message) -> Option<ChatMessage> {
    let user = msg.from.as_ref()?;
    Some(ChatMessage {
        message_id: msg.id.0 as i64,
        author: user.first_name.clone(),
        text: msg.text().map(str::to_string),
        is_bot: user.is_bot,
    })
}

/// Split text into pieces of at most `max_chars` characters.
///
/// Splits on character boundaries only, so the pieces concatenate back to
/// the original. Empty text yields no pieces.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(max_chars).map(|chunk| chunk.iter().collect()).collect()
}

/// Keep at most `max_chars` leading characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Keep at most `max_chars` trailing characters.
pub fn tail_chars(text: &str, max_chars: usize) -> &str {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    text.char_indices()
        .nth(total - max_chars)
        .map_or("", |(idx, _)| &text[idx..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_short_message() {
        assert_eq!(split_message("hello", MAX_MESSAGE_CHARS), vec!["hello".to_string()]);
    }

    #[test]
    fn test_split_empty_message() {
        assert!(split_message("", MAX_MESSAGE_CHARS).is_empty());
    }

    #[test]
    fn test_split_piece_count_and_sizes() {
        for len in [1, 3999, 4000, 4001, 8000, 12345] {
            let text = "a".repeat(len);
            let parts = split_message(&text, MAX_MESSAGE_CHARS);
            assert_eq!(parts.len(), len.div_ceil(MAX_MESSAGE_CHARS), "len {len}");
            assert!(parts.iter().all(|p| p.chars().count() <= MAX_MESSAGE_CHARS));
            assert_eq!(parts.concat(), text);
        }
    }

    #[test]
    fn test_split_multibyte_on_char_boundaries() {
        let text = "игра🎲".repeat(1000);
        let parts = split_message(&text, MAX_MESSAGE_CHARS);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].chars().count(), 4000);
        assert_eq!(parts[1].chars().count(), 1000);
        assert_eq!(parts.concat(), text);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 2), "he");
        assert_eq!(truncate_chars("привет", 3), "при");
    }

    #[test]
    fn test_tail_chars() {
        assert_eq!(tail_chars("hello", 10), "hello");
        assert_eq!(tail_chars("hello", 2), "lo");
        assert_eq!(tail_chars("привет", 3), "вет");
        assert_eq!(tail_chars("abc", 0), "");
    }

    #[test]
    fn test_admin_statuses_can_read_history() {
        assert!(MemberStatus::Owner.can_read_history());
        assert!(MemberStatus::Administrator.can_read_history());
        assert!(!MemberStatus::Member.can_read_history());
        assert!(!MemberStatus::Restricted.can_read_history());
        assert!(!MemberStatus::Left.can_read_history());
        assert!(!MemberStatus::Banned.can_read_history());
    }
}
