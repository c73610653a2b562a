//! Chat history: the messages the bot has seen and the collector that turns
//! them into prompt context.

pub mod collector;
pub mod log;
pub mod message;

use async_trait::async_trait;

pub use collector::{HistoryCollector, DEFAULT_HISTORY_LIMIT};
pub use log::ChatLog;
pub use message::ChatMessage;

/// A paginated view of a chat's past messages.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Up to `limit` messages, newest first, skipping the `offset` newest.
    async fn fetch_page(&self, chat_id: i64, limit: usize, offset: usize) -> Result<Vec<ChatMessage>, HistoryError>;
}

#[derive(Debug)]
pub enum HistoryError {
    Platform(String),
}

impl std::fmt::Display for HistoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryError::Platform(e) => write!(f, "history unavailable: {e}"),
        }
    }
}

impl std::error::Error for HistoryError {}
