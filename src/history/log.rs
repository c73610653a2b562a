//! In-memory log of recent messages per chat.
//!
//! The Bot API cannot read past messages, so the bot remembers what it has
//! observed since startup. Nothing here touches disk; a restart starts fresh.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::history::{ChatMessage, HistoryError, HistorySource};

/// Bounded per-chat message log.
pub struct ChatLog {
    capacity: usize,
    chats: Mutex<HashMap<i64, VecDeque<ChatMessage>>>,
}

impl ChatLog {
    /// Keep at most `capacity` messages per chat (oldest evicted first).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            chats: Mutex::new(HashMap::new()),
        }
    }

    /// Add a message.
    pub async fn record(&self, chat_id: i64, msg: ChatMessage) {
        let mut chats = self.chats.lock().await;
        let log = chats.entry(chat_id).or_default();
        if log.len() == self.capacity {
            log.pop_front();
        }
        log.push_back(msg);
    }

    /// Edit a message by ID.
    pub async fn edit(&self, chat_id: i64, message_id: i64, new_text: &str) {
        let mut chats = self.chats.lock().await;
        if let Some(msg) = chats
            .get_mut(&chat_id)
            .and_then(|log| log.iter_mut().rev().find(|m| m.message_id == message_id))
        {
            msg.text = Some(new_text.to_string());
        } else {
            debug!("Edit for unknown message {} in chat {}", message_id, chat_id);
        }
    }

    pub async fn len(&self, chat_id: i64) -> usize {
        self.chats.lock().await.get(&chat_id).map_or(0, VecDeque::len)
    }
}

#[async_trait]
impl HistorySource for ChatLog {
    async fn fetch_page(&self, chat_id: i64, limit: usize, offset: usize) -> Result<Vec<ChatMessage>, HistoryError> {
        let chats = self.chats.lock().await;
        let page = chats
            .get(&chat_id)
            .map(|log| log.iter().rev().skip(offset).take(limit).cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        Ok(page)
    }
}
