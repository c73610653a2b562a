//! Paginated collection of chat history into prompt context.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::history::HistorySource;

/// Messages collected for `/analyze`.
pub const DEFAULT_HISTORY_LIMIT: usize = 500;

const PAGE_SIZE: usize = 100;

/// Pause between page fetches to stay under platform rate limits.
const PAGE_DELAY: Duration = Duration::from_millis(500);

pub struct HistoryCollector {
    source: Arc<dyn HistorySource>,
    page_size: usize,
    page_delay: Duration,
}

impl HistoryCollector {
    pub fn new(source: Arc<dyn HistorySource>) -> Self {
        Self {
            source,
            page_size: PAGE_SIZE,
            page_delay: PAGE_DELAY,
        }
    }

    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// Collect up to `limit` human text messages and return them oldest first,
    /// one `[author]: text` line each.
    ///
    /// Source errors end pagination early; whatever was collected so far is
    /// still returned.
    pub async fn collect(&self, chat_id: i64, limit: usize) -> String {
        // Newest first, as pages arrive.
        let mut lines: Vec<String> = Vec::new();
        let mut offset = 0;

        while lines.len() < limit {
            let page = match self.source.fetch_page(chat_id, self.page_size, offset).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("Failed to read history for chat {} at offset {}: {e}", chat_id, offset);
                    break;
                }
            };
            if page.is_empty() {
                break;
            }

            for msg in &page {
                if let Some(line) = msg.history_line() {
                    lines.push(line);
                    if lines.len() >= limit {
                        break;
                    }
                }
            }

            offset += self.page_size;
            if lines.len() < limit {
                sleep(self.page_delay).await;
            }
        }

        info!("📜 Collected {} history lines from chat {}", lines.len(), chat_id);

        let start = lines.len().saturating_sub(limit);
        lines[start..]
            .iter()
            .rev()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{ChatMessage, HistoryError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Serves pre-built pages, newest page first.
    struct PagedSource {
        pages: Vec<Result<Vec<ChatMessage>, String>>,
        requests: Mutex<Vec<(usize, usize)>>,
    }

    impl PagedSource {
        fn new(pages: Vec<Result<Vec<ChatMessage>, String>>) -> Arc<Self> {
            Arc::new(Self {
                pages,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<(usize, usize)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HistorySource for PagedSource {
        async fn fetch_page(&self, _chat_id: i64, limit: usize, offset: usize) -> Result<Vec<ChatMessage>, HistoryError> {
            self.requests.lock().unwrap().push((limit, offset));
            match self.pages.get(offset / limit) {
                Some(Ok(page)) => Ok(page.clone()),
                Some(Err(e)) => Err(HistoryError::Platform(e.clone())),
                None => Ok(vec![]),
            }
        }
    }

    fn human(author: &str, text: &str) -> ChatMessage {
        ChatMessage {
            message_id: 0,
            author: author.to_string(),
            text: Some(text.to_string()),
            is_bot: false,
        }
    }

    fn bot(text: &str) -> ChatMessage {
        ChatMessage {
            message_id: 0,
            author: "SomeBot".to_string(),
            text: Some(text.to_string()),
            is_bot: true,
        }
    }

    fn sticker(author: &str) -> ChatMessage {
        ChatMessage {
            message_id: 0,
            author: author.to_string(),
            text: None,
            is_bot: false,
        }
    }

    fn collector(source: Arc<PagedSource>) -> HistoryCollector {
        HistoryCollector::new(source).with_page_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_empty_history() {
        let source = PagedSource::new(vec![]);
        assert_eq!(collector(source.clone()).collect(-1, 500).await, "");
        assert_eq!(source.requests(), vec![(100, 0)]);
    }

    #[tokio::test]
    async fn test_oldest_first_across_pages() {
        // Page 0 holds the newest messages.
        let source = PagedSource::new(vec![
            Ok(vec![human("C", "third"), human("B", "second")]),
            Ok(vec![human("A", "first")]),
        ]);
        let text = collector(source).collect(-1, 500).await;
        assert_eq!(text, "[A]: first\n[B]: second\n[C]: third");
    }

    #[tokio::test]
    async fn test_filters_bots_and_non_text() {
        let source = PagedSource::new(vec![Ok(vec![
            human("Alice", "dice or cards?"),
            bot("I am a bot"),
            sticker("Bob"),
            human("Bob", "cards"),
        ])]);
        let text = collector(source).collect(-1, 500).await;
        assert_eq!(text, "[Bob]: cards\n[Alice]: dice or cards?");
        assert!(!text.contains("SomeBot"));
    }

    #[tokio::test]
    async fn test_limit_stops_mid_page() {
        let page: Vec<ChatMessage> = (0..100).map(|i| human("U", &format!("m{i}"))).collect();
        let source = PagedSource::new(vec![Ok(page.clone()), Ok(page)]);
        let text = collector(source.clone()).collect(-1, 3).await;

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["[U]: m2", "[U]: m1", "[U]: m0"]);
        // Limit reached on the first page, no second fetch.
        assert_eq!(source.requests(), vec![(100, 0)]);
    }

    #[tokio::test]
    async fn test_never_exceeds_limit() {
        let pages = (0..6)
            .map(|p| Ok((0..100).map(|i| human("U", &format!("p{p}m{i}"))).collect()))
            .collect();
        let source = PagedSource::new(pages);
        let text = collector(source.clone()).collect(-1, 250).await;

        assert_eq!(text.lines().count(), 250);
        assert_eq!(source.requests(), vec![(100, 0), (100, 100), (100, 200)]);
        // Oldest kept line is the 50th message of the third page.
        assert_eq!(text.lines().next(), Some("[U]: p2m49"));
        assert_eq!(text.lines().last(), Some("[U]: p0m0"));
    }

    #[tokio::test]
    async fn test_stops_on_empty_page_with_partial_result() {
        let source = PagedSource::new(vec![
            Ok(vec![human("A", "one"), bot("noise")]),
            Ok(vec![human("B", "two"), human("C", "three")]),
            Ok(vec![]),
        ]);
        let text = collector(source.clone()).collect(-1, 10).await;

        assert_eq!(text, "[C]: three\n[B]: two\n[A]: one");
        assert_eq!(source.requests(), vec![(100, 0), (100, 100), (100, 200)]);
    }

    #[tokio::test]
    async fn test_error_keeps_partial_result() {
        let source = PagedSource::new(vec![
            Ok(vec![human("A", "kept")]),
            Err("Forbidden: bot is not a member".to_string()),
            Ok(vec![human("B", "never read")]),
        ]);
        let text = collector(source.clone()).collect(-1, 10).await;

        assert_eq!(text, "[A]: kept");
        assert_eq!(source.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_limit_fetches_nothing() {
        let source = PagedSource::new(vec![Ok(vec![human("A", "x")])]);
        assert_eq!(collector(source.clone()).collect(-1, 0).await, "");
        assert!(source.requests().is_empty());
    }
}
