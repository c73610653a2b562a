//! Forwards this crate's warnings and errors to an operator chat.

use teloxide::prelude::*;
use teloxide::types::ChatId;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::telegram::{split_message, MAX_MESSAGE_CHARS};

/// Only events from our own modules are forwarded; teloxide's own warnings
/// about failed sends would otherwise feed back into the channel.
const TARGET_PREFIX: &str = "qwen_partner";

pub struct TelegramLogLayer {
    tx: mpsc::UnboundedSender<String>,
}

impl TelegramLogLayer {
    /// Must be called from inside a tokio runtime.
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                for part in split_message(&text, MAX_MESSAGE_CHARS) {
                    if let Err(e) = bot.send_message(chat_id, part).await {
                        eprintln!("Failed to send log to Telegram: {e}");
                        break;
                    }
                }
            }
        });

        Self { tx }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else if self.message.is_empty() {
            self.message = format!("{} = {:?}", field.name(), value);
        } else {
            self.message
                .push_str(&format!(", {} = {:?}", field.name(), value));
        }
    }
}

/// Text sent for an event, or `None` if it should stay local.
fn forwarded_text(level: Level, target: &str, message: &str) -> Option<String> {
    if !target.starts_with(TARGET_PREFIX) {
        return None;
    }
    match level {
        Level::ERROR => Some(format!("❌ {message}")),
        Level::WARN => Some(format!("⚠️ {message}")),
        _ => None,
    }
}

impl<S: Subscriber> Layer<S> for TelegramLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() > Level::WARN {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        if let Some(text) = forwarded_text(*metadata.level(), metadata.target(), &visitor.message)
            && self.tx.send(text).is_err()
        {
            eprintln!("Log channel closed, message dropped");
        }
    }
}
