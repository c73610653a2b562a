//! Telegram bot that relays questions and chat history to a hosted Qwen model.

pub mod config;
pub mod dispatcher;
pub mod health;
pub mod history;
pub mod inference;
pub mod telegram;
pub mod telegram_log;
