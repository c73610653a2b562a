//! Bot commands and the flows behind them.

use std::sync::Arc;

use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use crate::history::{HistoryCollector, DEFAULT_HISTORY_LIMIT};
use crate::inference::{Inference, InferenceError, DEFAULT_MAX_NEW_TOKENS};
use crate::telegram::{split_message, tail_chars, truncate_chars, ChatPlatform, PlatformError, MAX_MESSAGE_CHARS};

/// Token budget for `/analyze`.
pub const ANALYSIS_MAX_NEW_TOKENS: u32 = 1500;

/// Chat history chars embedded in the analysis prompt (model context window).
const MAX_PROMPT_HISTORY_CHARS: usize = 8000;

/// Error text shown to users is cut to this many chars.
const MAX_ERROR_CHARS: usize = 300;

pub const HELP_TEXT: &str = "🧠 I'm a Qwen partner for game development!\n\n\
Commands:\n\
/analyze - analyze this chat and write up the board game being discussed\n\
/ask <question> - ask the model directly";

pub const ASK_USAGE: &str = "💬 Usage: /ask How do I implement the Observer pattern?";
pub const GROUP_ONLY: &str = "❌ This command has to be used in a group where I'm an admin!";
pub const NOT_ADMIN: &str = "⚠️ I must be an administrator to read the chat history!";
pub const PERMISSION_CHECK_FAILED: &str = "⚠️ Couldn't check my permissions. Make me an admin!";

const THINKING: &str = "🧠 Thinking...";
const DONE: &str = "✅ Done!";
const COLLECTING: &str = "🔍 Collecting chat history (last 500 messages)...";
const NO_HISTORY: &str = "📭 There are no messages in this chat to analyze.";
const ANALYZING: &str = "🧠 Analyzing the board game discussion... (Qwen-32B, ~30 sec)";
const ANALYSIS_DONE: &str = "✅ Analysis complete!";
const EMPTY_ANSWER: &str = "🤷 The model returned an empty answer.";

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Show help")]
    Start,
    #[command(description = "Ask the model directly: /ask <question>")]
    Ask(String),
    #[command(description = "Analyze this group's board game discussion")]
    Analyze,
}

/// Where a command came from.
#[derive(Debug, Clone, Copy)]
pub struct Invocation {
    pub chat_id: i64,
    /// The command message, replies are attached to it.
    pub message_id: i64,
    pub is_private: bool,
}

#[derive(Debug)]
pub enum CommandError {
    Inference(InferenceError),
    Platform(PlatformError),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Inference(e) => write!(f, "inference failed: {e}"),
            CommandError::Platform(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<InferenceError> for CommandError {
    fn from(e: InferenceError) -> Self {
        CommandError::Inference(e)
    }
}

impl From<PlatformError> for CommandError {
    fn from(e: PlatformError) -> Self {
        CommandError::Platform(e)
    }
}

/// Everything a command needs, built once at startup.
pub struct BotContext {
    platform: Arc<dyn ChatPlatform>,
    inference: Arc<dyn Inference>,
    history: HistoryCollector,
}

impl BotContext {
    pub fn new(platform: Arc<dyn ChatPlatform>, inference: Arc<dyn Inference>, history: HistoryCollector) -> Self {
        Self {
            platform,
            inference,
            history,
        }
    }

    pub async fn handle(&self, command: Command, inv: &Invocation) -> Result<(), CommandError> {
        match command {
            Command::Start => self.start(inv).await,
            Command::Ask(question) => self.ask(inv, question.trim()).await,
            Command::Analyze => self.analyze(inv).await,
        }
    }

    async fn start(&self, inv: &Invocation) -> Result<(), CommandError> {
        self.platform.reply(inv.chat_id, inv.message_id, HELP_TEXT).await?;
        Ok(())
    }

    async fn ask(&self, inv: &Invocation, question: &str) -> Result<(), CommandError> {
        if question.is_empty() {
            self.platform.reply(inv.chat_id, inv.message_id, ASK_USAGE).await?;
            return Ok(());
        }

        let placeholder = self.platform.reply(inv.chat_id, inv.message_id, THINKING).await?;

        match self.inference.ask(question, DEFAULT_MAX_NEW_TOKENS).await {
            Ok(answer) => {
                self.platform.edit(inv.chat_id, placeholder, DONE).await?;
                self.send_chunked(inv, &answer).await
            }
            Err(e) => {
                warn!("Inference failed for /ask in chat {}: {e}", inv.chat_id);
                let text = format!("❌ Model error: {}", truncate_chars(&e.to_string(), MAX_ERROR_CHARS));
                self.platform.edit(inv.chat_id, placeholder, &text).await?;
                Ok(())
            }
        }
    }

    async fn analyze(&self, inv: &Invocation) -> Result<(), CommandError> {
        if inv.is_private {
            self.platform.reply(inv.chat_id, inv.message_id, GROUP_ONLY).await?;
            return Ok(());
        }

        match self.platform.bot_status(inv.chat_id).await {
            Ok(status) if status.can_read_history() => {}
            Ok(status) => {
                info!("Refusing /analyze in chat {}: bot is {:?}", inv.chat_id, status);
                self.platform.reply(inv.chat_id, inv.message_id, NOT_ADMIN).await?;
                return Ok(());
            }
            Err(e) => {
                warn!("Permission check failed in chat {}: {e}", inv.chat_id);
                self.platform.reply(inv.chat_id, inv.message_id, PERMISSION_CHECK_FAILED).await?;
                return Ok(());
            }
        }

        let placeholder = self.platform.reply(inv.chat_id, inv.message_id, COLLECTING).await?;

        if let Err(e) = self.run_analysis(inv, placeholder).await {
            warn!("Analysis failed in chat {}: {e}", inv.chat_id);
            let text = format!("💥 Analysis failed: {}", truncate_chars(&e.to_string(), MAX_ERROR_CHARS));
            self.platform.edit(inv.chat_id, placeholder, &text).await?;
        }
        Ok(())
    }

    async fn run_analysis(&self, inv: &Invocation, placeholder: i64) -> Result<(), CommandError> {
        let history = self.history.collect(inv.chat_id, DEFAULT_HISTORY_LIMIT).await;
        if history.trim().is_empty() {
            self.platform.edit(inv.chat_id, placeholder, NO_HISTORY).await?;
            return Ok(());
        }

        self.platform.edit(inv.chat_id, placeholder, ANALYZING).await?;

        let prompt = analysis_prompt(&history);
        let analysis = self.inference.ask(&prompt, ANALYSIS_MAX_NEW_TOKENS).await?;

        self.platform.edit(inv.chat_id, placeholder, ANALYSIS_DONE).await?;
        self.send_chunked(inv, &analysis).await
    }

    async fn send_chunked(&self, inv: &Invocation, text: &str) -> Result<(), CommandError> {
        let parts = split_message(text, MAX_MESSAGE_CHARS);
        if parts.is_empty() {
            self.platform.reply(inv.chat_id, inv.message_id, EMPTY_ANSWER).await?;
            return Ok(());
        }
        for part in &parts {
            self.platform.reply(inv.chat_id, inv.message_id, part).await?;
        }
        Ok(())
    }
}

/// Board game write-up prompt over the most recent part of the history.
pub fn analysis_prompt(history: &str) -> String {
    format!(
        "You are a board game design expert. Based on the following chat between developers, \
write a structured description of the board game they are working on. Include:\n\
- Title (invent one if none is given)\n\
- Goal of the game\n\
- Core rules\n\
- Mechanics (turn order, resources, victory conditions, etc.)\n\
- Design highlights\n\n\
Chat:\n{}",
        tail_chars(history, MAX_PROMPT_HISTORY_CHARS)
    )
}
