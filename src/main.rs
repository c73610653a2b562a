use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use qwen_partner::config::Config;
use qwen_partner::dispatcher::{BotContext, Command, Invocation};
use qwen_partner::history::{ChatLog, HistoryCollector};
use qwen_partner::inference::InferenceClient;
use qwen_partner::telegram::{to_chat_message, TelegramClient};
use qwen_partner::telegram_log;

struct BotState {
    context: BotContext,
    chat_log: Arc<ChatLog>,
    bot_username: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_token);

    // Setup logging
    std::fs::create_dir_all(&config.log_dir)?;
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_dir.join("qwen-partner.log"))?;
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        );

    if let Some(log_chat_id) = config.log_chat_id {
        let tg_layer = telegram_log::TelegramLogLayer::new(bot.clone(), log_chat_id);
        registry.with(tg_layer).init();
    } else {
        registry.init();
    }

    info!("🚀 Starting qwen-partner...");
    info!("Inference endpoint: {}", config.hf_api_url);

    let me = match bot.get_me().await {
        Ok(me) => me,
        Err(e) => {
            error!("Failed to get bot info: {e}");
            return Err(e.into());
        }
    };
    info!("Bot user ID: {}, username: @{}", me.id, me.username());

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register command list: {e}");
    }

    let chat_log = Arc::new(ChatLog::new(config.chat_log_capacity));
    let telegram = Arc::new(TelegramClient::new(bot.clone(), me.id));
    let inference = Arc::new(InferenceClient::new(config.hf_api_url.clone(), config.hf_token.clone())?);
    let context = BotContext::new(telegram, inference, HistoryCollector::new(chat_log.clone()));

    let state = Arc::new(BotState {
        context,
        chat_log,
        bot_username: me.username().to_string(),
    });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_new_message))
        .branch(Update::filter_edited_message().endpoint(handle_edited_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_new_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    if let Some(chat_msg) = to_chat_message(&msg) {
        state.chat_log.record(msg.chat.id.0, chat_msg).await;
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };

    let Ok(command) = Command::parse(text, &state.bot_username) else {
        return Ok(());
    };

    let username = msg
        .from
        .as_ref()
        .map(|u| u.username.as_deref().unwrap_or(&u.first_name))
        .unwrap_or("unknown");
    info!("📨 {:?} from {} in chat {}", command, username, msg.chat.id);

    let invocation = Invocation {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0 as i64,
        is_private: msg.chat.is_private(),
    };

    if let Err(e) = state.context.handle(command, &invocation).await {
        warn!("Command failed in chat {}: {e}", msg.chat.id);
    }

    Ok(())
}

async fn handle_edited_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    if let Some(text) = msg.text() {
        state.chat_log.edit(msg.chat.id.0, msg.id.0 as i64, text).await;
    }
    Ok(())
}
