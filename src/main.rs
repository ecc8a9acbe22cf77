use std::env;
use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use craftpost::bot::{self, AppDeps};
use craftpost::gemini::GeminiClient;
use craftpost::localization::init_localization;
use craftpost::session::{ChatHistoryStore, SessionStore};
use craftpost::storage::MediaStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting CraftPost Telegram Bot");

    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Load user-facing message bundles
    init_localization()?;

    // Get bot token from environment
    let bot_token = env::var("TELEGRAM_BOT_TOKEN").expect("TELEGRAM_BOT_TOKEN must be set");
    let bot_username = env::var("BOT_USERNAME").ok();

    let media_root = env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string());
    info!("Storing media under: {}", media_root);

    let deps = Arc::new(AppDeps {
        sessions: SessionStore::new(),
        histories: ChatHistoryStore::new(),
        gemini: GeminiClient::from_env()?,
        media: MediaStore::new(media_root),
        bot_username,
    });

    // Initialize the bot
    let bot = Bot::new(bot_token);

    info!("Bot initialized, starting dispatcher");

    // Set up the dispatcher with shared state
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint({
            let deps = Arc::clone(&deps);
            move |bot: Bot, msg: Message| {
                let deps = Arc::clone(&deps);
                async move { bot::message_handler(bot, msg, deps).await }
            }
        }))
        .branch(Update::filter_callback_query().endpoint({
            let deps = Arc::clone(&deps);
            move |bot: Bot, q: CallbackQuery| {
                let deps = Arc::clone(&deps);
                async move { bot::callback_handler(bot, q, deps).await }
            }
        }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
