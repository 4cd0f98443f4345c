//! Sticker Bot - Telegram front end for merging sticker sets.
//!
//! ## Architecture
//!
//! ```text
//! getUpdates → Bot::dispatch → per-user worker → Conversation
//!                                    ↓                ↓
//! User ←── sendMessage ←── reply sender       TelegramClient (StickerApi)
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod bot;
pub mod telegram;

pub use bot::Bot;
pub use telegram::TelegramClient;

use std::sync::Arc;
use sticker_common::config::Config;

/// Build the client from configuration and run the update loop until shutdown.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let client = Arc::new(TelegramClient::from_config(&config.telegram)?);

    match client.get_me().await {
        Ok(me) => tracing::info!(
            bot_id = me.id,
            username = me.username.as_deref().unwrap_or("unknown"),
            "Connected to Telegram"
        ),
        Err(e) => tracing::warn!(error = %e, "getMe failed, continuing; the owner handle will be retried on first use"),
    }

    Bot::new(client, config).run().await
}
