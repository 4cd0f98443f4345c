//! Telegram Bot API client.
//!
//! [`TelegramClient`] implements [`StickerApi`] on top of the sticker methods
//! of the Bot API and also carries the chat methods the bot needs (long
//! polling, messages, inline keyboards, callback answers).

pub mod types;
pub mod update;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use std::time::Duration;
use sticker_common::config::TelegramConfig;
use sticker_common::util::split_message;
use sticker_core::{
    ApiError, ApiResult, Button, CollectionKind, Format, NewCollection, Reply, SourceCollection,
    StickerApi, TaggedContent, UploadedItem, UserId,
};
use types::{BotUser, Envelope, File, Sticker, StickerSet};

/// Telegram rejects messages longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Emoji attached to stickers whose source carried none.
const DEFAULT_EMOJI: &str = "🙂";

/// Extra time the HTTP request gets on top of the long-poll timeout.
const POLL_GRACE_SECS: u64 = 10;

pub struct TelegramClient {
    bot_token: String,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(bot_token: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &TelegramConfig) -> anyhow::Result<Self> {
        let token = config
            .bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("telegram.bot_token is not set"))?;
        Ok(Self::new(token, config.api_base.as_str()))
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{file_path}", self.api_base, self.bot_token)
    }

    /// Call a JSON method and unwrap the response envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> ApiResult<T> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Connection(format!("{method}: {e}")))?;
        decode(method, resp).await
    }

    async fn call_multipart<T: DeserializeOwned>(&self, method: &str, form: Form) -> ApiResult<T> {
        let resp = self
            .client
            .post(self.api_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Connection(format!("{method}: {e}")))?;
        decode(method, resp).await
    }

    pub async fn get_me(&self) -> ApiResult<BotUser> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> anyhow::Result<Vec<serde_json::Value>> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"]
        });

        let resp = self
            .client
            .post(self.api_url("getUpdates"))
            .timeout(Duration::from_secs(timeout_secs + POLL_GRACE_SECS))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let err = resp.text().await?;
            anyhow::bail!("Telegram getUpdates failed: {err}");
        }

        let data: serde_json::Value = resp.json().await?;
        Ok(data
            .get("result")
            .and_then(serde_json::Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// Send plain text, split into as many messages as needed.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        for chunk in split_message(text, MAX_MESSAGE_CHARS) {
            self.send_single_chunk(chat_id, &chunk, None).await?;
        }
        Ok(())
    }

    /// Send text with inline keyboard rows under the last message part.
    pub async fn send_with_inline_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        buttons: &[Vec<Button>],
    ) -> anyhow::Result<()> {
        let keyboard = inline_keyboard(buttons);
        let chunks = split_message(text, MAX_MESSAGE_CHARS);
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.iter().enumerate() {
            let markup = (i == last).then_some(&keyboard);
            self.send_single_chunk(chat_id, chunk, markup).await?;
        }
        Ok(())
    }

    pub async fn send_reply(&self, chat_id: i64, reply: &Reply) -> anyhow::Result<()> {
        if reply.buttons.is_empty() {
            self.send_message(chat_id, &reply.text).await
        } else {
            self.send_with_inline_keyboard(chat_id, &reply.text, &reply.buttons)
                .await
        }
    }

    async fn send_single_chunk(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<&serde_json::Value>,
    ) -> anyhow::Result<()> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(markup) = reply_markup {
            body["reply_markup"] = markup.clone();
        }

        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let err = resp.text().await?;
            anyhow::bail!("Telegram sendMessage failed: {err}");
        }
        Ok(())
    }

    /// Acknowledge an inline button press.
    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut body = serde_json::json!({ "callback_query_id": callback_query_id });
        if let Some(t) = text {
            body["text"] = serde_json::Value::String(t.to_string());
        }

        let resp = self
            .client
            .post(self.api_url("answerCallbackQuery"))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let err = resp.text().await?;
            anyhow::bail!("Telegram answerCallbackQuery failed: {err}");
        }
        Ok(())
    }
}

/// Unwrap a Bot API envelope, mapping failures onto [`ApiError`].
async fn decode<T: DeserializeOwned>(method: &str, resp: reqwest::Response) -> ApiResult<T> {
    let status = resp.status();
    let envelope: Envelope<T> = resp
        .json()
        .await
        .map_err(|e| ApiError::InvalidResponse(format!("{method} ({status}): {e}")))?;

    if envelope.ok {
        return envelope
            .result
            .ok_or_else(|| ApiError::InvalidResponse(format!("{method}: missing result")));
    }

    let code = envelope.error_code.unwrap_or_else(|| status.as_u16());
    let description = envelope
        .description
        .unwrap_or_else(|| format!("{method} failed with status {code}"));
    let retry_after = envelope.parameters.and_then(|p| p.retry_after);
    Err(classify_error(code, description, retry_after))
}

pub(crate) fn classify_error(code: u16, description: String, retry_after: Option<u64>) -> ApiError {
    if code == 429 {
        return ApiError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(1),
        };
    }
    if code == 404 || description.contains("STICKERSET_INVALID") {
        return ApiError::NotFound(description);
    }
    ApiError::Rejected(description)
}

fn inline_keyboard(buttons: &[Vec<Button>]) -> serde_json::Value {
    let rows: Vec<Vec<serde_json::Value>> = buttons
        .iter()
        .map(|row| {
            row.iter()
                .map(|btn| {
                    serde_json::json!({
                        "text": btn.label,
                        "callback_data": btn.callback.encode()
                    })
                })
                .collect()
        })
        .collect();
    serde_json::json!({ "inline_keyboard": rows })
}

fn input_sticker(item: &UploadedItem) -> serde_json::Value {
    serde_json::json!({
        "sticker": item.content_id,
        "format": item.format.as_str(),
        "emoji_list": [item.tag.as_deref().unwrap_or(DEFAULT_EMOJI)]
    })
}

const fn upload_file_name(format: Format) -> &'static str {
    match format {
        Format::Static => "sticker.webp",
        Format::Animated => "sticker.tgs",
        Format::Video => "sticker.webm",
    }
}

const fn sticker_type(kind: CollectionKind) -> &'static str {
    match kind {
        CollectionKind::Regular => "regular",
        CollectionKind::CustomEmoji => "custom_emoji",
    }
}

#[async_trait]
impl StickerApi for TelegramClient {
    async fn fetch_collection(&self, identifier: &str) -> ApiResult<SourceCollection> {
        let set: StickerSet = self
            .call("getStickerSet", &serde_json::json!({ "name": identifier }))
            .await?;
        tracing::debug!(name = %set.name, stickers = set.stickers.len(), "Sticker set fetched");
        Ok(set.into())
    }

    async fn resolve_tag_content(&self, tag_id: &str) -> ApiResult<TaggedContent> {
        let stickers: Vec<Sticker> = self
            .call(
                "getCustomEmojiStickers",
                &serde_json::json!({ "custom_emoji_ids": [tag_id] }),
            )
            .await?;
        let sticker = stickers
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound(format!("custom emoji {tag_id}")))?;
        let collection_id = sticker.set_name.clone();
        Ok(TaggedContent {
            item: sticker.into_item(0),
            collection_id,
        })
    }

    async fn download_content(&self, content_id: &str) -> ApiResult<Vec<u8>> {
        let file: File = self
            .call("getFile", &serde_json::json!({ "file_id": content_id }))
            .await?;
        let file_path = file.file_path.ok_or_else(|| {
            ApiError::InvalidResponse(format!("getFile: no file_path for {}", file.file_id))
        })?;

        let resp = self
            .client
            .get(self.file_url(&file_path))
            .send()
            .await
            .map_err(|e| ApiError::Connection(format!("download: {e}")))?;

        if !resp.status().is_success() {
            return Err(ApiError::Rejected(format!(
                "download of {file_path} failed: {}",
                resp.status()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ApiError::Connection(format!("download: {e}")))?;
        Ok(bytes.to_vec())
    }

    async fn upload_content(
        &self,
        owner: UserId,
        bytes: Vec<u8>,
        format: Format,
    ) -> ApiResult<String> {
        let part = Part::bytes(bytes).file_name(upload_file_name(format));
        let form = Form::new()
            .text("user_id", owner.to_string())
            .text("sticker_format", format.as_str())
            .part("sticker", part);

        let file: File = self.call_multipart("uploadStickerFile", form).await?;
        Ok(file.file_id)
    }

    async fn create_collection(&self, owner: UserId, collection: &NewCollection) -> ApiResult<()> {
        let body = serde_json::json!({
            "user_id": owner,
            "name": collection.short_name,
            "title": collection.title,
            "sticker_type": sticker_type(collection.kind),
            "stickers": [input_sticker(&collection.first)]
        });
        let _: bool = self.call("createNewStickerSet", &body).await?;
        tracing::info!(
            user_id = owner,
            short_name = %collection.short_name,
            kind = sticker_type(collection.kind),
            "Sticker set created"
        );
        Ok(())
    }

    async fn append_item(
        &self,
        owner: UserId,
        short_name: &str,
        item: &UploadedItem,
    ) -> ApiResult<()> {
        let body = serde_json::json!({
            "user_id": owner,
            "name": short_name,
            "sticker": input_sticker(item)
        });
        let _: bool = self.call("addStickerToSet", &body).await?;
        Ok(())
    }

    async fn resolve_owner_handle(&self) -> ApiResult<String> {
        let me = self.get_me().await?;
        me.username
            .ok_or_else(|| ApiError::InvalidResponse(format!("getMe: bot {} has no username", me.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sticker_core::Callback;
    use sticker_core::SelectionMode;

    #[test]
    fn api_url_includes_token() {
        let client = TelegramClient::new("123:ABC", "https://api.telegram.org/");
        assert_eq!(
            client.api_url("getMe"),
            "https://api.telegram.org/bot123:ABC/getMe"
        );
        assert_eq!(
            client.file_url("stickers/file_1.webp"),
            "https://api.telegram.org/file/bot123:ABC/stickers/file_1.webp"
        );
    }

    #[test]
    fn from_config_requires_token() {
        let config = TelegramConfig::default();
        assert!(TelegramClient::from_config(&config).is_err());

        let config = TelegramConfig {
            bot_token: Some("t".into()),
            ..TelegramConfig::default()
        };
        assert!(TelegramClient::from_config(&config).is_ok());
    }

    #[test]
    fn classifies_bot_api_errors() {
        assert_eq!(
            classify_error(429, "Too Many Requests".into(), Some(7)),
            ApiError::RateLimited { retry_after_secs: 7 }
        );
        assert_eq!(
            classify_error(400, "Bad Request: STICKERSET_INVALID".into(), None),
            ApiError::NotFound("Bad Request: STICKERSET_INVALID".into())
        );
        assert_eq!(
            classify_error(400, "Bad Request: sticker set name is already occupied".into(), None),
            ApiError::Rejected("Bad Request: sticker set name is already occupied".into())
        );
    }

    #[test]
    fn input_sticker_defaults_emoji() {
        let item = UploadedItem {
            content_id: "abc".into(),
            tag: None,
            format: Format::Video,
        };
        assert_eq!(
            input_sticker(&item),
            serde_json::json!({"sticker": "abc", "format": "video", "emoji_list": ["🙂"]})
        );
    }

    #[test]
    fn keyboard_encodes_callbacks() {
        let keyboard = inline_keyboard(&[vec![
            Button::new("▶️", Callback::Page(2)),
            Button::new("Select by emoji", Callback::Mode(SelectionMode::Tags)),
        ]]);
        assert_eq!(
            keyboard,
            serde_json::json!({"inline_keyboard": [[
                {"text": "▶️", "callback_data": "page:2"},
                {"text": "Select by emoji", "callback_data": "mode:tags"}
            ]]})
        );
    }
}
