//! Bot API payloads used by the sticker calls.

use serde::Deserialize;
use sticker_core::{Format, Item, SourceCollection};

/// Every Bot API response is wrapped in this envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<u16>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseParameters {
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sticker {
    pub file_id: String,
    pub emoji: Option<String>,
    #[serde(default)]
    pub is_animated: bool,
    #[serde(default)]
    pub is_video: bool,
    pub set_name: Option<String>,
}

impl Sticker {
    pub fn format(&self) -> Format {
        if self.is_video {
            Format::Video
        } else if self.is_animated {
            Format::Animated
        } else {
            Format::Static
        }
    }

    pub fn into_item(self, source_index: usize) -> Item {
        Item {
            format: self.format(),
            content_id: self.file_id,
            tag: self.emoji,
            source_index,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StickerSet {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub stickers: Vec<Sticker>,
}

impl From<StickerSet> for SourceCollection {
    fn from(set: StickerSet) -> Self {
        Self {
            identifier: set.name,
            title: Some(set.title),
            items: set
                .stickers
                .into_iter()
                .enumerate()
                .map(|(i, sticker)| sticker.into_item(i))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_id: String,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    pub username: Option<String>,
}
