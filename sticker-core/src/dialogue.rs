//! Inputs to and outputs of the dialogue state machine.

use crate::api::ResolutionFailure;
use crate::types::{
    ChosenRef, ChunkResult, CollectionKind, SelectionMode, SourceCollection, TagCollectionMode,
};

/// Slash commands understood by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Cancel,
    Done,
    TagMode(TagCollectionMode),
    TagDone,
}

impl Command {
    /// Parse `/name` or `/name@botname`, ignoring any trailing arguments.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim().strip_prefix('/')?.split_whitespace().next()?;
        let name = word.split('@').next().unwrap_or(word);
        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "cancel" => Some(Self::Cancel),
            "done" => Some(Self::Done),
            "tag_mode" | "tag_mode_items" | "emoji" => {
                Some(Self::TagMode(TagCollectionMode::Items))
            }
            "tag_mode_full" => Some(Self::TagMode(TagCollectionMode::FullSets)),
            "tag_done" | "emoji_done" => Some(Self::TagDone),
            _ => None,
        }
    }
}

/// Inline button payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Page(usize),
    Mode(SelectionMode),
}

impl Callback {
    pub fn encode(&self) -> String {
        match self {
            Self::Page(page) => format!("page:{page}"),
            Self::Mode(mode) => format!("mode:{}", mode.as_str()),
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        let (kind, value) = data.split_once(':')?;
        match kind {
            "page" => value.parse().ok().map(Self::Page),
            "mode" => SelectionMode::parse(value).map(Self::Mode),
            _ => None,
        }
    }
}

/// An inline button attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub callback: Callback,
}

impl Button {
    pub fn new(label: impl Into<String>, callback: Callback) -> Self {
        Self {
            label: label.into(),
            callback,
        }
    }
}

/// A text message for the user, optionally with button rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub buttons: Vec<Vec<Button>>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }
}

/// Everything that can advance a session.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Command(Command),
    /// A text message, with any tag ids (custom emoji) referenced inline
    Text { text: String, tag_ids: Vec<String> },
    /// A forwarded item, with the collection it belongs to if known
    Forwarded { collection_id: Option<String> },
    Callback(Callback),
    SourcesResolved {
        collections: Vec<SourceCollection>,
        failures: Vec<ResolutionFailure>,
    },
    TagsResolved {
        collection: SourceCollection,
        failures: Vec<ResolutionFailure>,
    },
    CreationFinished { results: Vec<ChunkResult> },
    CreationAborted { reason: String },
}

impl Event {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            tag_ids: Vec::new(),
        }
    }
}

/// Everything needed to plan and execute creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationRequest {
    pub collections: Vec<SourceCollection>,
    pub refs: Vec<ChosenRef>,
    pub title: String,
    pub raw_short_name: String,
    pub kind: CollectionKind,
}

/// Work requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Reply(Reply),
    ResolveSources { inputs: Vec<String> },
    ResolveTags { tag_ids: Vec<String>, mode: TagCollectionMode },
    Create(CreationRequest),
}
