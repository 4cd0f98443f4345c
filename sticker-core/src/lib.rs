//! Sticker Core - Platform-independent logic for merging sticker sets.
//!
//! This crate provides:
//! - Source identifier normalization and selection parsing
//! - Chunk planning and sequential chunk execution
//! - The per-user dialogue state machine and its effect driver
//! - The [`StickerApi`] seam that platform adapters implement

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod api;
pub mod conversation;
pub mod dialogue;
pub mod executor;
pub mod naming;
pub mod normalize;
pub mod planner;
pub mod prompts;
pub mod selection;
pub mod session;
pub mod settings;
pub mod summary;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod types;

pub use api::{
    ApiError, ApiResult, NewCollection, OwnerHandle, ResolutionFailure, StickerApi, TaggedContent,
    UploadedItem, UserId,
};
pub use conversation::Conversation;
pub use dialogue::{Button, Callback, Command, Effect, Event, Reply};
pub use session::{transition, SessionState, Stage};
pub use settings::MergeSettings;
pub use types::{
    ChosenRef, ChunkPlan, ChunkResult, CollectionKind, Format, Item, SelectionMode, SkippedItem,
    SourceCollection, TagCollectionMode,
};
