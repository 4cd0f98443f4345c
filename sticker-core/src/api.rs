//! Remote content API consumed by the merge flow.
//!
//! Implement [`StickerApi`] to back the dialogue with a real platform; tests
//! use an in-memory fake.

use crate::types::{CollectionKind, Format, Item, SourceCollection};
use async_trait::async_trait;
use tokio::sync::OnceCell;

/// Platform user id that owns created collections.
pub type UserId = i64;

/// Result type for remote API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Remote API error. The display text is shown to users as a skip reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Rejected(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("rate limited: retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// An input that could not be resolved, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionFailure {
    pub input: String,
    pub error: ApiError,
}

/// An item referenced by a tag id, together with the collection it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedContent {
    pub item: Item,
    /// Identifier of the owning collection, when the platform exposes it
    pub collection_id: Option<String>,
}

/// Content uploaded and ready to be placed into a destination collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedItem {
    pub content_id: String,
    pub tag: Option<String>,
    pub format: Format,
}

/// Parameters for creating a destination collection with its first item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCollection {
    pub short_name: String,
    pub title: String,
    pub format: Format,
    pub kind: CollectionKind,
    pub first: UploadedItem,
}

/// Remote operations the merge flow depends on.
#[async_trait]
pub trait StickerApi: Send + Sync {
    /// Fetch a whole collection by identifier.
    async fn fetch_collection(&self, identifier: &str) -> ApiResult<SourceCollection>;

    /// Resolve a tag id (custom emoji id) to the item it refers to.
    async fn resolve_tag_content(&self, tag_id: &str) -> ApiResult<TaggedContent>;

    /// Download the binary content of an item.
    async fn download_content(&self, content_id: &str) -> ApiResult<Vec<u8>>;

    /// Upload binary content so it can be placed into a destination collection.
    async fn upload_content(&self, owner: UserId, bytes: Vec<u8>, format: Format)
        -> ApiResult<String>;

    /// Create a destination collection holding a single first item.
    async fn create_collection(&self, owner: UserId, collection: &NewCollection) -> ApiResult<()>;

    /// Append one uploaded item to an existing destination collection.
    async fn append_item(&self, owner: UserId, short_name: &str, item: &UploadedItem)
        -> ApiResult<()>;

    /// Handle used to namespace destination short names (the bot username).
    async fn resolve_owner_handle(&self) -> ApiResult<String>;
}

/// Process-wide memoized owner handle.
///
/// Concurrent first callers share one lookup. A failed lookup is not cached.
#[derive(Debug, Default)]
pub struct OwnerHandle {
    cell: OnceCell<String>,
}

impl OwnerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, api: &dyn StickerApi) -> ApiResult<&str> {
        self.cell
            .get_or_try_init(|| async { api.resolve_owner_handle().await })
            .await
            .map(String::as_str)
    }

    /// The cached handle, if a lookup already succeeded.
    pub fn cached(&self) -> Option<&str> {
        self.cell.get().map(String::as_str)
    }
}
