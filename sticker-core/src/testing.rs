//! In-memory [`StickerApi`] with scripted failures.
//!
//! Downloads return the content id as bytes and uploads prefix them with
//! `up:`, so destinations can be inspected in terms of source content ids.

use crate::api::{ApiError, ApiResult, NewCollection, StickerApi, TaggedContent, UploadedItem, UserId};
use crate::types::{Format, Item, SourceCollection};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A recorded remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Fetch(String),
    ResolveTag(String),
    Download(String),
    Upload(Format),
    Create { short_name: String, title: String },
    Append { short_name: String, content_id: String },
    OwnerHandle,
}

/// Build a collection of `n` untagged items with content ids `<id>-<i>`.
pub fn collection(id: &str, n: usize, format: Format) -> SourceCollection {
    SourceCollection {
        identifier: id.to_string(),
        title: Some(format!("{id} title")),
        items: (0..n)
            .map(|i| Item {
                content_id: format!("{id}-{i}"),
                tag: None,
                format,
                source_index: i,
            })
            .collect(),
    }
}

/// Build a collection whose items carry the given tags.
pub fn tagged_collection(id: &str, tags: &[&str], format: Format) -> SourceCollection {
    let mut c = collection(id, tags.len(), format);
    for (item, tag) in c.items.iter_mut().zip(tags) {
        item.tag = Some((*tag).to_string());
    }
    c
}

#[derive(Debug, Default)]
pub struct FakeApi {
    collections: HashMap<String, SourceCollection>,
    tags: HashMap<String, TaggedContent>,
    owner_handle: Option<String>,
    failing_downloads: HashSet<String>,
    failing_creates: HashSet<String>,
    failing_appends: HashSet<String>,
    calls: Mutex<Vec<ApiCall>>,
    destinations: Mutex<BTreeMap<String, Vec<String>>>,
    owner_lookups: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, collection: SourceCollection) -> Self {
        self.collections
            .insert(collection.identifier.clone(), collection);
        self
    }

    /// Register a tag id resolving to item `index` of an already added collection.
    pub fn with_tag_in(mut self, tag_id: &str, collection_id: &str, index: usize) -> Self {
        if let Some(item) = self
            .collections
            .get(collection_id)
            .and_then(|c| c.item(index))
            .cloned()
        {
            self.tags.insert(
                tag_id.to_string(),
                TaggedContent {
                    item,
                    collection_id: Some(collection_id.to_string()),
                },
            );
        }
        self
    }

    /// Register a tag id resolving to a standalone item.
    pub fn with_tag(mut self, tag_id: &str, item: Item) -> Self {
        self.tags.insert(
            tag_id.to_string(),
            TaggedContent {
                item,
                collection_id: None,
            },
        );
        self
    }

    /// Drop a collection while keeping the tags registered into it.
    pub fn forget_collection(mut self, identifier: &str) -> Self {
        self.collections.remove(identifier);
        self
    }

    pub fn with_owner(mut self, handle: &str) -> Self {
        self.owner_handle = Some(handle.to_string());
        self
    }

    pub fn fail_download_of(mut self, content_id: &str) -> Self {
        self.failing_downloads.insert(content_id.to_string());
        self
    }

    pub fn fail_create_of(mut self, short_name: &str) -> Self {
        self.failing_creates.insert(short_name.to_string());
        self
    }

    pub fn fail_append_of(mut self, content_id: &str) -> Self {
        self.failing_appends.insert(content_id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Source content ids placed into a destination, in order.
    pub fn destination(&self, short_name: &str) -> Option<Vec<String>> {
        self.destinations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(short_name)
            .cloned()
    }

    pub fn destination_names(&self) -> Vec<String> {
        self.destinations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    pub fn owner_lookups(&self) -> usize {
        self.owner_lookups.load(Ordering::SeqCst)
    }

    fn record(&self, call: ApiCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }
}

fn source_id(uploaded: &str) -> String {
    uploaded.strip_prefix("up:").unwrap_or(uploaded).to_string()
}

#[async_trait]
impl StickerApi for FakeApi {
    async fn fetch_collection(&self, identifier: &str) -> ApiResult<SourceCollection> {
        self.record(ApiCall::Fetch(identifier.to_string()));
        self.collections
            .get(identifier)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("collection {identifier}")))
    }

    async fn resolve_tag_content(&self, tag_id: &str) -> ApiResult<TaggedContent> {
        self.record(ApiCall::ResolveTag(tag_id.to_string()));
        self.tags
            .get(tag_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("tag {tag_id}")))
    }

    async fn download_content(&self, content_id: &str) -> ApiResult<Vec<u8>> {
        self.record(ApiCall::Download(content_id.to_string()));
        if self.failing_downloads.contains(content_id) {
            return Err(ApiError::Connection(format!("download of {content_id} reset")));
        }
        Ok(content_id.as_bytes().to_vec())
    }

    async fn upload_content(
        &self,
        _owner: UserId,
        bytes: Vec<u8>,
        format: Format,
    ) -> ApiResult<String> {
        self.record(ApiCall::Upload(format));
        Ok(format!("up:{}", String::from_utf8_lossy(&bytes)))
    }

    async fn create_collection(&self, _owner: UserId, collection: &NewCollection) -> ApiResult<()> {
        self.record(ApiCall::Create {
            short_name: collection.short_name.clone(),
            title: collection.title.clone(),
        });
        if self.failing_creates.contains(&collection.short_name) {
            return Err(ApiError::Rejected("Bad Request: invalid sticker set name".into()));
        }

        let mut destinations = self.destinations.lock().unwrap_or_else(|e| e.into_inner());
        if destinations.contains_key(&collection.short_name) {
            return Err(ApiError::Rejected(
                "Bad Request: sticker set name is already occupied".into(),
            ));
        }
        destinations.insert(
            collection.short_name.clone(),
            vec![source_id(&collection.first.content_id)],
        );
        Ok(())
    }

    async fn append_item(
        &self,
        _owner: UserId,
        short_name: &str,
        item: &UploadedItem,
    ) -> ApiResult<()> {
        let content_id = source_id(&item.content_id);
        self.record(ApiCall::Append {
            short_name: short_name.to_string(),
            content_id: content_id.clone(),
        });
        if self.failing_appends.contains(&content_id) {
            return Err(ApiError::Rejected("Bad Request: STICKER_PNG_DIMENSIONS".into()));
        }

        let mut destinations = self.destinations.lock().unwrap_or_else(|e| e.into_inner());
        match destinations.get_mut(short_name) {
            Some(items) => {
                items.push(content_id);
                Ok(())
            }
            None => Err(ApiError::NotFound(format!("sticker set {short_name}"))),
        }
    }

    async fn resolve_owner_handle(&self) -> ApiResult<String> {
        self.record(ApiCall::OwnerHandle);
        self.owner_lookups.fetch_add(1, Ordering::SeqCst);
        self.owner_handle
            .clone()
            .ok_or_else(|| ApiError::Connection("getMe timed out".into()))
    }
}
