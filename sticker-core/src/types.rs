//! Data model shared by the parser, planner and executor.

use serde::{Deserialize, Serialize};

/// Binary format of an item. Destination collections must be homogeneous in format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Static,
    Animated,
    Video,
}

impl Format {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Animated => "animated",
            Self::Video => "video",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One content unit inside a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Remote id of the binary content
    pub content_id: String,
    /// Optional tag (usually an emoji)
    pub tag: Option<String>,
    pub format: Format,
    /// Position inside the owning collection
    pub source_index: usize,
}

/// A source collection resolved from user input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCollection {
    pub identifier: String,
    pub title: Option<String>,
    pub items: Vec<Item>,
}

impl SourceCollection {
    pub fn item(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }
}

/// Reference to one chosen item, keyed by owning collection and position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChosenRef {
    pub source_collection_id: String,
    pub index_in_source: usize,
}

impl ChosenRef {
    pub fn new(source_collection_id: impl Into<String>, index_in_source: usize) -> Self {
        Self {
            source_collection_id: source_collection_id.into(),
            index_in_source,
        }
    }
}

/// Look up the item a reference points at.
pub fn resolve_ref<'a>(collections: &'a [SourceCollection], r: &ChosenRef) -> Option<&'a Item> {
    collections
        .iter()
        .find(|c| c.identifier == r.source_collection_id)
        .and_then(|c| c.item(r.index_in_source))
}

/// How a selection utterance is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Numbers and ranges over the flattened list, e.g. `1-5, 7`
    #[default]
    Ranges,
    /// Tag filter, e.g. `:😀,😂`
    Tags,
}

impl SelectionMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ranges => "ranges",
            Self::Tags => "tags",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ranges" => Some(Self::Ranges),
            "tags" => Some(Self::Tags),
            _ => None,
        }
    }
}

/// How collected tag ids expand into creation items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagCollectionMode {
    /// Exactly the referenced items
    #[default]
    Items,
    /// Every item of every collection owning a referenced item
    FullSets,
}

/// Kind of destination collection to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Regular,
    CustomEmoji,
}

/// One destination collection to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    pub short_name: String,
    pub title: String,
    pub format: Format,
    pub kind: CollectionKind,
    pub refs: Vec<ChosenRef>,
}

/// An item that could not be appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    pub reason: String,
    /// `source_index` of the skipped item
    pub index: usize,
}

/// Outcome of creating one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkResult {
    pub short_name: String,
    pub title: String,
    pub format: Format,
    pub total: usize,
    pub added: usize,
    pub skipped: Vec<SkippedItem>,
    /// Set when the destination itself could not be created
    pub failure: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(id: &str, n: usize) -> SourceCollection {
        SourceCollection {
            identifier: id.into(),
            title: None,
            items: (0..n)
                .map(|i| Item {
                    content_id: format!("{id}-{i}"),
                    tag: None,
                    format: Format::Static,
                    source_index: i,
                })
                .collect(),
        }
    }

    #[test]
    fn resolve_ref_finds_item() {
        let collections = vec![collection("a", 2), collection("b", 3)];
        let item = resolve_ref(&collections, &ChosenRef::new("b", 2)).unwrap();
        assert_eq!(item.content_id, "b-2");
        assert!(resolve_ref(&collections, &ChosenRef::new("b", 3)).is_none());
        assert!(resolve_ref(&collections, &ChosenRef::new("c", 0)).is_none());
    }

    #[test]
    fn selection_mode_parse() {
        assert_eq!(SelectionMode::parse("ranges"), Some(SelectionMode::Ranges));
        assert_eq!(SelectionMode::parse("tags"), Some(SelectionMode::Tags));
        assert_eq!(SelectionMode::parse(SelectionMode::Tags.as_str()), Some(SelectionMode::Tags));
        assert_eq!(SelectionMode::parse("emoji"), None);
    }

    #[test]
    fn format_display() {
        assert_eq!(Format::Video.to_string(), "video");
    }
}
