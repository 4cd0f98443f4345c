//! Runtime knobs for the merge flow.

use sticker_common::config::{MergeConfig, DEFAULT_PAGE_SIZE, MAX_PER_DESTINATION};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSettings {
    pub max_per_destination: usize,
    pub page_size: usize,
    pub link_host: String,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            max_per_destination: MAX_PER_DESTINATION,
            page_size: DEFAULT_PAGE_SIZE,
            link_host: "t.me".to_string(),
        }
    }
}

impl From<&MergeConfig> for MergeSettings {
    fn from(config: &MergeConfig) -> Self {
        Self {
            max_per_destination: config.max_per_destination.clamp(1, MAX_PER_DESTINATION),
            page_size: config.page_size.max(1),
            link_host: config.link_host.clone(),
        }
    }
}
