//! Destination short names.
//!
//! Platforms namespace bot-created collections by requiring a
//! `_by_<owner>` suffix, and cap the whole name at 64 characters.

use sticker_common::util::truncate_chars;

/// Maximum length of a finalized short name.
pub const SHORT_NAME_MAX: usize = 64;

/// Keep only `[A-Za-z0-9_]` and cap the length.
pub fn sanitize_short_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    truncate_chars(&cleaned, SHORT_NAME_MAX).to_string()
}

/// Build the short name for chunk `chunk_index` (0-based).
///
/// Finalizing an already-finalized chunk-0 name returns it unchanged.
pub fn finalize_short_name(raw: &str, owner_handle: &str, chunk_index: usize) -> String {
    let mut base = sanitize_short_name(raw);
    let suffix = format!("_by_{}", owner_handle.to_lowercase());

    if base.to_lowercase().ends_with(&suffix) {
        if chunk_index == 0 {
            return base;
        }
        base.truncate(base.len() - suffix.len());
    }

    let with_index = if chunk_index == 0 {
        base
    } else {
        format!("{base}_{}", chunk_index + 1)
    };

    let keep = SHORT_NAME_MAX.saturating_sub(suffix.chars().count());
    format!("{}{suffix}", truncate_chars(&with_index, keep))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_owner_suffix() {
        assert_eq!(finalize_short_name("mypack", "bot", 0), "mypack_by_bot");
        assert_eq!(finalize_short_name("mypack", "MergeBot", 0), "mypack_by_mergebot");
    }

    #[test]
    fn numbers_later_chunks() {
        assert_eq!(finalize_short_name("mypack", "bot", 1), "mypack_2_by_bot");
        assert_eq!(finalize_short_name("mypack", "bot", 4), "mypack_5_by_bot");
    }

    #[test]
    fn strips_invalid_characters() {
        assert_eq!(finalize_short_name("my pack-2024!", "bot", 0), "mypack2024_by_bot");
        assert_eq!(sanitize_short_name("котики_cats"), "_cats");
    }

    #[test]
    fn idempotent_for_first_chunk() {
        let once = finalize_short_name("mypack", "Bot", 0);
        assert_eq!(finalize_short_name(&once, "Bot", 0), once);
        assert_eq!(finalize_short_name("MyPack_BY_BOT", "bot", 0), "MyPack_BY_BOT");
    }

    #[test]
    fn already_finalized_name_is_renumbered() {
        assert_eq!(finalize_short_name("mypack_by_bot", "bot", 1), "mypack_2_by_bot");
    }

    #[test]
    fn long_names_fit_the_limit() {
        let raw = "a".repeat(100);
        for chunk in 0..3 {
            let name = finalize_short_name(&raw, "merge_helper_bot", chunk);
            assert_eq!(name.len(), SHORT_NAME_MAX);
            assert!(name.ends_with("_by_merge_helper_bot"));
        }
        let once = finalize_short_name(&raw, "merge_helper_bot", 0);
        assert_eq!(finalize_short_name(&once, "merge_helper_bot", 0), once);
    }
}
