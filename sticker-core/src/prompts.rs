//! User-facing message text.

use crate::api::ResolutionFailure;
use crate::selection::ParseError;
use crate::types::{SelectionMode, TagCollectionMode};

pub const WELCOME: &str = "Hi! Send me the sticker sets to merge, for example:\n\
- short name: cats_pack_2024\n\
- link: t.me/addstickers/cats_pack_2024\n\
Or forward one sticker from each set and I will find the set myself.\n\
To build a set from custom emoji instead, start with /tag_mode (or /tag_mode_full to take whole emoji sets).\n\
Send /done when you are finished.";

pub const CANCELLED: &str = "Cancelled. Use /start to begin again.";
pub const START_FIRST: &str = "Send /start to begin, or /tag_mode to collect custom emoji.";
pub const NOT_RECOGNIZED: &str = "That does not look like a set name or link. Send a short name (e.g. cats_pack_2024), a link like t.me/addstickers/<name>, or a sticker from the set.";
pub const NO_PUBLIC_SET: &str = "This sticker does not belong to a public set. Send a t.me/addstickers/<name> link or the short name instead.";
pub const NEED_ONE_SOURCE: &str = "Add at least one set first.";
pub const NONE_RESOLVED: &str = "Could not load any of the sets. Use /start to try again.";
pub const CHOOSE_MODE: &str = "Choose how to select items using the buttons below the list.";
pub const NO_TAGS_IN_MESSAGE: &str = "I found no custom emoji in that message. Send text containing the emoji you want, or /tag_done.";
pub const NO_TAGS_YET: &str = "No custom emoji collected yet. Send some and repeat /tag_done.";
pub const TAG_MODE_FIRST: &str = "Start with /tag_mode and send some custom emoji first.";
pub const USE_TAG_DONE: &str = "You are collecting custom emoji; send /tag_done when finished.";
pub const NO_TAGS_RESOLVED: &str = "Could not load any of the collected emoji. Use /tag_mode to try again.";
pub const ASK_SHORT_NAME: &str = "Now choose a short name (latin letters, digits and underscores).";
pub const INVALID_SHORT_NAME: &str = "The short name needs at least one latin letter, digit or underscore. Try again.";
pub const CREATING: &str = "Creating, this can take a while...";
pub const STILL_CREATING: &str = "Still creating, please wait.";

pub fn added_source(identifier: &str) -> String {
    format!("Added: {identifier}. More? /done to continue.")
}

pub fn loading_sources(count: usize) -> String {
    format!("Loading {count} set(s)...")
}

pub fn resolution_failed(failure: &ResolutionFailure) -> String {
    format!("Could not load {}: {}", failure.input, failure.error)
}

pub fn tag_mode_started(mode: TagCollectionMode) -> String {
    let scope = match mode {
        TagCollectionMode::Items => "only the emoji you send",
        TagCollectionMode::FullSets => "every emoji of the sets they come from",
    };
    format!("Emoji mode: send messages with custom emoji, then /tag_done. I will take {scope}.")
}

pub fn tags_added(added: usize, total: usize) -> String {
    format!("Emoji added: +{added}. Total: {total}. Send more or /tag_done.")
}

pub fn resolving_tags(count: usize) -> String {
    format!("Loading {count} emoji...")
}

pub fn mode_selected(mode: SelectionMode) -> &'static str {
    match mode {
        SelectionMode::Ranges => {
            "Selection by numbers and ranges (example: 1-5,7,10-12). Send your selection."
        }
        SelectionMode::Tags => "Selection by emoji (example: :😀,😂). Send your selection.",
    }
}

pub fn parse_errors(errors: &[ParseError]) -> String {
    let lines: Vec<String> = errors.iter().map(ToString::to_string).collect();
    format!("Errors:\n- {}", lines.join("\n- "))
}

pub fn ask_title(selected: usize) -> String {
    format!("Selected {selected}. Enter a title for the new set.")
}

pub fn creation_aborted(reason: &str) -> String {
    format!("Could not start creating: {reason}. Use /start to try again.")
}
