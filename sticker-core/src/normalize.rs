//! Turns free-form user input into a canonical source collection identifier.

use regex::Regex;
use std::sync::LazyLock;

static LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:www\.)?(?:t|telegram)\.me/addstickers/([A-Za-z0-9_]+)").unwrap()
});
static BARE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{3,}$").unwrap());

/// What the user sent while sources are being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceInput<'a> {
    /// A typed short name or link
    Text(&'a str),
    /// A forwarded item, with the collection it belongs to if the platform reported one
    Forwarded(Option<&'a str>),
}

/// Input that could not be turned into an identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("not a collection name or link: {0}")]
    Unrecognized(String),

    #[error("the forwarded item does not belong to a public collection")]
    NoCollection,
}

/// Normalize a source input into a collection identifier.
pub fn normalize_identifier(input: SourceInput<'_>) -> Result<String, NormalizeError> {
    match input {
        SourceInput::Text(text) => normalize_text(text),
        SourceInput::Forwarded(Some(id)) if !id.trim().is_empty() => Ok(id.trim().to_string()),
        SourceInput::Forwarded(_) => Err(NormalizeError::NoCollection),
    }
}

fn normalize_text(text: &str) -> Result<String, NormalizeError> {
    let trimmed = text.trim();
    if let Some(caps) = LINK_PATTERN.captures(trimmed) {
        return Ok(caps[1].to_string());
    }
    if BARE_PATTERN.is_match(trimmed) {
        return Ok(trimmed.to_string());
    }
    Err(NormalizeError::Unrecognized(trimmed.to_string()))
}
