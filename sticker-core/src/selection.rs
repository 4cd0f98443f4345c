//! Selection parsing over the flattened list of source items.
//!
//! Both grammars address the concatenation of all source collections in
//! order, so "1" is always the first item of the first collection.

use crate::types::{ChosenRef, SelectionMode, SourceCollection};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static RANGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(?:-(\d+))?$").unwrap());

/// A problem with one part of a selection utterance.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid range token: {0}")]
    InvalidToken(String),

    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),

    #[error("No numbers or ranges provided")]
    EmptyRanges,

    #[error("No tags provided")]
    NoTags,
}

/// Result of parsing one selection utterance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSelection {
    pub chosen: Vec<ChosenRef>,
    pub errors: Vec<ParseError>,
}

impl ParsedSelection {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Flatten collections into references, collection order first.
pub fn flatten(collections: &[SourceCollection]) -> Vec<ChosenRef> {
    collections
        .iter()
        .flat_map(|c| (0..c.items.len()).map(move |i| ChosenRef::new(c.identifier.as_str(), i)))
        .collect()
}

/// Parse a selection utterance against the resolved source collections.
pub fn parse_selection(
    input: &str,
    collections: &[SourceCollection],
    mode: SelectionMode,
) -> ParsedSelection {
    let (chosen, errors) = match mode {
        SelectionMode::Ranges => parse_ranges(input, collections),
        SelectionMode::Tags => parse_tags(input, collections),
    };

    ParsedSelection {
        chosen: dedup_refs(chosen),
        errors,
    }
}

fn tokens(input: &str) -> impl Iterator<Item = &str> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn parse_ranges(
    input: &str,
    collections: &[SourceCollection],
) -> (Vec<ChosenRef>, Vec<ParseError>) {
    let flat = flatten(collections);
    let mut chosen = Vec::new();
    let mut errors = Vec::new();
    let mut valid = 0usize;

    for token in tokens(input) {
        let Some(caps) = RANGE_PATTERN.captures(token) else {
            errors.push(ParseError::InvalidToken(token.to_string()));
            continue;
        };

        let start = saturating_number(&caps[1]);
        let end = caps.get(2).map_or(start, |m| saturating_number(m.as_str()));

        if start < 1 || end < start {
            errors.push(ParseError::InvalidBounds(token.to_string()));
            continue;
        }

        valid += 1;
        let upper = end.min(flat.len());
        if start <= upper {
            chosen.extend_from_slice(&flat[start - 1..upper]);
        }
    }

    if valid == 0 && errors.is_empty() {
        errors.push(ParseError::EmptyRanges);
    }

    (chosen, errors)
}

/// Digits-only input; values past `usize::MAX` saturate and get clipped later.
fn saturating_number(digits: &str) -> usize {
    digits.parse().unwrap_or(usize::MAX)
}

fn parse_tags(input: &str, collections: &[SourceCollection]) -> (Vec<ChosenRef>, Vec<ParseError>) {
    let normalized = input.replace(':', " ");
    let wanted: HashSet<&str> = tokens(&normalized).collect();
    if wanted.is_empty() {
        return (Vec::new(), vec![ParseError::NoTags]);
    }

    let wanted = &wanted;
    let chosen = collections
        .iter()
        .flat_map(|c| {
            c.items.iter().enumerate().filter_map(move |(i, item)| {
                item.tag
                    .as_deref()
                    .filter(|tag| wanted.contains(tag))
                    .map(|_| ChosenRef::new(c.identifier.as_str(), i))
            })
        })
        .collect();

    (chosen, Vec::new())
}

/// Drop repeated references, keeping the first occurrence.
pub fn dedup_refs(refs: Vec<ChosenRef>) -> Vec<ChosenRef> {
    let mut seen = HashSet::new();
    refs.into_iter().filter(|r| seen.insert(r.clone())).collect()
}
