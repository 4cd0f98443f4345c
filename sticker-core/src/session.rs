//! Per-user conversation state machine.
//!
//! [`transition`] is pure: it consumes the current state and one event and
//! returns the next state plus the effects to run. Remote work (resolving
//! sources or tags, creating collections) is requested as an [`Effect`] and its
//! outcome comes back as another [`Event`].

use crate::dialogue::{Callback, Command, CreationRequest, Effect, Event, Reply};
use crate::naming::sanitize_short_name;
use crate::normalize::{normalize_identifier, NormalizeError, SourceInput};
use crate::prompts;
use crate::selection::{flatten, parse_selection};
use crate::settings::MergeSettings;
use crate::summary::{render_report, render_summary};
use crate::types::{
    ChosenRef, CollectionKind, SelectionMode, SourceCollection, TagCollectionMode,
};

/// Stage discriminant, for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    AwaitingSources,
    AwaitingTags,
    ReviewingSources,
    AwaitingSelection,
    ConfirmingCreation,
    Creating,
}

impl Stage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingSources => "awaiting_sources",
            Self::AwaitingTags => "awaiting_tags",
            Self::ReviewingSources => "reviewing_sources",
            Self::AwaitingSelection => "awaiting_selection",
            Self::ConfirmingCreation => "confirming_creation",
            Self::Creating => "creating",
        }
    }
}

/// Selection result waiting for a title and short name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub collections: Vec<SourceCollection>,
    pub chosen: Vec<ChosenRef>,
    pub kind: CollectionKind,
    /// Raw selection utterance, absent for the tag path
    pub selection_query: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingSources {
        inputs: Vec<String>,
    },
    AwaitingTags {
        tag_ids: Vec<String>,
        mode: TagCollectionMode,
    },
    ReviewingSources {
        collections: Vec<SourceCollection>,
    },
    AwaitingSelection {
        collections: Vec<SourceCollection>,
        mode: SelectionMode,
    },
    ConfirmingCreation(Draft),
    Creating,
}

impl SessionState {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Idle => Stage::Idle,
            Self::AwaitingSources { .. } => Stage::AwaitingSources,
            Self::AwaitingTags { .. } => Stage::AwaitingTags,
            Self::ReviewingSources { .. } => Stage::ReviewingSources,
            Self::AwaitingSelection { .. } => Stage::AwaitingSelection,
            Self::ConfirmingCreation(_) => Stage::ConfirmingCreation,
            Self::Creating => Stage::Creating,
        }
    }

    /// Resolved source collections, in stages that have them.
    pub fn collections(&self) -> Option<&[SourceCollection]> {
        match self {
            Self::ReviewingSources { collections } | Self::AwaitingSelection { collections, .. } => {
                Some(collections)
            }
            Self::ConfirmingCreation(draft) => Some(&draft.collections),
            _ => None,
        }
    }
}

type Transition = (SessionState, Vec<Effect>);

fn reply(text: impl Into<String>) -> Effect {
    Effect::Reply(Reply::text(text))
}

fn stay(state: SessionState) -> Transition {
    (state, Vec::new())
}

fn stay_with(state: SessionState, text: impl Into<String>) -> Transition {
    (state, vec![reply(text)])
}

/// Apply one event to a session.
pub fn transition(state: SessionState, event: Event, settings: &MergeSettings) -> Transition {
    match event {
        Event::Command(Command::Start) => (
            SessionState::AwaitingSources { inputs: Vec::new() },
            vec![reply(prompts::WELCOME)],
        ),
        Event::Command(Command::Cancel) => (SessionState::Idle, vec![reply(prompts::CANCELLED)]),
        Event::Command(Command::TagMode(mode)) => (
            SessionState::AwaitingTags {
                tag_ids: Vec::new(),
                mode,
            },
            vec![reply(prompts::tag_mode_started(mode))],
        ),
        Event::Callback(Callback::Page(page)) => on_page(state, page, settings),
        event => match state {
            SessionState::Idle => on_idle(event),
            SessionState::AwaitingSources { inputs } => on_awaiting_sources(inputs, event, settings),
            SessionState::AwaitingTags { tag_ids, mode } => on_awaiting_tags(tag_ids, mode, event),
            SessionState::ReviewingSources { collections } => on_reviewing(collections, event),
            SessionState::AwaitingSelection { collections, mode } => {
                on_awaiting_selection(collections, mode, event)
            }
            SessionState::ConfirmingCreation(draft) => on_confirming(draft, event),
            SessionState::Creating => on_creating(event, settings),
        },
    }
}

fn on_page(state: SessionState, page: usize, settings: &MergeSettings) -> Transition {
    let effects = match state.collections() {
        Some(collections) if state.stage() != Stage::ConfirmingCreation => {
            vec![Effect::Reply(render_summary(collections, page, settings.page_size))]
        }
        _ => Vec::new(),
    };
    (state, effects)
}

fn on_idle(event: Event) -> Transition {
    match event {
        Event::Text { .. } | Event::Command(_) => stay_with(SessionState::Idle, prompts::START_FIRST),
        _ => stay(SessionState::Idle),
    }
}

fn on_awaiting_sources(
    mut inputs: Vec<String>,
    event: Event,
    settings: &MergeSettings,
) -> Transition {
    let normalized = match &event {
        Event::Text { text, .. } => Some(normalize_identifier(SourceInput::Text(text))),
        Event::Forwarded { collection_id } => {
            Some(normalize_identifier(SourceInput::Forwarded(collection_id.as_deref())))
        }
        _ => None,
    };

    if let Some(result) = normalized {
        return match result {
            Ok(identifier) => {
                let text = prompts::added_source(&identifier);
                inputs.push(identifier);
                stay_with(SessionState::AwaitingSources { inputs }, text)
            }
            Err(NormalizeError::Unrecognized(_)) => {
                stay_with(SessionState::AwaitingSources { inputs }, prompts::NOT_RECOGNIZED)
            }
            Err(NormalizeError::NoCollection) => {
                stay_with(SessionState::AwaitingSources { inputs }, prompts::NO_PUBLIC_SET)
            }
        };
    }

    match event {
        Event::Command(Command::Done) if inputs.is_empty() => {
            stay_with(SessionState::AwaitingSources { inputs }, prompts::NEED_ONE_SOURCE)
        }
        Event::Command(Command::Done) => {
            let effects = vec![
                reply(prompts::loading_sources(inputs.len())),
                Effect::ResolveSources {
                    inputs: inputs.clone(),
                },
            ];
            (SessionState::AwaitingSources { inputs }, effects)
        }
        Event::Command(Command::TagDone) => {
            stay_with(SessionState::AwaitingSources { inputs }, prompts::TAG_MODE_FIRST)
        }
        Event::SourcesResolved {
            collections,
            failures,
        } => {
            let mut effects: Vec<Effect> = failures
                .iter()
                .map(|f| reply(prompts::resolution_failed(f)))
                .collect();

            if collections.is_empty() {
                effects.push(reply(prompts::NONE_RESOLVED));
                return (SessionState::Idle, effects);
            }

            effects.push(Effect::Reply(render_summary(
                &collections,
                1,
                settings.page_size,
            )));
            (SessionState::ReviewingSources { collections }, effects)
        }
        _ => stay(SessionState::AwaitingSources { inputs }),
    }
}

fn on_awaiting_tags(
    mut tag_ids: Vec<String>,
    mode: TagCollectionMode,
    event: Event,
) -> Transition {
    match event {
        Event::Text { tag_ids: found, .. } => {
            if found.is_empty() {
                return stay_with(
                    SessionState::AwaitingTags { tag_ids, mode },
                    prompts::NO_TAGS_IN_MESSAGE,
                );
            }
            let before = tag_ids.len();
            for id in found {
                if !tag_ids.contains(&id) {
                    tag_ids.push(id);
                }
            }
            let text = prompts::tags_added(tag_ids.len() - before, tag_ids.len());
            stay_with(SessionState::AwaitingTags { tag_ids, mode }, text)
        }
        Event::Forwarded { .. } => stay_with(
            SessionState::AwaitingTags { tag_ids, mode },
            prompts::NO_TAGS_IN_MESSAGE,
        ),
        Event::Command(Command::TagDone) if tag_ids.is_empty() => {
            stay_with(SessionState::AwaitingTags { tag_ids, mode }, prompts::NO_TAGS_YET)
        }
        Event::Command(Command::TagDone) => {
            let effects = vec![
                reply(prompts::resolving_tags(tag_ids.len())),
                Effect::ResolveTags {
                    tag_ids: tag_ids.clone(),
                    mode,
                },
            ];
            (SessionState::AwaitingTags { tag_ids, mode }, effects)
        }
        Event::Command(Command::Done) => {
            stay_with(SessionState::AwaitingTags { tag_ids, mode }, prompts::USE_TAG_DONE)
        }
        Event::TagsResolved {
            collection,
            failures,
        } => {
            let mut effects: Vec<Effect> = failures
                .iter()
                .map(|f| reply(prompts::resolution_failed(f)))
                .collect();

            if collection.items.is_empty() {
                effects.push(reply(prompts::NO_TAGS_RESOLVED));
                return (SessionState::Idle, effects);
            }

            let collections = vec![collection];
            let chosen = flatten(&collections);
            effects.push(reply(prompts::ask_title(chosen.len())));
            let draft = Draft {
                collections,
                chosen,
                kind: CollectionKind::CustomEmoji,
                selection_query: None,
                title: None,
            };
            (SessionState::ConfirmingCreation(draft), effects)
        }
        _ => stay(SessionState::AwaitingTags { tag_ids, mode }),
    }
}

fn on_reviewing(collections: Vec<SourceCollection>, event: Event) -> Transition {
    match event {
        Event::Callback(Callback::Mode(mode)) => (
            SessionState::AwaitingSelection { collections, mode },
            vec![reply(prompts::mode_selected(mode))],
        ),
        Event::Text { .. } => {
            stay_with(SessionState::ReviewingSources { collections }, prompts::CHOOSE_MODE)
        }
        _ => stay(SessionState::ReviewingSources { collections }),
    }
}

fn on_awaiting_selection(
    collections: Vec<SourceCollection>,
    mode: SelectionMode,
    event: Event,
) -> Transition {
    match event {
        Event::Callback(Callback::Mode(mode)) => (
            SessionState::AwaitingSelection { collections, mode },
            vec![reply(prompts::mode_selected(mode))],
        ),
        Event::Text { text, .. } => {
            let parsed = parse_selection(&text, &collections, mode);
            if !parsed.is_ok() {
                return stay_with(
                    SessionState::AwaitingSelection { collections, mode },
                    prompts::parse_errors(&parsed.errors),
                );
            }

            let text_reply = prompts::ask_title(parsed.chosen.len());
            let draft = Draft {
                collections,
                chosen: parsed.chosen,
                kind: CollectionKind::Regular,
                selection_query: Some(text),
                title: None,
            };
            (SessionState::ConfirmingCreation(draft), vec![reply(text_reply)])
        }
        _ => stay(SessionState::AwaitingSelection { collections, mode }),
    }
}

fn on_confirming(mut draft: Draft, event: Event) -> Transition {
    let Event::Text { text, .. } = event else {
        return stay(SessionState::ConfirmingCreation(draft));
    };
    let text = text.trim().to_string();
    if text.is_empty() {
        return stay(SessionState::ConfirmingCreation(draft));
    }

    let Some(title) = draft.title.clone() else {
        draft.title = Some(text);
        return stay_with(SessionState::ConfirmingCreation(draft), prompts::ASK_SHORT_NAME);
    };

    if sanitize_short_name(&text).is_empty() {
        return stay_with(
            SessionState::ConfirmingCreation(draft),
            prompts::INVALID_SHORT_NAME,
        );
    }

    let request = CreationRequest {
        collections: draft.collections,
        refs: draft.chosen,
        title,
        raw_short_name: text,
        kind: draft.kind,
    };
    (
        SessionState::Creating,
        vec![reply(prompts::CREATING), Effect::Create(request)],
    )
}

fn on_creating(event: Event, settings: &MergeSettings) -> Transition {
    match event {
        Event::CreationFinished { results } => (
            SessionState::Idle,
            vec![reply(render_report(&results, &settings.link_host))],
        ),
        Event::CreationAborted { reason } => (
            SessionState::Idle,
            vec![reply(prompts::creation_aborted(&reason))],
        ),
        Event::Text { .. } => stay_with(SessionState::Creating, prompts::STILL_CREATING),
        _ => stay(SessionState::Creating),
    }
}
