//! Drives one user's session: applies events and runs the effects they request.

use crate::api::{OwnerHandle, ResolutionFailure, StickerApi, UserId};
use crate::dialogue::{CreationRequest, Effect, Event, Reply};
use crate::executor::execute_plans;
use crate::planner::{plan_chunks, PlanRequest};
use crate::session::{transition, SessionState, Stage};
use crate::settings::MergeSettings;
use crate::types::{Item, SourceCollection, TagCollectionMode};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Identifier of the synthetic collection built from resolved tags.
pub const TAG_COLLECTION_ID: &str = "tags";

/// A single user's conversation.
///
/// Events for one conversation must be handled one at a time; the bot runs
/// each conversation on its own worker task to guarantee that.
pub struct Conversation {
    user_id: UserId,
    state: SessionState,
    api: Arc<dyn StickerApi>,
    owner: Arc<OwnerHandle>,
    settings: MergeSettings,
}

impl Conversation {
    pub fn new(
        user_id: UserId,
        api: Arc<dyn StickerApi>,
        owner: Arc<OwnerHandle>,
        settings: MergeSettings,
    ) -> Self {
        Self {
            user_id,
            state: SessionState::Idle,
            api,
            owner,
            settings,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    /// Handle one event and collect every reply it produces.
    pub async fn handle(&mut self, event: Event) -> Vec<Reply> {
        let mut replies = Vec::new();
        self.drive(event, &mut |reply| replies.push(reply)).await;
        replies
    }

    /// Handle one event, passing replies to `emit` as soon as they are produced.
    ///
    /// Effects run in order. Their outcomes are fed back as events before
    /// this returns, so the session is never left mid-effect.
    pub async fn drive(&mut self, event: Event, emit: &mut (dyn FnMut(Reply) + Send)) {
        let mut queue = VecDeque::from([event]);

        while let Some(event) = queue.pop_front() {
            let before = self.state.stage();
            let state = std::mem::take(&mut self.state);
            let (next, effects) = transition(state, event, &self.settings);
            self.state = next;

            if self.state.stage() != before {
                tracing::debug!(
                    user_id = self.user_id,
                    from = before.as_str(),
                    to = self.state.stage().as_str(),
                    "Session stage changed"
                );
            }

            for effect in effects {
                match effect {
                    Effect::Reply(reply) => emit(reply),
                    Effect::ResolveSources { inputs } => {
                        queue.push_back(self.resolve_sources(&inputs).await);
                    }
                    Effect::ResolveTags { tag_ids, mode } => {
                        queue.push_back(self.resolve_tags(&tag_ids, mode).await);
                    }
                    Effect::Create(request) => {
                        queue.push_back(self.create(request).await);
                    }
                }
            }
        }
    }

    async fn resolve_sources(&self, inputs: &[String]) -> Event {
        let mut collections: Vec<SourceCollection> = Vec::new();
        let mut failures = Vec::new();

        for input in inputs {
            match self.api.fetch_collection(input).await {
                Ok(collection) => {
                    if collections
                        .iter()
                        .any(|c| c.identifier == collection.identifier)
                    {
                        tracing::debug!(collection = %collection.identifier, "Duplicate source ignored");
                        continue;
                    }
                    collections.push(collection);
                }
                Err(error) => {
                    tracing::warn!(user_id = self.user_id, input = %input, error = %error, "Source not resolved");
                    failures.push(ResolutionFailure {
                        input: input.clone(),
                        error,
                    });
                }
            }
        }

        tracing::info!(
            user_id = self.user_id,
            resolved = collections.len(),
            failed = failures.len(),
            "Sources resolved"
        );
        Event::SourcesResolved {
            collections,
            failures,
        }
    }

    async fn resolve_tags(&self, tag_ids: &[String], mode: TagCollectionMode) -> Event {
        let mut items: Vec<Item> = Vec::new();
        let mut failures = Vec::new();
        let mut expanded: HashSet<String> = HashSet::new();
        let mut unavailable: HashSet<String> = HashSet::new();

        for tag_id in tag_ids {
            let tagged = match self.api.resolve_tag_content(tag_id).await {
                Ok(tagged) => tagged,
                Err(error) => {
                    failures.push(ResolutionFailure {
                        input: tag_id.clone(),
                        error,
                    });
                    continue;
                }
            };

            match (mode, tagged.collection_id) {
                (TagCollectionMode::FullSets, Some(collection_id))
                    if !unavailable.contains(&collection_id) =>
                {
                    if !expanded.insert(collection_id.clone()) {
                        continue;
                    }
                    match self.api.fetch_collection(&collection_id).await {
                        Ok(collection) => items.extend(collection.items),
                        Err(error) => {
                            tracing::warn!(
                                user_id = self.user_id,
                                collection = %collection_id,
                                error = %error,
                                "Owning set not loaded, keeping tagged item only"
                            );
                            failures.push(ResolutionFailure {
                                input: collection_id.clone(),
                                error,
                            });
                            unavailable.insert(collection_id);
                            items.push(tagged.item);
                        }
                    }
                }
                _ => items.push(tagged.item),
            }
        }

        let mut seen = HashSet::new();
        items.retain(|item| seen.insert(item.content_id.clone()));
        for (i, item) in items.iter_mut().enumerate() {
            item.source_index = i;
        }

        tracing::info!(
            user_id = self.user_id,
            items = items.len(),
            failed = failures.len(),
            "Tags resolved"
        );
        Event::TagsResolved {
            collection: SourceCollection {
                identifier: TAG_COLLECTION_ID.to_string(),
                title: None,
                items,
            },
            failures,
        }
    }

    async fn create(&self, request: CreationRequest) -> Event {
        let handle = match self.owner.get(self.api.as_ref()).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(user_id = self.user_id, error = %e, "Owner handle lookup failed");
                return Event::CreationAborted {
                    reason: e.to_string(),
                };
            }
        };

        let plans = plan_chunks(
            &request.refs,
            &request.collections,
            &PlanRequest {
                title: &request.title,
                raw_short_name: &request.raw_short_name,
                owner_handle: handle,
                kind: request.kind,
                max_per_destination: self.settings.max_per_destination,
            },
        );

        tracing::info!(
            user_id = self.user_id,
            chunks = plans.len(),
            items = request.refs.len(),
            "Starting creation"
        );

        let results = execute_plans(
            self.api.as_ref(),
            self.user_id,
            &request.collections,
            &plans,
        )
        .await;
        Event::CreationFinished { results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::{Callback, Command};
    use crate::testing::{collection, tagged_collection, ApiCall, FakeApi};
    use crate::types::{Format, SelectionMode};

    fn conversation(api: Arc<FakeApi>) -> Conversation {
        sticker_common::logging::init_test_logging();
        Conversation::new(
            42,
            api,
            Arc::new(OwnerHandle::new()),
            MergeSettings::default(),
        )
    }

    fn texts(replies: &[Reply]) -> Vec<&str> {
        replies.iter().map(|r| r.text.as_str()).collect()
    }

    #[tokio::test]
    async fn merges_two_sources_end_to_end() {
        let api = Arc::new(
            FakeApi::new()
                .with_collection(collection("a", 3, Format::Static))
                .with_collection(collection("b", 3, Format::Static))
                .with_owner("bot"),
        );
        let mut conv = conversation(api.clone());

        conv.handle(Event::Command(Command::Start)).await;
        conv.handle(Event::text("a")).await;
        conv.handle(Event::text("b")).await;
        let replies = conv.handle(Event::Command(Command::Done)).await;
        assert_eq!(conv.stage(), Stage::ReviewingSources);
        assert!(texts(&replies)[1].starts_with("Total items: 6. Page 1/1."));

        conv.handle(Event::Callback(Callback::Mode(SelectionMode::Ranges)))
            .await;
        conv.handle(Event::text("2-4")).await;
        conv.handle(Event::text("Pack")).await;
        let replies = conv.handle(Event::text("mypack")).await;

        assert_eq!(conv.stage(), Stage::Idle);
        assert_eq!(
            texts(&replies),
            vec![
                "Creating, this can take a while...",
                "Pack [static] added 3/3\nt.me/addstickers/mypack_by_bot",
            ]
        );
        assert_eq!(
            api.destination("mypack_by_bot"),
            Some(vec!["a-1".to_string(), "a-2".to_string(), "b-0".to_string()])
        );
    }

    #[tokio::test]
    async fn duplicate_sources_are_fetched_but_listed_once() {
        let api = Arc::new(FakeApi::new().with_collection(collection("a", 2, Format::Static)));
        let mut conv = conversation(api.clone());

        conv.handle(Event::Command(Command::Start)).await;
        conv.handle(Event::text("a")).await;
        conv.handle(Event::text("t.me/addstickers/a")).await;
        conv.handle(Event::Command(Command::Done)).await;

        let fetches = api
            .calls()
            .into_iter()
            .filter(|c| matches!(c, ApiCall::Fetch(_)))
            .count();
        assert_eq!(fetches, 2);
        assert_eq!(conv.state().collections().map(<[_]>::len), Some(1));
    }

    #[tokio::test]
    async fn owner_handle_is_looked_up_once() {
        let api = Arc::new(
            FakeApi::new()
                .with_collection(collection("a", 2, Format::Static))
                .with_owner("bot"),
        );
        let owner = Arc::new(OwnerHandle::new());

        for name in ["first", "second"] {
            let mut conv =
                Conversation::new(7, api.clone(), owner.clone(), MergeSettings::default());
            conv.handle(Event::Command(Command::Start)).await;
            conv.handle(Event::text("a")).await;
            conv.handle(Event::Command(Command::Done)).await;
            conv.handle(Event::Callback(Callback::Mode(SelectionMode::Ranges)))
                .await;
            conv.handle(Event::text("1")).await;
            conv.handle(Event::text("Title")).await;
            conv.handle(Event::text(name)).await;
        }

        assert_eq!(api.owner_lookups(), 1);
        assert_eq!(owner.cached(), Some("bot"));
        assert_eq!(
            api.destination_names(),
            vec!["first_by_bot".to_string(), "second_by_bot".to_string()]
        );
    }

    #[tokio::test]
    async fn failed_owner_lookup_aborts_and_is_retried_later() {
        let api = Arc::new(FakeApi::new().with_collection(collection("a", 1, Format::Static)));
        let mut conv = conversation(api.clone());

        conv.handle(Event::Command(Command::Start)).await;
        conv.handle(Event::text("a")).await;
        conv.handle(Event::Command(Command::Done)).await;
        conv.handle(Event::Callback(Callback::Mode(SelectionMode::Ranges)))
            .await;
        conv.handle(Event::text("1")).await;
        conv.handle(Event::text("Title")).await;
        let replies = conv.handle(Event::text("name")).await;

        assert_eq!(conv.stage(), Stage::Idle);
        assert_eq!(
            texts(&replies).last(),
            Some(&"Could not start creating: connection failed: getMe timed out. Use /start to try again.")
        );
        assert!(api.destination_names().is_empty());
        assert_eq!(conv.owner.cached(), None);
    }

    #[tokio::test]
    async fn tag_items_create_custom_emoji_collection() {
        let api = Arc::new(
            FakeApi::new()
                .with_collection(tagged_collection("emo", &["😀", "😂", "🙂"], Format::Static))
                .with_tag_in("100", "emo", 2)
                .with_tag_in("200", "emo", 0)
                .with_owner("bot"),
        );
        let mut conv = conversation(api.clone());

        conv.handle(Event::Command(Command::TagMode(TagCollectionMode::Items)))
            .await;
        conv.handle(Event::Text {
            text: "🙂😀".into(),
            tag_ids: vec!["100".into(), "200".into(), "404".into()],
        })
        .await;
        let replies = conv.handle(Event::Command(Command::TagDone)).await;
        assert_eq!(conv.stage(), Stage::ConfirmingCreation);
        assert!(texts(&replies).contains(&"Could not load 404: not found: tag 404"));

        conv.handle(Event::text("Emoji")).await;
        conv.handle(Event::text("emo_mix")).await;

        assert_eq!(
            api.destination("emo_mix_by_bot"),
            Some(vec!["emo-2".to_string(), "emo-0".to_string()])
        );
    }

    #[tokio::test]
    async fn full_set_mode_expands_each_owning_collection_once() {
        let api = Arc::new(
            FakeApi::new()
                .with_collection(tagged_collection("emo", &["😀", "😂"], Format::Static))
                .with_tag_in("1", "emo", 0)
                .with_tag_in("2", "emo", 1),
        );
        let conv = conversation(api.clone());

        let event = conv
            .resolve_tags(&["1".into(), "2".into()], TagCollectionMode::FullSets)
            .await;
        let Event::TagsResolved { collection, failures } = event else {
            panic!("expected resolved tags");
        };
        assert!(failures.is_empty());
        assert_eq!(collection.identifier, TAG_COLLECTION_ID);
        let ids: Vec<_> = collection.items.iter().map(|i| i.content_id.as_str()).collect();
        assert_eq!(ids, vec!["emo-0", "emo-1"]);
        assert_eq!(
            api.calls()
                .iter()
                .filter(|c| matches!(c, ApiCall::Fetch(_)))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn unloadable_owning_set_falls_back_to_tagged_items() {
        let api = Arc::new(
            FakeApi::new()
                .with_collection(tagged_collection("gone", &["😀", "😂", "🙂"], Format::Static))
                .with_tag_in("1", "gone", 0)
                .with_tag_in("2", "gone", 2)
                .forget_collection("gone"),
        );
        let mut conv = conversation(api.clone());

        let Event::TagsResolved { collection, failures } = conv
            .resolve_tags(&["1".into(), "2".into()], TagCollectionMode::FullSets)
            .await
        else {
            panic!("expected resolved tags");
        };
        let ids: Vec<_> = collection.items.iter().map(|i| i.content_id.as_str()).collect();
        assert_eq!(ids, vec!["gone-0", "gone-2"]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].input, "gone");
        assert_eq!(
            api.calls()
                .iter()
                .filter(|c| matches!(c, ApiCall::Fetch(_)))
                .count(),
            1
        );

        conv.handle(Event::Command(Command::TagMode(TagCollectionMode::FullSets)))
            .await;
        conv.handle(Event::Text {
            text: "😀🙂".into(),
            tag_ids: vec!["1".into(), "2".into()],
        })
        .await;
        let replies = conv.handle(Event::Command(Command::TagDone)).await;
        assert_eq!(conv.stage(), Stage::ConfirmingCreation);
        assert!(texts(&replies)
            .iter()
            .any(|t| t.starts_with("Could not load gone:")));
    }

    #[tokio::test]
    async fn resolved_tag_items_are_reindexed() {
        let api = Arc::new(
            FakeApi::new()
                .with_collection(collection("x", 5, Format::Video))
                .with_tag_in("9", "x", 4)
                .with_tag_in("8", "x", 4)
                .with_tag_in("7", "x", 1),
        );
        let conv = conversation(api);

        let Event::TagsResolved { collection, .. } = conv
            .resolve_tags(
                &["9".into(), "8".into(), "7".into()],
                TagCollectionMode::Items,
            )
            .await
        else {
            panic!("expected resolved tags");
        };
        let indexed: Vec<_> = collection
            .items
            .iter()
            .map(|i| (i.content_id.as_str(), i.source_index))
            .collect();
        assert_eq!(indexed, vec![("x-4", 0), ("x-1", 1)]);
    }
}
