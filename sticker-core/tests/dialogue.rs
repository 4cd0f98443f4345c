//! Whole-dialogue scenarios driven through `Conversation` with the in-memory API.

use std::sync::Arc;
use sticker_core::testing::{collection, tagged_collection, FakeApi};
use sticker_core::{
    Callback, Command, Conversation, Event, Format, Item, MergeSettings, OwnerHandle, Reply,
    SelectionMode, Stage, TagCollectionMode,
};

fn settings(cap: usize) -> MergeSettings {
    MergeSettings {
        max_per_destination: cap,
        ..MergeSettings::default()
    }
}

async fn select_and_create(conv: &mut Conversation, sources: &[&str], selection: &str) -> Vec<Reply> {
    conv.handle(Event::Command(Command::Start)).await;
    for source in sources {
        conv.handle(Event::text(*source)).await;
    }
    conv.handle(Event::Command(Command::Done)).await;
    conv.handle(Event::Callback(Callback::Mode(SelectionMode::Ranges)))
        .await;
    conv.handle(Event::text(selection)).await;
    conv.handle(Event::text("Pack")).await;
    conv.handle(Event::text("mypack")).await
}

#[tokio::test]
async fn large_selection_is_split_into_capped_chunks() {
    let api = Arc::new(
        FakeApi::new()
            .with_collection(collection("a", 5, Format::Static))
            .with_owner("bot"),
    );
    let mut conv = Conversation::new(1, api.clone(), Arc::new(OwnerHandle::new()), settings(2));

    let replies = select_and_create(&mut conv, &["a"], "1-5").await;

    assert_eq!(
        api.destination_names(),
        vec!["mypack_2_by_bot", "mypack_3_by_bot", "mypack_by_bot"]
    );
    assert_eq!(api.destination("mypack_3_by_bot"), Some(vec!["a-4".to_string()]));
    let report = &replies.last().unwrap().text;
    assert!(report.starts_with("Pack [static] added 2/2\nt.me/addstickers/mypack_by_bot"));
    assert!(report.ends_with("Pack (3) [static] added 1/1\nt.me/addstickers/mypack_3_by_bot"));
}

#[tokio::test]
async fn failed_appends_are_reported_and_skipped() {
    let api = Arc::new(
        FakeApi::new()
            .with_collection(collection("a", 4, Format::Static))
            .fail_append_of("a-2")
            .with_owner("bot"),
    );
    let mut conv = Conversation::new(
        1,
        api.clone(),
        Arc::new(OwnerHandle::new()),
        MergeSettings::default(),
    );

    let replies = select_and_create(&mut conv, &["a"], "1-4").await;

    assert_eq!(
        api.destination("mypack_by_bot"),
        Some(vec!["a-0".to_string(), "a-1".to_string(), "a-3".to_string()])
    );
    assert_eq!(
        replies.last().unwrap().text,
        "Pack [static] added 3/4, skipped 1\nt.me/addstickers/mypack_by_bot"
    );
    assert_eq!(conv.stage(), Stage::Idle);
}

#[tokio::test]
async fn failed_first_item_skips_only_that_chunk() {
    let api = Arc::new(
        FakeApi::new()
            .with_collection(collection("a", 3, Format::Static))
            .fail_download_of("a-0")
            .with_owner("bot"),
    );
    let mut conv = Conversation::new(1, api.clone(), Arc::new(OwnerHandle::new()), settings(2));

    let replies = select_and_create(&mut conv, &["a"], "1-3").await;

    assert_eq!(api.destination_names(), vec!["mypack_2_by_bot"]);
    let report = &replies.last().unwrap().text;
    assert!(report.contains("Pack [static] added 0/2\nNot created: connection failed: download of a-0 reset"));
    assert!(report.contains("Pack (2) [static] added 1/1"));
}

#[tokio::test]
async fn unresolvable_sources_reset_the_session() {
    let api = Arc::new(FakeApi::new());
    let mut conv = Conversation::new(
        1,
        api,
        Arc::new(OwnerHandle::new()),
        MergeSettings::default(),
    );

    conv.handle(Event::Command(Command::Start)).await;
    conv.handle(Event::text("ghost_pack")).await;
    let replies = conv.handle(Event::Command(Command::Done)).await;

    assert_eq!(conv.stage(), Stage::Idle);
    let texts: Vec<_> = replies.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Loading 1 set(s)...",
            "Could not load ghost_pack: not found: collection ghost_pack",
            "Could not load any of the sets. Use /start to try again.",
        ]
    );
}

#[tokio::test]
async fn tag_selection_picks_matching_items_in_order() {
    let api = Arc::new(
        FakeApi::new()
            .with_collection(tagged_collection("a", &["😀", "😂", "😀"], Format::Static))
            .with_collection(tagged_collection("b", &["🙂", "😀"], Format::Static))
            .with_owner("bot"),
    );
    let mut conv = Conversation::new(
        1,
        api.clone(),
        Arc::new(OwnerHandle::new()),
        MergeSettings::default(),
    );

    conv.handle(Event::Command(Command::Start)).await;
    conv.handle(Event::text("a")).await;
    conv.handle(Event::text("b")).await;
    conv.handle(Event::Command(Command::Done)).await;
    conv.handle(Event::Callback(Callback::Mode(SelectionMode::Tags)))
        .await;
    conv.handle(Event::text(":😀")).await;
    conv.handle(Event::text("Smiles")).await;
    conv.handle(Event::text("smiles")).await;

    assert_eq!(
        api.destination("smiles_by_bot"),
        Some(vec!["a-0".to_string(), "a-2".to_string(), "b-1".to_string()])
    );
}

#[tokio::test]
async fn mixed_formats_from_tags_get_separate_destinations() {
    let api = Arc::new(
        FakeApi::new()
            .with_collection(collection("s", 1, Format::Static))
            .with_collection(collection("v", 1, Format::Video))
            .with_tag_in("1", "s", 0)
            .with_tag_in("2", "v", 0)
            .with_owner("bot"),
    );
    let mut conv = Conversation::new(
        1,
        api.clone(),
        Arc::new(OwnerHandle::new()),
        MergeSettings::default(),
    );

    conv.handle(Event::Command(Command::TagMode(TagCollectionMode::Items)))
        .await;
    conv.handle(Event::Text {
        text: "xy".into(),
        tag_ids: vec!["1".into(), "2".into()],
    })
    .await;
    conv.handle(Event::Command(Command::TagDone)).await;
    conv.handle(Event::text("Mixed")).await;
    let replies = conv.handle(Event::text("mixed")).await;

    assert_eq!(
        replies.last().unwrap().text,
        "Mixed [static] added 1/1\nt.me/addstickers/mixed_by_bot\n\n\
         Mixed (2) [video] added 1/1\nt.me/addstickers/mixed_2_by_bot"
    );
    assert_eq!(api.destination("mixed_2_by_bot"), Some(vec!["v-0".to_string()]));
}

#[tokio::test]
async fn full_set_mode_expands_owning_sets_once() {
    let loose = Item {
        content_id: "loose".into(),
        tag: Some("🔥".into()),
        format: Format::Static,
        source_index: 0,
    };
    let api = Arc::new(
        FakeApi::new()
            .with_collection(collection("s", 3, Format::Static))
            .with_tag_in("1", "s", 2)
            .with_tag_in("2", "s", 0)
            .with_tag("3", loose)
            .with_owner("bot"),
    );
    let mut conv = Conversation::new(
        1,
        api.clone(),
        Arc::new(OwnerHandle::new()),
        MergeSettings::default(),
    );

    conv.handle(Event::Command(Command::TagMode(TagCollectionMode::FullSets)))
        .await;
    conv.handle(Event::Text {
        text: "abc".into(),
        tag_ids: vec!["1".into(), "2".into(), "3".into()],
    })
    .await;
    conv.handle(Event::Command(Command::TagDone)).await;
    conv.handle(Event::text("Full")).await;
    conv.handle(Event::text("full")).await;

    assert_eq!(
        api.destination("full_by_bot"),
        Some(vec![
            "s-0".to_string(),
            "s-1".to_string(),
            "s-2".to_string(),
            "loose".to_string(),
        ])
    );
}

#[tokio::test]
async fn cancel_mid_flow_returns_to_idle() {
    let api = Arc::new(FakeApi::new().with_collection(collection("a", 2, Format::Static)));
    let mut conv = Conversation::new(
        1,
        api,
        Arc::new(OwnerHandle::new()),
        MergeSettings::default(),
    );

    conv.handle(Event::Command(Command::Start)).await;
    conv.handle(Event::text("a")).await;
    conv.handle(Event::Command(Command::Done)).await;
    assert_eq!(conv.stage(), Stage::ReviewingSources);

    let replies = conv.handle(Event::Command(Command::Cancel)).await;
    assert_eq!(conv.stage(), Stage::Idle);
    assert_eq!(replies[0].text, "Cancelled. Use /start to begin again.");
}
