//! Creates destination collections chunk by chunk.
//!
//! Every remote call is awaited in sequence: items are appended in plan order
//! and chunks are processed in plan order. A failed first item aborts only its
//! chunk; a failed append is recorded and the loop moves on. Nothing is retried.

use crate::api::{ApiError, ApiResult, NewCollection, StickerApi, UploadedItem, UserId};
use crate::types::{resolve_ref, ChosenRef, ChunkPlan, ChunkResult, Item, SkippedItem, SourceCollection};

/// Execute every plan in order and report one result per plan.
pub async fn execute_plans(
    api: &dyn StickerApi,
    owner: UserId,
    collections: &[SourceCollection],
    plans: &[ChunkPlan],
) -> Vec<ChunkResult> {
    let mut results = Vec::with_capacity(plans.len());
    for plan in plans {
        results.push(execute_chunk(api, owner, collections, plan).await);
    }
    results
}

/// Create one destination collection from its first item, then append the rest.
pub async fn execute_chunk(
    api: &dyn StickerApi,
    owner: UserId,
    collections: &[SourceCollection],
    plan: &ChunkPlan,
) -> ChunkResult {
    let mut result = ChunkResult {
        short_name: plan.short_name.clone(),
        title: plan.title.clone(),
        format: plan.format,
        total: plan.refs.len(),
        added: 0,
        skipped: Vec::new(),
        failure: None,
    };

    let Some((first, rest)) = plan.refs.split_first() else {
        return result;
    };

    tracing::info!(
        short_name = %plan.short_name,
        format = %plan.format,
        total = result.total,
        "Creating destination collection"
    );

    if let Err(e) = create_with_first(api, owner, collections, plan, first).await {
        tracing::warn!(
            short_name = %plan.short_name,
            error = %e,
            "Destination creation failed, skipping chunk"
        );
        result.failure = Some(e.to_string());
        return result;
    }
    result.added = 1;

    for r in rest {
        let index = r.index_in_source;
        match append_one(api, owner, collections, plan, r).await {
            Ok(()) => result.added += 1,
            Err(e) => {
                tracing::warn!(
                    short_name = %plan.short_name,
                    collection = %r.source_collection_id,
                    index,
                    error = %e,
                    "Item skipped"
                );
                result.skipped.push(SkippedItem {
                    reason: e.to_string(),
                    index,
                });
            }
        }
    }

    tracing::info!(
        short_name = %plan.short_name,
        added = result.added,
        skipped = result.skipped.len(),
        "Destination collection filled"
    );

    result
}

fn lookup<'a>(collections: &'a [SourceCollection], r: &ChosenRef) -> ApiResult<&'a Item> {
    resolve_ref(collections, r).ok_or_else(|| {
        ApiError::NotFound(format!(
            "item #{} of {}",
            r.index_in_source + 1,
            r.source_collection_id
        ))
    })
}

/// Download an item and upload it in destination-ready form.
async fn transfer(api: &dyn StickerApi, owner: UserId, item: &Item) -> ApiResult<UploadedItem> {
    let bytes = api.download_content(&item.content_id).await?;
    let content_id = api.upload_content(owner, bytes, item.format).await?;
    Ok(UploadedItem {
        content_id,
        tag: item.tag.clone(),
        format: item.format,
    })
}

async fn create_with_first(
    api: &dyn StickerApi,
    owner: UserId,
    collections: &[SourceCollection],
    plan: &ChunkPlan,
    first: &ChosenRef,
) -> ApiResult<()> {
    let item = lookup(collections, first)?;
    let uploaded = transfer(api, owner, item).await?;
    let collection = NewCollection {
        short_name: plan.short_name.clone(),
        title: plan.title.clone(),
        format: plan.format,
        kind: plan.kind,
        first: uploaded,
    };
    api.create_collection(owner, &collection).await
}

async fn append_one(
    api: &dyn StickerApi,
    owner: UserId,
    collections: &[SourceCollection],
    plan: &ChunkPlan,
    r: &ChosenRef,
) -> ApiResult<()> {
    let item = lookup(collections, r)?;
    let uploaded = transfer(api, owner, item).await?;
    api.append_item(owner, &plan.short_name, &uploaded).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{collection, ApiCall, FakeApi};
    use crate::types::{CollectionKind, Format};

    fn plan_for(id: &str, indices: &[usize], short_name: &str) -> ChunkPlan {
        ChunkPlan {
            short_name: short_name.into(),
            title: "Pack".into(),
            format: Format::Static,
            kind: CollectionKind::Regular,
            refs: indices.iter().map(|&i| ChosenRef::new(id, i)).collect(),
        }
    }

    #[tokio::test]
    async fn creates_then_appends_in_order() {
        let source = collection("a", 4, Format::Static);
        let api = FakeApi::new().with_collection(source.clone());
        let plan = plan_for("a", &[2, 0, 3], "dest_by_bot");

        let result = execute_chunk(&api, 7, &[source], &plan).await;

        assert_eq!(result.total, 3);
        assert_eq!(result.added, 3);
        assert!(result.skipped.is_empty());
        assert!(result.failure.is_none());
        assert_eq!(
            api.destination("dest_by_bot").unwrap(),
            vec!["a-2".to_string(), "a-0".to_string(), "a-3".to_string()]
        );
    }

    #[tokio::test]
    async fn first_item_failure_aborts_only_that_chunk() {
        let source = collection("a", 3, Format::Static);
        let api = FakeApi::new()
            .with_collection(source.clone())
            .fail_create_of("first_by_bot");
        let plans = vec![
            plan_for("a", &[0, 1], "first_by_bot"),
            plan_for("a", &[2], "second_by_bot"),
        ];

        let results = execute_plans(&api, 7, &[source], &plans).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].added, 0);
        assert_eq!(results[0].total, 2);
        assert!(results[0].skipped.is_empty());
        assert!(results[0].failure.is_some());
        assert_eq!(results[1].added, 1);

        // no append was attempted for the aborted chunk
        assert!(!api
            .calls()
            .iter()
            .any(|c| matches!(c, ApiCall::Append { short_name, .. } if short_name == "first_by_bot")));
    }

    #[tokio::test]
    async fn download_failure_of_first_item_aborts_chunk() {
        let source = collection("a", 2, Format::Static);
        let api = FakeApi::new()
            .with_collection(source.clone())
            .fail_download_of("a-0");

        let result = execute_chunk(&api, 7, &[source], &plan_for("a", &[0, 1], "x_by_bot")).await;

        assert_eq!(result.added, 0);
        assert_eq!(result.total, 2);
        assert!(api.destination("x_by_bot").is_none());
    }

    #[tokio::test]
    async fn append_failures_are_recorded_and_loop_continues() {
        let source = collection("a", 5, Format::Static);
        let api = FakeApi::new()
            .with_collection(source.clone())
            .fail_append_of("a-1")
            .fail_download_of("a-3");

        let result =
            execute_chunk(&api, 7, &[source], &plan_for("a", &[0, 1, 2, 3, 4], "x_by_bot")).await;

        assert_eq!(result.total, 5);
        assert_eq!(result.skipped.len(), 2);
        assert_eq!(result.added, result.total - result.skipped.len());
        assert_eq!(
            result.skipped.iter().map(|s| s.index).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert!(result.skipped.iter().all(|s| !s.reason.is_empty()));
        assert_eq!(
            api.destination("x_by_bot").unwrap(),
            vec!["a-0".to_string(), "a-2".to_string(), "a-4".to_string()]
        );
    }

    #[tokio::test]
    async fn dangling_reference_is_skipped() {
        let source = collection("a", 2, Format::Static);
        let api = FakeApi::new().with_collection(source.clone());

        let result = execute_chunk(&api, 7, &[source], &plan_for("a", &[0, 9], "x_by_bot")).await;

        assert_eq!(result.added, 1);
        assert_eq!(result.skipped[0].index, 9);
    }

    #[tokio::test]
    async fn empty_plan_does_nothing() {
        let api = FakeApi::new();
        let result = execute_chunk(&api, 7, &[], &plan_for("a", &[], "x_by_bot")).await;
        assert_eq!(result.total, 0);
        assert!(api.calls().is_empty());
    }
}
