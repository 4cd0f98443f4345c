//! Groups chosen items by format and splits each group into size-bounded chunks.

use crate::naming::finalize_short_name;
use crate::types::{resolve_ref, ChosenRef, ChunkPlan, CollectionKind, Format, SourceCollection};

/// Naming and sizing inputs for a plan.
#[derive(Debug, Clone)]
pub struct PlanRequest<'a> {
    pub title: &'a str,
    pub raw_short_name: &'a str,
    pub owner_handle: &'a str,
    pub kind: CollectionKind,
    pub max_per_destination: usize,
}

/// Title for chunk `index` (0-based).
pub fn chunk_title(title: &str, index: usize) -> String {
    if index == 0 {
        title.to_string()
    } else {
        format!("{title} ({})", index + 1)
    }
}

/// Group references by item format, keeping first-seen group order and the
/// relative order of references inside each group.
pub fn group_by_format(
    refs: &[ChosenRef],
    collections: &[SourceCollection],
) -> Vec<(Format, Vec<ChosenRef>)> {
    let mut groups: Vec<(Format, Vec<ChosenRef>)> = Vec::new();

    for r in refs {
        let Some(item) = resolve_ref(collections, r) else {
            tracing::warn!(
                collection = %r.source_collection_id,
                index = r.index_in_source,
                "Dropping reference to an unknown item"
            );
            continue;
        };

        match groups.iter_mut().find(|(format, _)| *format == item.format) {
            Some((_, group)) => group.push(r.clone()),
            None => groups.push((item.format, vec![r.clone()])),
        }
    }

    groups
}

/// Build the creation plan: one [`ChunkPlan`] per destination collection.
///
/// Chunks are numbered across all format groups rather than restarting at
/// zero for each group, so a selection mixing formats never produces two
/// destinations with the same short name. A static group of two chunks
/// followed by an animated one yields `name`, `name_2`, `name_3`.
pub fn plan_chunks(
    refs: &[ChosenRef],
    collections: &[SourceCollection],
    request: &PlanRequest<'_>,
) -> Vec<ChunkPlan> {
    let cap = request.max_per_destination.max(1);
    let mut plans = Vec::new();

    for (format, group) in group_by_format(refs, collections) {
        for chunk in group.chunks(cap) {
            let index = plans.len();
            plans.push(ChunkPlan {
                short_name: finalize_short_name(request.raw_short_name, request.owner_handle, index),
                title: chunk_title(request.title, index),
                format,
                kind: request.kind,
                refs: chunk.to_vec(),
            });
        }
    }

    plans
}
