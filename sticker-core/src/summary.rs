//! Source listing pages and the final creation report.

use crate::dialogue::{Button, Callback, Reply};
use crate::types::{ChunkResult, SelectionMode, SourceCollection};

/// One page of a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    /// 1-based page number after clamping
    pub page: usize,
    pub pages: usize,
}

impl<T> Page<T> {
    /// 1-based position of the first item on this page in the whole list.
    pub fn first_position(&self, per_page: usize) -> usize {
        (self.page - 1) * per_page + 1
    }
}

/// Slice out page `page` (1-based), clamping it into `[1, pages]`.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total = items.len();
    let pages = total.div_ceil(per_page).max(1);
    let page = page.clamp(1, pages);
    let start = (page - 1) * per_page;
    let end = (start + per_page).min(total);

    Page {
        items: items[start..end].to_vec(),
        total,
        page,
        pages,
    }
}

/// Label every source item as `<collection> #<n> <tag>`.
pub fn item_labels(collections: &[SourceCollection]) -> Vec<String> {
    collections
        .iter()
        .flat_map(|c| {
            c.items.iter().enumerate().map(move |(i, item)| {
                format!(
                    "{} #{} {}",
                    c.identifier,
                    i + 1,
                    item.tag.as_deref().unwrap_or("")
                )
                .trim_end()
                .to_string()
            })
        })
        .collect()
}

/// Render one page of the source listing with navigation and mode buttons.
pub fn render_summary(collections: &[SourceCollection], page: usize, per_page: usize) -> Reply {
    let labels = item_labels(collections);
    let view = paginate(&labels, page, per_page);
    let first = view.first_position(per_page.max(1));

    let body = if view.items.is_empty() {
        "(empty)".to_string()
    } else {
        view.items
            .iter()
            .enumerate()
            .map(|(i, label)| format!("{}. {label}", first + i))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let mut navigation = Vec::new();
    if view.page > 1 {
        navigation.push(Button::new("◀️", Callback::Page(view.page - 1)));
    }
    if view.page < view.pages {
        navigation.push(Button::new("▶️", Callback::Page(view.page + 1)));
    }

    let mut buttons = Vec::new();
    if !navigation.is_empty() {
        buttons.push(navigation);
    }
    buttons.push(vec![
        Button::new("Select by numbers", Callback::Mode(SelectionMode::Ranges)),
        Button::new("Select by emoji", Callback::Mode(SelectionMode::Tags)),
    ]);

    Reply {
        text: format!(
            "Total items: {}. Page {}/{}.\n{body}",
            view.total, view.page, view.pages
        ),
        buttons,
    }
}

/// Render the final report, one paragraph per created chunk.
pub fn render_report(results: &[ChunkResult], link_host: &str) -> String {
    if results.is_empty() {
        return "Nothing was created.".to_string();
    }

    results
        .iter()
        .map(|r| {
            let skipped = if r.skipped.is_empty() {
                String::new()
            } else {
                format!(", skipped {}", r.skipped.len())
            };
            let failure = r
                .failure
                .as_deref()
                .map(|reason| format!("\nNot created: {reason}"))
                .unwrap_or_default();
            format!(
                "{} [{}] added {}/{}{skipped}{failure}\n{link_host}/addstickers/{}",
                r.title, r.format, r.added, r.total, r.short_name
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
