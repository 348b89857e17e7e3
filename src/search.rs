//! In-memory symbol search and the browse view.
//!
//! Pure functions over a decoded item list: no I/O, no mutation. Every call
//! returns a fresh sequence of borrowed records.

use crate::types::{DocItem, ItemKind};

/// Maximum number of results returned by [`search`].
pub const MAX_RESULTS: usize = 100;

/// Maximum number of modules returned by [`top_level_modules`].
pub const MAX_BROWSE_MODULES: usize = 40;

const SEPARATOR: &str = "::";

/// Ranking tier for a name against a lowercased query. Lower sorts first.
///
/// - 0: name equals the query
/// - 1: name starts with the query
/// - 2: anything else (path-only match)
fn tier(name: &str, query: &str) -> u8 {
    let name = name.to_lowercase();
    if name == query {
        0
    } else if name.starts_with(query) {
        1
    } else {
        2
    }
}

/// Case-insensitive substring search over item paths.
///
/// Results are ordered exact name match, then name prefix match, then everything
/// else; within a tier the original list order is kept. An empty query returns
/// nothing: callers show browse sections instead.
pub fn search<'a>(items: &'a [DocItem], query: &str) -> Vec<&'a DocItem> {
    if query.is_empty() {
        return Vec::new();
    }
    let query = query.to_lowercase();

    let mut results: Vec<(u8, &DocItem)> = items
        .iter()
        .filter(|item| item.path.to_lowercase().contains(&query))
        .map(|item| (tier(&item.name, &query), item))
        .collect();

    // Stable sort: equal tiers keep decode order.
    results.sort_by_key(|(tier, _)| *tier);

    results
        .into_iter()
        .take(MAX_RESULTS)
        .map(|(_, item)| item)
        .collect()
}

/// Modules sitting directly under a crate root (`std::fs`, not `std::os::unix`).
pub fn top_level_modules(items: &[DocItem]) -> Vec<&DocItem> {
    items
        .iter()
        .filter(|item| item.kind == ItemKind::Module && is_top_level(&item.path))
        .take(MAX_BROWSE_MODULES)
        .collect()
}

/// True when the path has no separator after the first one.
fn is_top_level(path: &str) -> bool {
    match path.find(SEPARATOR) {
        Some(first) => !path[first + SEPARATOR.len()..].contains(SEPARATOR),
        None => true,
    }
}
