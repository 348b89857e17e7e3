//! Search-index decoding.
//!
//! The generator emits a script that assigns one compact section per crate:
//!
//! ```text
//! searchIndex["std"] = [
//!     ["collections", "HashMap", "swap"],      // item names
//!     "ADF",                                   // one kind code per item
//!     [null, 0, 1],                            // enclosing component per item
//!     [["collections", null], ["mem", null]]   // components: [name, parent]
//! ];
//! ```
//!
//! Decoding isolates each section, reads it with a literal-only reader, checks the
//! tables, rebuilds paths and attaches URLs. The whole pass is synchronous and
//! owns everything it produces.

mod isolate;
mod literal;
mod tables;
mod url;

use crate::error::DecodeError;
use crate::types::{DocItem, ItemKind};
use std::collections::BTreeMap;
use tables::{CrateTables, PATH_SEPARATOR};
use url::item_url;

/// Counters describing one decode pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Crate sections found, including empty ones.
    pub crates: usize,
    /// Records produced.
    pub items: usize,
    /// Items dropped because their kind has no URL template.
    pub unresolvable: usize,
    /// Unknown kind codes that were read as `other`, with occurrence counts.
    pub substituted_kinds: BTreeMap<char, usize>,
}

/// Output of a decode pass: records in payload order plus statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedIndex {
    pub items: Vec<DocItem>,
    pub stats: DecodeStats,
}

/// Decode a fetched search-index script.
///
/// `doc_root` is the documentation root item URLs are built on; it must end with `/`.
pub fn decode(text: &str, doc_root: &str) -> Result<DecodedIndex, DecodeError> {
    let start = std::time::Instant::now();
    let mut index = DecodedIndex::default();

    for section in isolate::sections(text)? {
        let node = literal::parse(section.text, section.start)?;
        let tables = CrateTables::from_node(node)?;
        append_crate(&mut index, section.crate_name, &tables, doc_root);
        index.stats.crates += 1;
    }

    let stats = &index.stats;
    if stats.unresolvable > 0 || !stats.substituted_kinds.is_empty() {
        tracing::warn!(
            unresolvable = stats.unresolvable,
            substituted = ?stats.substituted_kinds,
            "Some index items have no documentation page and were skipped"
        );
    }
    tracing::info!(
        crates = stats.crates,
        items = stats.items,
        elapsed = ?start.elapsed(),
        "Decoded search index"
    );

    Ok(index)
}

fn append_crate(index: &mut DecodedIndex, crate_name: &str, tables: &CrateTables, doc_root: &str) {
    let component_paths = tables.component_paths(crate_name);

    for ((name, &code), parent) in tables.names.iter().zip(&tables.kinds).zip(&tables.parents) {
        let kind = ItemKind::from_code(code).unwrap_or_else(|| {
            *index.stats.substituted_kinds.entry(code).or_default() += 1;
            ItemKind::Other
        });

        let parent_path = parent.map_or(crate_name, |p| component_paths[p].as_str());

        let Some(url) = item_url(doc_root, parent_path, name, kind) else {
            tracing::debug!(crate_name, name = name.as_str(), %kind, "No URL template for item");
            index.stats.unresolvable += 1;
            continue;
        };

        index.items.push(DocItem {
            name: name.clone(),
            path: format!("{parent_path}{PATH_SEPARATOR}{name}"),
            kind,
            url,
        });
        index.stats.items += 1;
    }
}
