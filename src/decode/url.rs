//! Canonical documentation URLs for decoded items.

use crate::types::ItemKind;

/// Crate whose pages host primitive and keyword documentation.
const REFERENCE_CRATE: &str = "std";

/// Build the documentation URL for an item, or `None` if its kind has no page.
///
/// `parent_path` is the `::`-joined path of the enclosing module (at least the
/// crate name). `doc_root` must end with `/`.
pub(crate) fn item_url(
    doc_root: &str,
    parent_path: &str,
    name: &str,
    kind: ItemKind,
) -> Option<String> {
    let dir = parent_path.replace("::", "/");

    let url = match kind {
        ItemKind::Module => format!("{doc_root}{dir}/{name}/index.html"),
        ItemKind::Struct
        | ItemKind::Enum
        | ItemKind::Trait
        | ItemKind::Union
        | ItemKind::TypeAlias => format!("{doc_root}{dir}/{}.{name}.html", page_prefix(kind)?),
        ItemKind::Function
        | ItemKind::Macro
        | ItemKind::Constant
        | ItemKind::Static
        | ItemKind::Attribute
        | ItemKind::Derive => {
            let anchor = name.trim_end_matches('!');
            format!("{doc_root}{dir}/index.html#{}.{anchor}", page_prefix(kind)?)
        }
        ItemKind::Primitive | ItemKind::Keyword => {
            format!("{doc_root}{REFERENCE_CRATE}/{}.{name}.html", page_prefix(kind)?)
        }
        ItemKind::Other => return None,
    };

    Some(url)
}

/// The generator's file/anchor prefix for a kind.
const fn page_prefix(kind: ItemKind) -> Option<&'static str> {
    let prefix = match kind {
        ItemKind::Struct => "struct",
        ItemKind::Enum => "enum",
        ItemKind::Trait => "trait",
        ItemKind::Union => "union",
        ItemKind::TypeAlias => "type",
        ItemKind::Function => "fn",
        ItemKind::Macro => "macro",
        ItemKind::Constant => "constant",
        ItemKind::Static => "static",
        ItemKind::Attribute => "attr",
        ItemKind::Derive => "derive",
        ItemKind::Primitive => "primitive",
        ItemKind::Keyword => "keyword",
        ItemKind::Module | ItemKind::Other => return None,
    };
    Some(prefix)
}
