//! Symbol records produced by the decoder and consumed by search and the stores.

use rmcp::schemars;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a documented symbol.
///
/// DO NOT add doc comments to individual variants - this causes schemars to generate
/// `oneOf` schemas instead of simple `enum` arrays, breaking MCP client enum handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
pub enum ItemKind {
    #[serde(rename = "module")]
    Module,
    #[serde(rename = "struct")]
    Struct,
    #[serde(rename = "enum")]
    Enum,
    #[serde(rename = "trait")]
    Trait,
    #[serde(rename = "fn")]
    Function,
    #[serde(rename = "macro")]
    Macro,
    #[serde(rename = "const")]
    Constant,
    #[serde(rename = "static")]
    Static,
    #[serde(rename = "primitive")]
    Primitive,
    #[serde(rename = "type")]
    TypeAlias,
    #[serde(rename = "keyword")]
    Keyword,
    #[serde(rename = "union")]
    Union,
    #[serde(rename = "attr")]
    Attribute,
    #[serde(rename = "derive")]
    Derive,
    #[serde(rename = "other")]
    Other,
}

impl ItemKind {
    /// Map a search-index kind code to a kind.
    ///
    /// Codes are `'A' + ordinal` in the generator's item-type table. Returns `None`
    /// for codes this crate does not know; callers substitute [`ItemKind::Other`].
    pub fn from_code(code: char) -> Option<Self> {
        let kind = match code {
            'A' => Self::Module,
            'D' => Self::Struct,
            'E' => Self::Enum,
            'F' => Self::Function,
            'G' => Self::TypeAlias,
            'H' => Self::Static,
            'I' => Self::Trait,
            'O' => Self::Macro,
            'P' => Self::Primitive,
            'R' => Self::Constant,
            'T' => Self::Union,
            'V' => Self::Keyword,
            'X' => Self::Attribute,
            'Y' => Self::Derive,
            _ => return None,
        };
        Some(kind)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Trait => "trait",
            Self::Function => "fn",
            Self::Macro => "macro",
            Self::Constant => "const",
            Self::Static => "static",
            Self::Primitive => "primitive",
            Self::TypeAlias => "type",
            Self::Keyword => "keyword",
            Self::Union => "union",
            Self::Attribute => "attr",
            Self::Derive => "derive",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One documented symbol.
///
/// `url` is derived from `(crate, path, kind)` at decode time. `path` is not unique:
/// re-exports and overloads share it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocItem {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub url: String,
}
