//! Mapping a parsed crate section onto its aligned tables.
//!
//! Components form an append-only arena: each names an optional parent by index,
//! and that index must precede the component itself. The check is explicit so a
//! malformed payload can never assemble a cyclic or forward-pointing path.

use super::literal::{Literal, Node};
use crate::error::DecodeError;

/// Path separator used in fully-qualified paths.
pub(crate) const PATH_SEPARATOR: &str = "::";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Component {
    pub(crate) name: String,
    pub(crate) parent: Option<usize>,
}

/// The decode tables for one crate. Discarded once records are built.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct CrateTables {
    pub(crate) names: Vec<String>,
    pub(crate) kinds: Vec<char>,
    /// Enclosing component per item; `None` means the crate root.
    pub(crate) parents: Vec<Option<usize>>,
    pub(crate) components: Vec<Component>,
}

impl CrateTables {
    pub(crate) fn from_node(node: Node) -> Result<Self, DecodeError> {
        let tables = match node.value {
            Literal::Array(tables) => tables,
            other => return Err(mismatch(node.pos, "crate section", &other)),
        };

        if tables.is_empty() {
            return Ok(Self::default());
        }
        if !matches!(tables.len(), 3 | 4) {
            return Err(DecodeError::new(
                node.pos,
                format!("crate section has {} tables, expected 3 or 4", tables.len()),
            ));
        }

        let mut tables = tables.into_iter();
        let (Some(names_node), Some(kinds_node), Some(parents_node)) =
            (tables.next(), tables.next(), tables.next())
        else {
            return Err(DecodeError::new(node.pos, "crate section is missing tables"));
        };

        let components = match tables.next() {
            Some(node) => components(node)?,
            None => Vec::new(),
        };
        let (names_pos, names) = names(names_node)?;
        let (kinds_pos, kinds) = kinds(kinds_node)?;
        let (parents_pos, parents) = parents(parents_node, components.len())?;

        if kinds.len() != names.len() {
            return Err(DecodeError::new(
                kinds_pos,
                format!("{} kind codes for {} names", kinds.len(), names.len()),
            ));
        }
        if parents.len() != names.len() {
            return Err(DecodeError::new(
                parents_pos,
                format!("{} parent entries for {} names", parents.len(), names.len()),
            ));
        }
        tracing::trace!(items = names.len(), names_pos, "Interpreted crate tables");

        Ok(Self {
            names,
            kinds,
            parents,
            components,
        })
    }

    /// Fully-qualified path of every component, in arena order.
    pub(crate) fn component_paths(&self, crate_name: &str) -> Vec<String> {
        let mut paths: Vec<String> = Vec::with_capacity(self.components.len());
        for component in &self.components {
            let parent = component.parent.map_or(crate_name, |p| paths[p].as_str());
            let path = format!("{parent}{PATH_SEPARATOR}{}", component.name);
            paths.push(path);
        }
        paths
    }
}

fn mismatch(pos: usize, what: &str, found: &Literal) -> DecodeError {
    DecodeError::new(pos, format!("{what} must be an array, found {}", found.describe()))
}

fn non_empty_string(node: Node, what: &str) -> Result<String, DecodeError> {
    match node.value {
        Literal::Str(s) if !s.is_empty() => Ok(s),
        Literal::Str(_) => Err(DecodeError::new(node.pos, format!("empty {what}"))),
        other => Err(DecodeError::new(
            node.pos,
            format!("{what} must be a string, found {}", other.describe()),
        )),
    }
}

fn index(node: &Node, what: &str) -> Result<Option<usize>, DecodeError> {
    match node.value {
        Literal::Null => Ok(None),
        Literal::Int(i) => usize::try_from(i)
            .map(Some)
            .map_err(|_| DecodeError::new(node.pos, format!("negative {what} index {i}"))),
        ref other => Err(DecodeError::new(
            node.pos,
            format!("{what} must be an index or null, found {}", other.describe()),
        )),
    }
}

fn names(node: Node) -> Result<(usize, Vec<String>), DecodeError> {
    let items = match node.value {
        Literal::Array(items) => items,
        other => return Err(mismatch(node.pos, "name table", &other)),
    };
    let names = items
        .into_iter()
        .map(|n| non_empty_string(n, "item name"))
        .collect::<Result<_, _>>()?;
    Ok((node.pos, names))
}

/// Either one string with a code per character, or an array of one-character strings.
fn kinds(node: Node) -> Result<(usize, Vec<char>), DecodeError> {
    let codes = match node.value {
        Literal::Str(codes) => codes.chars().collect(),
        Literal::Array(items) => items
            .into_iter()
            .map(|n| {
                let pos = n.pos;
                let code = non_empty_string(n, "kind code")?;
                let mut chars = code.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(DecodeError::new(pos, format!("kind code {code:?} is not one character"))),
                }
            })
            .collect::<Result<_, _>>()?,
        other => {
            return Err(DecodeError::new(
                node.pos,
                format!("kind table must be a string or array, found {}", other.describe()),
            ));
        }
    };
    Ok((node.pos, codes))
}

fn parents(node: Node, component_count: usize) -> Result<(usize, Vec<Option<usize>>), DecodeError> {
    let items = match node.value {
        Literal::Array(items) => items,
        other => return Err(mismatch(node.pos, "parent table", &other)),
    };

    let mut parents = Vec::with_capacity(items.len());
    for item in &items {
        let parent = index(item, "parent")?;
        if let Some(p) = parent
            && p >= component_count
        {
            return Err(DecodeError::new(
                item.pos,
                format!("parent {p} is out of range ({component_count} components)"),
            ));
        }
        parents.push(parent);
    }
    Ok((node.pos, parents))
}

fn components(node: Node) -> Result<Vec<Component>, DecodeError> {
    let items = match node.value {
        Literal::Array(items) => items,
        other => return Err(mismatch(node.pos, "component table", &other)),
    };

    let mut components = Vec::with_capacity(items.len());
    for (position, item) in items.into_iter().enumerate() {
        let pos = item.pos;
        let fields = match item.value {
            Literal::Array(fields) => fields,
            other => return Err(mismatch(pos, "component", &other)),
        };
        let [name, parent] = <[Node; 2]>::try_from(fields).map_err(|fields| {
            DecodeError::new(
                pos,
                format!("component has {} fields, expected [name, parent]", fields.len()),
            )
        })?;

        let parent_index = index(&parent, "component parent")?;
        if let Some(p) = parent_index
            && p >= position
        {
            return Err(DecodeError::new(
                parent.pos,
                format!("component {position} references parent {p}, which does not precede it"),
            ));
        }

        components.push(Component {
            name: non_empty_string(name, "component name")?,
            parent: parent_index,
        });
    }
    Ok(components)
}
