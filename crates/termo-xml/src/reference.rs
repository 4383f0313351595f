#![forbid(unsafe_code)]

//! Same-document URI references (`""` and `#id`).

use roxmltree::{Document, Node, NodeId};
use std::collections::HashMap;
use termo_core::Error;

/// What a `Reference/@URI` points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SameDocumentRef<'u> {
    /// `URI=""`: the whole document without comments.
    WholeDocument,
    /// `URI="#value"`: the element carrying ID `value`, without comments.
    Id(&'u str),
}

/// Classify a reference URI. External references are rejected.
pub fn parse_uri(uri: &str) -> Result<SameDocumentRef<'_>, Error> {
    if uri.is_empty() {
        return Ok(SameDocumentRef::WholeDocument);
    }
    match uri.strip_prefix('#') {
        Some("") => Err(Error::InvalidUri("empty fragment identifier".into())),
        Some(id) => Ok(SameDocumentRef::Id(id)),
        None => Err(Error::InvalidUri(format!("only same-document references are supported: {uri}"))),
    }
}

/// Resolve an ID value using a pre-built ID map.
pub fn resolve_id<'a, 'input>(
    doc: &'a Document<'input>,
    id_map: &HashMap<String, NodeId>,
    id: &str,
) -> Result<Node<'a, 'input>, Error> {
    id_map
        .get(id)
        .and_then(|nid| doc.get_node(*nid))
        .ok_or_else(|| Error::InvalidUri(format!("ID not found: {id}")))
}

/// Whether `ancestor` is `node` or one of its ancestors.
pub fn is_ancestor_or_self(ancestor: Node<'_, '_>, node: Node<'_, '_>) -> bool {
    node.ancestors().any(|n| n.id() == ancestor.id())
}
