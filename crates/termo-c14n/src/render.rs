#![forbid(unsafe_code)]

//! Rendering pieces shared by the inclusive and exclusive canonicalizers.

use crate::escape;
use roxmltree::{Attribute, Node, NodeType};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use termo_core::ns;
use termo_xml::nodeset::NodeSet;

/// A namespace declaration to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    /// `""` for the default namespace.
    pub prefix: String,
    /// `""` undeclares the default namespace.
    pub uri: String,
}

impl NsDecl {
    pub fn new(prefix: &str, uri: &str) -> Self {
        Self {
            prefix: prefix.to_owned(),
            uri: uri.to_owned(),
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        if self.prefix.is_empty() {
            out.extend_from_slice(b" xmlns=\"");
        } else {
            out.extend_from_slice(b" xmlns:");
            out.extend_from_slice(self.prefix.as_bytes());
            out.extend_from_slice(b"=\"");
        }
        escape::write_attr(out, &self.uri);
        out.push(b'"');
    }
}

impl Ord for NsDecl {
    // Default namespace first, then by prefix.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.prefix.is_empty(), other.prefix.is_empty()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self.prefix.cmp(&other.prefix),
        }
    }
}

impl PartialOrd for NsDecl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// `""` for an unqualified attribute.
    pub ns_uri: String,
    pub local_name: String,
    pub qualified_name: String,
    pub value: String,
}

impl Attr {
    pub fn from_node(node: Node<'_, '_>, attr: &Attribute<'_, '_>) -> Self {
        Self {
            ns_uri: attr.namespace().unwrap_or("").to_owned(),
            local_name: attr.name().to_owned(),
            qualified_name: attribute_qname(node, attr),
            value: attr.value().to_owned(),
        }
    }

    /// Prefix used by a namespaced attribute, `None` when unqualified.
    pub fn prefix(&self) -> Option<&str> {
        termo_xml::document::qname_prefix(&self.qualified_name)
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(b' ');
        out.extend_from_slice(self.qualified_name.as_bytes());
        out.extend_from_slice(b"=\"");
        escape::write_attr(out, &self.value);
        out.push(b'"');
    }
}

impl Ord for Attr {
    // Unqualified attributes first (by local name), then by
    // (namespace URI, local name).
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.ns_uri.is_empty(), other.ns_uri.is_empty()) {
            (true, true) => self.local_name.cmp(&other.local_name),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .ns_uri
                .cmp(&other.ns_uri)
                .then_with(|| self.local_name.cmp(&other.local_name)),
        }
    }
}

impl PartialOrd for Attr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The attribute axis of `node`, sorted into canonical order.
pub fn sorted_attributes(node: Node<'_, '_>) -> Vec<Attr> {
    let mut attrs: Vec<Attr> = node
        .attributes()
        .map(|a| Attr::from_node(node, &a))
        .collect();
    attrs.sort();
    attrs
}

/// Qualified attribute name as written in the start tag.
fn attribute_qname(node: Node<'_, '_>, attr: &Attribute<'_, '_>) -> String {
    if let Some(written) = termo_xml::document::attribute_qname(node, attr) {
        return written.to_owned();
    }
    match attr.namespace() {
        Some(ns::XML) => format!("xml:{}", attr.name()),
        _ => attr.name().to_owned(),
    }
}

/// In-scope namespace bindings of an element, `xml` excluded.
///
/// Each prefix is resolved through the element itself so the nearest
/// declaration wins and `xmlns=""` leaves no default binding.
pub fn in_scope_namespaces(node: Node<'_, '_>) -> BTreeMap<String, String> {
    let mut result = BTreeMap::new();
    for namespace in node.namespaces() {
        let prefix = namespace.name();
        if prefix == Some("xml") {
            continue;
        }
        if let Some(uri) = node.lookup_namespace_uri(prefix).filter(|u| !u.is_empty()) {
            result.insert(prefix.unwrap_or("").to_owned(), uri.to_owned());
        }
    }
    result
}

pub fn write_start_tag(out: &mut Vec<u8>, qname: &str, decls: &[NsDecl], attrs: &[Attr]) {
    out.push(b'<');
    out.extend_from_slice(qname.as_bytes());
    for decl in decls {
        decl.write_to(out);
    }
    for attr in attrs {
        attr.write_to(out);
    }
    out.push(b'>');
}

pub fn write_end_tag(out: &mut Vec<u8>, qname: &str) {
    out.extend_from_slice(b"</");
    out.extend_from_slice(qname.as_bytes());
    out.push(b'>');
}

/// Whether a node is in the subset being canonicalized.
pub fn is_visible(node_set: Option<&NodeSet>, node: &Node<'_, '_>) -> bool {
    node_set.map_or(true, |set| set.contains(node))
}

/// Render a text, comment or processing-instruction node.
///
/// Comments and PIs that are children of the document node are separated
/// from the document element by a single LF: after them when they precede
/// it, before them when they follow it.
pub fn write_leaf(out: &mut Vec<u8>, node: Node<'_, '_>, with_comments: bool, node_set: Option<&NodeSet>) {
    if !is_visible(node_set, &node) {
        return;
    }
    match node.node_type() {
        NodeType::Text => escape::write_text(out, node.text().unwrap_or("")),
        NodeType::Comment if with_comments => {
            let top_level = at_document_level(node);
            if top_level && node.prev_siblings().any(|s| s.is_element()) {
                out.push(b'\n');
            }
            out.extend_from_slice(b"<!--");
            out.extend_from_slice(node.text().unwrap_or("").as_bytes());
            out.extend_from_slice(b"-->");
            if top_level && node.next_siblings().any(|s| s.is_element()) {
                out.push(b'\n');
            }
        }
        NodeType::PI => {
            let Some(pi) = node.pi() else { return };
            let top_level = at_document_level(node);
            if top_level && node.prev_siblings().any(|s| s.is_element()) {
                out.push(b'\n');
            }
            out.extend_from_slice(b"<?");
            out.extend_from_slice(pi.target.as_bytes());
            if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
                out.push(b' ');
                escape::write_pi(out, value);
            }
            out.extend_from_slice(b"?>");
            if top_level && node.next_siblings().any(|s| s.is_element()) {
                out.push(b'\n');
            }
        }
        _ => {}
    }
}

fn at_document_level(node: Node<'_, '_>) -> bool {
    node.parent().is_some_and(|p| p.node_type() == NodeType::Root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_order() {
        let doc = termo_xml::parse(
            r#"<e xmlns:b="urn:b" xmlns:a="urn:a" z="1" b:y="2" a:y="3" a="4" xml:lang="pt"/>"#,
        )
        .unwrap();
        let names: Vec<String> = sorted_attributes(doc.root_element())
            .into_iter()
            .map(|a| a.qualified_name)
            .collect();
        assert_eq!(names, vec!["a", "z", "xml:lang", "a:y", "b:y"]);
    }

    #[test]
    fn test_aliased_prefix_kept_as_written() {
        let doc = termo_xml::parse(r#"<root xmlns:b="urn:x" xmlns:a="urn:x"><e b:k="1" a:j="2"/></root>"#).unwrap();
        let e = doc.descendants().find(|n| n.has_tag_name("e")).unwrap();
        let names: Vec<String> = sorted_attributes(e).into_iter().map(|a| a.qualified_name).collect();
        assert_eq!(names, vec!["a:j", "b:k"]);
    }

    #[test]
    fn test_ns_decl_order() {
        let mut decls = vec![NsDecl::new("b", "urn:b"), NsDecl::new("", "urn:d"), NsDecl::new("a", "urn:a")];
        decls.sort();
        let prefixes: Vec<&str> = decls.iter().map(|d| d.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["", "a", "b"]);
    }

    #[test]
    fn test_in_scope_nearest_wins() {
        let doc = termo_xml::parse(
            r#"<r xmlns="urn:d" xmlns:p="urn:p1"><m xmlns:p="urn:p2"><n xmlns=""/></m></r>"#,
        )
        .unwrap();
        let n = doc.descendants().find(|n| n.has_tag_name("n")).unwrap();
        let scope = in_scope_namespaces(n);
        assert_eq!(scope.get("p").map(String::as_str), Some("urn:p2"));
        assert!(!scope.contains_key(""));
        assert!(!scope.contains_key("xml"));
    }
}
