#![forbid(unsafe_code)]

//! Inclusive Canonical XML 1.0.
//!
//! Algorithm URI: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315`
//! (`#WithComments` to keep comments).
//!
//! Every in-scope namespace of an output element is rendered unless the
//! nearest output ancestor already rendered the same binding. The apex of
//! a document subset therefore carries all of its inherited namespaces, and
//! also the `xml:*` attributes of its ancestors.

use crate::render::{self, Attr, NsDecl};
use roxmltree::{Document, Node, NodeType};
use std::collections::BTreeMap;
use termo_core::{ns, Error};
use termo_xml::document::element_qname;
use termo_xml::nodeset::NodeSet;

/// Canonicalize `doc` (or the subset named by `node_set`).
pub fn canonicalize(
    doc: &Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
) -> Result<Vec<u8>, Error> {
    let mut output = Vec::new();
    let ctx = C14nContext {
        with_comments,
        node_set,
    };
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new());
    Ok(output)
}

struct C14nContext<'a> {
    with_comments: bool,
    node_set: Option<&'a NodeSet>,
}

impl C14nContext<'_> {
    fn process_node(
        &self,
        node: Node<'_, '_>,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) {
        match node.node_type() {
            NodeType::Root => {
                for child in node.children() {
                    self.process_node(child, output, rendered_ns);
                }
            }
            NodeType::Element => self.process_element(node, output, rendered_ns),
            _ => render::write_leaf(output, node, self.with_comments, self.node_set),
        }
    }

    fn process_element(
        &self,
        node: Node<'_, '_>,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) {
        if !render::is_visible(self.node_set, &node) {
            // Invisible elements contribute nothing themselves; visible
            // descendants compare against the nearest visible ancestor.
            for child in node.children() {
                self.process_node(child, output, rendered_ns);
            }
            return;
        }

        let in_scope = render::in_scope_namespaces(node);

        let mut ns_decls: Vec<NsDecl> = in_scope
            .iter()
            .filter(|(prefix, uri)| rendered_ns.get(*prefix) != Some(*uri))
            .map(|(prefix, uri)| NsDecl::new(prefix, uri))
            .collect();

        let parent_had_default = rendered_ns.get("").is_some_and(|uri| !uri.is_empty());
        if parent_had_default && !in_scope.contains_key("") {
            ns_decls.push(NsDecl::new("", ""));
        }
        ns_decls.sort();

        let mut attrs = render::sorted_attributes(node);
        if self.node_set.is_some() && !self.parent_visible(node) {
            let inherited = inherited_xml_attrs(node, &attrs);
            attrs.extend(inherited);
            attrs.sort();
        }

        let qname = element_qname(node);
        render::write_start_tag(output, qname, &ns_decls, &attrs);
        for child in node.children() {
            self.process_node(child, output, &in_scope);
        }
        render::write_end_tag(output, qname);
    }

    fn parent_visible(&self, node: Node<'_, '_>) -> bool {
        node.parent()
            .is_some_and(|p| p.is_element() && render::is_visible(self.node_set, &p))
    }
}

/// `xml:*` attributes of the ancestors, nearest first wins, minus those
/// the element already carries.
fn inherited_xml_attrs(node: Node<'_, '_>, existing: &[Attr]) -> Vec<Attr> {
    let mut inherited: BTreeMap<&str, &str> = BTreeMap::new();
    for ancestor in node.ancestors().skip(1).filter(|n| n.is_element()) {
        for attr in ancestor.attributes() {
            if attr.namespace() == Some(ns::XML) {
                inherited.entry(attr.name()).or_insert(attr.value());
            }
        }
    }

    inherited
        .into_iter()
        .filter(|(name, _)| {
            !existing
                .iter()
                .any(|a| a.ns_uri == ns::XML && a.local_name == *name)
        })
        .map(|(name, value)| Attr {
            ns_uri: ns::XML.to_owned(),
            local_name: name.to_owned(),
            qualified_name: format!("xml:{name}"),
            value: value.to_owned(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn c14n(xml: &str) -> String {
        let doc = termo_xml::parse(xml).unwrap();
        String::from_utf8(canonicalize(&doc, false, None).unwrap()).unwrap()
    }

    fn c14n_subtree(xml: &str, local: &str) -> String {
        let doc = termo_xml::parse(xml).unwrap();
        let node = doc.descendants().find(|n| n.has_tag_name(local)).unwrap();
        let set = NodeSet::tree_without_comments(node);
        String::from_utf8(canonicalize(&doc, false, Some(&set)).unwrap()).unwrap()
    }

    #[test]
    fn test_simple_c14n() {
        assert_eq!(c14n(r#"<root><a b="1" a="2"/></root>"#), r#"<root><a a="2" b="1"></a></root>"#);
    }

    #[test]
    fn test_declaration_dtd_and_comments_dropped() {
        let xml = "<?xml version=\"1.0\"?>\n<!DOCTYPE root [<!ENTITY e \"v\">]>\n<!-- head --><root>x<!-- in -->y</root>";
        assert_eq!(c14n(xml), "<root>xy</root>");
    }

    #[test]
    fn test_with_comments_document_level_newlines() {
        let xml = "<?pi data?><!-- a --><root/><!-- b -->";
        let doc = termo_xml::parse(xml).unwrap();
        let out = String::from_utf8(canonicalize(&doc, true, None).unwrap()).unwrap();
        assert_eq!(out, "<?pi data?>\n<!-- a -->\n<root></root>\n<!-- b -->");
    }

    #[test]
    fn test_redundant_namespaces_removed() {
        let xml = r#"<a:root xmlns:a="urn:a" xmlns="urn:d"><child xmlns="urn:d" xmlns:a="urn:a"><a:x/></child></a:root>"#;
        assert_eq!(
            c14n(xml),
            r#"<a:root xmlns="urn:d" xmlns:a="urn:a"><child><a:x></a:x></child></a:root>"#
        );
    }

    #[test]
    fn test_default_namespace_undeclared() {
        let xml = r#"<root xmlns="urn:d"><plain xmlns=""><inner/></plain></root>"#;
        assert_eq!(
            c14n(xml),
            r#"<root xmlns="urn:d"><plain xmlns=""><inner></inner></plain></root>"#
        );
    }

    #[test]
    fn test_whitespace_and_escaping_preserved() {
        let xml = "<root attr=\"a&#9;b&#10;&quot;\">\n  <v>1 &lt; 2 &amp;&gt; 3</v>\r\n</root>";
        assert_eq!(
            c14n(xml),
            "<root attr=\"a&#x9;b&#xA;&quot;\">\n  <v>1 &lt; 2 &amp;&gt; 3</v>\n</root>"
        );
    }

    #[test]
    fn test_subtree_inherits_namespaces_and_xml_attrs() {
        let xml = r#"<root xmlns="urn:d" xmlns:p="urn:p" xml:lang="pt"><!-- c --><p:item id="x1"><!-- c -->v</p:item></root>"#;
        assert_eq!(
            c14n_subtree(xml, "item"),
            r#"<p:item xmlns="urn:d" xmlns:p="urn:p" id="x1" xml:lang="pt">v</p:item>"#
        );
    }

    #[test]
    fn test_subtree_minus_enveloped_child() {
        let xml = r#"<root><data>1</data><Signature xmlns="http://www.w3.org/2000/09/xmldsig#"><x/></Signature></root>"#;
        let doc = termo_xml::parse(xml).unwrap();
        let sig = doc.descendants().find(|n| n.has_tag_name((ns::DSIG, "Signature"))).unwrap();
        let mut set = NodeSet::all_without_comments(&doc);
        set.subtract_tree(sig);
        let out = String::from_utf8(canonicalize(&doc, false, Some(&set)).unwrap()).unwrap();
        assert_eq!(out, "<root><data>1</data></root>");
    }
}
