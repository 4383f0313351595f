#![forbid(unsafe_code)]

//! Exclusive XML Canonicalization 1.0.
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//! (`#WithComments` to keep comments).
//!
//! Only namespaces visibly utilized by an output element (its own prefix
//! and the prefixes of its attributes) are rendered, plus any prefix named
//! in the `InclusiveNamespaces PrefixList`. `xml:*` attributes are never
//! inherited.

use crate::render::{self, NsDecl};
use roxmltree::{Document, Node, NodeType};
use std::collections::{BTreeMap, BTreeSet};
use termo_core::Error;
use termo_xml::document::{element_qname, qname_prefix};
use termo_xml::nodeset::NodeSet;

/// Canonicalize `doc` (or the subset named by `node_set`).
///
/// `inclusive_prefixes` uses `#default` for the default namespace.
pub fn canonicalize(
    doc: &Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let inclusive: BTreeSet<String> = inclusive_prefixes
        .iter()
        .map(|p| if p == "#default" { String::new() } else { p.clone() })
        .collect();

    let mut output = Vec::new();
    let ctx = ExcC14nContext {
        with_comments,
        node_set,
        inclusive,
    };
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new());
    Ok(output)
}

struct ExcC14nContext<'a> {
    with_comments: bool,
    node_set: Option<&'a NodeSet>,
    inclusive: BTreeSet<String>,
}

impl ExcC14nContext<'_> {
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
            for child in node.children() {
                self.process_node(child, output, rendered_ns);
            }
            return;
        }

        let in_scope = render::in_scope_namespaces(node);
        let qname = element_qname(node);
        let attrs = render::sorted_attributes(node);

        let mut utilized: BTreeSet<&str> = BTreeSet::new();
        utilized.insert(qname_prefix(qname).unwrap_or(""));
        for attr in &attrs {
            if let Some(prefix) = attr.prefix().filter(|p| *p != "xml") {
                utilized.insert(prefix);
            }
        }
        for prefix in &self.inclusive {
            if in_scope.contains_key(prefix) {
                utilized.insert(prefix.as_str());
            }
        }

        let mut ns_decls = Vec::new();
        for prefix in utilized {
            let uri = in_scope.get(prefix).map(String::as_str).unwrap_or("");
            let rendered = rendered_ns.get(prefix).map(String::as_str);
            let needed = if uri.is_empty() {
                // An empty binding only matters when undoing a rendered default.
                prefix.is_empty() && rendered.is_some_and(|r| !r.is_empty())
            } else {
                rendered != Some(uri)
            };
            if needed {
                ns_decls.push(NsDecl::new(prefix, uri));
            }
        }
        ns_decls.sort();

        let mut child_ns = rendered_ns.clone();
        for decl in &ns_decls {
            child_ns.insert(decl.prefix.clone(), decl.uri.clone());
        }

        render::write_start_tag(output, qname, &ns_decls, &attrs);
        for child in node.children() {
            self.process_node(child, output, &child_ns);
        }
        render::write_end_tag(output, qname);
    }
}
