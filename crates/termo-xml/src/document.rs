#![forbid(unsafe_code)]

//! Lookups over a parsed `roxmltree` tree.

use roxmltree::{Attribute, Document, Node, NodeId};
use termo_core::ns;
use std::collections::HashMap;

/// Attribute names registered as IDs on every document.
pub const DEFAULT_ID_ATTRS: [&str; 3] = ["Id", "ID", "id"];

/// Map every ID attribute value (defaults plus `extra`) to its element.
///
/// When a value repeats, the first element in document order wins.
pub fn build_id_map(doc: &Document<'_>, extra: &[String]) -> HashMap<String, NodeId> {
    let mut map = HashMap::new();
    for node in doc.descendants().filter(|n| n.is_element()) {
        let names = DEFAULT_ID_ATTRS
            .iter()
            .copied()
            .chain(extra.iter().map(String::as_str));
        for name in names {
            if let Some(value) = node.attribute(name) {
                map.entry(value.to_owned()).or_insert(node.id());
            }
        }
    }
    map
}

pub fn find_child_element<'a, 'input>(
    parent: Node<'a, 'input>,
    ns: &str,
    local_name: &str,
) -> Option<Node<'a, 'input>> {
    parent.children().find(|n| is_named(n, ns, local_name))
}

pub fn find_child_elements<'a, 'input>(
    parent: Node<'a, 'input>,
    ns: &str,
    local_name: &str,
) -> Vec<Node<'a, 'input>> {
    parent
        .children()
        .filter(|n| is_named(n, ns, local_name))
        .collect()
}

fn is_named(node: &Node<'_, '_>, ns: &str, local_name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local_name
        && node.tag_name().namespace().unwrap_or("") == ns
}

/// First element in document order whose name matches `tag`.
///
/// A qualified tag (`p:name`) must match the element's qualified name as
/// written. An unqualified tag matches the local name in any namespace.
pub fn find_by_tag<'a, 'input>(doc: &'a Document<'input>, tag: &str) -> Option<Node<'a, 'input>> {
    let qualified = tag.contains(':');
    doc.descendants().filter(|n| n.is_element()).find(|n| {
        if qualified {
            element_qname(*n) == tag
        } else {
            n.tag_name().name() == tag
        }
    })
}

/// The element's qualified name exactly as written in the source
/// (`prefix:local` or `local`).
pub fn element_qname<'input>(node: Node<'_, 'input>) -> &'input str {
    let text = node.document().input_text();
    let tag = text.get(node.range().start + 1..).unwrap_or("");
    let end = tag
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(tag.len());
    &tag[..end]
}

/// Attribute names in the element's start tag exactly as written, in
/// source order. Namespace declarations are included.
pub fn written_attribute_names<'input>(node: Node<'_, 'input>) -> Vec<&'input str> {
    let text = node.document().input_text();
    let start = node.range().start + 1 + element_qname(node).len();
    let mut rest = text.get(start..).unwrap_or("");
    let mut names = Vec::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() || rest.starts_with('/') || rest.starts_with('>') {
            break;
        }
        let Some(eq) = rest.find('=') else { break };
        names.push(rest[..eq].trim_end());
        rest = rest[eq + 1..].trim_start();
        let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            break;
        };
        let Some(close) = rest[1..].find(quote) else { break };
        rest = &rest[close + 2..];
    }
    names
}

/// The qualified name `attr` was written with on `node`.
///
/// Several prefixes may be bound to one namespace URI, so the prefix can
/// only come from the source text. `None` when the start tag holds no
/// matching name.
pub fn attribute_qname<'input>(node: Node<'_, 'input>, attr: &Attribute<'_, '_>) -> Option<&'input str> {
    written_attribute_names(node).into_iter().find(|written| match written.split_once(':') {
        None => attr.namespace().is_none() && *written == attr.name(),
        Some(("xmlns", _)) => false,
        Some((prefix, local)) => {
            let bound = if prefix == "xml" {
                Some(ns::XML)
            } else {
                node.lookup_namespace_uri(Some(prefix))
            };
            local == attr.name() && bound.is_some() && bound == attr.namespace()
        }
    })
}

/// The prefix part of a qualified name, if any.
pub fn qname_prefix(qname: &str) -> Option<&str> {
    qname.split_once(':').map(|(prefix, _)| prefix)
}

/// Drop a leading XML declaration (and the whitespace after it).
///
/// Text without a declaration is returned unchanged.
pub fn strip_declaration(text: &str) -> &str {
    let body = text.strip_prefix('\u{feff}').unwrap_or(text);
    let is_decl = body
        .strip_prefix("<?xml")
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_whitespace() || c == '?'));
    if !is_decl {
        return text;
    }
    match body.find("?>") {
        Some(end) => body[end + 2..].trim_start(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_tag_local_and_qualified() {
        let xml = r#"<a:root xmlns:a="urn:a"><a:item n="1"/><item n="2"/></a:root>"#;
        let doc = crate::parse(xml).unwrap();

        let local = find_by_tag(&doc, "item").unwrap();
        assert_eq!(local.attribute("n"), Some("1"));

        let qualified = find_by_tag(&doc, "a:item").unwrap();
        assert_eq!(qualified.attribute("n"), Some("1"));

        assert!(find_by_tag(&doc, "b:item").is_none());
        assert!(find_by_tag(&doc, "missing").is_none());
    }

    #[test]
    fn test_element_qname_from_source() {
        let xml = "<p:root xmlns:p=\"urn:p\">\n  <p:child\n   x=\"1\"/><plain/></p:root>";
        let doc = crate::parse(xml).unwrap();
        let names: Vec<&str> = doc
            .descendants()
            .filter(|n| n.is_element())
            .map(element_qname)
            .collect();
        assert_eq!(names, vec!["p:root", "p:child", "plain"]);
        assert_eq!(qname_prefix("p:child"), Some("p"));
        assert_eq!(qname_prefix("plain"), None);
    }

    #[test]
    fn test_written_attribute_names() {
        let xml = "<p:e xmlns:p=\"urn:p\"\n  a = 'x>y'  p:b=\"2\"/>";
        let doc = crate::parse(xml).unwrap();
        assert_eq!(written_attribute_names(doc.root_element()), vec!["xmlns:p", "a", "p:b"]);
    }

    #[test]
    fn test_attribute_qname_keeps_written_prefix() {
        let xml = r#"<root xmlns:b="urn:x" xmlns:a="urn:x"><e b:k="1" xml:lang="pt" n="2"/></root>"#;
        let doc = crate::parse(xml).unwrap();
        let e = doc.descendants().find(|n| n.has_tag_name("e")).unwrap();
        let names: Vec<&str> = e.attributes().filter_map(|a| attribute_qname(e, &a)).collect();
        assert_eq!(names, vec!["b:k", "xml:lang", "n"]);
    }

    #[test]
    fn test_id_map_first_wins() {
        let xml = r#"<root><a Id="x"/><b id="x"/><c ref="y"/></root>"#;
        let doc = crate::parse(xml).unwrap();
        let map = build_id_map(&doc, &["ref".to_owned()]);
        let x = doc.get_node(map["x"]).unwrap();
        assert_eq!(x.tag_name().name(), "a");
        let y = doc.get_node(map["y"]).unwrap();
        assert_eq!(y.tag_name().name(), "c");
    }

    #[test]
    fn test_strip_declaration() {
        assert_eq!(
            strip_declaration("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root/>"),
            "<root/>"
        );
        assert_eq!(strip_declaration("<root/>"), "<root/>");
        assert_eq!(strip_declaration("<?xml-stylesheet href=\"a\"?><r/>"), "<?xml-stylesheet href=\"a\"?><r/>");
    }
}
