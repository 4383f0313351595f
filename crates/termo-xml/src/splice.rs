#![forbid(unsafe_code)]

//! Text-level edits at node byte ranges.

use crate::document::element_qname;
use roxmltree::Node;
use std::ops::Range;
use termo_core::Error;

/// Insert `fragment` as the last child of `parent`, returning new text.
///
/// `parent` must come from a tree parsed from `text`. A self-closing
/// parent (`<a/>`) is expanded into a start/end pair.
pub fn append_child(text: &str, parent: Node<'_, '_>, fragment: &str) -> Result<String, Error> {
    if !parent.is_element() {
        return Err(Error::XmlParse("insertion point is not an element".into()));
    }
    let range = parent.range();
    let source = text
        .get(range.clone())
        .ok_or_else(|| Error::XmlParse("node range outside document text".into()))?;

    let mut out = String::with_capacity(text.len() + fragment.len() + 16);
    if source.ends_with("/>") && !source.contains("</") {
        let close = range.end - 2;
        out.push_str(&text[..close]);
        out.push('>');
        out.push_str(fragment);
        out.push_str("</");
        out.push_str(element_qname(parent));
        out.push('>');
        out.push_str(&text[range.end..]);
    } else {
        let end_tag = source
            .rfind("</")
            .map(|i| range.start + i)
            .ok_or_else(|| Error::XmlParse("element has no end tag".into()))?;
        out.push_str(&text[..end_tag]);
        out.push_str(fragment);
        out.push_str(&text[end_tag..]);
    }
    Ok(out)
}

/// Replace `range` of `text` with `replacement`.
pub fn replace_range(text: &str, range: Range<usize>, replacement: &str) -> Result<String, Error> {
    if range.start > range.end || text.get(range.clone()).is_none() {
        return Err(Error::XmlParse("replacement range outside document text".into()));
    }
    let mut out = String::with_capacity(text.len() - range.len() + replacement.len());
    out.push_str(&text[..range.start]);
    out.push_str(replacement);
    out.push_str(&text[range.end..]);
    Ok(out)
}
