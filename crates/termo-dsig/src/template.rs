#![forbid(unsafe_code)]

//! Locating the signature target and rendering the `Signature` element.

use crate::options::SignOptions;
use roxmltree::{Document, Node, NodeId};
use termo_c14n::C14nMode;
use termo_core::{algorithm, ns, Error};
use termo_xml::writer::XmlWriter;
use termo_xml::NodeSet;

/// Everything needed to digest the target and place the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureDescriptor {
    pub c14n: C14nMode,
    pub digest_method: &'static str,
    pub signature_method: &'static str,
    /// `""` for the whole document, `#value` for the target element.
    pub reference_uri: String,
    /// The element being signed.
    pub target: NodeId,
    /// The element that receives `Signature` as its last child.
    pub insertion_point: NodeId,
}

impl SignatureDescriptor {
    /// The nodes covered by the reference, before `Signature` exists.
    pub fn reference_node_set(&self, doc: &Document<'_>) -> Result<NodeSet, Error> {
        if self.reference_uri.is_empty() {
            return Ok(NodeSet::all_without_comments(doc));
        }
        let target = doc
            .get_node(self.target)
            .ok_or_else(|| Error::TargetNotFound("target node is not part of this document".into()))?;
        Ok(NodeSet::tree_without_comments(target))
    }
}

/// Find the target element and the insertion point for `options`.
///
/// Without a target tag the document element is signed and receives the
/// signature. With one, the first element in document order whose local or
/// qualified name matches is signed and the signature is appended to its
/// parent; a match on the document element falls back to the first case.
pub fn locate(doc: &Document<'_>, options: &SignOptions) -> Result<SignatureDescriptor, Error> {
    let root = doc.root_element();

    let target = match options.target_tag() {
        None => root,
        Some(tag) => termo_xml::document::find_by_tag(doc, tag)
            .ok_or_else(|| Error::TargetNotFound(format!("no element named '{tag}'")))?,
    };
    let insertion = if target == root {
        root
    } else {
        target
            .parent_element()
            .ok_or_else(|| Error::TargetNotFound("target element has no parent element".into()))?
    };

    let reference_uri = reference_uri(target, options.id_attribute())?;
    tracing::debug!(
        element = target.tag_name().name(),
        uri = %reference_uri,
        "located signature target"
    );

    Ok(SignatureDescriptor {
        c14n: options.c14n,
        digest_method: algorithm::SHA256,
        signature_method: algorithm::RSA_SHA256,
        reference_uri,
        target: target.id(),
        insertion_point: insertion.id(),
    })
}

fn reference_uri(target: Node<'_, '_>, id_attribute: Option<&str>) -> Result<String, Error> {
    let Some(name) = id_attribute else {
        return Ok(String::new());
    };
    match target.attribute(name) {
        Some(value) if !value.is_empty() => Ok(format!("#{value}")),
        _ => Err(Error::MissingAttribute(format!(
            "'{name}' on <{}>",
            termo_xml::document::element_qname(target)
        ))),
    }
}

/// A filled-in `Signature` with an empty `SignatureValue`.
#[derive(Debug, Clone, Copy)]
pub struct SignatureTemplate<'a> {
    pub descriptor: &'a SignatureDescriptor,
    /// Base64 digest of the canonical reference.
    pub digest_value: &'a str,
    /// Signer certificate DER as single-line base64.
    pub certificate: &'a str,
}

impl SignatureTemplate<'_> {
    /// Render compact markup in the default XML-DSig namespace.
    pub fn to_xml(&self) -> Result<String, Error> {
        use ns::node;

        let c14n = self.descriptor.c14n.uri();
        let mut w = XmlWriter::new();
        w.start_element(node::SIGNATURE, &[("xmlns", ns::DSIG)])?;

        w.start_element(node::SIGNED_INFO, &[])?;
        w.text_element(node::CANONICALIZATION_METHOD, &[(ns::attr::ALGORITHM, c14n)], "")?;
        w.text_element(
            node::SIGNATURE_METHOD,
            &[(ns::attr::ALGORITHM, self.descriptor.signature_method)],
            "",
        )?;
        w.start_element(node::REFERENCE, &[(ns::attr::URI, self.descriptor.reference_uri.as_str())])?;
        w.start_element(node::TRANSFORMS, &[])?;
        w.text_element(node::TRANSFORM, &[(ns::attr::ALGORITHM, algorithm::ENVELOPED_SIGNATURE)], "")?;
        w.text_element(node::TRANSFORM, &[(ns::attr::ALGORITHM, c14n)], "")?;
        w.end_element(node::TRANSFORMS)?;
        w.text_element(
            node::DIGEST_METHOD,
            &[(ns::attr::ALGORITHM, self.descriptor.digest_method)],
            "",
        )?;
        w.text_element(node::DIGEST_VALUE, &[], self.digest_value)?;
        w.end_element(node::REFERENCE)?;
        w.end_element(node::SIGNED_INFO)?;

        w.text_element(node::SIGNATURE_VALUE, &[], "")?;

        w.start_element(node::KEY_INFO, &[])?;
        w.start_element(node::X509_DATA, &[])?;
        w.text_element(node::X509_CERTIFICATE, &[], self.certificate)?;
        w.end_element(node::X509_DATA)?;
        w.end_element(node::KEY_INFO)?;

        w.end_element(node::SIGNATURE)?;
        w.into_string()
    }
}
