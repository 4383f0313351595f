#![forbid(unsafe_code)]

//! Enveloped signature verification.
//!
//! Processing order:
//! 1. Parse, register ID attributes, pick the first (or last) `<Signature>`
//! 2. Read `<SignedInfo>`: CanonicalizationMethod, SignatureMethod
//! 3. For each `<Reference>`: resolve URI, run transforms, compare digests
//! 4. Resolve the key (caller-supplied, else `KeyInfo/X509Data`)
//! 5. Canonicalize `<SignedInfo>` and check `<SignatureValue>`

use crate::options::{SignaturePosition, VerifyOptions};
use base64::Engine;
use roxmltree::{Document, Node, NodeId};
use std::collections::HashMap;
use termo_c14n::C14nMode;
use termo_core::{algorithm, ns, Error};
use termo_crypto::sign::SigningKey;
use termo_xml::document::{build_id_map, find_child_element, find_child_elements};
use termo_xml::reference::{self, SameDocumentRef};
use termo_xml::NodeSet;

/// Result of signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    /// Digests and signature value check out.
    Valid,
    /// Well-formed signature that does not match the document or key.
    Invalid { reason: String },
}

impl VerifyResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyResult::Valid)
    }
}

/// Verify one `Signature` in `xml`, the first unless
/// [`VerifyOptions::signature`] says otherwise.
pub fn verify(xml: &str, options: &VerifyOptions) -> Result<VerifyResult, Error> {
    let doc = termo_xml::parse(xml)?;
    let id_map = build_id_map(&doc, &options.id_attrs);

    let mut signatures = doc
        .descendants()
        .filter(|n| n.is_element() && n.has_tag_name((ns::DSIG, ns::node::SIGNATURE)));
    let signature = match options.signature {
        SignaturePosition::First => signatures.next(),
        SignaturePosition::Last => signatures.last(),
    }
    .ok_or_else(|| Error::MissingElement("Signature".into()))?;
    let signed_info = find_child_element(signature, ns::DSIG, ns::node::SIGNED_INFO)
        .ok_or_else(|| Error::MissingElement("SignedInfo".into()))?;

    let c14n_method = find_child_element(signed_info, ns::DSIG, ns::node::CANONICALIZATION_METHOD)
        .ok_or_else(|| Error::MissingElement("CanonicalizationMethod".into()))?;
    let c14n_mode = c14n_mode_of(c14n_method)?;
    let c14n_prefixes = read_inclusive_prefixes(c14n_method);

    let signature_method = find_child_element(signed_info, ns::DSIG, ns::node::SIGNATURE_METHOD)
        .ok_or_else(|| Error::MissingElement("SignatureMethod".into()))?;
    let signature_uri = required_algorithm(signature_method, "SignatureMethod")?;

    let references = find_child_elements(signed_info, ns::DSIG, ns::node::REFERENCE);
    if references.is_empty() {
        return Err(Error::MissingElement("Reference".into()));
    }
    for reference in references {
        if let VerifyResult::Invalid { reason } = verify_reference(reference, &doc, &id_map, signature)? {
            tracing::warn!(%reason, "reference digest mismatch");
            return Ok(VerifyResult::Invalid {
                reason: format!("reference digest failed: {reason}"),
            });
        }
    }

    let key = match &options.public_key {
        Some(key) => SigningKey::RsaPublic(key.clone()),
        None => SigningKey::RsaPublic(key_info_public_key(signature)?),
    };

    let signed_info_set = NodeSet::tree_without_comments(signed_info);
    let canonical = termo_c14n::canonicalize_doc(&doc, c14n_mode, Some(&signed_info_set), &c14n_prefixes)?;

    let signature_value = find_child_element(signature, ns::DSIG, ns::node::SIGNATURE_VALUE)
        .ok_or_else(|| Error::MissingElement("SignatureValue".into()))?;
    let value = decode_base64(signature_value, "SignatureValue")?;

    let algorithm = termo_crypto::sign::from_uri(signature_uri)?;
    if algorithm.verify(&key, &canonical, &value)? {
        tracing::info!("signature valid");
        Ok(VerifyResult::Valid)
    } else {
        tracing::warn!("signature value does not verify");
        Ok(VerifyResult::Invalid {
            reason: "signature value verification failed".into(),
        })
    }
}

fn verify_reference(
    reference: Node<'_, '_>,
    doc: &Document<'_>,
    id_map: &HashMap<String, NodeId>,
    signature: Node<'_, '_>,
) -> Result<VerifyResult, Error> {
    let uri = reference.attribute(ns::attr::URI).unwrap_or("");

    let digest_method = find_child_element(reference, ns::DSIG, ns::node::DIGEST_METHOD)
        .ok_or_else(|| Error::MissingElement("DigestMethod".into()))?;
    let digest_uri = required_algorithm(digest_method, "DigestMethod")?;
    let digest_value = find_child_element(reference, ns::DSIG, ns::node::DIGEST_VALUE)
        .ok_or_else(|| Error::MissingElement("DigestValue".into()))?;
    let expected = decode_base64(digest_value, "DigestValue")?;

    let mut node_set = match reference::parse_uri(uri)? {
        SameDocumentRef::WholeDocument => NodeSet::all_without_comments(doc),
        SameDocumentRef::Id(id) => NodeSet::tree_without_comments(reference::resolve_id(doc, id_map, id)?),
    };

    // Node-set to octets defaults to inclusive C14N without comments.
    let mut mode = C14nMode::Inclusive;
    let mut prefixes = Vec::new();
    if let Some(transforms) = find_child_element(reference, ns::DSIG, ns::node::TRANSFORMS) {
        for transform in find_child_elements(transforms, ns::DSIG, ns::node::TRANSFORM) {
            let uri = required_algorithm(transform, "Transform")?;
            if uri == algorithm::ENVELOPED_SIGNATURE {
                node_set.subtract_tree(signature);
            } else if let Some(c14n) = C14nMode::from_uri(uri) {
                mode = c14n;
                prefixes = read_inclusive_prefixes(transform);
            } else {
                return Err(Error::UnsupportedAlgorithm(format!("transform: {uri}")));
            }
        }
    }

    let canonical = termo_c14n::canonicalize_doc(doc, mode, Some(&node_set), &prefixes)?;
    let computed = termo_crypto::digest::digest(digest_uri, &canonical)?;

    if computed == expected {
        Ok(VerifyResult::Valid)
    } else {
        Ok(VerifyResult::Invalid {
            reason: format!("URI=\"{uri}\": expected digest does not match computed digest"),
        })
    }
}

fn key_info_public_key(signature: Node<'_, '_>) -> Result<rsa::RsaPublicKey, Error> {
    let certificate = find_child_element(signature, ns::DSIG, ns::node::KEY_INFO)
        .and_then(|ki| find_child_element(ki, ns::DSIG, ns::node::X509_DATA))
        .and_then(|data| find_child_element(data, ns::DSIG, ns::node::X509_CERTIFICATE))
        .ok_or_else(|| Error::MissingElement("KeyInfo/X509Data/X509Certificate".into()))?;
    let der = decode_base64(certificate, "X509Certificate")?;
    let bundle = termo_keys::CertificateBundle::new(None, der, Vec::new())?;
    Ok(bundle.public_key().clone())
}

fn c14n_mode_of(node: Node<'_, '_>) -> Result<C14nMode, Error> {
    let uri = required_algorithm(node, "CanonicalizationMethod")?;
    C14nMode::from_uri(uri).ok_or_else(|| Error::UnsupportedAlgorithm(format!("C14N: {uri}")))
}

fn required_algorithm<'a>(node: Node<'a, '_>, element: &str) -> Result<&'a str, Error> {
    node.attribute(ns::attr::ALGORITHM)
        .ok_or_else(|| Error::MissingAttribute(format!("Algorithm on {element}")))
}

fn decode_base64(node: Node<'_, '_>, element: &str) -> Result<Vec<u8>, Error> {
    let text: String = node
        .text()
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    base64::engine::general_purpose::STANDARD
        .decode(text)
        .map_err(|e| Error::Base64(format!("{element}: {e}")))
}

/// The `PrefixList` of an `InclusiveNamespaces` child, if any.
fn read_inclusive_prefixes(node: Node<'_, '_>) -> Vec<String> {
    find_child_element(node, ns::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES)
        .and_then(|n| n.attribute(ns::attr::PREFIX_LIST))
        .map(|list| list.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default()
}
