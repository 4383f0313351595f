#![forbid(unsafe_code)]

//! Enveloped signature creation.
//!
//! The input text is never re-serialized. The digest is taken before
//! anything is inserted, the rendered `Signature` is spliced in as the last
//! child of the insertion point, and `SignedInfo` is canonicalized from a
//! re-parse of the spliced text so that inherited namespaces are exactly
//! what a verifier sees. The computed value then replaces the empty
//! `SignatureValue` in place.

use crate::options::SignOptions;
use crate::template::{self, SignatureDescriptor, SignatureTemplate};
use base64::Engine;
use roxmltree::{Node, NodeId};
use termo_core::{ns, Error};
use termo_crypto::sign::SigningKey;
use termo_keys::CertificateBundle;
use termo_xml::document::{find_child_element, strip_declaration};
use termo_xml::{splice, NodeSet};

/// A signed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedDocument {
    xml: String,
}

impl SignedDocument {
    pub fn xml(&self) -> &str {
        &self.xml
    }

    pub fn into_xml(self) -> String {
        self.xml
    }

    /// Standard base64 of the UTF-8 XML bytes.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.xml.as_bytes())
    }
}

impl std::fmt::Display for SignedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.xml)
    }
}

/// Output of [`Signer::digest`].
#[derive(Debug, Clone)]
pub struct Digested {
    pub descriptor: SignatureDescriptor,
    /// Base64 SHA-256 of the canonical reference.
    pub digest_value: String,
}

/// Output of [`Signer::assemble`]: the document text with a `Signature`
/// whose `SignatureValue` is still empty.
#[derive(Debug, Clone)]
pub struct Assembled {
    pub xml: String,
    insertion_point: NodeId,
}

/// Signs documents with one bundle and one set of options.
///
/// The three steps can be driven one at a time (the facade does, to report
/// which step failed) or all at once with [`Signer::sign_document`].
pub struct Signer<'a> {
    bundle: &'a CertificateBundle,
    options: &'a SignOptions,
}

impl<'a> Signer<'a> {
    pub fn new(bundle: &'a CertificateBundle, options: &'a SignOptions) -> Self {
        Self { bundle, options }
    }

    /// Locate the target and digest its canonical form.
    pub fn digest(&self, xml: &str) -> Result<Digested, Error> {
        let doc = termo_xml::parse(xml)?;
        let descriptor = template::locate(&doc, self.options)?;
        let node_set = descriptor.reference_node_set(&doc)?;
        let canonical = termo_c14n::canonicalize_doc(&doc, descriptor.c14n, Some(&node_set), &[])?;
        let digest_value = termo_crypto::digest::digest_base64(descriptor.digest_method, &canonical)?;
        tracing::debug!(uri = %descriptor.reference_uri, bytes = canonical.len(), "reference digested");
        Ok(Digested {
            descriptor,
            digest_value,
        })
    }

    /// Render the `Signature` and splice it into `xml`.
    ///
    /// `xml` must be the same text that was passed to [`Signer::digest`].
    pub fn assemble(&self, xml: &str, digested: &Digested) -> Result<Assembled, Error> {
        let certificate = self.bundle.certificate_base64();
        let fragment = SignatureTemplate {
            descriptor: &digested.descriptor,
            digest_value: &digested.digest_value,
            certificate: &certificate,
        }
        .to_xml()?;

        let doc = termo_xml::parse(xml)?;
        let parent = doc
            .get_node(digested.descriptor.insertion_point)
            .ok_or_else(|| Error::TargetNotFound("insertion point is not part of this document".into()))?;
        let assembled = splice::append_child(xml, parent, &fragment)?;
        tracing::debug!(bytes = assembled.len(), "signature structure assembled");

        Ok(Assembled {
            xml: assembled,
            insertion_point: digested.descriptor.insertion_point,
        })
    }

    /// Canonicalize `SignedInfo` in place, sign it and fill in
    /// `SignatureValue`.
    pub fn sign(&self, assembled: Assembled) -> Result<SignedDocument, Error> {
        let private_key = self
            .bundle
            .private_key()
            .ok_or_else(|| Error::Signing("certificate bundle has no private key".into()))?;

        let doc = termo_xml::parse(&assembled.xml)?;
        let signature = inserted_signature(&doc, assembled.insertion_point)?;
        let signed_info = find_child_element(signature, ns::DSIG, ns::node::SIGNED_INFO)
            .ok_or_else(|| Error::MissingElement("SignedInfo".into()))?;
        let signature_value = find_child_element(signature, ns::DSIG, ns::node::SIGNATURE_VALUE)
            .ok_or_else(|| Error::MissingElement("SignatureValue".into()))?;

        let node_set = NodeSet::tree_without_comments(signed_info);
        let canonical = termo_c14n::canonicalize_doc(&doc, self.options.c14n, Some(&node_set), &[])?;

        let algorithm = termo_crypto::sign::from_uri(termo_core::algorithm::RSA_SHA256)?;
        let raw = algorithm.sign(&SigningKey::Rsa(private_key.clone()), &canonical)?;
        let value = base64::engine::general_purpose::STANDARD.encode(raw);

        let replacement = format!(
            "<{name}>{value}</{name}>",
            name = termo_xml::document::element_qname(signature_value)
        );
        let signed = splice::replace_range(&assembled.xml, signature_value.range(), &replacement)?;
        let xml = if self.options.strip_declaration {
            strip_declaration(&signed).to_owned()
        } else {
            signed
        };

        tracing::info!(subject = %self.bundle.subject(), "document signed");
        Ok(SignedDocument { xml })
    }

    /// Run all three steps.
    pub fn sign_document(&self, xml: &str) -> Result<SignedDocument, Error> {
        let digested = self.digest(xml)?;
        let assembled = self.assemble(xml, &digested)?;
        self.sign(assembled)
    }
}

/// Sign `xml` with an enveloped RSA-SHA256 signature.
pub fn sign_document(xml: &str, bundle: &CertificateBundle, options: &SignOptions) -> Result<SignedDocument, Error> {
    Signer::new(bundle, options).sign_document(xml)
}

/// The `Signature` appended under `insertion_point`: its last `Signature`
/// child. Node ids before the splice point are unchanged by the splice.
fn inserted_signature<'a, 'input>(
    doc: &'a roxmltree::Document<'input>,
    insertion_point: NodeId,
) -> Result<Node<'a, 'input>, Error> {
    doc.get_node(insertion_point)
        .and_then(|parent| {
            parent
                .children()
                .filter(|n| n.is_element() && n.has_tag_name((ns::DSIG, ns::node::SIGNATURE)))
                .last()
        })
        .ok_or_else(|| Error::MissingElement("Signature".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::{verify, VerifyResult};
    use crate::options::SignaturePosition;
    use crate::VerifyOptions;
    use pretty_assertions::assert_eq;
    use termo_c14n::C14nMode;
    use termo_testkit as testkit;

    fn bundle() -> CertificateBundle {
        let key = testkit::rsa_key();
        CertificateBundle::new(Some(key.clone()), testkit::valid_certificate(key), Vec::new()).unwrap()
    }

    fn assert_verifies(xml: &str, options: &VerifyOptions) {
        let result = verify(xml, options).unwrap();
        assert!(result.is_valid(), "{result:?}");
    }

    #[test]
    fn test_sign_whole_document() {
        testkit::init_tracing();
        let bundle = bundle();
        let signed = sign_document("<root/>", &bundle, &SignOptions::default()).unwrap();

        let doc = termo_xml::parse(signed.xml()).unwrap();
        let root = doc.root_element();
        let last = root.last_element_child().unwrap();
        assert!(last.has_tag_name((ns::DSIG, ns::node::SIGNATURE)));
        let reference = last
            .descendants()
            .find(|n| n.has_tag_name((ns::DSIG, ns::node::REFERENCE)))
            .unwrap();
        assert_eq!(reference.attribute("URI"), Some(""));

        assert_verifies(signed.xml(), &VerifyOptions::default());
    }

    #[test]
    fn test_sign_named_tag() {
        let bundle = bundle();
        let options = SignOptions::default().with_target_tag("child").with_id_attribute("id");
        let signed = sign_document(r#"<root><child id="x1"/></root>"#, &bundle, &options).unwrap();

        assert!(signed.xml().starts_with(r#"<root><child id="x1"/><Signature xmlns="#));
        assert!(signed.xml().contains(r##"<Reference URI="#x1">"##));
        assert!(signed.xml().ends_with("</Signature></root>"));
        assert_verifies(signed.xml(), &VerifyOptions::default());
    }

    #[test]
    fn test_deterministic() {
        let bundle = bundle();
        let xml = "<termo xmlns:a=\"urn:a\"><a:item>1</a:item>\n  <!-- note --></termo>";
        let first = sign_document(xml, &bundle, &SignOptions::default()).unwrap();
        let second = sign_document(xml, &bundle, &SignOptions::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_declaration_handling() {
        let bundle = bundle();
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root>text</root>";

        let stripped = sign_document(xml, &bundle, &SignOptions::default()).unwrap();
        assert!(stripped.xml().starts_with("<root>text<Signature"));

        let kept = sign_document(xml, &bundle, &SignOptions::default().with_strip_declaration(false)).unwrap();
        assert!(kept.xml().starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root>"));
        assert_verifies(kept.xml(), &VerifyOptions::default());
    }

    #[test]
    fn test_exclusive_mode_verifies() {
        let bundle = bundle();
        let options = SignOptions::default().with_c14n(C14nMode::Exclusive);
        let xml = r#"<ns:root xmlns:ns="urn:ns" xmlns:unused="urn:u"><ns:a b="1"/></ns:root>"#;
        let signed = sign_document(xml, &bundle, &options).unwrap();
        assert!(signed.xml().contains(termo_core::algorithm::EXC_C14N));
        assert_verifies(signed.xml(), &VerifyOptions::default());
    }

    #[test]
    fn test_existing_signature_untouched() {
        let bundle = bundle();
        let first = sign_document("<root><a>1</a></root>", &bundle, &SignOptions::default()).unwrap();
        let second = sign_document(first.xml(), &bundle, &SignOptions::default()).unwrap();
        assert!(second.xml().starts_with(first.xml().trim_end_matches("</root>")));
        let count = second.xml().matches("<Signature ").count();
        assert_eq!(count, 2);

        let newest = VerifyOptions::new().with_signature(SignaturePosition::Last);
        assert_verifies(second.xml(), &newest);
        // The outer signature now sits inside what the first one digested.
        assert!(!verify(second.xml(), &VerifyOptions::new()).unwrap().is_valid());
    }

    #[test]
    fn test_missing_private_key() {
        let key = testkit::rsa_key();
        let bundle = CertificateBundle::new(None, testkit::valid_certificate(key), Vec::new()).unwrap();
        let err = sign_document("<root/>", &bundle, &SignOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Signing(_)));
    }

    #[test]
    fn test_base64_output() {
        let bundle = bundle();
        let signed = sign_document("<root/>", &bundle, &SignOptions::default()).unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(signed.to_base64())
            .unwrap();
        assert_eq!(decoded, signed.xml().as_bytes());
    }

    #[test]
    fn test_tampering_detected() {
        let bundle = bundle();
        let signed = sign_document("<root><amount>10</amount></root>", &bundle, &SignOptions::default()).unwrap();
        let tampered = signed.xml().replace("<amount>10</amount>", "<amount>99</amount>");
        let result = verify(&tampered, &VerifyOptions::default()).unwrap();
        assert!(matches!(result, VerifyResult::Invalid { .. }));
    }
}
