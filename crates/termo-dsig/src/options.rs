#![forbid(unsafe_code)]

//! Per-call signing and verification options.

use serde::{Deserialize, Serialize};
use termo_c14n::C14nMode;

/// What to sign and how.
///
/// Deserializes from kebab-case keys; missing keys take their defaults:
///
/// ```json
/// { "target-tag": "termo", "id-attribute": "id", "strip-declaration": true, "c14n": "inclusive" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SignOptions {
    /// Element to sign, by local or qualified name. `None` (or empty) signs
    /// the document element.
    pub target_tag: Option<String>,
    /// Attribute whose value becomes the reference id (`URI="#value"`).
    /// `None` (or empty) references the whole document (`URI=""`).
    pub id_attribute: Option<String>,
    /// Remove the XML declaration from the signed output.
    pub strip_declaration: bool,
    /// Canonicalization for both `SignedInfo` and the reference transform.
    pub c14n: C14nMode,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            target_tag: None,
            id_attribute: None,
            strip_declaration: true,
            c14n: C14nMode::default(),
        }
    }
}

impl SignOptions {
    pub fn with_target_tag(mut self, tag: impl Into<String>) -> Self {
        self.target_tag = Some(tag.into());
        self
    }

    pub fn with_id_attribute(mut self, name: impl Into<String>) -> Self {
        self.id_attribute = Some(name.into());
        self
    }

    pub fn with_strip_declaration(mut self, strip: bool) -> Self {
        self.strip_declaration = strip;
        self
    }

    pub fn with_c14n(mut self, mode: C14nMode) -> Self {
        self.c14n = mode;
        self
    }

    /// The target tag, treating an empty string as unset.
    pub fn target_tag(&self) -> Option<&str> {
        self.target_tag.as_deref().filter(|t| !t.is_empty())
    }

    /// The id attribute name, treating an empty string as unset.
    pub fn id_attribute(&self) -> Option<&str> {
        self.id_attribute.as_deref().filter(|a| !a.is_empty())
    }
}

/// Which `Signature` element, in document order, a verification checks.
///
/// Signing appends, so the most recent signature of a document signed more
/// than once is the last one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignaturePosition {
    #[default]
    First,
    Last,
}

/// Verification settings.
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// ID attribute names honoured in addition to `Id`, `ID` and `id`.
    pub id_attrs: Vec<String>,
    /// Verify with this key instead of the certificate in `KeyInfo`.
    pub public_key: Option<rsa::RsaPublicKey>,
    pub signature: SignaturePosition,
}

impl VerifyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_id_attr(mut self, name: impl Into<String>) -> Self {
        self.id_attrs.push(name.into());
        self
    }

    pub fn with_public_key(mut self, key: rsa::RsaPublicKey) -> Self {
        self.public_key = Some(key);
        self
    }

    pub fn with_signature(mut self, position: SignaturePosition) -> Self {
        self.signature = position;
        self
    }
}
