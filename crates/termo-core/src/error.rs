#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Why a certificate bundle was refused for signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidReason {
    /// The bundle carries a certificate but no private key.
    NoPrivateKey,
    /// The current instant is after the certificate's notAfter.
    Expired,
    /// The current instant is before the certificate's notBefore.
    NotYetValid,
}

impl std::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoPrivateKey => f.write_str("certificate has no private key"),
            Self::Expired => f.write_str("certificate has expired"),
            Self::NotYetValid => f.write_str("certificate is not yet valid"),
        }
    }
}

/// Errors produced by the termo signing engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load certificate store: {0}")]
    CertificateLoad(String),

    #[error("certificate rejected: {0}")]
    CertificateInvalid(InvalidReason),

    #[error("canonicalization error: {0}")]
    Canonicalization(String),

    #[error("signature target not found: {0}")]
    TargetNotFound(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("signature computation failed: {0}")]
    SignatureComputation(String),

    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("invalid URI reference: {0}")]
    InvalidUri(String),

    #[error("base64 decode error: {0}")]
    Base64(String),
}

pub type Result<T> = std::result::Result<T, Error>;
