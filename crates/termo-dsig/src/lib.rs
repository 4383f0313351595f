#![forbid(unsafe_code)]

//! Enveloped XML Digital Signatures for the termo signing engine.
//!
//! Signing always produces one `Reference` with the enveloped-signature and
//! C14N transforms, SHA-256 digests and RSA-SHA256 (PKCS#1 v1.5)
//! signatures, with the signer certificate in `KeyInfo/X509Data`.

pub mod options;
pub mod sign;
pub mod template;
pub mod verify;

pub use options::{SignOptions, SignaturePosition, VerifyOptions};
pub use sign::{sign_document, SignedDocument, Signer};
pub use template::{SignatureDescriptor, SignatureTemplate};
pub use verify::{verify, VerifyResult};
