#![forbid(unsafe_code)]

//! Enveloped XML signatures with PKCS#12 credentials.
//!
//! [`sign`] runs the whole pipeline: load the container, validate the
//! certificate, digest the target, assemble the `Signature` element and
//! compute its value. The component crates are re-exported for callers
//! that need a single step.

pub use termo_core as core;
pub use termo_xml as xml;
pub use termo_c14n as c14n;
pub use termo_crypto as crypto;
pub use termo_pkcs12 as pkcs12;
pub use termo_keys as keys;
pub use termo_dsig as dsig;
pub use termo_auth as auth;

pub mod pipeline;

pub use pipeline::{sign, sign_with_bundle, Failure, SigningRequest, Stage};
pub use termo_c14n::C14nMode;
pub use termo_core::{Error, InvalidReason};
pub use termo_dsig::{verify, SignOptions, SignaturePosition, SignedDocument, VerifyOptions, VerifyResult};
pub use termo_keys::CertificateBundle;
