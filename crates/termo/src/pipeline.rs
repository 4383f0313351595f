#![forbid(unsafe_code)]

//! End-to-end signing: load credentials, validate them, sign.
//!
//! Each run moves through [`Stage`]s in order. The first error stops the
//! run and is reported together with the stage that could not be reached.

use serde::Serialize;
use termo_core::Error;
use termo_dsig::{SignOptions, SignedDocument, Signer};
use termo_keys::CertificateBundle;
use zeroize::Zeroizing;

/// Progress of one signing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Unsigned,
    CertificateLoaded,
    CertificateValidated,
    DigestComputed,
    StructureAssembled,
    Signed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unsigned => "unsigned",
            Self::CertificateLoaded => "certificate-loaded",
            Self::CertificateValidated => "certificate-validated",
            Self::DigestComputed => "digest-computed",
            Self::StructureAssembled => "structure-assembled",
            Self::Signed => "signed",
        })
    }
}

/// A failed run. `stage` is the stage that could not be reached.
#[derive(Debug, thiserror::Error)]
#[error("signing failed before reaching {stage}: {error}")]
pub struct Failure {
    pub stage: Stage,
    #[source]
    pub error: Error,
}

impl Failure {
    fn at(stage: Stage) -> impl FnOnce(Error) -> Self {
        move |error| {
            tracing::warn!(%stage, %error, "signing run failed");
            Self { stage, error }
        }
    }
}

/// Everything one signing run needs.
pub struct SigningRequest<'a> {
    /// Unsigned XML text.
    pub document: &'a str,
    /// PKCS#12 container bytes.
    pub pkcs12: &'a [u8],
    /// Container passphrase; wiped when the request is dropped.
    pub passphrase: Zeroizing<String>,
    pub options: SignOptions,
}

impl<'a> SigningRequest<'a> {
    pub fn new(document: &'a str, pkcs12: &'a [u8], passphrase: impl Into<String>) -> Self {
        Self {
            document,
            pkcs12,
            passphrase: Zeroizing::new(passphrase.into()),
            options: SignOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SignOptions) -> Self {
        self.options = options;
        self
    }
}

impl std::fmt::Debug for SigningRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningRequest")
            .field("document", &self.document.len())
            .field("pkcs12", &self.pkcs12.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Load the request's PKCS#12 container, validate it and sign the
/// document.
#[tracing::instrument(skip_all, fields(document_bytes = request.document.len()))]
pub fn sign(request: &SigningRequest<'_>) -> Result<SignedDocument, Failure> {
    let bundle = termo_keys::load_pkcs12(request.pkcs12, &request.passphrase)
        .map_err(Failure::at(Stage::CertificateLoaded))?;
    tracing::debug!(stage = %Stage::CertificateLoaded);
    run(request.document, &bundle, &request.options)
}

/// Validate an already loaded bundle and sign `document` with it.
#[tracing::instrument(skip_all, fields(document_bytes = document.len()))]
pub fn sign_with_bundle(
    document: &str,
    bundle: &CertificateBundle,
    options: &SignOptions,
) -> Result<SignedDocument, Failure> {
    run(document, bundle, options)
}

fn run(document: &str, bundle: &CertificateBundle, options: &SignOptions) -> Result<SignedDocument, Failure> {
    termo_keys::validate(bundle)
        .into_result()
        .map_err(Failure::at(Stage::CertificateValidated))?;
    tracing::debug!(stage = %Stage::CertificateValidated);

    let signer = Signer::new(bundle, options);
    let digested = signer
        .digest(document)
        .map_err(Failure::at(Stage::DigestComputed))?;
    tracing::debug!(stage = %Stage::DigestComputed);

    let assembled = signer
        .assemble(document, &digested)
        .map_err(Failure::at(Stage::StructureAssembled))?;
    tracing::debug!(stage = %Stage::StructureAssembled);

    let signed = signer.sign(assembled).map_err(Failure::at(Stage::Signed))?;
    tracing::debug!(stage = %Stage::Signed);
    Ok(signed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_and_names() {
        assert!(Stage::Unsigned < Stage::CertificateLoaded);
        assert!(Stage::StructureAssembled < Stage::Signed);
        assert_eq!(Stage::DigestComputed.to_string(), "digest-computed");
        assert_eq!(
            serde_json::to_string(&Stage::CertificateValidated).unwrap(),
            "\"certificate-validated\""
        );
    }

    #[test]
    fn test_failure_message() {
        let failure = Failure::at(Stage::CertificateLoaded)(Error::CertificateLoad("bad".into()));
        assert_eq!(
            failure.to_string(),
            "signing failed before reaching certificate-loaded: failed to load certificate store: bad"
        );
    }

    #[test]
    fn test_request_debug_hides_passphrase() {
        let request = SigningRequest::new("<root/>", b"pfx", "hunter2");
        assert!(!format!("{request:?}").contains("hunter2"));
    }
}
