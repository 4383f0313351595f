#![forbid(unsafe_code)]

//! The signer's credentials: an optional RSA private key plus the X.509
//! certificate that identifies it.

use std::time::SystemTime;

use base64::Engine;
use der::{Decode, Encode};
use rsa::{RsaPrivateKey, RsaPublicKey};
use termo_core::Error;
use x509_cert::Certificate;

/// Credentials loaded from a PKCS#12 container or PEM files.
///
/// Never mutated after loading. The RSA private key zeroizes itself on drop.
pub struct CertificateBundle {
    private_key: Option<RsaPrivateKey>,
    certificate: Certificate,
    certificate_der: Vec<u8>,
    public_key: RsaPublicKey,
    not_before: SystemTime,
    not_after: SystemTime,
    chain: Vec<Vec<u8>>,
}

impl CertificateBundle {
    /// Build a bundle from an optional private key, the signer certificate
    /// (DER) and any further certificates from the same container.
    pub fn new(
        private_key: Option<RsaPrivateKey>,
        certificate_der: Vec<u8>,
        chain: Vec<Vec<u8>>,
    ) -> Result<Self, Error> {
        let certificate = Certificate::from_der(&certificate_der)
            .map_err(|e| Error::CertificateLoad(format!("failed to parse X.509 certificate: {e}")))?;
        let public_key = rsa_public_key(&certificate)?;
        let validity = &certificate.tbs_certificate.validity;
        let not_before = validity.not_before.to_system_time();
        let not_after = validity.not_after.to_system_time();

        Ok(Self {
            private_key,
            certificate,
            certificate_der,
            public_key,
            not_before,
            not_after,
            chain,
        })
    }

    pub fn private_key(&self) -> Option<&RsaPrivateKey> {
        self.private_key.as_ref()
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    /// The certificate DER as single-line standard base64, i.e. the PEM
    /// body without armor or line breaks.
    pub fn certificate_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.certificate_der)
    }

    /// The RSA public key from the certificate.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    pub fn not_before(&self) -> SystemTime {
        self.not_before
    }

    pub fn not_after(&self) -> SystemTime {
        self.not_after
    }

    /// Certificates other than the signer's, in container order.
    pub fn chain(&self) -> &[Vec<u8>] {
        &self.chain
    }

    /// The subject distinguished name in RFC 4514 form.
    pub fn subject(&self) -> String {
        self.certificate.tbs_certificate.subject.to_string()
    }

    /// Whether the private key belongs to the certificate.
    pub fn key_matches_certificate(&self) -> bool {
        self.private_key
            .as_ref()
            .is_some_and(|key| key.to_public_key() == self.public_key)
    }
}

impl std::fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("subject", &self.subject())
            .field("has_private_key", &self.has_private_key())
            .field("not_before", &self.not_before)
            .field("not_after", &self.not_after)
            .field("chain", &self.chain.len())
            .finish()
    }
}

/// Extract the RSA public key from a certificate's SubjectPublicKeyInfo.
pub(crate) fn rsa_public_key(certificate: &Certificate) -> Result<RsaPublicKey, Error> {
    use spki::DecodePublicKey;

    let spki_der = certificate
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| Error::CertificateLoad(format!("failed to encode SPKI: {e}")))?;
    RsaPublicKey::from_public_key_der(&spki_der)
        .map_err(|_| Error::CertificateLoad("unsupported public key algorithm in certificate (RSA required)".into()))
}
