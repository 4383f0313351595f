#![forbid(unsafe_code)]

//! Credential loading from PKCS#12 containers and PEM text.

use crate::bundle::{self, CertificateBundle};
use crate::pem;
use der::Decode;
use rsa::RsaPrivateKey;
use termo_core::Error;
use x509_cert::Certificate;

/// Load a bundle from PKCS#12 (.p12/.pfx) bytes.
///
/// The signer certificate is the one whose public key matches the private
/// key, falling back to the first certificate in the container.
pub fn load_pkcs12(data: &[u8], passphrase: &str) -> Result<CertificateBundle, Error> {
    let contents = termo_pkcs12::parse_pkcs12(data, passphrase)?;

    if contents.private_keys.len() > 1 {
        tracing::warn!(
            keys = contents.private_keys.len(),
            "PKCS#12 holds several private keys; using the first"
        );
    }
    let private_key = contents
        .private_keys
        .first()
        .map(|der| load_private_key_pkcs8_der(der))
        .transpose()?;

    let bundle = select_certificate(private_key, contents.certificates)?;
    tracing::info!(subject = %bundle.subject(), has_private_key = bundle.has_private_key(), "loaded PKCS#12 bundle");
    Ok(bundle)
}

/// Load a bundle from PEM text: one or more certificates and an optional
/// private key (PKCS#8 `PRIVATE KEY` or PKCS#1 `RSA PRIVATE KEY`).
pub fn load_pem(certificate_pem: &str, private_key_pem: Option<&str>) -> Result<CertificateBundle, Error> {
    let private_key = private_key_pem.map(load_private_key_pem).transpose()?;
    let certificates = pem::certificate_ders(certificate_pem)?;
    select_certificate(private_key, certificates)
}

/// Load a bundle without a private key from certificate PEM.
pub fn load_certificate_pem(certificate_pem: &str) -> Result<CertificateBundle, Error> {
    load_pem(certificate_pem, None)
}

fn load_private_key_pkcs8_der(der: &[u8]) -> Result<RsaPrivateKey, Error> {
    use pkcs8::DecodePrivateKey;

    RsaPrivateKey::from_pkcs8_der(der)
        .map_err(|_| Error::CertificateLoad("unsupported private key (RSA PKCS#8 required)".into()))
}

fn load_private_key_pem(text: &str) -> Result<RsaPrivateKey, Error> {
    use pkcs8::DecodePrivateKey;
    use rsa::pkcs1::DecodeRsaPrivateKey;

    let text = text.trim();
    if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(text) {
        return Ok(key);
    }
    RsaPrivateKey::from_pkcs1_pem(text)
        .map_err(|e| Error::CertificateLoad(format!("failed to decode RSA private key PEM: {e}")))
}

fn select_certificate(
    private_key: Option<RsaPrivateKey>,
    mut certificates: Vec<Vec<u8>>,
) -> Result<CertificateBundle, Error> {
    if certificates.is_empty() {
        return Err(Error::CertificateLoad("no certificate found".into()));
    }

    let matching = private_key.as_ref().and_then(|key| {
        let public = key.to_public_key();
        certificates.iter().position(|der| {
            Certificate::from_der(der)
                .ok()
                .and_then(|cert| bundle::rsa_public_key(&cert).ok())
                .is_some_and(|candidate| candidate == public)
        })
    });
    let index = match matching {
        Some(index) => index,
        None => {
            if private_key.is_some() {
                tracing::warn!("no certificate matches the private key; using the first");
            }
            0
        }
    };

    let leaf = certificates.remove(index);
    CertificateBundle::new(private_key, leaf, certificates)
}
