#![forbid(unsafe_code)]

//! PEM helpers: certificate chain decoding and PEM export.

use base64::Engine;
use der::Encode;
use pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use termo_core::Error;
use x509_cert::Certificate;
use zeroize::Zeroizing;

/// Decode every `CERTIFICATE` block to DER, in order.
pub fn certificate_ders(pem: &str) -> Result<Vec<Vec<u8>>, Error> {
    let pem = pem.trim();
    if pem.is_empty() {
        return Err(Error::CertificateLoad("no CERTIFICATE block in PEM input".into()));
    }
    let chain = Certificate::load_pem_chain(pem.as_bytes())
        .map_err(|e| Error::CertificateLoad(format!("failed to decode certificate PEM: {e}")))?;
    if chain.is_empty() {
        return Err(Error::CertificateLoad("no CERTIFICATE block in PEM input".into()));
    }
    chain
        .iter()
        .map(|certificate| {
            certificate
                .to_der()
                .map_err(|e| Error::CertificateLoad(format!("failed to encode certificate DER: {e}")))
        })
        .collect()
}

/// The first certificate as single-line base64 DER, the form
/// `X509Certificate` carries.
pub fn certificate_body(pem: &str) -> Result<String, Error> {
    let ders = certificate_ders(pem)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(&ders[0]))
}

/// Encode DER certificate bytes as PEM.
pub fn certificate_pem(der: &[u8]) -> Result<String, Error> {
    pem_rfc7468::encode_string("CERTIFICATE", pem_rfc7468::LineEnding::LF, der)
        .map_err(|e| Error::CertificateLoad(format!("failed to encode certificate PEM: {e}")))
}

/// Encode a private key as unencrypted PKCS#8 PEM.
pub fn private_key_pem(key: &RsaPrivateKey) -> Result<Zeroizing<String>, Error> {
    key.to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| Error::CertificateLoad(format!("failed to encode private key PEM: {e}")))
}
