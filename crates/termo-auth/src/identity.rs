#![forbid(unsafe_code)]

//! Client certificate export for mutual TLS.

use crate::AuthError;
use termo_keys::{pem, CertificateBundle};
use zeroize::Zeroizing;

/// The PEM material a TLS stack needs to present a client certificate.
///
/// Everything stays in memory; nothing is written to disk.
pub struct ClientIdentity {
    pub certificate_pem: String,
    pub chain_pem: Vec<String>,
    private_key_pem: Zeroizing<String>,
}

impl ClientIdentity {
    pub fn from_bundle(bundle: &CertificateBundle) -> Result<Self, AuthError> {
        let key = bundle.private_key().ok_or(AuthError::MissingPrivateKey)?;
        let certificate_pem = pem::certificate_pem(bundle.certificate_der())?;
        let chain_pem = bundle
            .chain()
            .iter()
            .map(|der| pem::certificate_pem(der))
            .collect::<Result<Vec<_>, _>>()?;
        let private_key_pem = pem::private_key_pem(key)?;

        tracing::debug!(subject = %bundle.subject(), chain = chain_pem.len(), "client identity exported");
        Ok(Self {
            certificate_pem,
            chain_pem,
            private_key_pem,
        })
    }

    /// Unencrypted PKCS#8 PEM of the private key.
    pub fn private_key_pem(&self) -> &str {
        &self.private_key_pem
    }

    /// Key, certificate and chain concatenated, the single-buffer form most
    /// TLS client identity loaders accept.
    pub fn to_pem_bundle(&self) -> Zeroizing<String> {
        let mut out = Zeroizing::new(String::with_capacity(
            self.private_key_pem.len() + self.certificate_pem.len() * (1 + self.chain_pem.len()),
        ));
        out.push_str(&self.private_key_pem);
        out.push_str(&self.certificate_pem);
        for certificate in &self.chain_pem {
            out.push_str(certificate);
        }
        out
    }
}

impl std::fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("certificate_pem", &self.certificate_pem)
            .field("chain_pem", &self.chain_pem.len())
            .finish_non_exhaustive()
    }
}
