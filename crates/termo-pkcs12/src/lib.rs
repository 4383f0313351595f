#![forbid(unsafe_code)]

//! PKCS#12 (.p12/.pfx) containers for the termo signing engine.
//!
//! Reading supports legacy PBE (SHA-1 + 3DES-CBC) and PBES2
//! (PBKDF2 + AES-256-CBC) bags with SHA-1 or SHA-256 MACs. Writing
//! always produces PBES2 with an HMAC-SHA256 MAC.

mod encode;
mod kdf;
mod oid;
mod parse;

use zeroize::Zeroizing;

pub use encode::DEFAULT_ITERATIONS;

/// Contents extracted from a PKCS#12 file.
pub struct Pkcs12Contents {
    /// PKCS#8 DER-encoded private keys.
    pub private_keys: Vec<Zeroizing<Vec<u8>>>,
    /// DER-encoded X.509 certificates, in container order.
    pub certificates: Vec<Vec<u8>>,
}

impl std::fmt::Debug for Pkcs12Contents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pkcs12Contents")
            .field("private_keys", &self.private_keys.len())
            .field("certificates", &self.certificates.len())
            .finish()
    }
}

/// Parse a PKCS#12 file, decrypting with the given password.
pub fn parse_pkcs12(data: &[u8], password: &str) -> Result<Pkcs12Contents, termo_core::Error> {
    parse::parse_pfx(data, password)
}

/// Encode a PKCS#12 file protected by `password`.
///
/// `private_key_pkcs8` is an unencrypted PKCS#8 `PrivateKeyInfo`;
/// `certificates` are DER X.509 certificates, leaf first.
pub fn encode_pkcs12(
    private_key_pkcs8: Option<&[u8]>,
    certificates: &[Vec<u8>],
    password: &str,
) -> Result<Vec<u8>, termo_core::Error> {
    encode::encode_pfx(private_key_pkcs8, certificates, password, DEFAULT_ITERATIONS)
}
