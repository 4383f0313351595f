#![forbid(unsafe_code)]

//! RSA PKCS#1 v1.5 signature algorithms.

use crate::digest::DigestMethod;
use signature::SignatureEncoding;
use termo_core::{algorithm, Error};

/// Key material for signature operations.
pub enum SigningKey {
    Rsa(rsa::RsaPrivateKey),
    RsaPublic(rsa::RsaPublicKey),
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsa(_) => f.write_str("SigningKey::Rsa(..)"),
            Self::RsaPublic(_) => f.write_str("SigningKey::RsaPublic(..)"),
        }
    }
}

/// A signature algorithm selected by URI.
pub trait SignatureAlgorithm: Send {
    fn uri(&self) -> &'static str;
    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, Error>;
    /// `Ok(false)` for a well-formed signature that does not verify.
    fn verify(&self, key: &SigningKey, data: &[u8], signature: &[u8]) -> Result<bool, Error>;
}

/// Create a signature algorithm from its URI.
pub fn from_uri(uri: &str) -> Result<Box<dyn SignatureAlgorithm>, Error> {
    let (uri, hash) = match uri {
        algorithm::RSA_SHA1 => (algorithm::RSA_SHA1, DigestMethod::Sha1),
        algorithm::RSA_SHA256 => (algorithm::RSA_SHA256, DigestMethod::Sha256),
        algorithm::RSA_SHA384 => (algorithm::RSA_SHA384, DigestMethod::Sha384),
        algorithm::RSA_SHA512 => (algorithm::RSA_SHA512, DigestMethod::Sha512),
        _ => return Err(Error::UnsupportedAlgorithm(format!("signature algorithm: {uri}"))),
    };
    Ok(Box::new(RsaPkcs1v15 { uri, hash }))
}

struct RsaPkcs1v15 {
    uri: &'static str,
    hash: DigestMethod,
}

impl RsaPkcs1v15 {
    fn sign_with_key(&self, private_key: &rsa::RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>, Error> {
        use signature::Signer;
        macro_rules! do_sign {
            ($hasher:ty) => {{
                let sk = rsa::pkcs1v15::SigningKey::<$hasher>::new(private_key.clone());
                sk.try_sign(data)
                    .map(|sig| sig.to_vec())
                    .map_err(|e| Error::SignatureComputation(format!("RSA signing failed: {e}")))
            }};
        }
        match self.hash {
            DigestMethod::Sha1 => do_sign!(sha1::Sha1),
            DigestMethod::Sha256 => do_sign!(sha2::Sha256),
            DigestMethod::Sha384 => do_sign!(sha2::Sha384),
            DigestMethod::Sha512 => do_sign!(sha2::Sha512),
        }
    }

    fn verify_with_key(&self, public_key: &rsa::RsaPublicKey, data: &[u8], sig_bytes: &[u8]) -> Result<bool, Error> {
        use signature::Verifier;
        let sig = rsa::pkcs1v15::Signature::try_from(sig_bytes)
            .map_err(|e| Error::SignatureComputation(format!("invalid RSA signature: {e}")))?;
        macro_rules! do_verify {
            ($hasher:ty) => {{
                let vk = rsa::pkcs1v15::VerifyingKey::<$hasher>::new(public_key.clone());
                Ok(vk.verify(data, &sig).is_ok())
            }};
        }
        match self.hash {
            DigestMethod::Sha1 => do_verify!(sha1::Sha1),
            DigestMethod::Sha256 => do_verify!(sha2::Sha256),
            DigestMethod::Sha384 => do_verify!(sha2::Sha384),
            DigestMethod::Sha512 => do_verify!(sha2::Sha512),
        }
    }
}

impl SignatureAlgorithm for RsaPkcs1v15 {
    fn uri(&self) -> &'static str {
        self.uri
    }

    fn sign(&self, key: &SigningKey, data: &[u8]) -> Result<Vec<u8>, Error> {
        match key {
            SigningKey::Rsa(pk) => self.sign_with_key(pk, data),
            SigningKey::RsaPublic(_) => Err(Error::Signing("RSA private key required".into())),
        }
    }

    fn verify(&self, key: &SigningKey, data: &[u8], sig_bytes: &[u8]) -> Result<bool, Error> {
        let public = match key {
            SigningKey::Rsa(pk) => pk.to_public_key(),
            SigningKey::RsaPublic(pk) => pk.clone(),
        };
        self.verify_with_key(&public, data, sig_bytes)
    }
}
