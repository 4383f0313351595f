#![forbid(unsafe_code)]

//! Object identifiers used inside PFX structures.

use yasna::models::ObjectIdentifier;

// PKCS#7 content types
pub const DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 1];
pub const ENCRYPTED_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 6];

// PKCS#12 bag types
pub const PKCS8_SHROUDED_KEY_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 2];
pub const CERT_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 3];
pub const X509_CERTIFICATE: &[u64] = &[1, 2, 840, 113549, 1, 9, 22, 1];

// Password-based encryption
pub const PBE_SHA1_3DES: &[u64] = &[1, 2, 840, 113549, 1, 12, 1, 3];
pub const PBES2: &[u64] = &[1, 2, 840, 113549, 1, 5, 13];
pub const PBKDF2: &[u64] = &[1, 2, 840, 113549, 1, 5, 12];
pub const AES_256_CBC: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 1, 42];

// Hashes and HMACs
pub const SHA1: &[u64] = &[1, 3, 14, 3, 2, 26];
pub const SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
pub const HMAC_SHA1: &[u64] = &[1, 2, 840, 113549, 2, 7];
pub const HMAC_SHA256: &[u64] = &[1, 2, 840, 113549, 2, 9];

pub fn oid(components: &[u64]) -> ObjectIdentifier {
    ObjectIdentifier::from_slice(components)
}
