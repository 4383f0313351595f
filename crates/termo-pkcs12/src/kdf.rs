#![forbid(unsafe_code)]

//! Key derivation and bag encryption for PKCS#12.
//!
//! - the PKCS#12 KDF (RFC 7292 Appendix B), for MAC keys and legacy PBE
//! - legacy PBE: pbeWithSHAAnd3-KeyTripleDES-CBC
//! - PBES2: PBKDF2 (HMAC-SHA1 or HMAC-SHA256) + AES-256-CBC
//!
//! Every derived key and every decrypted buffer is zeroized on drop.

use cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::digest::FixedOutputReset;
use sha2::{Digest, Sha256};
use termo_core::Error;
use zeroize::Zeroizing;

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Des3CbcDec = cbc::Decryptor<des::TdesEde3>;

/// Diversifier IDs (RFC 7292 Appendix B.3).
pub const ID_KEY: u8 = 1;
pub const ID_IV: u8 = 2;
pub const ID_MAC: u8 = 3;

/// Hash underlying the PKCS#12 KDF and the PFX MAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfHash {
    Sha1,
    Sha256,
}

impl KdfHash {
    pub fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }
}

/// PBKDF2 pseudo-random function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prf {
    HmacSha1,
    HmacSha256,
}

/// PKCS#12 KDF over a BMP-encoded password.
pub fn pkcs12_kdf(
    hash: KdfHash,
    id: u8,
    bmp_password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
) -> Zeroizing<Vec<u8>> {
    match hash {
        KdfHash::Sha1 => derive::<Sha1>(id, bmp_password, salt, iterations, output_len),
        KdfHash::Sha256 => derive::<Sha256>(id, bmp_password, salt, iterations, output_len),
    }
}

// Both SHA-1 and SHA-256 use a 64-byte input block.
const V: usize = 64;

fn derive<D>(id: u8, password: &[u8], salt: &[u8], iterations: u32, output_len: usize) -> Zeroizing<Vec<u8>>
where
    D: Digest + FixedOutputReset,
{
    let diversifier = [id; V];

    let mut i_block = Zeroizing::new(repeat_to_block(salt));
    i_block.extend_from_slice(&repeat_to_block(password));

    let mut result = Zeroizing::new(Vec::with_capacity(output_len + V));
    let mut hasher = D::new();
    while result.len() < output_len {
        Digest::update(&mut hasher, diversifier);
        Digest::update(&mut hasher, &*i_block);
        let mut a = hasher.finalize_reset();
        for _ in 1..iterations {
            Digest::update(&mut hasher, &a);
            a = hasher.finalize_reset();
        }
        result.extend_from_slice(&a);

        if result.len() < output_len {
            let b = repeat_to_len(&a, V);
            for chunk in i_block.chunks_mut(V) {
                add_with_carry(chunk, &b);
            }
        }
    }

    result.truncate(output_len);
    result
}

/// Repeat `data` to the next multiple of the block size (empty stays empty).
fn repeat_to_block(data: &[u8]) -> Vec<u8> {
    repeat_to_len(data, data.len().div_ceil(V) * V)
}

fn repeat_to_len(data: &[u8], len: usize) -> Vec<u8> {
    data.iter().copied().cycle().take(if data.is_empty() { 0 } else { len }).collect()
}

/// `chunk = (chunk + b + 1) mod 2^(8 * len)`, big-endian.
fn add_with_carry(chunk: &mut [u8], b: &[u8]) {
    let mut carry: u16 = 1;
    for (x, y) in chunk.iter_mut().zip(b).rev() {
        let sum = *x as u16 + *y as u16 + carry;
        *x = sum as u8;
        carry = sum >> 8;
    }
}

/// Encode a password as BMPString (UTF-16BE) plus a two-byte terminator.
/// The empty password encodes to nothing.
pub fn password_to_bmp(password: &str) -> Zeroizing<Vec<u8>> {
    let mut bmp = Zeroizing::new(Vec::with_capacity(password.len() * 2 + 2));
    if password.is_empty() {
        return bmp;
    }
    for unit in password.encode_utf16() {
        bmp.extend_from_slice(&unit.to_be_bytes());
    }
    bmp.extend_from_slice(&[0, 0]);
    bmp
}

/// Legacy pbeWithSHAAnd3-KeyTripleDES-CBC decryption.
pub fn decrypt_pbe_sha1_3des(
    ciphertext: &[u8],
    bmp_password: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let key = pkcs12_kdf(KdfHash::Sha1, ID_KEY, bmp_password, salt, iterations, 24);
    let iv = pkcs12_kdf(KdfHash::Sha1, ID_IV, bmp_password, salt, iterations, 8);

    let decryptor = Des3CbcDec::new_from_slices(&key, &iv)
        .map_err(|e| Error::CertificateLoad(format!("3DES-CBC init failed: {e}")))?;
    let mut buf = Zeroizing::new(ciphertext.to_vec());
    let len = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| Error::CertificateLoad("3DES-CBC decryption failed (wrong passphrase?)".into()))?
        .len();
    buf.truncate(len);
    Ok(buf)
}

fn pbes2_key(prf: Prf, password: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; 32]> {
    let mut key = Zeroizing::new([0u8; 32]);
    match prf {
        Prf::HmacSha1 => pbkdf2::pbkdf2_hmac::<Sha1>(password.as_bytes(), salt, iterations, &mut *key),
        Prf::HmacSha256 => pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut *key),
    }
    key
}

/// PBES2 (PBKDF2 + AES-256-CBC) decryption.
pub fn decrypt_pbes2(
    prf: Prf,
    ciphertext: &[u8],
    password: &str,
    salt: &[u8],
    iterations: u32,
    iv: &[u8],
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let key = pbes2_key(prf, password, salt, iterations);
    let decryptor = Aes256CbcDec::new_from_slices(&*key, iv)
        .map_err(|e| Error::CertificateLoad(format!("AES-256-CBC init failed: {e}")))?;
    let mut buf = Zeroizing::new(ciphertext.to_vec());
    let len = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| Error::CertificateLoad("AES-256-CBC decryption failed (wrong passphrase?)".into()))?
        .len();
    buf.truncate(len);
    Ok(buf)
}

/// PBES2 (PBKDF2 + AES-256-CBC) encryption.
pub fn encrypt_pbes2(
    prf: Prf,
    plaintext: &[u8],
    password: &str,
    salt: &[u8],
    iterations: u32,
    iv: &[u8],
) -> Result<Vec<u8>, Error> {
    let key = pbes2_key(prf, password, salt, iterations);
    let encryptor = Aes256CbcEnc::new_from_slices(&*key, iv)
        .map_err(|e| Error::CertificateLoad(format!("AES-256-CBC init failed: {e}")))?;
    Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// HMAC over the PFX `authSafe` content.
pub fn compute_mac(hash: KdfHash, key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
    fn run<M: Mac + hmac::digest::KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
        let mut mac = <M as Mac>::new_from_slice(key)
            .map_err(|e| Error::CertificateLoad(format!("HMAC init failed: {e}")))?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }
    match hash {
        KdfHash::Sha1 => run::<Hmac<Sha1>>(key, data),
        KdfHash::Sha256 => run::<Hmac<Sha256>>(key, data),
    }
}
