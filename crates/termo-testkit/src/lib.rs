#![forbid(unsafe_code)]
// Test-only support crate; fixture failures abort the test.
#![allow(clippy::expect_used)]

//! Fixtures shared by the termo test suites: RSA keys, self-signed
//! certificates with chosen validity windows, and PKCS#12 containers
//! built from them.

use std::str::FromStr;
use std::sync::OnceLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use der::asn1::UtcTime;
use der::Encode;
use pkcs8::EncodePrivateKey;
use rsa::RsaPrivateKey;
use sha2::Sha256;
use spki::SubjectPublicKeyInfoOwned;
use tracing::metadata::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;
use x509_cert::builder::{Builder, CertificateBuilder, Profile};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::{Time, Validity};

/// Passphrase protecting every container built by [`signing_pkcs12`].
pub const PASSPHRASE: &str = "termo-test";

pub const DAY: Duration = Duration::from_secs(86_400);

/// Initializes `tracing` for tests, honouring `RUST_LOG`.
pub fn init_tracing() {
    static ONCE: std::sync::Once = std::sync::Once::new();

    ONCE.call_once(|| {
        let targets = if let Ok(var) = std::env::var("RUST_LOG") {
            var.parse().expect("Failed to parse RUST_LOG environment variable")
        } else {
            Targets::new().with_default(LevelFilter::DEBUG)
        };
        let _ = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_test_writer()
            .with_max_level(LevelFilter::TRACE)
            .with_thread_ids(true)
            .finish()
            .with(targets)
            .try_init();
    });
}

/// A freshly generated 1024-bit RSA key. Slow; prefer [`rsa_key`].
pub fn generate_rsa_key() -> RsaPrivateKey {
    RsaPrivateKey::new(&mut rand::thread_rng(), 1024).expect("RSA key generation failed")
}

/// The shared signing key.
pub fn rsa_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(generate_rsa_key)
}

/// A second key, distinct from [`rsa_key`].
pub fn other_rsa_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(generate_rsa_key)
}

fn utc(at: SystemTime) -> Time {
    let since_epoch = at.duration_since(UNIX_EPOCH).expect("time before 1970");
    // X.509 UTCTime has one-second resolution.
    let whole = Duration::from_secs(since_epoch.as_secs());
    Time::UtcTime(UtcTime::from_unix_duration(whole).expect("time out of UTCTime range"))
}

/// A self-signed DER certificate for `key` valid over `[not_before, not_after]`.
pub fn certificate(key: &RsaPrivateKey, common_name: &str, not_before: SystemTime, not_after: SystemTime) -> Vec<u8> {
    let validity = Validity {
        not_before: utc(not_before),
        not_after: utc(not_after),
    };
    let subject = Name::from_str(&format!("CN={common_name},O=Termo Test,C=BR")).expect("invalid subject");
    let spki = SubjectPublicKeyInfoOwned::from_key(key.to_public_key()).expect("SPKI encoding failed");
    let signer = rsa::pkcs1v15::SigningKey::<Sha256>::new(key.clone());
    let serial = SerialNumber::from(rand::random::<u32>() >> 1);

    let builder = CertificateBuilder::new(Profile::Root, serial, validity, subject, spki, &signer)
        .expect("certificate builder");
    builder
        .build::<rsa::pkcs1v15::Signature>()
        .expect("certificate signing failed")
        .to_der()
        .expect("certificate encoding failed")
}

/// A certificate valid from yesterday until a year from now.
pub fn valid_certificate(key: &RsaPrivateKey) -> Vec<u8> {
    let now = SystemTime::now();
    certificate(key, "termo signer", now - DAY, now + 365 * DAY)
}

/// A certificate that expired yesterday.
pub fn expired_certificate(key: &RsaPrivateKey) -> Vec<u8> {
    let now = SystemTime::now();
    certificate(key, "termo expired", now - 30 * DAY, now - DAY)
}

/// A certificate whose validity starts tomorrow.
pub fn future_certificate(key: &RsaPrivateKey) -> Vec<u8> {
    let now = SystemTime::now();
    certificate(key, "termo future", now + DAY, now + 30 * DAY)
}

/// Unencrypted PKCS#8 DER for `key`.
pub fn pkcs8_der(key: &RsaPrivateKey) -> Vec<u8> {
    key.to_pkcs8_der().expect("PKCS#8 encoding failed").as_bytes().to_vec()
}

/// A PKCS#12 container holding `key` (if any) and `certificates`.
pub fn pkcs12(key: Option<&RsaPrivateKey>, certificates: &[Vec<u8>], password: &str) -> Vec<u8> {
    let pkcs8 = key.map(pkcs8_der);
    termo_pkcs12::encode_pkcs12(pkcs8.as_deref(), certificates, password).expect("PKCS#12 encoding failed")
}

/// The usual happy-path container: [`rsa_key`] with a valid certificate,
/// protected by [`PASSPHRASE`].
pub fn signing_pkcs12() -> Vec<u8> {
    let key = rsa_key();
    pkcs12(Some(key), &[valid_certificate(key)], PASSPHRASE)
}
