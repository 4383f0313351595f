#![forbid(unsafe_code)]

//! Signer credentials for the termo signing engine.
//!
//! Loads an RSA private key and its X.509 certificate from PKCS#12 or PEM
//! input and checks that they are usable before any signing happens.

pub mod bundle;
pub mod loader;
pub mod pem;
pub mod validator;

pub use bundle::CertificateBundle;
pub use loader::{load_certificate_pem, load_pem, load_pkcs12};
pub use validator::{validate, validate_at, Validation};
