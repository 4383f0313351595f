#![forbid(unsafe_code)]

//! Digest and signature algorithms for the termo signing engine.

pub mod digest;
pub mod sign;

pub use digest::DigestMethod;
pub use sign::{SignatureAlgorithm, SigningKey};
