#![forbid(unsafe_code)]

//! Pre-signing certificate checks: private key presence and the validity
//! window.
//!
//! No chain building or revocation checking happens here; the signer only
//! needs to know that its own credentials are usable right now.

use std::time::SystemTime;

use crate::bundle::CertificateBundle;
use termo_core::{Error, InvalidReason};

/// Outcome of validating a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid(InvalidReason),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// `Invalid(reason)` becomes `Error::CertificateInvalid(reason)`.
    pub fn into_result(self) -> Result<(), Error> {
        match self {
            Self::Valid => Ok(()),
            Self::Invalid(reason) => Err(Error::CertificateInvalid(reason)),
        }
    }
}

/// Validate against the system clock.
pub fn validate(bundle: &CertificateBundle) -> Validation {
    validate_at(bundle, SystemTime::now())
}

/// Validate at `at`.
///
/// Checks run in order: private key present, not before `notBefore`, not
/// after `notAfter`. Both bounds are inclusive.
pub fn validate_at(bundle: &CertificateBundle, at: SystemTime) -> Validation {
    let validation = if !bundle.has_private_key() {
        Validation::Invalid(InvalidReason::NoPrivateKey)
    } else if at < bundle.not_before() {
        Validation::Invalid(InvalidReason::NotYetValid)
    } else if at > bundle.not_after() {
        Validation::Invalid(InvalidReason::Expired)
    } else {
        Validation::Valid
    };

    match validation {
        Validation::Valid => tracing::debug!(subject = %bundle.subject(), "certificate valid"),
        Validation::Invalid(reason) => {
            tracing::warn!(subject = %bundle.subject(), %reason, "certificate rejected")
        }
    }
    validation
}
