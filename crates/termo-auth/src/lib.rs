#![forbid(unsafe_code)]

//! Partner-service authentication values: the client-credentials token
//! exchange and the client certificate presented over mutual TLS.
//!
//! No networking happens here. Callers feed [`TokenRequest`] and
//! [`ClientIdentity`] to their HTTP client and parse the reply with
//! [`TokenResponse::from_json`].

pub mod identity;
pub mod token;

pub use identity::ClientIdentity;
pub use token::{Method, TokenRequest, TokenResponse, AUTHENTICATE_URL, ROLE_TYPE};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid token response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("client identity requires a private key")]
    MissingPrivateKey,

    #[error(transparent)]
    Credentials(#[from] termo_core::Error),
}
