#![forbid(unsafe_code)]

//! Shared error type, algorithm URIs and XML-DSig names for the termo
//! signing engine.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, InvalidReason, Result};
