#![forbid(unsafe_code)]

//! XML document helpers for the termo signing engine.
//!
//! Everything here works on `roxmltree` trees borrowed from the caller's
//! text. Documents are never re-serialized: edits are made by splicing
//! text at node byte ranges, so whitespace and formatting outside the
//! edited region survive untouched.

pub mod document;
pub mod nodeset;
pub mod reference;
pub mod splice;
pub mod writer;

pub use nodeset::NodeSet;

/// Return roxmltree parsing options that allow DTD.
///
/// roxmltree never fetches external entities, so an internal subset is
/// harmless and some producers still emit one.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}

/// Parse `text` with [`parsing_options`].
pub fn parse(text: &str) -> termo_core::Result<roxmltree::Document<'_>> {
    roxmltree::Document::parse_with_options(text, parsing_options())
        .map_err(|e| termo_core::Error::XmlParse(e.to_string()))
}
