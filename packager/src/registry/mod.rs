//! Registry entry assembly and index output.
//!
//! - [`legacy`] - the previous-schema registry consulted for authored metadata.
//! - [`entry`] - per-module entry assembly (`assemble_entry`).
//! - [`index`] - the index document and its atomic writer.
//! - [`ascii`] - ASCII-only JSON formatting.

pub mod ascii;
pub mod entry;
pub mod index;
pub mod legacy;
