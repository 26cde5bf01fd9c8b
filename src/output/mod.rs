//! Result output
//!
//! `text` prints the end-of-run summary; `json` exports raw operation records.

pub mod json;
pub mod text;
