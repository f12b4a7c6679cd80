//! Whole-program tests driven by assembled listings
//!
//! Each listing is a table of `(bytes, text)` lines as an assembler would
//! produce them:
//! - `tests_decode`: byte-exact decoding and disassembly text
//! - `tests_simulate`: execution traces and final machine state
//! - `tests_clocks`: per-instruction clock estimates and running totals

mod tests_decode;
mod tests_simulate;

/// Concatenate the bytes of a listing into one program image
pub(crate) fn assemble(listing: &[(&[u8], &str)]) -> Vec<u8> {
    listing.iter().flat_map(|(bytes, _)| bytes.iter().copied()).collect()
}
