//! This module contains the pure, stateless kernels for inter-frame XOR delta
//! coding.
//!
//! Each symbol is XORed with the symbol at the same position of the previous
//! frame's stream, so static regions of a sequence collapse to zero runs that
//! the RLE stage can then absorb. XOR is its own inverse, but decode is kept as
//! a separate entry point so call sites read symmetrically.

use crate::error::BitframeError;
use crate::types::symbol_stream::SymbolStream;

fn check_compatible(current: &SymbolStream, previous: &SymbolStream) -> Result<(), BitframeError> {
    if current.width() != previous.width() || current.len() != previous.len() {
        return Err(BitframeError::ShapeError(format!(
            "delta reference mismatch: {} x {}-bit vs {} x {}-bit",
            current.len(),
            current.width(),
            previous.len(),
            previous.width()
        )));
    }
    Ok(())
}

fn xor_streams(a: &SymbolStream, b: &SymbolStream) -> Result<SymbolStream, BitframeError> {
    SymbolStream::from_values(a.width(), a.iter().zip(b.iter()).map(|(x, y)| x ^ y))
}

/// Encodes `current` as its XOR difference against `previous`.
pub fn encode(current: &SymbolStream, previous: &SymbolStream) -> Result<SymbolStream, BitframeError> {
    check_compatible(current, previous)?;
    xor_streams(current, previous)
}

/// Reconstructs a frame's stream from its XOR difference and the previous
/// (already reconstructed) stream.
pub fn decode(delta: &SymbolStream, previous: &SymbolStream) -> Result<SymbolStream, BitframeError> {
    check_compatible(delta, previous)?;
    xor_streams(delta, previous)
}
