//! Canonical Huffman entropy coding over fixed-width symbol streams.
//!
//! A session runs in two directions:
//!
//! - encode: `build_frequency_table` → `build_tree` → `code_lengths` →
//!   `canonical_codes`, then `encode_run` per stream and `serialize_codebook` once;
//! - decode: `deserialize_codebook` → `canonical_codes`, then `decode_run` per run.
//!
//! Every run carries its own terminator: the frequency table reserves one
//! occurrence of `SENTINEL` per stream, and `encode_run` closes each run with the
//! sentinel's code. The leading count byte of a run is informational only; the
//! decoder stops on the sentinel and nothing else.

use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::error::BitframeError;
use crate::types::bit_buffer::BitBuffer;
use crate::types::symbol_stream::SymbolStream;

pub mod codebook;
pub mod tree;

pub use codebook::{canonical_codes, deserialize_codebook, serialize_codebook, Code, CodeTable, Codebook};
pub use tree::{build_tree, code_lengths, HuffmanTree};

//==================================================================================
// 1. Constants & Types
//==================================================================================

/// Reserved end-of-run symbol. Lies outside every alphabet the coder accepts.
pub const SENTINEL: u32 = 0x7FFF_FFFF;

/// Widest symbol the entropy stage accepts, keeping `SENTINEL` unambiguous.
pub const MAX_ALPHABET_BITS: u32 = 30;

/// Bits of the informational symbol-count header in front of each run.
pub const RUN_HEADER_BITS: u32 = 8;

/// `symbol -> occurrences`.
pub type FrequencyTable = HashMap<u32, u64>;

/// `symbol -> code length`, kept ordered by symbol for deterministic output.
pub type CodeLengths = BTreeMap<u32, u8>;

//==================================================================================
// 2. Frequencies
//==================================================================================

/// Tallies every symbol of every stream and reserves one sentinel per stream.
pub fn build_frequency_table<'a, I>(streams: I) -> Result<FrequencyTable, BitframeError>
where
    I: IntoIterator<Item = &'a SymbolStream>,
{
    let mut freqs = FrequencyTable::new();
    for stream in streams {
        add_stream(&mut freqs, stream)?;
    }
    Ok(freqs)
}

/// Adds a single stream's symbols (plus its sentinel) to an existing table.
pub fn add_stream(freqs: &mut FrequencyTable, stream: &SymbolStream) -> Result<(), BitframeError> {
    if stream.width() > MAX_ALPHABET_BITS {
        return Err(BitframeError::RangeError(format!(
            "{}-bit symbols exceed the {}-bit entropy alphabet",
            stream.width(),
            MAX_ALPHABET_BITS
        )));
    }
    let mask = stream.mask();
    for symbol in stream.iter() {
        *freqs.entry(symbol & mask).or_insert(0) += 1;
    }
    *freqs.entry(SENTINEL).or_insert(0) += 1;
    Ok(())
}

//==================================================================================
// 3. Runs
//==================================================================================

/// Encodes one run into a fresh buffer.
pub fn encode_run(symbols: &SymbolStream, table: &CodeTable) -> Result<BitBuffer, BitframeError> {
    let mut buffer = BitBuffer::new();
    encode_run_into(&mut buffer, symbols, table)?;
    Ok(buffer)
}

/// Appends one run to `buffer`: the count byte, every symbol's code bit-reversed
/// so it reads back MSB-first, then the sentinel's code.
pub fn encode_run_into(
    buffer: &mut BitBuffer,
    symbols: &SymbolStream,
    table: &CodeTable,
) -> Result<(), BitframeError> {
    if symbols.len() > u8::MAX as usize {
        log::warn!(
            "run of {} symbols: count header truncated to {}",
            symbols.len(),
            symbols.len() as u8
        );
    }
    buffer.append(symbols.len() as u8 as u32, RUN_HEADER_BITS)?;

    for symbol in symbols.iter() {
        let code = table
            .code(symbol)
            .ok_or(BitframeError::PrecompositionError(symbol))?;
        buffer.append_reversed(code.bits, code.len as u32)?;
    }
    let terminator = table
        .code(SENTINEL)
        .ok_or(BitframeError::PrecompositionError(SENTINEL))?;
    buffer.append_reversed(terminator.bits, terminator.len as u32)?;
    Ok(())
}

/// Decodes the run starting at `offset`, returning its symbols as a `width`-bit
/// stream and the offset just past the run's terminator.
pub fn decode_run(
    buffer: &BitBuffer,
    table: &CodeTable,
    offset: usize,
    width: u32,
) -> Result<(SymbolStream, usize), BitframeError> {
    let header_end = offset + RUN_HEADER_BITS as usize;
    if header_end > buffer.total_bits() {
        return Err(BitframeError::FormatError(format!(
            "run at bit {} is missing its header",
            offset
        )));
    }

    let mut output = SymbolStream::new(width)?;
    let mask = output.mask();
    let mut position = header_end;
    let mut accumulator: u32 = 0;
    let mut acc_len: u8 = 0;

    loop {
        if position >= buffer.total_bits() {
            return Err(BitframeError::FormatError(format!(
                "run at bit {} ended after {} symbols without a terminator",
                offset,
                output.len()
            )));
        }
        accumulator = (accumulator << 1) | buffer.get(position, 1)?;
        acc_len += 1;
        position += 1;

        if let Some(symbol) = table.symbol(accumulator, acc_len) {
            if symbol == SENTINEL {
                return Ok((output, position));
            }
            if symbol & !mask != 0 {
                return Err(BitframeError::FormatError(format!(
                    "decoded symbol {:#x} does not fit in {} bits",
                    symbol, width
                )));
            }
            output.push(symbol);
            accumulator = 0;
            acc_len = 0;
        } else if acc_len >= table.max_len() {
            return Err(BitframeError::FormatError(format!(
                "no code matches {:#b} at bit {}",
                accumulator, position
            )));
        }
    }
}

//==================================================================================
// 4. Unit Tests
//==================================================================================
