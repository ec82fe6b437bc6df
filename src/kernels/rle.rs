//! This module contains the pure, stateless kernels for Run-Length Encoding
//! (RLE) of fixed-width symbol streams.
//!
//! Each run becomes one packed record of `d + n` bits: the run's value in the
//! high `d` bits and `run_length - 1` in the low `n` bits. A run longer than
//! `2^n` is split across consecutive records. Records are themselves symbols, so
//! the output is just another `SymbolStream` and can feed the entropy stage.

use crate::error::BitframeError;
use crate::types::bit_buffer::low_mask;
use crate::types::symbol_stream::SymbolStream;

//==================================================================================
// 1. Public API
//==================================================================================

/// Encodes `stream` into `(value, run - 1)` records of width `data_bits + count_bits`.
///
/// If the stream's width differs from `data_bits`, its bits are first re-read as
/// `data_bits`-wide symbols; the caller is responsible for padding so that the
/// bit length is a multiple of `data_bits`. The input is never modified.
pub fn encode(
    stream: &SymbolStream,
    data_bits: u32,
    count_bits: u32,
) -> Result<SymbolStream, BitframeError> {
    let record_bits = check_record_widths(data_bits, count_bits)?;
    let source = stream.rechunk(data_bits)?;
    let mut output = SymbolStream::new(record_bits)?;

    let mut values = source.iter();
    let Some(mut current_val) = values.next() else {
        return Ok(output);
    };
    let max_run: u64 = 1u64 << count_bits;
    let mut run_count: u64 = 1;

    for val in values {
        if val == current_val {
            run_count += 1;
            if run_count > max_run {
                output.push(pack_record(current_val, max_run, count_bits));
                run_count = 1;
            }
        } else {
            output.push(pack_record(current_val, run_count, count_bits));
            current_val = val;
            run_count = 1;
        }
    }
    output.push(pack_record(current_val, run_count, count_bits));

    log::debug!(
        "rle: {} symbols -> {} records of {} bits",
        source.len(),
        output.len(),
        record_bits
    );
    Ok(output)
}

/// Expands records produced by `encode` back into `data_bits`-wide symbols.
pub fn decode(
    stream: &SymbolStream,
    data_bits: u32,
    count_bits: u32,
) -> Result<SymbolStream, BitframeError> {
    let record_bits = check_record_widths(data_bits, count_bits)?;
    let records = stream.rechunk(record_bits)?;
    let count_mask = low_mask(count_bits);

    let mut output = SymbolStream::new(data_bits)?;
    for record in records.iter() {
        let value = record >> count_bits;
        let run_length = (record & count_mask) as u64 + 1;
        for _ in 0..run_length {
            output.push(value);
        }
    }
    Ok(output)
}

//==================================================================================
// 2. Private Helpers
//==================================================================================

fn check_record_widths(data_bits: u32, count_bits: u32) -> Result<u32, BitframeError> {
    if data_bits == 0 || count_bits == 0 {
        return Err(BitframeError::RangeError(format!(
            "RLE widths must be positive (data {}, count {})",
            data_bits, count_bits
        )));
    }
    let record_bits = data_bits + count_bits;
    if record_bits > 32 {
        return Err(BitframeError::RangeError(format!(
            "RLE record of {} + {} bits exceeds 32 bits",
            data_bits, count_bits
        )));
    }
    Ok(record_bits)
}

#[inline]
fn pack_record(value: u32, run_length: u64, count_bits: u32) -> u32 {
    (value << count_bits) | (run_length - 1) as u32
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
