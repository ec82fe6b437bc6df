//! Canonical code assignment and the serialized codebook format.
//!
//! A codebook on the wire only carries `(symbol, length)` pairs; the actual
//! codewords are rebuilt deterministically by `canonical_codes`, so encoder and
//! decoder agree as long as they agree on the lengths.
//!
//! Wire format: `u32` entry count, then per entry a `u32` symbol and a `u8`
//! length, sorted ascending by symbol. All fields are written least-significant
//! bit first through `BitBuffer::append`.

use hashbrown::HashMap;

use super::tree::{build_tree, code_lengths, MAX_CODE_LENGTH};
use super::{build_frequency_table, decode_run, encode_run, CodeLengths};
use crate::error::BitframeError;
use crate::types::bit_buffer::BitBuffer;
use crate::types::symbol_stream::SymbolStream;

const COUNT_BITS: u32 = 32;
const SYMBOL_BITS: u32 = 32;
const LENGTH_BITS: u32 = 8;

//==================================================================================
// 1. Canonical Codes
//==================================================================================

/// A single codeword, `len` bits wide, most significant bit first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code {
    pub bits: u32,
    pub len: u8,
}

/// Bidirectional lookup between symbols and their canonical codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    by_symbol: HashMap<u32, Code>,
    by_code: HashMap<(u32, u8), u32>,
    max_len: u8,
}

impl CodeTable {
    pub fn code(&self, symbol: u32) -> Option<Code> {
        self.by_symbol.get(&symbol).copied()
    }

    pub fn symbol(&self, bits: u32, len: u8) -> Option<u32> {
        self.by_code.get(&(bits, len)).copied()
    }

    pub fn contains(&self, symbol: u32) -> bool {
        self.by_symbol.contains_key(&symbol)
    }

    /// Length of the longest codeword.
    pub fn max_len(&self) -> u8 {
        self.max_len
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

/// Assigns canonical codewords: entries sorted by `(length, symbol)`, the first
/// gets code 0, each next one gets `previous + 1` shifted left by the increase in
/// length.
pub fn canonical_codes(lengths: &CodeLengths) -> Result<CodeTable, BitframeError> {
    let mut entries: Vec<(u8, u32)> = lengths.iter().map(|(&symbol, &len)| (len, symbol)).collect();
    entries.sort_unstable();

    let mut by_symbol = HashMap::with_capacity(entries.len());
    let mut by_code = HashMap::with_capacity(entries.len());
    let mut code: u64 = 0;
    let mut previous_len: Option<u8> = None;

    for &(len, symbol) in &entries {
        if len == 0 || len as u32 > MAX_CODE_LENGTH {
            return Err(BitframeError::FormatError(format!(
                "symbol {:#x} has invalid code length {}",
                symbol, len
            )));
        }
        if let Some(previous) = previous_len {
            code = (code + 1) << (len - previous);
        }
        if code >= 1u64 << len {
            return Err(BitframeError::FormatError(format!(
                "code lengths are over-subscribed at symbol {:#x} (length {})",
                symbol, len
            )));
        }
        previous_len = Some(len);

        let assigned = Code {
            bits: code as u32,
            len,
        };
        by_symbol.insert(symbol, assigned);
        if by_code.insert((assigned.bits, len), symbol).is_some() {
            return Err(BitframeError::FormatError(format!(
                "duplicate canonical code {:#b}/{}",
                assigned.bits, len
            )));
        }
    }

    Ok(CodeTable {
        by_symbol,
        by_code,
        max_len: previous_len.unwrap_or(0),
    })
}

//==================================================================================
// 2. Serialization
//==================================================================================

pub fn serialize_codebook(lengths: &CodeLengths) -> Result<BitBuffer, BitframeError> {
    let mut buffer = BitBuffer::new();
    buffer.append(lengths.len() as u32, COUNT_BITS)?;
    for (&symbol, &len) in lengths {
        buffer.append(symbol, SYMBOL_BITS)?;
        buffer.append(len as u32, LENGTH_BITS)?;
    }
    Ok(buffer)
}

/// Reads a codebook from the start of `buffer`. Entries must be strictly
/// ascending by symbol, and the buffer must hold every declared entry.
pub fn deserialize_codebook(buffer: &BitBuffer) -> Result<CodeLengths, BitframeError> {
    if buffer.total_bits() < COUNT_BITS as usize {
        return Err(BitframeError::FormatError(
            "codebook is too short to hold its entry count".to_string(),
        ));
    }
    let count = buffer.get(0, COUNT_BITS)? as usize;
    let entry_bits = (SYMBOL_BITS + LENGTH_BITS) as usize;
    let needed = count
        .checked_mul(entry_bits)
        .and_then(|bits| bits.checked_add(COUNT_BITS as usize))
        .ok_or_else(|| BitframeError::FormatError(format!("codebook count {} overflows", count)))?;
    if buffer.total_bits() < needed {
        return Err(BitframeError::FormatError(format!(
            "codebook declares {} entries ({} bits) but holds {} bits",
            count,
            needed,
            buffer.total_bits()
        )));
    }

    let mut lengths = CodeLengths::new();
    let mut offset = COUNT_BITS as usize;
    let mut previous: Option<u32> = None;
    for _ in 0..count {
        let symbol = buffer.get(offset, SYMBOL_BITS)?;
        let len = buffer.get(offset + SYMBOL_BITS as usize, LENGTH_BITS)? as u8;
        offset += entry_bits;

        if previous.is_some_and(|p| symbol <= p) {
            return Err(BitframeError::FormatError(format!(
                "codebook entry {:#x} is out of order or duplicated",
                symbol
            )));
        }
        previous = Some(symbol);
        lengths.insert(symbol, len);
    }
    Ok(lengths)
}

//==================================================================================
// 3. Codebook (lengths + derived table)
//==================================================================================

/// A built or deserialized codebook together with its canonical lookup table.
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codebook {
    lengths: CodeLengths,
    table: CodeTable,
}

impl Codebook {
    /// Runs the full build: frequencies, tree, lengths, canonical codes.
    pub fn from_streams<'a, I>(streams: I) -> Result<Self, BitframeError>
    where
        I: IntoIterator<Item = &'a SymbolStream>,
    {
        let freqs = build_frequency_table(streams)?;
        let tree = build_tree(&freqs)?;
        let lengths = code_lengths(&tree)?;
        log::debug!(
            "huffman: built codebook of {} symbols over {} occurrences",
            lengths.len(),
            tree.weight()
        );
        Self::from_lengths(lengths)
    }

    pub fn from_lengths(lengths: CodeLengths) -> Result<Self, BitframeError> {
        let table = canonical_codes(&lengths)?;
        Ok(Self { lengths, table })
    }

    pub fn deserialize(buffer: &BitBuffer) -> Result<Self, BitframeError> {
        Self::from_lengths(deserialize_codebook(buffer)?)
    }

    pub fn serialize(&self) -> Result<BitBuffer, BitframeError> {
        serialize_codebook(&self.lengths)
    }

    pub fn lengths(&self) -> &CodeLengths {
        &self.lengths
    }

    pub fn table(&self) -> &CodeTable {
        &self.table
    }

    pub fn encode_run(&self, symbols: &SymbolStream) -> Result<BitBuffer, BitframeError> {
        encode_run(symbols, &self.table)
    }

    pub fn decode_run(
        &self,
        buffer: &BitBuffer,
        offset: usize,
        width: u32,
    ) -> Result<(SymbolStream, usize), BitframeError> {
        decode_run(buffer, &self.table, offset, width)
    }
}

//==================================================================================
// 4. Unit Tests
//==================================================================================
