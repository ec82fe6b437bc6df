// In: src/config.rs

//! The single source of truth for all codec configuration.
//!
//! `CodecConfig` is created once at the application boundary (from JSON or in
//! code), validated, and then passed down read-only as an `Arc<CodecConfig>`.
//! It describes one point in the codec's parameter space: how many pixels are
//! packed per symbol, in which orientation, how the grid is flattened, and which
//! of the delta, run-length and entropy stages are applied.

use serde::{Deserialize, Serialize};

use crate::error::BitframeError;
use crate::kernels::huffman::MAX_ALPHABET_BITS;
use crate::types::grid::FlattenOrder;

//==================================================================================
// I. Configuration Enums
//==================================================================================

/// The grid axis along which adjacent pixels are packed into one symbol.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PackOrientation {
    /// **Default:** pack consecutive pixels of one line (one `x` column of the frame).
    #[default]
    Rows,
    /// Pack the same position across consecutive lines.
    Columns,
}

impl PackOrientation {
    pub fn along_columns(self) -> bool {
        matches!(self, PackOrientation::Columns)
    }
}

/// How many Huffman codebooks an encoded sequence carries.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CodebookScope {
    /// One codebook built over every frame of the sequence.
    #[default]
    Session,
    /// A separate codebook per frame.
    PerFrame,
}

//==================================================================================
// II. The Unified CodecConfig
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CodecConfig {
    /// Bits kept per pixel (the low bits of each pixel byte).
    #[serde(default = "default_color_bits")]
    pub color_bits: u32,

    /// Pixels merged into one symbol by `Grid::pack`.
    #[serde(default = "default_pack_count")]
    pub pack_count: usize,

    #[serde(default)]
    pub pack_orientation: PackOrientation,

    #[serde(default)]
    pub flatten_order: FlattenOrder,

    /// XOR every frame against the previous one before run-length coding.
    #[serde(default)]
    pub delta: bool,

    /// Width of the run-length field of an RLE record; `None` skips RLE.
    #[serde(default)]
    pub rle_count_bits: Option<u32>,

    /// Entropy stage; `None` stores the symbols uncompressed.
    #[serde(default)]
    pub huffman: Option<CodebookScope>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            color_bits: default_color_bits(),
            pack_count: default_pack_count(),
            pack_orientation: PackOrientation::default(),
            flatten_order: FlattenOrder::default(),
            delta: false,
            rle_count_bits: None,
            huffman: None,
        }
    }
}

fn default_color_bits() -> u32 {
    1
}

fn default_pack_count() -> usize {
    1
}

impl CodecConfig {
    /// Width of one packed symbol.
    pub fn symbol_bits(&self) -> u32 {
        let pack_count = u32::try_from(self.pack_count).unwrap_or(u32::MAX);
        self.color_bits.saturating_mul(pack_count)
    }

    /// Width of one RLE record, if RLE is enabled.
    pub fn record_bits(&self) -> Option<u32> {
        self.rle_count_bits.map(|n| self.symbol_bits().saturating_add(n))
    }

    /// Width of the symbols that reach the final stage.
    pub fn payload_bits(&self) -> u32 {
        self.record_bits().unwrap_or_else(|| self.symbol_bits())
    }

    /// Rejects combinations the codec cannot represent.
    pub fn validate(&self) -> Result<(), BitframeError> {
        if !(1..=8).contains(&self.color_bits) {
            return Err(BitframeError::RangeError(format!(
                "color_bits {} must be within [1, 8]",
                self.color_bits
            )));
        }
        if self.pack_count == 0 {
            return Err(BitframeError::RangeError("pack_count must be at least 1".to_string()));
        }
        if self.symbol_bits() > 32 {
            return Err(BitframeError::RangeError(format!(
                "packing {} pixels of {} bits exceeds 32-bit symbols",
                self.pack_count, self.color_bits
            )));
        }
        if let Some(count_bits) = self.rle_count_bits {
            if count_bits == 0 || self.symbol_bits().saturating_add(count_bits) > 32 {
                return Err(BitframeError::RangeError(format!(
                    "RLE record of {} + {} bits must be within [1, 32]",
                    self.symbol_bits(),
                    count_bits
                )));
            }
        }
        if self.huffman.is_some() && self.payload_bits() > MAX_ALPHABET_BITS {
            return Err(BitframeError::RangeError(format!(
                "{}-bit symbols exceed the {}-bit entropy alphabet",
                self.payload_bits(),
                MAX_ALPHABET_BITS
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, BitframeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, BitframeError> {
        let config: CodecConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

//==================================================================================
// III. Unit Tests
//==================================================================================
