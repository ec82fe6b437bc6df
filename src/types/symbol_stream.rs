//! This module defines `SymbolStream`, an ordered sequence of fixed-width
//! unsigned symbols ("chunks"). Every stored value is masked to the declared
//! width, so a stream always serializes to exactly `len * width` bits.

use crate::error::BitframeError;
use crate::types::bit_buffer::{low_mask, BitBuffer};

/// Validates a symbol width, which must lie within `[1, 32]`.
pub(crate) fn check_width(width: u32) -> Result<(), BitframeError> {
    if width == 0 || width > 32 {
        return Err(BitframeError::RangeError(format!(
            "symbol width {} must be within [1, 32]",
            width
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolStream {
    width: u32,
    values: Vec<u32>,
}

impl SymbolStream {
    /// Creates an empty stream of `width`-bit symbols.
    pub fn new(width: u32) -> Result<Self, BitframeError> {
        check_width(width)?;
        Ok(Self {
            width,
            values: Vec::new(),
        })
    }

    /// Creates an empty stream with room for `capacity` symbols.
    pub fn with_capacity(width: u32, capacity: usize) -> Result<Self, BitframeError> {
        check_width(width)?;
        Ok(Self {
            width,
            values: Vec::with_capacity(capacity),
        })
    }

    /// Builds a stream from raw values, masking each to `width` bits.
    pub fn from_values<I>(width: u32, values: I) -> Result<Self, BitframeError>
    where
        I: IntoIterator<Item = u32>,
    {
        check_width(width)?;
        let mask = low_mask(width);
        Ok(Self {
            width,
            values: values.into_iter().map(|v| v & mask).collect(),
        })
    }

    /// Splits a bit buffer into `width`-bit symbols. The buffer's length must be
    /// an exact multiple of `width`.
    pub fn from_bit_buffer(buffer: &BitBuffer, width: u32) -> Result<Self, BitframeError> {
        check_width(width)?;
        if buffer.total_bits() % width as usize != 0 {
            return Err(BitframeError::RangeError(format!(
                "buffer of {} bits is not a multiple of the {}-bit symbol width",
                buffer.total_bits(),
                width
            )));
        }
        let count = buffer.total_bits() / width as usize;
        let mut values = Vec::with_capacity(count);
        for i in 0..count {
            values.push(buffer.get(i * width as usize, width)?);
        }
        Ok(Self { width, values })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn mask(&self) -> u32 {
        low_mask(self.width)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn total_bits(&self) -> usize {
        self.values.len() * self.width as usize
    }

    pub fn values(&self) -> &[u32] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.values.iter().copied()
    }

    pub fn get(&self, index: usize) -> Result<u32, BitframeError> {
        self.values.get(index).copied().ok_or_else(|| {
            BitframeError::RangeError(format!(
                "symbol index {} out of bounds for stream of {}",
                index,
                self.values.len()
            ))
        })
    }

    pub fn set(&mut self, index: usize, value: u32) -> Result<(), BitframeError> {
        let mask = self.mask();
        let len = self.values.len();
        let slot = self.values.get_mut(index).ok_or_else(|| {
            BitframeError::RangeError(format!(
                "symbol index {} out of bounds for stream of {}",
                index, len
            ))
        })?;
        *slot = value & mask;
        Ok(())
    }

    /// Appends `value`, masked to the stream's width.
    pub fn push(&mut self, value: u32) {
        let mask = self.mask();
        self.values.push(value & mask);
    }

    /// Appends every symbol of `other`. Both streams must share a width.
    pub fn extend(&mut self, other: &SymbolStream) -> Result<(), BitframeError> {
        if other.width != self.width {
            return Err(BitframeError::ShapeError(format!(
                "cannot concatenate a {}-bit stream onto a {}-bit stream",
                other.width, self.width
            )));
        }
        self.values.extend_from_slice(&other.values);
        Ok(())
    }

    /// Grows (with zero symbols) or truncates to exactly `len` symbols.
    pub fn resize(&mut self, len: usize) {
        self.values.resize(len, 0);
    }

    /// Serializes every symbol in order at its native width.
    pub fn to_bit_buffer(&self) -> Result<BitBuffer, BitframeError> {
        let mut buffer = BitBuffer::new();
        for &value in &self.values {
            buffer.append(value, self.width)?;
        }
        Ok(buffer)
    }

    /// Reinterprets the same bit sequence as symbols of `new_width`.
    pub fn rechunk(&self, new_width: u32) -> Result<SymbolStream, BitframeError> {
        if new_width == self.width {
            return Ok(self.clone());
        }
        SymbolStream::from_bit_buffer(&self.to_bit_buffer()?, new_width)
    }
}

//==================================================================================
// Unit Tests
//==================================================================================
