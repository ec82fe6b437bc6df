//! This module defines `BitBuffer`, the growable, bit-addressable store that every
//! other stage of the pipeline is built on.
//!
//! Storage is a `Vec<u32>`. Bit `i` of the buffer lives in word `i / 32` at bit
//! position `i % 32` (little-endian within a word, words ascending). Any field of
//! 1 to 32 bits can be read or written at any bit offset, including fields that
//! straddle two words. Bits at or beyond `total_bits` are don't-care.

use std::fmt;

use bitvec::prelude::*;

use crate::error::BitframeError;

//==================================================================================
// 0. Constants
//==================================================================================
/// The buffer never shrinks below this many words.
pub const MIN_WORDS: usize = 16;
const GROW_FACTOR: usize = 2;
const SHRINK_FACTOR: usize = 4;
const WORD_BITS: usize = 32;

/// Returns a mask covering the low `bit_count` bits (`bit_count` in 0..=32).
#[inline]
pub fn low_mask(bit_count: u32) -> u32 {
    if bit_count >= 32 {
        u32::MAX
    } else {
        (1u32 << bit_count) - 1
    }
}

/// Reverses the order of the low `bit_count` bits of `value`.
#[inline]
pub fn reverse_bits(value: u32, bit_count: u32) -> u32 {
    if bit_count == 0 {
        return 0;
    }
    (value & low_mask(bit_count)).reverse_bits() >> (32 - bit_count)
}

fn check_bit_count(bit_count: u32) -> Result<(), BitframeError> {
    if bit_count == 0 || bit_count > 32 {
        return Err(BitframeError::RangeError(format!(
            "bit count {} must be within [1, 32]",
            bit_count
        )));
    }
    Ok(())
}

//==================================================================================
// 1. The BitBuffer
//==================================================================================

#[derive(Debug, Clone)]
pub struct BitBuffer {
    words: Vec<u32>,
    total_bits: usize,
}

impl Default for BitBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl BitBuffer {
    pub fn new() -> Self {
        Self {
            words: vec![0; MIN_WORDS],
            total_bits: 0,
        }
    }

    /// Builds a buffer holding the first `total_bits` bits of `bytes`, read
    /// little-endian (bit 0 of byte 0 first).
    pub fn from_bytes(bytes: &[u8], total_bits: usize) -> Result<Self, BitframeError> {
        if total_bits > bytes.len() * 8 {
            return Err(BitframeError::RangeError(format!(
                "requested {} bits from a {}-byte slice",
                total_bits,
                bytes.len()
            )));
        }
        let mut buffer = Self::new();
        for &byte in &bytes[..total_bits / 8] {
            buffer.append(byte as u32, 8)?;
        }
        let remaining = (total_bits % 8) as u32;
        if remaining > 0 {
            buffer.append(bytes[total_bits / 8] as u32, remaining)?;
        }
        Ok(buffer)
    }

    /// The logical length in bits.
    pub fn total_bits(&self) -> usize {
        self.total_bits
    }

    pub fn is_empty(&self) -> bool {
        self.total_bits == 0
    }

    /// The number of bits the current storage can hold without growing.
    pub fn capacity_bits(&self) -> usize {
        self.words.len() * WORD_BITS
    }

    //------------------------------------------------------------------------------
    // Random access
    //------------------------------------------------------------------------------

    /// Reads `bit_count` bits starting at bit `index`. Bit 0 of the result is the
    /// buffer's `index`th bit.
    pub fn get(&self, index: usize, bit_count: u32) -> Result<u32, BitframeError> {
        check_bit_count(bit_count)?;
        let end = index.checked_add(bit_count as usize);
        if end.map_or(true, |end| end > self.total_bits) {
            return Err(BitframeError::RangeError(format!(
                "read of {} bits at index {} exceeds length {}",
                bit_count, index, self.total_bits
            )));
        }

        let word = index / WORD_BITS;
        let offset = index % WORD_BITS;
        let mut window = self.words[word] as u64;
        if offset + bit_count as usize > WORD_BITS {
            window |= (self.words[word + 1] as u64) << WORD_BITS;
        }
        Ok(((window >> offset) as u32) & low_mask(bit_count))
    }

    /// Writes the low `bit_count` bits of `value` at bit `index`. The range is
    /// checked against capacity, not the logical length, so callers may write
    /// into pre-sized space.
    pub fn set(&mut self, index: usize, bit_count: u32, value: u32) -> Result<(), BitframeError> {
        check_bit_count(bit_count)?;
        let end = index.checked_add(bit_count as usize);
        if end.map_or(true, |end| end > self.capacity_bits()) {
            return Err(BitframeError::RangeError(format!(
                "write of {} bits at index {} exceeds capacity {}",
                bit_count,
                index,
                self.capacity_bits()
            )));
        }

        let word = index / WORD_BITS;
        let offset = index % WORD_BITS;
        let field_mask = (low_mask(bit_count) as u64) << offset;
        let field = ((value & low_mask(bit_count)) as u64) << offset;

        self.words[word] = (self.words[word] & !(field_mask as u32)) | field as u32;
        if offset + bit_count as usize > WORD_BITS {
            let hi_mask = (field_mask >> WORD_BITS) as u32;
            let hi = (field >> WORD_BITS) as u32;
            self.words[word + 1] = (self.words[word + 1] & !hi_mask) | hi;
        }
        Ok(())
    }

    //------------------------------------------------------------------------------
    // Appending and removing
    //------------------------------------------------------------------------------

    /// Appends the low `bit_count` bits of `value` at the end of the buffer.
    pub fn append(&mut self, value: u32, bit_count: u32) -> Result<(), BitframeError> {
        check_bit_count(bit_count)?;
        self.reserve_bits(self.total_bits + bit_count as usize);
        self.set(self.total_bits, bit_count, value)?;
        self.total_bits += bit_count as usize;
        Ok(())
    }

    /// Appends the low `bit_count` bits of `value` in reverse order, so a code
    /// built MSB-first reads back MSB-first when consumed one bit at a time.
    pub fn append_reversed(&mut self, value: u32, bit_count: u32) -> Result<(), BitframeError> {
        check_bit_count(bit_count)?;
        self.append(reverse_bits(value, bit_count), bit_count)
    }

    /// Appends the full logical content of `other`.
    pub fn append_other(&mut self, other: &BitBuffer) -> Result<(), BitframeError> {
        let full_words = other.total_bits / WORD_BITS;
        let remainder = (other.total_bits % WORD_BITS) as u32;

        if self.total_bits % WORD_BITS == 0 {
            // Word-aligned: copy whole words straight across.
            let start = self.total_bits / WORD_BITS;
            self.reserve_bits(self.total_bits + full_words * WORD_BITS);
            self.words[start..start + full_words].copy_from_slice(&other.words[..full_words]);
            self.total_bits += full_words * WORD_BITS;
        } else {
            for &word in &other.words[..full_words] {
                self.append(word, 32)?;
            }
        }

        if remainder > 0 {
            let tail = other.get(full_words * WORD_BITS, remainder)?;
            self.append(tail, remainder)?;
        }
        Ok(())
    }

    /// Removes `bit_count` bits from the end of the buffer.
    pub fn remove(&mut self, bit_count: usize) -> Result<(), BitframeError> {
        if bit_count > self.total_bits {
            return Err(BitframeError::RangeError(format!(
                "cannot remove {} bits from a buffer of {}",
                bit_count, self.total_bits
            )));
        }
        self.total_bits -= bit_count;
        self.shrink_to_fit_occupancy();
        Ok(())
    }

    /// Sets the logical length to exactly `bit_count`. Newly exposed bits read as zero.
    pub fn resize(&mut self, bit_count: usize) -> Result<(), BitframeError> {
        if bit_count > self.total_bits {
            self.reserve_bits(bit_count);
            let mut index = self.total_bits;
            while index < bit_count {
                let step = (bit_count - index).min(WORD_BITS) as u32;
                self.set(index, step, 0)?;
                index += step as usize;
            }
        }
        self.total_bits = bit_count;
        self.shrink_to_fit_occupancy();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.words = vec![0; MIN_WORDS];
        self.total_bits = 0;
    }

    /// Copies `bit_count` bits starting at `index` into a new buffer.
    pub fn take_segment(&self, index: usize, bit_count: usize) -> Result<BitBuffer, BitframeError> {
        let end = index.checked_add(bit_count);
        if end.map_or(true, |end| end > self.total_bits) {
            return Err(BitframeError::RangeError(format!(
                "segment of {} bits at index {} exceeds length {}",
                bit_count, index, self.total_bits
            )));
        }

        let mut segment = BitBuffer::new();
        let full_words = bit_count / WORD_BITS;
        for i in 0..full_words {
            segment.append(self.get(index + i * WORD_BITS, 32)?, 32)?;
        }
        let remainder = (bit_count % WORD_BITS) as u32;
        if remainder > 0 {
            segment.append(self.get(index + full_words * WORD_BITS, remainder)?, remainder)?;
        }
        Ok(segment)
    }

    //------------------------------------------------------------------------------
    // Export
    //------------------------------------------------------------------------------

    /// Number of zero bits `to_bytes` adds to fill the last byte.
    pub fn byte_padding(&self) -> u32 {
        ((8 - self.total_bits % 8) % 8) as u32
    }

    /// Packs the logical bits into little-endian bytes. The final partial byte is
    /// padded with zero bits; see `byte_padding`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let byte_len = (self.total_bits + 7) / 8;
        let mut bytes = Vec::with_capacity(byte_len);
        for word in &self.words[..(byte_len + 3) / 4] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes.truncate(byte_len);

        let padding = self.byte_padding();
        if padding > 0 {
            if let Some(last) = bytes.last_mut() {
                *last &= 0xFF >> padding;
            }
        }
        log::trace!(
            "bit buffer exported: {} bits -> {} bytes ({} pad bits)",
            self.total_bits,
            byte_len,
            padding
        );
        bytes
    }

    /// A read-only view over the logical bits.
    pub fn as_bitslice(&self) -> &BitSlice<u32, Lsb0> {
        &self.words.view_bits::<Lsb0>()[..self.total_bits]
    }

    //------------------------------------------------------------------------------
    // Storage management
    //------------------------------------------------------------------------------

    fn reserve_bits(&mut self, needed_bits: usize) {
        while self.capacity_bits() < needed_bits {
            let new_len = self.words.len() * GROW_FACTOR;
            self.words.resize(new_len, 0);
        }
    }

    fn shrink_to_fit_occupancy(&mut self) {
        while self.total_bits * SHRINK_FACTOR < self.capacity_bits() && self.words.len() > MIN_WORDS
        {
            let new_len = (self.words.len() / SHRINK_FACTOR).max(MIN_WORDS);
            self.words.truncate(new_len);
        }
    }
}

/// Two buffers are equal when their logical bits are equal; stale storage past
/// `total_bits` is ignored.
impl PartialEq for BitBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_bitslice() == other.as_bitslice()
    }
}

impl Eq for BitBuffer {}

impl fmt::Display for BitBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.as_bitslice().iter().by_vals() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

//==================================================================================
// 2. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_across_word_boundary() {
        let mut buffer = BitBuffer::new();
        buffer.resize(96).unwrap();
        buffer.set(20, 32, 0xDEAD_BEEF).unwrap();
        assert_eq!(buffer.get(20, 32).unwrap(), 0xDEAD_BEEF);
        assert_eq!(buffer.get(20, 12).unwrap(), 0xEEF);
        assert_eq!(buffer.get(32, 20).unwrap(), 0xDEAD_B);
        assert_eq!(buffer.get(0, 20).unwrap(), 0);
    }

    #[test]
    fn test_set_ignores_high_bits() {
        let mut buffer = BitBuffer::new();
        buffer.append(0, 16).unwrap();
        buffer.set(4, 4, 0xFFFF_FFF5).unwrap();
        assert_eq!(buffer.get(0, 16).unwrap(), 0x0050);
    }

    #[test]
    fn test_set_then_get_every_width() {
        let mut buffer = BitBuffer::new();
        buffer.resize(200).unwrap();
        for bit_count in 1..=32u32 {
            for index in [0usize, 1, 17, 31, 32, 63, 100] {
                let value = 0xA5C3_96F1u32.rotate_left(bit_count);
                buffer.set(index, bit_count, value).unwrap();
                assert_eq!(
                    buffer.get(index, bit_count).unwrap(),
                    value & low_mask(bit_count),
                    "index {} width {}",
                    index,
                    bit_count
                );
            }
        }
    }

    #[test]
    fn test_range_errors() {
        let mut buffer = BitBuffer::new();
        buffer.append(0b101, 3).unwrap();
        assert!(matches!(buffer.get(0, 0), Err(BitframeError::RangeError(_))));
        assert!(matches!(buffer.get(0, 33), Err(BitframeError::RangeError(_))));
        assert!(matches!(buffer.get(1, 3), Err(BitframeError::RangeError(_))));
        assert!(matches!(buffer.get(usize::MAX, 1), Err(BitframeError::RangeError(_))));
        let capacity = buffer.capacity_bits();
        assert!(matches!(
            buffer.set(capacity - 4, 8, 0),
            Err(BitframeError::RangeError(_))
        ));
        assert!(matches!(buffer.remove(4), Err(BitframeError::RangeError(_))));
    }

    #[test]
    fn test_set_is_checked_against_capacity_not_length() {
        let mut buffer = BitBuffer::new();
        buffer.set(100, 8, 0xAB).unwrap();
        assert_eq!(buffer.total_bits(), 0);
        assert!(buffer.get(100, 8).is_err());
    }

    #[test]
    fn test_append_reversed() {
        let mut buffer = BitBuffer::new();
        buffer.append_reversed(0b110, 3).unwrap();
        assert_eq!(buffer.get(0, 3).unwrap(), 0b011);
        assert_eq!(buffer.to_string(), "110");
        assert_eq!(reverse_bits(0x1, 32), 0x8000_0000);
    }

    #[test]
    fn test_grow_and_shrink() {
        let mut buffer = BitBuffer::new();
        for i in 0..1000u32 {
            buffer.append(i, 17).unwrap();
        }
        assert_eq!(buffer.total_bits(), 17_000);
        assert!(buffer.capacity_bits() >= 17_000);
        let grown = buffer.capacity_bits();

        buffer.remove(16_900).unwrap();
        assert!(buffer.capacity_bits() < grown);
        assert!(buffer.capacity_bits() >= MIN_WORDS * 32);
        assert_eq!(buffer.get(0, 17).unwrap(), 0);
        assert_eq!(buffer.get(17, 17).unwrap(), 1);
    }

    #[test]
    fn test_resize_zero_fills_stale_bits() {
        let mut buffer = BitBuffer::new();
        buffer.append(u32::MAX, 32).unwrap();
        buffer.append(u32::MAX, 32).unwrap();
        buffer.remove(40).unwrap();
        buffer.resize(64).unwrap();
        assert_eq!(buffer.get(0, 24).unwrap(), 0xFF_FFFF);
        assert_eq!(buffer.get(24, 32).unwrap(), 0);
        assert_eq!(buffer.get(56, 8).unwrap(), 0);
    }

    #[test]
    fn test_append_other_aligned_and_unaligned() {
        let mut other = BitBuffer::new();
        other.append(0x1234_5678, 32).unwrap();
        other.append(0b10110, 5).unwrap();

        let mut aligned = BitBuffer::new();
        aligned.append_other(&other).unwrap();
        assert_eq!(aligned, other);

        let mut unaligned = BitBuffer::new();
        unaligned.append(0b1, 1).unwrap();
        unaligned.append_other(&other).unwrap();
        assert_eq!(unaligned.total_bits(), 38);
        assert_eq!(unaligned.get(1, 32).unwrap(), 0x1234_5678);
        assert_eq!(unaligned.get(33, 5).unwrap(), 0b10110);
    }

    #[test]
    fn test_take_segment() {
        let mut buffer = BitBuffer::new();
        for i in 0..10u32 {
            buffer.append(i, 7).unwrap();
        }
        let segment = buffer.take_segment(7 * 3, 7 * 5).unwrap();
        assert_eq!(segment.total_bits(), 35);
        for i in 0..5 {
            assert_eq!(segment.get(i * 7, 7).unwrap(), 3 + i as u32);
        }
        assert!(buffer.take_segment(60, 20).is_err());
    }

    #[test]
    fn test_to_bytes_pads_last_byte() {
        let mut buffer = BitBuffer::new();
        buffer.append(0x0F, 8).unwrap();
        buffer.append(0b101, 3).unwrap();
        assert_eq!(buffer.byte_padding(), 5);
        assert_eq!(buffer.to_bytes(), vec![0x0F, 0b101]);

        // Stale bits past the logical end never leak into the export.
        buffer.append(0b11111, 5).unwrap();
        buffer.remove(5).unwrap();
        assert_eq!(buffer.to_bytes(), vec![0x0F, 0b101]);
    }

    #[test]
    fn test_from_bytes_roundtrip() {
        let bytes = [0x0F, 0x33, 0xA5];
        let buffer = BitBuffer::from_bytes(&bytes, 20).unwrap();
        assert_eq!(buffer.total_bits(), 20);
        assert_eq!(buffer.to_bytes(), vec![0x0F, 0x33, 0x05]);
        assert!(BitBuffer::from_bytes(&bytes, 25).is_err());
    }

    #[test]
    fn test_display_is_bit_order() {
        let buffer = BitBuffer::from_bytes(&[0x0F, 0x33], 16).unwrap();
        assert_eq!(buffer.to_string(), "1111000011001100");
    }
}
