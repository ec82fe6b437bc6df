//! Defines the self-describing byte format of an encoded frame sequence.
//! This module is the single source of truth for serializing and parsing it.
//!
//! Layout (integers little-endian):
//!
//! ```text
//! magic "BFRM"
//! u32 config_len | config JSON
//! u32 width | u32 height | u32 frame_count
//! u8 has_session_codebook | [bit buffer]
//! frame_count x ( u8 has_codebook | [bit buffer] | bit buffer payload )
//! ```
//!
//! A bit buffer is written as `u64 bit_length` followed by `ceil(bit_length / 8)`
//! bytes, least-significant bit first.

use std::io::{Cursor, Read};

use crate::config::CodecConfig;
use crate::error::BitframeError;
use crate::types::bit_buffer::BitBuffer;

//==================================================================================
// Format Constants
//==================================================================================

pub const SEQUENCE_MAGIC: &[u8; 4] = b"BFRM";
/// magic(4) + config_len(4) + width(4) + height(4) + count(4) + flag(1)
const MIN_SEQUENCE_SIZE: usize = 21;
/// Guards allocations driven by a corrupt length prefix. (16MB)
const MAX_REASONABLE_CONFIG_LEN: usize = 16 * 1024 * 1024;

//==================================================================================
// Public Structs
//==================================================================================

/// One encoded frame: its payload and, for per-frame entropy coding, its codebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub codebook: Option<BitBuffer>,
    pub payload: BitBuffer,
}

impl EncodedFrame {
    pub fn total_bits(&self) -> usize {
        self.payload.total_bits() + self.codebook.as_ref().map_or(0, |c| c.total_bits())
    }
}

/// A fully encoded frame sequence in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSequence {
    pub config: CodecConfig,
    pub width: u32,
    pub height: u32,
    /// Shared codebook when the whole sequence is entropy coded with one table.
    pub codebook: Option<BitBuffer>,
    pub frames: Vec<EncodedFrame>,
}

//==================================================================================
// Core Implementation
//==================================================================================

impl EncodedSequence {
    /// Bits of compressed content: every payload plus every codebook. Container
    /// framing (magic, config header, length prefixes) is not counted.
    pub fn total_bits(&self) -> usize {
        self.codebook.as_ref().map_or(0, |c| c.total_bits())
            + self.frames.iter().map(EncodedFrame::total_bits).sum::<usize>()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, BitframeError> {
        let config_json = self.config.to_json()?;
        if config_json.len() > MAX_REASONABLE_CONFIG_LEN {
            return Err(BitframeError::FormatError(format!(
                "config header of {} bytes exceeds the maximum of {}",
                config_json.len(),
                MAX_REASONABLE_CONFIG_LEN
            )));
        }
        let frame_count = u32::try_from(self.frames.len()).map_err(|_| {
            BitframeError::FormatError(format!("{} frames exceed the format limit", self.frames.len()))
        })?;

        let mut out = Vec::with_capacity(MIN_SEQUENCE_SIZE + config_json.len() + self.total_bits() / 8);
        out.extend_from_slice(SEQUENCE_MAGIC);
        out.extend_from_slice(&(config_json.len() as u32).to_le_bytes());
        out.extend_from_slice(config_json.as_bytes());
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&frame_count.to_le_bytes());

        write_optional_buffer(&mut out, self.codebook.as_ref());
        for frame in &self.frames {
            write_optional_buffer(&mut out, frame.codebook.as_ref());
            write_buffer(&mut out, &frame.payload);
        }
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BitframeError> {
        if bytes.len() < MIN_SEQUENCE_SIZE {
            return Err(BitframeError::FormatError(format!(
                "sequence is too small to be valid. Minimum size: {}, got: {}",
                MIN_SEQUENCE_SIZE,
                bytes.len()
            )));
        }
        let mut cursor = Cursor::new(bytes);

        let mut magic = [0u8; 4];
        read_exact(&mut cursor, &mut magic)?;
        if magic != *SEQUENCE_MAGIC {
            return Err(BitframeError::FormatError("Invalid sequence magic number".into()));
        }

        let config_len = read_u32(&mut cursor)? as usize;
        if config_len > MAX_REASONABLE_CONFIG_LEN {
            return Err(BitframeError::FormatError(format!(
                "config header length ({}) exceeds maximum allowed size ({})",
                config_len, MAX_REASONABLE_CONFIG_LEN
            )));
        }
        let mut config_buf = vec![0u8; config_len];
        read_exact(&mut cursor, &mut config_buf)?;
        let config_json =
            String::from_utf8(config_buf).map_err(|e| BitframeError::FormatError(e.to_string()))?;
        let config = CodecConfig::from_json(&config_json)?;

        let width = read_u32(&mut cursor)?;
        let height = read_u32(&mut cursor)?;
        let frame_count = read_u32(&mut cursor)? as usize;

        let codebook = read_optional_buffer(&mut cursor)?;
        // Each frame needs at least a flag byte and a payload length.
        let remaining = bytes.len() - cursor.position() as usize;
        if frame_count > remaining / 9 {
            return Err(BitframeError::FormatError(format!(
                "sequence declares {} frames but only {} bytes remain",
                frame_count, remaining
            )));
        }
        let mut frames = Vec::with_capacity(frame_count);
        for _ in 0..frame_count {
            let codebook = read_optional_buffer(&mut cursor)?;
            let payload = read_buffer(&mut cursor)?;
            frames.push(EncodedFrame { codebook, payload });
        }

        if (cursor.position() as usize) != bytes.len() {
            return Err(BitframeError::FormatError(format!(
                "{} trailing bytes after the last frame",
                bytes.len() - cursor.position() as usize
            )));
        }

        Ok(Self {
            config,
            width,
            height,
            codebook,
            frames,
        })
    }
}

//==================================================================================
// Private Helpers
//==================================================================================

fn write_buffer(out: &mut Vec<u8>, buffer: &BitBuffer) {
    out.extend_from_slice(&(buffer.total_bits() as u64).to_le_bytes());
    out.extend_from_slice(&buffer.to_bytes());
}

fn write_optional_buffer(out: &mut Vec<u8>, buffer: Option<&BitBuffer>) {
    match buffer {
        Some(buffer) => {
            out.push(1);
            write_buffer(out, buffer);
        }
        None => out.push(0),
    }
}

fn read_exact(cursor: &mut Cursor<&[u8]>, buf: &mut [u8]) -> Result<(), BitframeError> {
    cursor
        .read_exact(buf)
        .map_err(|e| BitframeError::FormatError(e.to_string()))
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32, BitframeError> {
    let mut buf = [0u8; 4];
    read_exact(cursor, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_buffer(cursor: &mut Cursor<&[u8]>) -> Result<BitBuffer, BitframeError> {
    let mut buf = [0u8; 8];
    read_exact(cursor, &mut buf)?;
    let total_bits = u64::from_le_bytes(buf);

    // SECURITY: the declared length must fit in what is left before allocating.
    let remaining = cursor.get_ref().len() as u64 - cursor.position();
    let byte_len = total_bits.div_ceil(8);
    if byte_len > remaining {
        return Err(BitframeError::FormatError(format!(
            "bit buffer of {} bits exceeds the {} remaining bytes",
            total_bits, remaining
        )));
    }
    let mut bytes = vec![0u8; byte_len as usize];
    read_exact(cursor, &mut bytes)?;
    BitBuffer::from_bytes(&bytes, total_bits as usize)
}

fn read_optional_buffer(cursor: &mut Cursor<&[u8]>) -> Result<Option<BitBuffer>, BitframeError> {
    let mut flag = [0u8; 1];
    read_exact(cursor, &mut flag)?;
    match flag[0] {
        0 => Ok(None),
        1 => read_buffer(cursor).map(Some),
        other => Err(BitframeError::FormatError(format!(
            "invalid codebook flag {}",
            other
        ))),
    }
}

//==================================================================================
// Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodebookScope;

    fn bits(bytes: &[u8], total_bits: usize) -> BitBuffer {
        BitBuffer::from_bytes(bytes, total_bits).unwrap()
    }

    fn create_test_sequence() -> EncodedSequence {
        EncodedSequence {
            config: CodecConfig {
                color_bits: 2,
                rle_count_bits: Some(3),
                huffman: Some(CodebookScope::PerFrame),
                ..Default::default()
            },
            width: 4,
            height: 3,
            codebook: None,
            frames: vec![
                EncodedFrame {
                    codebook: Some(bits(&[0xAA, 0x01], 10)),
                    payload: bits(&[0xFF, 0x0F, 0x03], 18),
                },
                EncodedFrame {
                    codebook: Some(bits(&[0x05], 3)),
                    payload: bits(&[], 0),
                },
            ],
        }
    }

    #[test]
    fn test_artifact_roundtrip_is_successful() {
        let original = create_test_sequence();
        let bytes = original.to_bytes().unwrap();
        assert_eq!(&bytes[..4], SEQUENCE_MAGIC);
        let reconstructed = EncodedSequence::from_bytes(&bytes).unwrap();
        assert_eq!(original, reconstructed);
    }

    #[test]
    fn test_session_codebook_roundtrip() {
        let mut original = create_test_sequence();
        original.config.huffman = Some(CodebookScope::Session);
        original.codebook = Some(bits(&[0x12, 0x34, 0x56], 20));
        for frame in &mut original.frames {
            frame.codebook = None;
        }
        let reconstructed = EncodedSequence::from_bytes(&original.to_bytes().unwrap()).unwrap();
        assert_eq!(original, reconstructed);
    }

    #[test]
    fn test_total_bits_counts_payloads_and_codebooks() {
        assert_eq!(create_test_sequence().total_bits(), 10 + 18 + 3);
    }

    #[test]
    fn test_parsing_errors_are_handled_gracefully() {
        assert!(matches!(
            EncodedSequence::from_bytes(b"short"),
            Err(BitframeError::FormatError(_))
        ));

        let mut bad_magic = create_test_sequence().to_bytes().unwrap();
        bad_magic[0] = b'X';
        assert!(matches!(
            EncodedSequence::from_bytes(&bad_magic),
            Err(BitframeError::FormatError(_))
        ));

        let bytes = create_test_sequence().to_bytes().unwrap();
        let truncated = &bytes[..bytes.len() - 1];
        assert!(matches!(
            EncodedSequence::from_bytes(truncated),
            Err(BitframeError::FormatError(_))
        ));

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(matches!(
            EncodedSequence::from_bytes(&trailing),
            Err(BitframeError::FormatError(_))
        ));
    }

    #[test]
    fn test_malformed_lengths_are_rejected() {
        let mut bytes = create_test_sequence().to_bytes().unwrap();
        // Corrupt the config length to be huge.
        bytes[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            EncodedSequence::from_bytes(&bytes),
            Err(BitframeError::FormatError(_))
        ));
    }
}
