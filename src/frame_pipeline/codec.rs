//! The frame codec: the full encode/decode chain over a sequence of frames.
//!
//! ```text
//! Frame → Grid (pack_safe) → flatten → [xor delta] → [rle] → [huffman | raw bits]
//! ```
//!
//! Decoding runs the same chain backwards. The previous frame used as the delta
//! reference is always the *prepared* (packed and flattened) stream of the
//! previous frame, never its delta.

use std::sync::Arc;

use crate::config::{CodebookScope, CodecConfig};
use crate::error::BitframeError;
use crate::kernels::huffman::Codebook;
use crate::kernels::{rle, xor_delta};
use crate::types::bit_buffer::BitBuffer;
use crate::types::frame::Frame;
use crate::types::grid::{Dimension, Grid};
use crate::types::symbol_stream::SymbolStream;

use super::artifact::{EncodedFrame, EncodedSequence};
use super::container::FrameSet;

/// Extents needed to turn a prepared stream back into a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub frame_width: usize,
    pub frame_height: usize,
    /// Line count of the packed grid.
    pub line_count: usize,
    /// Line length of the packed grid.
    pub line_length: usize,
}

pub struct FrameCodec {
    config: Arc<CodecConfig>,
}

impl FrameCodec {
    pub fn new(config: Arc<CodecConfig>) -> Result<Self, BitframeError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// The packed-grid extents for a `width x height` frame under this config.
    pub fn geometry(&self, frame_width: usize, frame_height: usize) -> FrameGeometry {
        let k = self.config.pack_count;
        let packed = |n: usize| (n + k - 1) / k;
        let (line_count, line_length) = if self.config.pack_orientation.along_columns() {
            (packed(frame_width), frame_height)
        } else {
            (frame_width, packed(frame_height))
        };
        FrameGeometry {
            frame_width,
            frame_height,
            line_count,
            line_length,
        }
    }

    //------------------------------------------------------------------------------
    // Single frame
    //------------------------------------------------------------------------------

    /// Quantizes, packs and flattens one frame.
    pub fn prepare_frame(&self, frame: &Frame) -> Result<(SymbolStream, FrameGeometry), BitframeError> {
        let along_columns = self.config.pack_orientation.along_columns();
        let grid = Grid::from_frame(frame, self.config.color_bits)?
            .pack_safe(self.config.pack_count, along_columns)?;
        let geometry = self.geometry(frame.width(), frame.height());
        debug_assert_eq!(
            (grid.line_count(), grid.line_length()),
            (geometry.line_count, geometry.line_length)
        );
        Ok((grid.flatten(self.config.flatten_order)?, geometry))
    }

    /// Inverse of `prepare_frame`: unflatten, unpack and trim the padding.
    pub fn restore_frame(
        &self,
        stream: &SymbolStream,
        geometry: &FrameGeometry,
    ) -> Result<Frame, BitframeError> {
        let along_columns = self.config.pack_orientation.along_columns();
        let grid = Grid::unflatten(
            stream,
            geometry.line_count,
            geometry.line_length,
            self.config.flatten_order,
        )?
        .unpack(self.config.pack_count, along_columns)?;
        let grid = if along_columns {
            grid.trim(Dimension::LineCount, geometry.frame_width)?
        } else {
            grid.trim(Dimension::LineLength, geometry.frame_height)?
        };
        grid.to_frame()
    }

    //------------------------------------------------------------------------------
    // Sequence
    //------------------------------------------------------------------------------

    pub fn encode_sequence(&self, frames: &FrameSet) -> Result<EncodedSequence, BitframeError> {
        let config = &self.config;
        let symbol_bits = config.symbol_bits();

        let mut payloads = Vec::with_capacity(frames.len());
        let mut previous: Option<SymbolStream> = None;
        for (index, frame) in frames.iter().enumerate() {
            let (stream, _) = self
                .prepare_frame(frame)
                .map_err(|e| e.at_stage(format!("prepare frame {}", index)))?;

            let reduced = match (&previous, config.delta) {
                (Some(reference), true) => xor_delta::encode(&stream, reference)
                    .map_err(|e| e.at_stage(format!("delta frame {}", index)))?,
                _ => stream.clone(),
            };
            previous = Some(stream);

            let coded = match config.rle_count_bits {
                Some(count_bits) => rle::encode(&reduced, symbol_bits, count_bits)
                    .map_err(|e| e.at_stage(format!("rle frame {}", index)))?,
                None => reduced,
            };
            payloads.push(coded);
        }

        let (codebook, encoded_frames) = self.entropy_encode(&payloads)?;
        let sequence = EncodedSequence {
            config: (**config).clone(),
            width: dimension_to_u32(frames.width(), "width")?,
            height: dimension_to_u32(frames.height(), "height")?,
            codebook,
            frames: encoded_frames,
        };

        log::info!(
            "encoded {} frames of {}x{}: {} -> {} bits",
            frames.len(),
            frames.width(),
            frames.height(),
            frames.raw_bits(config.color_bits),
            sequence.total_bits()
        );
        Ok(sequence)
    }

    pub fn decode_sequence(&self, encoded: &EncodedSequence) -> Result<FrameSet, BitframeError> {
        if encoded.config != *self.config {
            return Err(BitframeError::FormatError(
                "sequence was encoded with a different configuration".to_string(),
            ));
        }
        let config = &self.config;
        let symbol_bits = config.symbol_bits();
        let payload_bits = config.payload_bits();
        let geometry = self.geometry(encoded.width as usize, encoded.height as usize);

        let session_book = match (config.huffman, &encoded.codebook) {
            (Some(CodebookScope::Session), Some(buffer)) => Some(
                Codebook::deserialize(buffer).map_err(|e| e.at_stage("session codebook"))?,
            ),
            (Some(CodebookScope::Session), None) if !encoded.frames.is_empty() => {
                return Err(BitframeError::FormatError(
                    "session-coded sequence carries no codebook".to_string(),
                ))
            }
            _ => None,
        };

        let mut output = FrameSet::new(geometry.frame_width, geometry.frame_height);
        let mut previous: Option<SymbolStream> = None;
        for (index, frame) in encoded.frames.iter().enumerate() {
            let payload = self
                .entropy_decode(frame, session_book.as_ref(), payload_bits)
                .map_err(|e| e.at_stage(format!("entropy frame {}", index)))?;

            let reduced = match config.rle_count_bits {
                Some(count_bits) => rle::decode(&payload, symbol_bits, count_bits)
                    .map_err(|e| e.at_stage(format!("rle frame {}", index)))?,
                None => payload,
            };

            let stream = match (&previous, config.delta) {
                (Some(reference), true) => xor_delta::decode(&reduced, reference)
                    .map_err(|e| e.at_stage(format!("delta frame {}", index)))?,
                _ => reduced,
            };

            let restored = self
                .restore_frame(&stream, &geometry)
                .map_err(|e| e.at_stage(format!("restore frame {}", index)))?;
            output.push(restored)?;
            previous = Some(stream);
        }
        log::info!("decoded {} frames", output.len());
        Ok(output)
    }

    //------------------------------------------------------------------------------
    // Entropy stage
    //------------------------------------------------------------------------------

    fn entropy_encode(
        &self,
        payloads: &[SymbolStream],
    ) -> Result<(Option<BitBuffer>, Vec<EncodedFrame>), BitframeError> {
        match self.config.huffman {
            None => {
                let frames = payloads
                    .iter()
                    .map(|p| {
                        Ok(EncodedFrame {
                            codebook: None,
                            payload: p.to_bit_buffer()?,
                        })
                    })
                    .collect::<Result<Vec<_>, BitframeError>>()?;
                Ok((None, frames))
            }
            Some(CodebookScope::Session) if payloads.is_empty() => Ok((None, Vec::new())),
            Some(CodebookScope::Session) => {
                let book = Codebook::from_streams(payloads).map_err(|e| e.at_stage("session codebook"))?;
                let mut frames = Vec::with_capacity(payloads.len());
                for (index, payload) in payloads.iter().enumerate() {
                    let encoded = book
                        .encode_run(payload)
                        .map_err(|e| e.at_stage(format!("huffman frame {}", index)))?;
                    log_metric!("event"="frame_encoded", "frame"=&index, "bits"=&encoded.total_bits());
                    frames.push(EncodedFrame {
                        codebook: None,
                        payload: encoded,
                    });
                }
                Ok((Some(book.serialize()?), frames))
            }
            Some(CodebookScope::PerFrame) => {
                let mut frames = Vec::with_capacity(payloads.len());
                for (index, payload) in payloads.iter().enumerate() {
                    let book = Codebook::from_streams([payload])
                        .map_err(|e| e.at_stage(format!("codebook frame {}", index)))?;
                    let encoded = book
                        .encode_run(payload)
                        .map_err(|e| e.at_stage(format!("huffman frame {}", index)))?;
                    log_metric!("event"="frame_encoded", "frame"=&index, "bits"=&encoded.total_bits());
                    frames.push(EncodedFrame {
                        codebook: Some(book.serialize()?),
                        payload: encoded,
                    });
                }
                Ok((None, frames))
            }
        }
    }

    fn entropy_decode(
        &self,
        frame: &EncodedFrame,
        session_book: Option<&Codebook>,
        payload_bits: u32,
    ) -> Result<SymbolStream, BitframeError> {
        let frame_book;
        let book = match (self.config.huffman, session_book, &frame.codebook) {
            (None, _, _) => return SymbolStream::from_bit_buffer(&frame.payload, payload_bits),
            (Some(CodebookScope::Session), Some(book), _) => book,
            (Some(CodebookScope::PerFrame), _, Some(buffer)) => {
                frame_book = Codebook::deserialize(buffer)?;
                &frame_book
            }
            _ => {
                return Err(BitframeError::FormatError(
                    "entropy-coded frame has no codebook".to_string(),
                ))
            }
        };
        let (stream, next) = book.decode_run(&frame.payload, 0, payload_bits)?;
        if next != frame.payload.total_bits() {
            log::warn!(
                "{} bits after the run terminator ignored",
                frame.payload.total_bits() - next
            );
        }
        Ok(stream)
    }
}

fn dimension_to_u32(value: usize, name: &str) -> Result<u32, BitframeError> {
    u32::try_from(value)
        .map_err(|_| BitframeError::RangeError(format!("frame {} {} exceeds u32", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PackOrientation;
    use crate::types::grid::FlattenOrder;

    fn codec(config: CodecConfig) -> FrameCodec {
        FrameCodec::new(Arc::new(config)).unwrap()
    }

    #[test]
    fn test_geometry_rounds_up_packed_dimension() {
        let rows = codec(CodecConfig {
            pack_count: 4,
            ..Default::default()
        });
        let g = rows.geometry(5, 7);
        assert_eq!((g.line_count, g.line_length), (5, 2));

        let columns = codec(CodecConfig {
            pack_count: 4,
            pack_orientation: PackOrientation::Columns,
            ..Default::default()
        });
        let g = columns.geometry(5, 7);
        assert_eq!((g.line_count, g.line_length), (2, 7));
    }

    #[test]
    fn test_prepare_and_restore_frame() {
        let frame = Frame::new(3, 5, (0..15).map(|v| (v % 4) as u8).collect()).unwrap();
        for orientation in [PackOrientation::Rows, PackOrientation::Columns] {
            for order in [FlattenOrder::EndToEnd, FlattenOrder::Interleaved] {
                let c = codec(CodecConfig {
                    color_bits: 2,
                    pack_count: 2,
                    pack_orientation: orientation,
                    flatten_order: order,
                    ..Default::default()
                });
                let (stream, geometry) = c.prepare_frame(&frame).unwrap();
                assert_eq!(stream.width(), 4);
                assert_eq!(stream.len(), geometry.line_count * geometry.line_length);
                assert_eq!(c.restore_frame(&stream, &geometry).unwrap(), frame);
            }
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = FrameCodec::new(Arc::new(CodecConfig {
            color_bits: 0,
            ..Default::default()
        }));
        assert!(matches!(result, Err(BitframeError::RangeError(_))));
    }

    #[test]
    fn test_decode_with_other_config_fails() {
        let frames = FrameSet::from_frames(vec![Frame::blank(2, 2)]).unwrap();
        let encoded = codec(CodecConfig::default()).encode_sequence(&frames).unwrap();
        let other = codec(CodecConfig {
            delta: true,
            ..Default::default()
        });
        assert!(matches!(
            other.decode_sequence(&encoded),
            Err(BitframeError::FormatError(_))
        ));
    }
}
