//! Reading and writing the raw frame container produced by the image loader.
//!
//! Layout (all integers little-endian `i32`):
//!
//! ```text
//! frame_count | width | height | frame_count * width * height pixel bytes
//! ```
//!
//! Pixels of each frame are stored with `x` as the outer loop, which is exactly
//! the in-memory order of `Frame`.

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use crate::error::BitframeError;
use crate::types::bit_buffer::low_mask;
use crate::types::frame::Frame;

const HEADER_SIZE: usize = 12;

/// An ordered sequence of equally sized frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSet {
    width: usize,
    height: usize,
    frames: Vec<Frame>,
}

impl FrameSet {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            frames: Vec::new(),
        }
    }

    /// Builds a set from frames that must all share the first frame's size.
    pub fn from_frames(frames: Vec<Frame>) -> Result<Self, BitframeError> {
        let (width, height) = frames
            .first()
            .map_or((0, 0), |f| (f.width(), f.height()));
        let mut set = Self::new(width, height);
        for frame in frames {
            set.push(frame)?;
        }
        Ok(set)
    }

    pub fn push(&mut self, frame: Frame) -> Result<(), BitframeError> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(BitframeError::ShapeError(format!(
                "{}x{} frame does not match the {}x{} sequence",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    /// Bits needed to store every pixel at `color_bits` per pixel.
    pub fn raw_bits(&self, color_bits: u32) -> usize {
        self.frames.len() * self.width * self.height * color_bits as usize
    }

    /// A copy with every pixel reduced to its low `color_bits` bits.
    pub fn quantized(&self, color_bits: u32) -> Result<FrameSet, BitframeError> {
        let mask = low_mask(color_bits.min(8)) as u8;
        let frames = self
            .frames
            .iter()
            .map(|f| Frame::new(f.width(), f.height(), f.pixels().iter().map(|p| p & mask).collect()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FrameSet {
            width: self.width,
            height: self.height,
            frames,
        })
    }

    /// Downsamples every frame by `factor`. See `Frame::downsample`.
    pub fn downsample(&self, factor: usize) -> Result<FrameSet, BitframeError> {
        if factor == 0 || self.width % factor != 0 || self.height % factor != 0 {
            return Err(BitframeError::ShapeError(format!(
                "cannot downsample {}x{} frames by {}",
                self.width, self.height, factor
            )));
        }
        let frames = self
            .frames
            .iter()
            .map(|f| f.downsample(factor))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FrameSet {
            width: self.width / factor,
            height: self.height / factor,
            frames,
        })
    }

    //------------------------------------------------------------------------------
    // Container format
    //------------------------------------------------------------------------------

    pub fn from_container_bytes(bytes: &[u8]) -> Result<Self, BitframeError> {
        if bytes.len() < HEADER_SIZE {
            return Err(BitframeError::FormatError(format!(
                "container is too small to be valid. Minimum size: {}, got: {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut cursor = Cursor::new(bytes);
        let frame_count = read_dimension(&mut cursor, "frame count")?;
        let width = read_dimension(&mut cursor, "width")?;
        let height = read_dimension(&mut cursor, "height")?;

        let frame_size = width * height;
        let expected = frame_count
            .checked_mul(frame_size)
            .ok_or_else(|| BitframeError::FormatError("container dimensions overflow".into()))?;
        let payload = &bytes[HEADER_SIZE..];
        if payload.len() != expected {
            return Err(BitframeError::FormatError(format!(
                "container declares {} frames of {}x{} ({} bytes) but holds {} bytes",
                frame_count,
                width,
                height,
                expected,
                payload.len()
            )));
        }

        let mut set = FrameSet::new(width, height);
        for i in 0..frame_count {
            let start = i * frame_size;
            set.frames
                .push(Frame::new(width, height, payload[start..start + frame_size].to_vec())?);
        }
        log::debug!(
            "container: read {} frames of {}x{}",
            frame_count,
            width,
            height
        );
        Ok(set)
    }

    pub fn to_container_bytes(&self) -> Result<Vec<u8>, BitframeError> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.frames.len() * self.width * self.height);
        for (name, value) in [
            ("frame count", self.frames.len()),
            ("width", self.width),
            ("height", self.height),
        ] {
            let value = i32::try_from(value).map_err(|_| {
                BitframeError::FormatError(format!("{} {} does not fit the container header", name, value))
            })?;
            out.extend_from_slice(&value.to_le_bytes());
        }
        for frame in &self.frames {
            out.extend_from_slice(frame.pixels());
        }
        Ok(out)
    }

    pub fn read_container(path: &Path) -> Result<Self, BitframeError> {
        let bytes = fs::read(path)?;
        Self::from_container_bytes(&bytes)
    }

    pub fn write_container(&self, path: &Path) -> Result<(), BitframeError> {
        fs::write(path, self.to_container_bytes()?)?;
        Ok(())
    }
}

fn read_dimension(cursor: &mut Cursor<&[u8]>, name: &str) -> Result<usize, BitframeError> {
    let mut buf = [0u8; 4];
    cursor
        .read_exact(&mut buf)
        .map_err(|e| BitframeError::FormatError(e.to_string()))?;
    let value = i32::from_le_bytes(buf);
    usize::try_from(value)
        .map_err(|_| BitframeError::FormatError(format!("container {} is negative: {}", name, value)))
}
