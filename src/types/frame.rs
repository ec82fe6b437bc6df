//! A single grayscale frame as delivered by the image-loading collaborator.
//!
//! Pixels are stored `x`-outer (`pixels[x * height + y]`), matching the frame
//! container's byte order, so a frame can be sliced straight out of a container
//! payload without reordering.

use crate::error::BitframeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Frame {
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self, BitframeError> {
        if pixels.len() != width * height {
            return Err(BitframeError::ShapeError(format!(
                "{}x{} frame needs {} pixels, got {}",
                width,
                height,
                width * height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// An all-zero frame.
    pub fn blank(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw pixel bytes, `x`-outer.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[x * self.height + y])
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, value: u8) -> Result<(), BitframeError> {
        if x >= self.width || y >= self.height {
            return Err(BitframeError::RangeError(format!(
                "pixel ({}, {}) outside {}x{} frame",
                x, y, self.width, self.height
            )));
        }
        self.pixels[x * self.height + y] = value;
        Ok(())
    }

    /// Keeps every `factor`th pixel along both axes. No blending is done; both
    /// dimensions must be divisible by `factor`.
    pub fn downsample(&self, factor: usize) -> Result<Frame, BitframeError> {
        if factor == 0 || self.width % factor != 0 || self.height % factor != 0 {
            return Err(BitframeError::ShapeError(format!(
                "cannot downsample a {}x{} frame by {}",
                self.width, self.height, factor
            )));
        }
        let width = self.width / factor;
        let height = self.height / factor;
        let mut pixels = Vec::with_capacity(width * height);
        for x in 0..width {
            for y in 0..height {
                pixels.push(self.pixels[(x * factor) * self.height + y * factor]);
            }
        }
        Ok(Frame {
            width,
            height,
            pixels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_order_is_x_outer() {
        let frame = Frame::new(2, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(frame.pixel(0, 2), Some(3));
        assert_eq!(frame.pixel(1, 0), Some(4));
        assert_eq!(frame.pixel(2, 0), None);
    }

    #[test]
    fn test_wrong_pixel_count() {
        assert!(matches!(
            Frame::new(2, 2, vec![0; 3]),
            Err(BitframeError::ShapeError(_))
        ));
    }

    #[test]
    fn test_downsample() {
        let pixels: Vec<u8> = (0..16).collect();
        let frame = Frame::new(4, 4, pixels).unwrap();
        let small = frame.downsample(2).unwrap();
        assert_eq!(small.width(), 2);
        assert_eq!(small.pixels(), &[0, 2, 8, 10]);
        assert!(frame.downsample(3).is_err());
        assert!(frame.downsample(0).is_err());
    }
}
