//! This module defines `Grid`, a 2D arrangement of fixed-width symbols
//! (`line_count` lines of `line_length` symbols each) and the layout transforms
//! used to turn a frame into a 1D `SymbolStream` with better locality:
//! flattening, transposition, padding/trimming and N-to-1 symbol packing.
//!
//! Every transform returns a new grid; none of them alias the source.

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use crate::error::BitframeError;
use crate::types::bit_buffer::low_mask;
use crate::types::frame::Frame;
use crate::types::symbol_stream::{check_width, SymbolStream};

//==================================================================================
// 1. Layout Enums
//==================================================================================

/// The order in which a grid's symbols are laid out in a 1D stream.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlattenOrder {
    /// Line 0 in full, then line 1, and so on (row-major).
    #[default]
    EndToEnd,
    /// Index 0 of every line, then index 1 of every line, and so on (column-major).
    Interleaved,
}

/// Which extent of a grid a pad or trim applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    LineLength,
    LineCount,
}

//==================================================================================
// 2. The Grid
//==================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    /// Shape is `(line_count, line_length)`.
    cells: Array2<u32>,
}

impl Grid {
    /// An all-zero grid.
    pub fn new(width: u32, line_count: usize, line_length: usize) -> Result<Self, BitframeError> {
        check_width(width)?;
        Ok(Self {
            width,
            cells: Array2::zeros((line_count, line_length)),
        })
    }

    /// Builds a grid from equal-length lines, masking every value to `width`.
    pub fn from_lines(width: u32, lines: &[Vec<u32>]) -> Result<Self, BitframeError> {
        check_width(width)?;
        let line_length = lines.first().map_or(0, |line| line.len());
        if let Some(bad) = lines.iter().position(|line| line.len() != line_length) {
            return Err(BitframeError::ShapeError(format!(
                "line {} has {} symbols, expected {}",
                bad,
                lines[bad].len(),
                line_length
            )));
        }
        let mask = low_mask(width);
        let cells = Array2::from_shape_fn((lines.len(), line_length), |(i, j)| lines[i][j] & mask);
        Ok(Self { width, cells })
    }

    /// Builds a grid of `color_bits`-wide symbols from a frame. Each line is one
    /// `x` column of the frame, so `line_count == width` and `line_length == height`.
    pub fn from_frame(frame: &Frame, color_bits: u32) -> Result<Self, BitframeError> {
        check_width(color_bits)?;
        if color_bits > 8 {
            return Err(BitframeError::RangeError(format!(
                "color depth {} exceeds the 8 bits a pixel byte can hold",
                color_bits
            )));
        }
        let mask = low_mask(color_bits);
        let cells = Array2::from_shape_vec(
            (frame.width(), frame.height()),
            frame.pixels().iter().map(|&p| p as u32 & mask).collect(),
        )
        .map_err(|e| BitframeError::InternalError(format!("frame shape rejected: {}", e)))?;
        Ok(Self {
            width: color_bits,
            cells,
        })
    }

    /// Converts back into a frame (one line per `x` column). Symbols must fit in a byte.
    pub fn to_frame(&self) -> Result<Frame, BitframeError> {
        if self.width > 8 {
            return Err(BitframeError::RangeError(format!(
                "{}-bit symbols do not fit in pixel bytes",
                self.width
            )));
        }
        Frame::new(
            self.line_count(),
            self.line_length(),
            self.cells.iter().map(|&v| v as u8).collect(),
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn line_count(&self) -> usize {
        self.cells.nrows()
    }

    pub fn line_length(&self) -> usize {
        self.cells.ncols()
    }

    pub fn total_bits(&self) -> usize {
        self.cells.len() * self.width as usize
    }

    pub fn get(&self, line: usize, index: usize) -> Result<u32, BitframeError> {
        self.cells.get((line, index)).copied().ok_or_else(|| {
            BitframeError::RangeError(format!(
                "cell ({}, {}) outside {}x{} grid",
                line,
                index,
                self.line_count(),
                self.line_length()
            ))
        })
    }

    pub fn set(&mut self, line: usize, index: usize, value: u32) -> Result<(), BitframeError> {
        let mask = low_mask(self.width);
        let (line_count, line_length) = self.cells.dim();
        let cell = self.cells.get_mut((line, index)).ok_or_else(|| {
            BitframeError::RangeError(format!(
                "cell ({}, {}) outside {}x{} grid",
                line, index, line_count, line_length
            ))
        })?;
        *cell = value & mask;
        Ok(())
    }

    /// Copies one line out as a stream.
    pub fn line(&self, line: usize) -> Result<SymbolStream, BitframeError> {
        if line >= self.line_count() {
            return Err(BitframeError::RangeError(format!(
                "line {} outside grid of {} lines",
                line,
                self.line_count()
            )));
        }
        SymbolStream::from_values(self.width, self.cells.row(line).iter().copied())
    }

    //------------------------------------------------------------------------------
    // Flattening
    //------------------------------------------------------------------------------

    pub fn flatten(&self, order: FlattenOrder) -> Result<SymbolStream, BitframeError> {
        match order {
            FlattenOrder::EndToEnd => SymbolStream::from_values(self.width, self.cells.iter().copied()),
            FlattenOrder::Interleaved => {
                SymbolStream::from_values(self.width, self.cells.t().iter().copied())
            }
        }
    }

    /// Exact inverse of `flatten` for a grid of the given extent.
    pub fn unflatten(
        stream: &SymbolStream,
        line_count: usize,
        line_length: usize,
        order: FlattenOrder,
    ) -> Result<Grid, BitframeError> {
        if stream.len() != line_count * line_length {
            return Err(BitframeError::ShapeError(format!(
                "stream of {} symbols cannot fill a {}x{} grid",
                stream.len(),
                line_count,
                line_length
            )));
        }
        let values = stream.values();
        let cells = match order {
            FlattenOrder::EndToEnd => {
                Array2::from_shape_fn((line_count, line_length), |(i, j)| values[i * line_length + j])
            }
            FlattenOrder::Interleaved => {
                Array2::from_shape_fn((line_count, line_length), |(i, j)| values[j * line_count + i])
            }
        };
        Ok(Grid {
            width: stream.width(),
            cells,
        })
    }

    //------------------------------------------------------------------------------
    // Geometry
    //------------------------------------------------------------------------------

    /// Swaps the roles of lines and columns. The result owns a fresh copy.
    pub fn transpose(&self) -> Grid {
        let (line_count, line_length) = self.cells.dim();
        Grid {
            width: self.width,
            cells: Array2::from_shape_fn((line_length, line_count), |(i, j)| self.cells[[j, i]]),
        }
    }

    /// Extends `dimension` with zero symbols up to the next multiple of `multiple`.
    pub fn pad(&self, dimension: Dimension, multiple: usize) -> Result<Grid, BitframeError> {
        if multiple == 0 {
            return Err(BitframeError::RangeError("pad multiple must be at least 1".to_string()));
        }
        let (line_count, line_length) = self.cells.dim();
        let round_up = |n: usize| (n + multiple - 1) / multiple * multiple;
        let (padded_count, padded_length) = match dimension {
            Dimension::LineLength => (line_count, round_up(line_length)),
            Dimension::LineCount => (round_up(line_count), line_length),
        };
        if (padded_count, padded_length) == (line_count, line_length) {
            return Ok(self.clone());
        }

        let mut cells = Array2::zeros((padded_count, padded_length));
        cells
            .slice_mut(s![..line_count, ..line_length])
            .assign(&self.cells);
        Ok(Grid {
            width: self.width,
            cells,
        })
    }

    /// Cuts `dimension` back to `length`.
    pub fn trim(&self, dimension: Dimension, length: usize) -> Result<Grid, BitframeError> {
        let (line_count, line_length) = self.cells.dim();
        let current = match dimension {
            Dimension::LineLength => line_length,
            Dimension::LineCount => line_count,
        };
        if length > current {
            return Err(BitframeError::RangeError(format!(
                "cannot trim {:?} of {} up to {}",
                dimension, current, length
            )));
        }
        let cells = match dimension {
            Dimension::LineLength => self.cells.slice(s![.., ..length]).to_owned(),
            Dimension::LineCount => self.cells.slice(s![..length, ..]).to_owned(),
        };
        Ok(Grid {
            width: self.width,
            cells,
        })
    }

    //------------------------------------------------------------------------------
    // Packing
    //------------------------------------------------------------------------------

    /// Merges every `pack_count` adjacent symbols into one symbol of
    /// `width * pack_count` bits, least-significant group first. Packs along
    /// lines, or along columns when `along_columns` is set.
    pub fn pack(&self, pack_count: usize, along_columns: bool) -> Result<Grid, BitframeError> {
        if pack_count == 0 {
            return Err(BitframeError::RangeError("pack count must be at least 1".to_string()));
        }
        let packed_width = self.width as usize * pack_count;
        if packed_width > 32 {
            return Err(BitframeError::RangeError(format!(
                "packing {} symbols of {} bits exceeds 32 bits",
                pack_count, self.width
            )));
        }
        if pack_count == 1 {
            return Ok(self.clone());
        }

        let source = if along_columns { self.transpose() } else { self.clone() };
        if source.line_length() % pack_count != 0 {
            return Err(BitframeError::ShapeError(format!(
                "line length {} is not divisible by pack count {}",
                source.line_length(),
                pack_count
            )));
        }

        let width = self.width;
        let cells = Array2::from_shape_fn(
            (source.line_count(), source.line_length() / pack_count),
            |(i, j)| {
                (0..pack_count).fold(0u32, |acc, q| {
                    acc | (source.cells[[i, j * pack_count + q]] << (q as u32 * width))
                })
            },
        );
        let packed = Grid {
            width: packed_width as u32,
            cells,
        };
        Ok(if along_columns { packed.transpose() } else { packed })
    }

    /// Pads the packed dimension to a multiple of `pack_count`, then packs. The
    /// padding stays until trimmed explicitly.
    pub fn pack_safe(&self, pack_count: usize, along_columns: bool) -> Result<Grid, BitframeError> {
        let dimension = if along_columns {
            Dimension::LineCount
        } else {
            Dimension::LineLength
        };
        self.pad(dimension, pack_count.max(1))?
            .pack(pack_count, along_columns)
    }

    /// Inverse of `pack`: splits every symbol into `unpack_count` narrower ones.
    pub fn unpack(&self, unpack_count: usize, along_columns: bool) -> Result<Grid, BitframeError> {
        if unpack_count == 0 || self.width as usize % unpack_count != 0 {
            return Err(BitframeError::ShapeError(format!(
                "symbol width {} is not divisible by unpack count {}",
                self.width, unpack_count
            )));
        }
        if unpack_count == 1 {
            return Ok(self.clone());
        }

        let narrow = self.width / unpack_count as u32;
        let mask = low_mask(narrow);
        let source = if along_columns { self.transpose() } else { self.clone() };
        let cells = Array2::from_shape_fn(
            (source.line_count(), source.line_length() * unpack_count),
            |(i, j)| {
                let shift = (j % unpack_count) as u32 * narrow;
                (source.cells[[i, j / unpack_count]] >> shift) & mask
            },
        );
        let unpacked = Grid {
            width: narrow,
            cells,
        };
        Ok(if along_columns { unpacked.transpose() } else { unpacked })
    }
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
