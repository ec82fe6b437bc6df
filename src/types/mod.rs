//! This module defines the core data representations of the codec: the
//! bit-addressable `BitBuffer`, the fixed-width `SymbolStream` built on top of
//! it, the 2D `Grid` used for layout transforms, and the raw `Frame`.

pub mod bit_buffer;
mod bit_buffer_tests;
pub mod frame;
pub mod grid;
pub mod symbol_stream;

// Re-export the main types for easier access.
pub use bit_buffer::BitBuffer;
pub use frame::Frame;
pub use grid::{Dimension, FlattenOrder, Grid};
pub use symbol_stream::SymbolStream;
