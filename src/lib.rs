//! This file is the root of the `bitframe` crate, an experimental compressor
//! for sequences of low-bit-depth grayscale frames.
//!
//! Its responsibilities are strictly limited to declaring the top-level modules
//! and re-exporting the types most callers need:
//!
//! - `types`: `BitBuffer`, `SymbolStream`, `Grid`, `Frame`
//! - `kernels`: XOR delta, run-length and canonical Huffman coders
//! - `frame_pipeline`: the sequence codec, its artifact format and trials
//! - `config`: `CodecConfig`, shared read-only via `Arc`

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
pub mod observability; // Make macros available throughout the crate

pub mod config;
pub mod error;
pub mod frame_pipeline;
pub mod kernels;
pub mod types;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================
pub use config::{CodebookScope, CodecConfig, PackOrientation};
pub use error::BitframeError;
pub use frame_pipeline::{compress, decompress, FrameSet};
pub use types::{BitBuffer, Dimension, FlattenOrder, Frame, Grid, SymbolStream};
