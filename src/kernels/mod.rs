//! This module collects the pure, stateless coding kernels of the codec.
//!
//! Each kernel takes its input by shared reference and returns a new value; none
//! of them keeps state between calls. The frame pipeline chains them in a fixed
//! order: `xor_delta` → `rle` → `huffman`.

//==================================================================================
// 1. Module Declarations
//==================================================================================

/// Inter-frame value reduction
pub mod xor_delta;

/// Run exploitation
pub mod rle;

/// Final stage: entropy coding
pub mod huffman;
