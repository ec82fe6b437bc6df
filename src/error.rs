// In: src/error.rs

//! This module defines the single, unified error type for the entire bitframe library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BitframeError {
    // =========================================================================
    // === Core Taxonomy (bit buffers, grids, coders)
    // =========================================================================
    /// A bit index, bit count, symbol width or extent is out of bounds.
    #[error("Range error: {0}")]
    RangeError(String),

    /// Dimensions don't line up (grid reshape, packing divisor, width mismatch).
    #[error("Shape error: {0}")]
    ShapeError(String),

    /// A codebook, Huffman run, container or artifact is malformed or truncated.
    #[error("Format error: {0}")]
    FormatError(String),

    /// A symbol was encoded that the code table was never built with.
    #[error("Symbol {0:#x} is absent from the code table")]
    PrecompositionError(u32),

    #[error("Internal logic error (this is a bug): {0}")]
    InternalError(String),

    #[error("Pipeline execution failed at stage '{stage}': {source}")]
    PipelineError {
        stage: String,
        #[source]
        source: Box<BitframeError>,
    },

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the underlying I/O subsystem (e.g., file not found).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, typically during config/report serialization.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

impl BitframeError {
    /// Wraps `self` with the name of the pipeline stage it escaped from.
    pub fn at_stage(self, stage: impl Into<String>) -> Self {
        BitframeError::PipelineError {
            stage: stage.into(),
            source: Box::new(self),
        }
    }
}
