//! This module defines the highest-level processing pipeline: turning a whole
//! sequence of frames into an `EncodedSequence` and back, plus the compression
//! trial used to compare configurations.
//!
//! The frame container (`container`) is the boundary with the image loader; the
//! artifact (`artifact`) is the boundary with whatever stores or ships the
//! compressed result.

use std::sync::Arc;

use crate::config::CodecConfig;
use crate::error::BitframeError;

//==================================================================================
// 1. Module Declarations
//==================================================================================

pub mod artifact;
pub mod codec;
pub mod container;
pub mod trial;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================

pub use self::artifact::{EncodedFrame, EncodedSequence};
pub use self::codec::{FrameCodec, FrameGeometry};
pub use self::container::FrameSet;
pub use self::trial::{best_trial, run_trial, run_trials, TrialReport};

/// Encodes `frames` under `config` and serializes the result.
pub fn compress(frames: &FrameSet, config: Arc<CodecConfig>) -> Result<Vec<u8>, BitframeError> {
    FrameCodec::new(config)?.encode_sequence(frames)?.to_bytes()
}

/// Parses a serialized sequence and decodes it with the configuration it carries.
pub fn decompress(bytes: &[u8]) -> Result<FrameSet, BitframeError> {
    let encoded = EncodedSequence::from_bytes(bytes)?;
    FrameCodec::new(Arc::new(encoded.config.clone()))?.decode_sequence(&encoded)
}
