//! A compression trial: encode a frame sequence under one configuration and
//! report how well it did.
//!
//! Trials take the frames by shared reference and never modify them, so any
//! number of trials over the same input can run side by side.

use std::sync::Arc;

use serde::Serialize;

use super::codec::FrameCodec;
use super::container::FrameSet;
use crate::config::CodecConfig;
use crate::error::BitframeError;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TrialReport {
    pub config: CodecConfig,
    pub frame_count: usize,
    /// Bits needed to store the frames at `color_bits` per pixel.
    pub input_bits: usize,
    /// Payload and codebook bits of the encoded sequence.
    pub output_bits: usize,
    /// `input_bits / output_bits`; 0 when nothing was produced.
    pub ratio: f64,
    /// Whether the sequence decoded back to the quantized input. `None` when not checked.
    pub verified: Option<bool>,
}

impl TrialReport {
    pub fn to_json(&self) -> Result<String, BitframeError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Runs one trial. With `verify`, the encoded sequence is also serialized,
/// parsed back, decoded and compared with the input reduced to `color_bits`.
pub fn run_trial(
    frames: &FrameSet,
    config: CodecConfig,
    verify: bool,
) -> Result<TrialReport, BitframeError> {
    let codec = FrameCodec::new(Arc::new(config))?;
    let encoded = codec.encode_sequence(frames)?;

    let verified = if verify {
        let parsed = super::artifact::EncodedSequence::from_bytes(&encoded.to_bytes()?)?;
        let decoded = codec.decode_sequence(&parsed)?;
        let matches = decoded == frames.quantized(codec.config().color_bits)?;
        if !matches {
            log::warn!("trial output does not match its input: {:?}", codec.config());
        }
        Some(matches)
    } else {
        None
    };

    let input_bits = frames.raw_bits(codec.config().color_bits);
    let output_bits = encoded.total_bits();
    let ratio = if output_bits == 0 {
        0.0
    } else {
        input_bits as f64 / output_bits as f64
    };

    let report = TrialReport {
        config: codec.config().clone(),
        frame_count: frames.len(),
        input_bits,
        output_bits,
        ratio,
        verified,
    };
    log::info!(
        "trial: pack={} orientation={:?} delta={} rle={:?} huffman={:?} -> {} bits (x{:.3})",
        report.config.pack_count,
        report.config.pack_orientation,
        report.config.delta,
        report.config.rle_count_bits,
        report.config.huffman,
        report.output_bits,
        report.ratio
    );
    Ok(report)
}

/// Runs every configuration against the same frames, keeping failures per entry.
pub fn run_trials(
    frames: &FrameSet,
    configs: &[CodecConfig],
    verify: bool,
) -> Vec<Result<TrialReport, BitframeError>> {
    configs
        .iter()
        .map(|config| run_trial(frames, config.clone(), verify))
        .collect()
}

/// The successful report with the smallest output, ties going to the earliest.
pub fn best_trial(reports: &[Result<TrialReport, BitframeError>]) -> Option<&TrialReport> {
    reports
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .filter(|r| r.verified != Some(false))
        .min_by_key(|r| r.output_bits)
}
