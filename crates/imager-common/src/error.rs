//! Error types for frame construction and accumulation.

use thiserror::Error;

use crate::frame::FrameShape;

/// Result type alias using FrameError.
pub type FrameResult<T> = Result<T, FrameError>;

/// Errors raised when pixel buffers don't line up with their declared shape.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Pixel buffer holds {actual} samples, shape {shape} needs {expected}")]
    LengthMismatch {
        shape: FrameShape,
        expected: usize,
        actual: usize,
    },

    #[error("Frame shape {actual} does not match buffer shape {expected}")]
    ShapeMismatch {
        expected: FrameShape,
        actual: FrameShape,
    },

    #[error("Cannot mix {expected}-bit and {actual}-bit frames in one buffer")]
    DepthMismatch { expected: u8, actual: u8 },

    #[error("Metadata sequence has {metadata} records for {frames} frames")]
    MetadataMisaligned { frames: usize, metadata: usize },

    #[error("Unsupported channel count: {0} (expected 1 or 3)")]
    UnsupportedChannels(usize),
}
