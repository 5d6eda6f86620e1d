//! Error types for PGM decoding.

use imager_common::FrameError;
use thiserror::Error;

/// Result type for PGM parser operations.
pub type PgmResult<T> = Result<T, PgmError>;

/// Error types for PGM decoding.
#[derive(Error, Debug)]
pub enum PgmError {
    /// Magic number was not `P2` or `P5`
    #[error("Invalid magic number {0:?} (expected P2 or P5)")]
    InvalidMagicNumber(String),

    /// Stream ended before width, height and maxval were all read
    #[error("Stream ended before the PGM header was complete")]
    TruncatedHeader,

    /// Header held something other than integers, whitespace and comments
    #[error("Malformed PGM header: {0}")]
    MalformedHeader(String),

    #[error("Invalid dimensions: width={width} height={height} maxval={maxval}")]
    InvalidDimensions { width: u64, height: u64, maxval: u64 },

    /// Stream ended inside the pixel section
    #[error("Pixel data truncated: expected {expected} bytes, read {read}")]
    TruncatedPixelData { expected: usize, read: usize },

    #[error("Malformed pixel data: {0}")]
    MalformedPixelData(String),

    /// Comments carried no exposure start time
    #[error("No timing information found in PGM comments")]
    MissingTimeInformation,

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PgmError {
    /// Failures that happen after a header was accepted, i.e. mid-stream.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            PgmError::TruncatedPixelData { .. }
                | PgmError::MalformedPixelData(_)
                | PgmError::Frame(_)
        )
    }
}
