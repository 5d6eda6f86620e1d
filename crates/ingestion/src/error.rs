//! Error types for the ingestion crate.

use hdf5_parser::Hdf5Error;
use imager_common::FrameError;
use pgm_parser::PgmError;
use png_parser::PngError;
use thiserror::Error;

/// Errors that can occur while decoding a batch of imager files.
///
/// Parser errors are folded onto this taxonomy with `From`, so callers only
/// need to match one enum whichever container a file came in.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("No readable files to decode")]
    NoFilesFound,

    #[error("Invalid magic number {0:?}")]
    InvalidMagicNumber(String),

    #[error("Stream ended before the header was complete")]
    TruncatedHeader,

    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("No timing information found")]
    MissingTimeInformation,

    #[error("Unrecognized filename format: {0}")]
    UnrecognizedFilenameFormat(String),

    #[error("Missing required attribute: {0}")]
    MissingRequiredAttribute(String),

    #[error("Archive corrupt: {0}")]
    ArchiveCorrupt(String),

    /// Non-fatal: the decoder degraded to a slower path
    #[error("Unsupported capability: {0}")]
    UnsupportedCapability(String),

    /// Container is readable but its content is not what the imagers write
    #[error("Malformed file: {0}")]
    Malformed(String),

    /// Failure mid-stream, after the file's header was accepted
    #[error("Structural error: {0}")]
    Structural(String),

    #[error("Unknown file type: {0}")]
    UnknownFileType(String),

    /// File decoded, but its frames cannot join the frames already accumulated
    #[error("Frame shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("All {0} files failed to decode")]
    AllFilesFailed(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    pub fn is_structural(&self) -> bool {
        matches!(self, DecodeError::Structural(_))
    }

    /// Errors that end the whole call rather than one file.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DecodeError::NoFilesFound | DecodeError::AllFilesFailed(_))
    }
}

impl From<PgmError> for DecodeError {
    fn from(err: PgmError) -> Self {
        match err {
            PgmError::InvalidMagicNumber(magic) => DecodeError::InvalidMagicNumber(magic),
            PgmError::TruncatedHeader => DecodeError::TruncatedHeader,
            PgmError::MalformedHeader(msg) => DecodeError::Malformed(msg),
            e @ PgmError::InvalidDimensions { .. } => DecodeError::InvalidDimensions(e.to_string()),
            PgmError::MissingTimeInformation => DecodeError::MissingTimeInformation,
            PgmError::Io(e) => DecodeError::Io(e),
            e @ (PgmError::TruncatedPixelData { .. } | PgmError::MalformedPixelData(_) | PgmError::Frame(_)) => {
                DecodeError::Structural(e.to_string())
            }
        }
    }
}

impl From<PngError> for DecodeError {
    fn from(err: PngError) -> Self {
        match err {
            PngError::UnrecognizedFilenameFormat(name) => DecodeError::UnrecognizedFilenameFormat(name),
            e @ (PngError::ArchiveCorrupt { .. } | PngError::EmptyArchive(_)) => {
                DecodeError::ArchiveCorrupt(e.to_string())
            }
            PngError::Io(e) => DecodeError::Io(e),
            e @ (PngError::Image(_) | PngError::UnsupportedPixelLayout(_) | PngError::Frame(_)) => {
                DecodeError::Structural(e.to_string())
            }
        }
    }
}

impl From<Hdf5Error> for DecodeError {
    fn from(err: Hdf5Error) -> Self {
        match err {
            Hdf5Error::MissingRequiredAttribute(key) => DecodeError::MissingRequiredAttribute(key),
            e @ (Hdf5Error::MissingData(_) | Hdf5Error::InvalidFormat(_) | Hdf5Error::Hdf5(_)) => {
                DecodeError::Malformed(e.to_string())
            }
            e @ Hdf5Error::Frame(_) => DecodeError::Structural(e.to_string()),
            Hdf5Error::IoError(e) => DecodeError::Io(e),
        }
    }
}

impl From<FrameError> for DecodeError {
    fn from(err: FrameError) -> Self {
        DecodeError::ShapeMismatch(err.to_string())
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, DecodeError>;
