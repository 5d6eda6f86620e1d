//! Error types for PNG and PNG-archive decoding.

use std::path::PathBuf;

use imager_common::FrameError;
use thiserror::Error;

/// Result type for PNG parser operations.
pub type PngResult<T> = Result<T, PngError>;

/// Error types for PNG decoding.
#[derive(Error, Debug)]
pub enum PngError {
    /// Member name does not follow `DATE_TIME_MS_SITE_DEVICE_EXP_MODE.png`
    #[error("Unrecognized PNG filename format: {0}")]
    UnrecognizedFilenameFormat(String),

    #[error("Corrupt archive {path}: {reason}")]
    ArchiveCorrupt { path: PathBuf, reason: String },

    #[error("Archive {0} contains no PNG members")]
    EmptyArchive(PathBuf),

    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    /// Colour type other than 8/16-bit grey or RGB
    #[error("Unsupported pixel layout: {0}")]
    UnsupportedPixelLayout(String),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PngError {
    /// Failures inside a member after the archive itself was accepted.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            PngError::Image(_) | PngError::UnsupportedPixelLayout(_) | PngError::Frame(_)
        )
    }
}
