//! Error types for HDF5 cube decoding.

use imager_common::FrameError;
use thiserror::Error;

/// Result type for HDF5 parser operations.
pub type Hdf5Result<T> = Result<T, Hdf5Error>;

/// Error types for HDF5 decoding.
#[derive(Error, Debug)]
pub enum Hdf5Error {
    /// A metadata attribute every imager file must carry is absent
    #[error("Missing required attribute: {0}")]
    MissingRequiredAttribute(String),

    /// Missing dataset or group
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
