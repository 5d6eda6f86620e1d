//! All-sky imager ingestion library.
//!
//! Decodes an ordered list of raw imager files into one frame set with
//! per-frame metadata, whatever container each file came in:
//!
//! - PGM streams, plain or gzipped (THEMIS, REGO)
//! - PNG frames and tar archives of PNGs (TREx RGB)
//! - HDF5 image cubes (TREx NIR, Blue, newer RGB)
//!
//! # Architecture
//!
//! [`Ingester::decode`] detects each file's container from its name, hands it
//! to the matching parser crate, and appends the frames to one accumulation
//! buffer. Failed files are recorded in the returned [`FrameSet`] rather than
//! aborting the batch. Once every file is processed the buffer is trimmed and
//! flipped into canonical orientation using [`OrientationNormalizer`].
//!
//! ```no_run
//! use ingestion::{DecodeOptions, Ingester};
//! use png_parser::DecoderCapabilities;
//!
//! let ingester = Ingester::new(DecoderCapabilities::default());
//! let files = ["20140310_0600_gill_themis19_full.pgm.gz"];
//! let set = ingester.decode("THEMIS_ASI_RAW", &files, &DecodeOptions::default())?;
//! println!("{} frames, {} failures", set.len(), set.failures.len());
//! # Ok::<(), ingestion::DecodeError>(())
//! ```

pub mod config;
pub mod error;
pub mod file_type;
mod ingester;
pub mod orientation;

// Re-exports
pub use config::{DecodeOptions, IngestConfig};
pub use error::{DecodeError, Result};
pub use file_type::{detect_file_type, FileType};
pub use ingester::{DatasetDescriptor, FileFailure, FileReport, FrameSet, IngestionReport, Ingester};
pub use orientation::OrientationNormalizer;
