//! Common types shared by the all-sky imager decoders.
//!
//! Every decoder (PGM, PNG, HDF5) produces the same two things: pixel frames
//! and per-frame metadata. This crate defines both, plus the growable
//! [`AccumulationBuffer`] the decoders and the ingestion orchestrator write
//! frames into while the final frame count is still unknown.
//!
//! # Frame layout
//!
//! Pixels are stored row-major as `(height, width, channels)`. The array views
//! reverse the axes, so callers always see `(channels, width, height)` for one
//! frame and `(channels, width, height, frames)` for an accumulated cube.

pub mod buffer;
pub mod error;
pub mod frame;
pub mod metadata;
pub mod time;

pub use buffer::{AccumulationBuffer, FrameBuffer, GrowthPolicy, PixelCube, PGM_CHUNK_FRAMES};
pub use error::{FrameError, FrameResult};
pub use frame::{AnyFrame, Flip, Frame, FrameShape, Sample};
pub use metadata::{
    AttrValue, CcdGeometry, CommonMeta, FrameMetadata, Hdf5Meta, MetadataLevel, PgmMeta, PngMeta, SourceKind,
};
pub use time::{epoch_seconds, format_timestamp, parse_timestamp};
