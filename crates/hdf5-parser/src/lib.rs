//! HDF5 image-cube decoder for all-sky imagers.
//!
//! Newer imagers write one HDF5 file per minute with this layout:
//!
//! ```text
//! /data/images            (frames, height, width[, channels]) u8 or u16
//! /data/timestamp         one string per frame
//! /metadata/file          file-level attributes
//! /metadata/frame/frameN  per-frame attributes
//! ```
//!
//! The cube is stored frame-first; [`FrameBuffer::into_parts`] exposes it
//! frame-last as `(channels, width, height, frames)`.

pub mod error;
pub mod metadata;
pub mod native;

use std::collections::BTreeMap;
use std::path::Path;

use imager_common::{
    AccumulationBuffer, FrameBuffer, FrameMetadata, FrameShape, GrowthPolicy, MetadataLevel, Sample,
};
use tracing::debug;

pub use error::{Hdf5Error, Hdf5Result};
pub use native::silence_hdf5_errors;

use native::{read_cube, read_group_attrs, read_strings, sample_width, SampleWidth};

const IMAGES: &str = "data/images";
const TIMESTAMPS: &str = "data/timestamp";
const FILE_ATTRS: &str = "metadata/file";
const FRAME_ATTRS: &str = "metadata/frame";

/// Options for decoding one HDF5 file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hdf5DecodeOptions {
    pub first_frame_only: bool,
    pub metadata: MetadataLevel,
}

/// Frames decoded from one file.
#[derive(Debug, Clone)]
pub struct DecodedHdf5 {
    pub frames: FrameBuffer,
    pub bytes_read: u64,
}

/// Decode an `.h5` imager file.
pub fn decode_file(path: impl AsRef<Path>, options: &Hdf5DecodeOptions) -> Hdf5Result<DecodedHdf5> {
    silence_hdf5_errors();

    let path = path.as_ref();
    let bytes_read = std::fs::metadata(path)?.len();
    let file = hdf5::File::open(path)?;

    let images = file
        .dataset(IMAGES)
        .map_err(|_| Hdf5Error::MissingData(format!("/{}", IMAGES)))?;

    let frames = match sample_width(&images)? {
        SampleWidth::U8 => {
            let (samples, shape) = read_cube::<u8>(&images, options.first_frame_only)?;
            let metadata = read_metadata(&file, shape[0], options.metadata)?;
            FrameBuffer::U8(build_buffer(samples, &shape, metadata)?)
        }
        SampleWidth::U16 => {
            let (samples, shape) = read_cube::<u16>(&images, options.first_frame_only)?;
            let metadata = read_metadata(&file, shape[0], options.metadata)?;
            FrameBuffer::U16(build_buffer(samples, &shape, metadata)?)
        }
    };

    debug!(
        file = %path.display(),
        frames = frames.len(),
        shape = %frames.shape(),
        bits = frames.bits(),
        bytes = bytes_read,
        "Decoded HDF5 file"
    );
    Ok(DecodedHdf5 { frames, bytes_read })
}

fn build_buffer<T: Sample>(
    samples: Vec<T>,
    shape: &[usize],
    metadata: Option<Vec<FrameMetadata>>,
) -> Hdf5Result<AccumulationBuffer<T>> {
    let channels = shape.get(3).copied().unwrap_or(1);
    let frame_shape = FrameShape::new(channels, shape[2], shape[1])?;
    let mut buffer = AccumulationBuffer::with_capacity(frame_shape, GrowthPolicy::Doubling, shape[0]);

    let mut metadata = metadata.map(Vec::into_iter);
    for chunk in samples.chunks_exact(frame_shape.sample_count()) {
        let meta = metadata.as_mut().and_then(|records| records.next());
        buffer.append_samples(chunk, meta)?;
    }
    Ok(buffer)
}

/// One metadata record per frame, or `None` when metadata is not wanted.
fn read_metadata(
    file: &hdf5::File,
    frames: usize,
    level: MetadataLevel,
) -> Hdf5Result<Option<Vec<FrameMetadata>>> {
    if !level.wanted() {
        return Ok(None);
    }

    let timestamps = file
        .dataset(TIMESTAMPS)
        .map_err(|_| Hdf5Error::MissingData(format!("/{}", TIMESTAMPS)))
        .and_then(|ds| read_strings(&ds))?;
    if timestamps.len() < frames {
        return Err(Hdf5Error::InvalidFormat(format!(
            "{} timestamps for {} frames",
            timestamps.len(),
            frames
        )));
    }

    let file_attrs = match file.group(FILE_ATTRS) {
        Ok(group) => read_group_attrs(&group)?,
        Err(_) => BTreeMap::new(),
    };
    let frame_root = file.group(FRAME_ATTRS).ok();

    let mut records = Vec::with_capacity(frames);
    for (index, timestamp) in timestamps.iter().take(frames).enumerate() {
        let frame_attrs = match frame_root.as_ref().and_then(|g| g.group(&format!("frame{}", index)).ok()) {
            Some(group) => read_group_attrs(&group)?,
            None => BTreeMap::new(),
        };
        let merged = metadata::merge_attrs(&file_attrs, frame_attrs);
        records.push(metadata::frame_metadata(timestamp, merged, level)?.into());
    }
    Ok(Some(records))
}
