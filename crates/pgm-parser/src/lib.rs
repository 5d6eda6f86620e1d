//! PGM decoder for all-sky imager streams.
//!
//! Imager PGM files are concatenations of `P2`/`P5` frames, optionally gzip
//! compressed, whose comment blocks carry the acquisition metadata. This crate
//! reads every frame of such a stream into a [`FrameBuffer`] together with one
//! [`PgmMeta`](imager_common::PgmMeta) record per frame.
//!
//! # Example
//!
//! ```no_run
//! use pgm_parser::{decode_file, PgmDecodeOptions};
//!
//! let decoded = decode_file("20140310_0600_gill_themis19_full.pgm.gz", &PgmDecodeOptions::default())?;
//! println!("{} frames, {} bytes", decoded.frames.len(), decoded.bytes_read);
//! # Ok::<(), pgm_parser::PgmError>(())
//! ```

pub mod comments;
pub mod encode;
pub mod error;
pub mod filename;
pub mod reader;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use imager_common::{FrameBuffer, FrameMetadata, GrowthPolicy, MetadataLevel, PGM_CHUNK_FRAMES};
use tracing::debug;

pub use comments::parse_comments;
pub use encode::{encode_frame, encode_pixels};
pub use error::{PgmError, PgmResult};
pub use filename::{ids_from_filename, reconcile_ids, FilenameIds, IdReconciliation};
pub use reader::{PgmFormat, PgmFrame, PgmHeader, PgmReader};

/// Options for decoding one PGM file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PgmDecodeOptions {
    /// Stop after the first frame of the stream.
    pub first_frame_only: bool,
    pub metadata: MetadataLevel,
}

/// Frames decoded from one file.
#[derive(Debug, Clone)]
pub struct DecodedPgm {
    pub frames: FrameBuffer,
    /// On-disk size of the file (compressed size for `.gz`).
    pub bytes_read: u64,
}

/// Decode a `.pgm` or `.pgm.gz` file.
pub fn decode_file(path: impl AsRef<Path>, options: &PgmDecodeOptions) -> PgmResult<DecodedPgm> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let bytes_read = file.metadata()?.len();
    let filename = path.file_name().and_then(|n| n.to_str());

    let gzipped = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);

    let frames = if gzipped {
        decode_stream(BufReader::new(MultiGzDecoder::new(file)), filename, options)?
    } else {
        decode_stream(BufReader::new(file), filename, options)?
    };

    debug!(
        file = %path.display(),
        frames = frames.len(),
        bytes = bytes_read,
        gzipped,
        "Decoded PGM file"
    );

    Ok(DecodedPgm { frames, bytes_read })
}

/// Decode every frame of an already-open PGM stream.
///
/// When `filename` is given and full metadata is requested, the site and
/// imager identifiers embedded in it replace the comment values.
pub fn decode_stream<R: BufRead>(
    reader: R,
    filename: Option<&str>,
    options: &PgmDecodeOptions,
) -> PgmResult<FrameBuffer> {
    let mut reader = PgmReader::new(reader);
    let mut buffer: Option<FrameBuffer> = None;

    while let Some(frame) = reader.next_frame()? {
        let metadata = frame_metadata(&frame.header, filename, options.metadata)?;
        let buffer = buffer.get_or_insert_with(|| {
            FrameBuffer::for_frame(&frame.pixels, GrowthPolicy::Chunked(PGM_CHUNK_FRAMES))
        });
        buffer.append(&frame.pixels, metadata)?;

        if options.first_frame_only {
            break;
        }
    }

    let mut buffer = buffer.ok_or(PgmError::TruncatedHeader)?;
    let count = buffer.len();
    buffer.trim(count);
    Ok(buffer)
}

fn frame_metadata(
    header: &PgmHeader,
    filename: Option<&str>,
    level: MetadataLevel,
) -> PgmResult<Option<FrameMetadata>> {
    if !level.wanted() {
        return Ok(None);
    }
    let mut meta = parse_comments(&header.comments, level)?;
    if level == MetadataLevel::Full {
        if let Some(name) = filename {
            reconcile_ids(&mut meta, name);
        }
    }
    Ok(Some(meta.into()))
}
