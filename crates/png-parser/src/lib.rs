//! PNG frame and PNG-archive decoder.
//!
//! RGB imagers deliver one PNG per exposure, usually bundled into a tar
//! archive per minute. Metadata comes entirely from the member names (see
//! [`filename`]); pixels are decoded with the `image` crate and flipped into
//! canonical orientation.
//!
//! Archives are unpacked into an [`ArchiveExtractionContext`] that is removed
//! when the decode returns, on success and on failure alike.

pub mod archive;
pub mod capabilities;
pub mod error;
pub mod filename;
pub mod frame;

use std::path::{Path, PathBuf};

use imager_common::{FrameBuffer, GrowthPolicy, MetadataLevel};
use tracing::debug;

pub use archive::{ArchiveExtractionContext, ArchiveExtractor, ExtractionMode};
pub use capabilities::DecoderCapabilities;
pub use error::{PngError, PngResult};
pub use filename::PngFilename;
pub use frame::read_png_frame;

/// Options for decoding one PNG or PNG archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PngDecodeOptions {
    pub first_frame_only: bool,
    pub metadata: MetadataLevel,
    /// Leave extracted members on disk
    pub keep_extracted_files: bool,
    /// Parent of the per-archive extraction directory
    pub extraction_dir: Option<PathBuf>,
}

/// Frames decoded from one file.
#[derive(Debug, Clone)]
pub struct DecodedPng {
    pub frames: FrameBuffer,
    /// On-disk size of the PNG or archive
    pub bytes_read: u64,
    /// `None` for a bare PNG
    pub extraction: Option<ExtractionMode>,
}

impl DecodedPng {
    /// The archive had to be unpacked fully to serve a first-frame request.
    pub fn used_fallback(&self) -> bool {
        self.extraction == Some(ExtractionMode::FullFallback)
    }
}

/// Decodes bare PNGs and tar archives of PNGs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngDecoder {
    extractor: ArchiveExtractor,
}

impl PngDecoder {
    pub fn new(capabilities: DecoderCapabilities) -> Self {
        Self {
            extractor: ArchiveExtractor::new(capabilities),
        }
    }

    /// Decode a `.png` or `.png.tar` file.
    pub fn decode_file(&self, path: impl AsRef<Path>, options: &PngDecodeOptions) -> PngResult<DecodedPng> {
        let path = path.as_ref();
        let bytes_read = std::fs::metadata(path)?.len();

        if !is_tar(path) {
            let frames = decode_members(&[path.to_path_buf()], options)?;
            return Ok(DecodedPng {
                frames,
                bytes_read,
                extraction: None,
            });
        }

        let mut ctx = ArchiveExtractionContext::new(options.extraction_dir.as_deref())?;
        ctx.keep_files(options.keep_extracted_files);
        let mode = self.extractor.extract(path, options.first_frame_only, &mut ctx)?;

        let members = if options.first_frame_only {
            &ctx.files()[..1]
        } else {
            ctx.files()
        };
        let frames = decode_members(members, options)?;

        debug!(
            archive = %path.display(),
            frames = frames.len(),
            bytes = bytes_read,
            "Decoded PNG archive"
        );
        Ok(DecodedPng {
            frames,
            bytes_read,
            extraction: Some(mode),
        })
    }
}

/// Decode `members` in order into one buffer.
fn decode_members(members: &[PathBuf], options: &PngDecodeOptions) -> PngResult<FrameBuffer> {
    let mut buffer: Option<FrameBuffer> = None;

    for member in members {
        let metadata = if options.metadata.wanted() {
            let name = member
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| PngError::UnrecognizedFilenameFormat(member.display().to_string()))?;
            Some(PngFilename::parse(name)?.to_metadata(options.metadata).into())
        } else {
            None
        };

        let frame = read_png_frame(member)?;
        let buffer = buffer.get_or_insert_with(|| {
            let mut b = FrameBuffer::for_frame(&frame, GrowthPolicy::Doubling);
            b.reserve(members.len());
            b
        });
        buffer.append(&frame, metadata)?;
    }

    buffer.ok_or_else(|| PngError::EmptyArchive(PathBuf::new()))
}

fn is_tar(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("tar"))
        .unwrap_or(false)
}
