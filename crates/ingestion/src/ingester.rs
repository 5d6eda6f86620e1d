//! Batch decoder: routes each file to its decoder and accumulates one frame set.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use imager_common::{
    Flip, FrameBuffer, FrameMetadata, FrameShape, GrowthPolicy, PixelCube, SourceKind, PGM_CHUNK_FRAMES,
};
use png_parser::{DecoderCapabilities, PngDecoder};
use tracing::{debug, info, warn};

use crate::config::{DecodeOptions, IngestConfig};
use crate::error::{DecodeError, Result};
use crate::file_type::{detect_file_type, FileType};
use crate::orientation::OrientationNormalizer;

/// What was decoded and how it was oriented.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetDescriptor {
    pub name: String,
    /// Flip applied to every frame after decoding
    pub orientation: Flip,
    pub frame_shape: FrameShape,
    pub bits: u8,
}

/// One successfully decoded file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub path: PathBuf,
    pub file_type: FileType,
    pub frames: usize,
    /// On-disk size of the file
    pub bytes: u64,
}

/// A file that contributed no frames.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: DecodeError,
}

/// Per-file records and totals for one decode call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestionReport {
    pub files: Vec<FileReport>,
    pub total_frames: usize,
    pub total_bytes: u64,
    pub elapsed: Duration,
}

impl IngestionReport {
    fn record(&mut self, file: FileReport) {
        self.total_frames += file.frames;
        self.total_bytes += file.bytes;
        self.files.push(file);
    }
}

/// Decoded frames of a batch, oriented and trimmed.
///
/// `pixels` has axes `(channels, width, height, frames)`. `metadata` is
/// either empty (metadata not requested) or holds exactly one record per
/// frame, in frame order.
#[derive(Debug)]
pub struct FrameSet {
    pub dataset: DatasetDescriptor,
    pub pixels: PixelCube,
    pub metadata: Vec<FrameMetadata>,
    /// Files skipped, in input order
    pub failures: Vec<FileFailure>,
    /// Non-fatal degradations such as full-archive extraction
    pub warnings: Vec<DecodeError>,
    pub report: IngestionReport,
}

impl FrameSet {
    pub fn len(&self) -> usize {
        self.pixels.frame_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct DecodedFile {
    frames: FrameBuffer,
    bytes: u64,
    used_fallback: bool,
}

/// Decodes ordered batches of imager files into a single [`FrameSet`].
///
/// Files are decoded strictly one after another, in the order given. A file
/// that fails is recorded and skipped; the call only fails when no file is
/// left to decode or none decoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ingester {
    png: PngDecoder,
}

impl Ingester {
    pub fn new(capabilities: DecoderCapabilities) -> Self {
        Self {
            png: PngDecoder::new(capabilities),
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(config.capabilities)
    }

    /// Decode `files` as dataset `dataset`.
    pub fn decode<P: AsRef<Path>>(&self, dataset: &str, files: &[P], options: &DecodeOptions) -> Result<FrameSet> {
        let started = Instant::now();
        let mut failures = Vec::new();
        let mut warnings = Vec::new();
        let mut report = IngestionReport::default();

        let paths: Vec<PathBuf> = files.iter().map(|p| p.as_ref().to_path_buf()).collect();
        let paths = if options.assume_files_exist {
            paths
        } else {
            readable_files(paths, &mut failures)
        };
        if paths.is_empty() {
            return Err(DecodeError::NoFilesFound);
        }

        let mut frames: Option<FrameBuffer> = None;
        for (index, path) in paths.iter().enumerate() {
            let file_type = detect_file_type(path);
            let decoded = match self.decode_file(path, file_type, options) {
                Ok(decoded) => decoded,
                Err(error) => {
                    warn!(
                        file = %path.display(),
                        error = %error,
                        structural = error.is_structural(),
                        "Skipping file"
                    );
                    failures.push(FileFailure {
                        path: path.clone(),
                        error,
                    });
                    continue;
                }
            };

            let batch = frames.get_or_insert_with(|| batch_buffer(&decoded.frames, file_type, paths.len() - index));
            if let Err(e) = batch.extend_from(&decoded.frames) {
                let error = DecodeError::from(e);
                warn!(file = %path.display(), error = %error, "Skipping file");
                failures.push(FileFailure {
                    path: path.clone(),
                    error,
                });
                continue;
            }

            if decoded.used_fallback {
                warnings.push(DecodeError::UnsupportedCapability(format!(
                    "partial archive extraction unavailable, unpacked all of {}",
                    path.display()
                )));
            }

            debug!(
                file = %path.display(),
                kind = %file_type,
                frames = decoded.frames.len(),
                bytes = decoded.bytes,
                "Decoded file"
            );
            report.record(FileReport {
                path: path.clone(),
                file_type,
                frames: decoded.frames.len(),
                bytes: decoded.bytes,
            });
        }

        let Some(mut frames) = frames else {
            return Err(DecodeError::AllFilesFailed(failures.len()));
        };

        let count = frames.len();
        frames.trim(count);
        let orientation = OrientationNormalizer::image_flip(dataset);
        frames.flip_all(orientation);

        let dataset = DatasetDescriptor {
            name: dataset.to_string(),
            orientation,
            frame_shape: frames.shape(),
            bits: frames.bits(),
        };
        let (pixels, metadata) = frames.into_parts()?;
        report.elapsed = started.elapsed();

        info!(
            dataset = %dataset.name,
            files = report.files.len(),
            failed = failures.len(),
            frames = report.total_frames,
            bytes = report.total_bytes,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Decode complete"
        );

        Ok(FrameSet {
            dataset,
            pixels,
            metadata,
            failures,
            warnings,
            report,
        })
    }

    fn decode_file(&self, path: &Path, file_type: FileType, options: &DecodeOptions) -> Result<DecodedFile> {
        match file_type {
            FileType::Pgm | FileType::PgmGz => {
                let decoded = pgm_parser::decode_file(path, &options.pgm())?;
                Ok(DecodedFile {
                    frames: decoded.frames,
                    bytes: decoded.bytes_read,
                    used_fallback: false,
                })
            }
            FileType::Png | FileType::PngTar => {
                let decoded = self.png.decode_file(path, &options.png())?;
                let used_fallback = decoded.used_fallback();
                Ok(DecodedFile {
                    frames: decoded.frames,
                    bytes: decoded.bytes_read,
                    used_fallback,
                })
            }
            FileType::Hdf5 => {
                let decoded = hdf5_parser::decode_file(path, &options.hdf5())?;
                Ok(DecodedFile {
                    frames: decoded.frames,
                    bytes: decoded.bytes_read,
                    used_fallback: false,
                })
            }
            FileType::Unknown => Err(DecodeError::UnknownFileType(path.display().to_string())),
        }
    }
}

/// Batch buffer shaped like the first decoded file.
///
/// PGM batches grow in fixed chunks; the others are pre-sized assuming every
/// remaining file holds as many frames as the first one.
fn batch_buffer(first: &FrameBuffer, file_type: FileType, remaining_files: usize) -> FrameBuffer {
    match file_type.source_kind() {
        Some(SourceKind::Pgm) => FrameBuffer::like(first, GrowthPolicy::Chunked(PGM_CHUNK_FRAMES)),
        _ => {
            let mut buffer = FrameBuffer::like(first, GrowthPolicy::Doubling);
            buffer.reserve(first.len() * remaining_files);
            buffer
        }
    }
}

/// Keep the paths that are readable regular files, recording the rest.
fn readable_files(paths: Vec<PathBuf>, failures: &mut Vec<FileFailure>) -> Vec<PathBuf> {
    let mut readable = Vec::with_capacity(paths.len());
    for path in paths {
        let checked = fs::metadata(&path).and_then(|meta| {
            if meta.is_file() {
                fs::File::open(&path).map(drop)
            } else {
                Err(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"))
            }
        });
        match checked {
            Ok(()) => readable.push(path),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Skipping unreadable file");
                failures.push(FileFailure {
                    path,
                    error: DecodeError::Io(e),
                });
            }
        }
    }
    readable
}

#[cfg(test)]
mod tests {
    use super::*;
    use imager_common::{AnyFrame, Frame};

    fn buffer_of(frames: usize) -> FrameBuffer {
        let frame = AnyFrame::U8(Frame::zeros(FrameShape::mono(2, 2)));
        let mut buffer = FrameBuffer::for_frame(&frame, GrowthPolicy::Doubling);
        for _ in 0..frames {
            buffer.append(&frame, None).unwrap();
        }
        buffer
    }

    #[test]
    fn test_batch_buffer_presizes_non_pgm() {
        let first = buffer_of(10);
        let batch = batch_buffer(&first, FileType::PngTar, 6);
        assert!(batch.is_empty());
        assert_eq!(batch.capacity(), 60);
    }

    #[test]
    fn test_batch_buffer_pgm_grows_in_chunks() {
        let first = buffer_of(3);
        let mut batch = batch_buffer(&first, FileType::PgmGz, 6);
        assert_eq!(batch.capacity(), 0);
        batch.extend_from(&first).unwrap();
        assert_eq!(batch.capacity(), PGM_CHUNK_FRAMES);
    }

    #[test]
    fn test_readable_files_records_missing() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("a.pgm");
        fs::write(&present, b"P5").unwrap();
        let missing = dir.path().join("b.pgm");

        let mut failures = Vec::new();
        let kept = readable_files(vec![present.clone(), missing.clone(), dir.path().to_path_buf()], &mut failures);
        assert_eq!(kept, vec![present]);
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].path, missing);
        assert!(matches!(failures[0].error, DecodeError::Io(_)));
    }

    #[test]
    fn test_unknown_file_type_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"hello").unwrap();

        let err = Ingester::default()
            .decode("THEMIS_ASI_RAW", &[&path], &DecodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, DecodeError::AllFilesFailed(1)));
    }

    #[test]
    fn test_no_files() {
        let files: [&str; 0] = [];
        let err = Ingester::default()
            .decode("THEMIS_ASI_RAW", &files, &DecodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, DecodeError::NoFilesFound));
    }
}
