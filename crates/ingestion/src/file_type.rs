//! Container detection from file names.

use std::fmt;
use std::path::Path;

use imager_common::SourceKind;

/// Detected file type based on extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// One or more concatenated PGM frames
    Pgm,
    /// Gzip-compressed PGM stream
    PgmGz,
    /// A single PNG frame
    Png,
    /// Tar archive of PNG frames
    PngTar,
    /// HDF5 image cube
    Hdf5,
    Unknown,
}

impl FileType {
    /// Decoder family, or `None` for [`FileType::Unknown`].
    pub fn source_kind(self) -> Option<SourceKind> {
        match self {
            FileType::Pgm | FileType::PgmGz => Some(SourceKind::Pgm),
            FileType::Png | FileType::PngTar => Some(SourceKind::Png),
            FileType::Hdf5 => Some(SourceKind::Hdf5),
            FileType::Unknown => None,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileType::Pgm => "pgm",
            FileType::PgmGz => "pgm.gz",
            FileType::Png => "png",
            FileType::PngTar => "png.tar",
            FileType::Hdf5 => "h5",
            FileType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Detect file type from path.
pub fn detect_file_type(path: impl AsRef<Path>) -> FileType {
    let lower = path.as_ref().to_string_lossy().to_lowercase();

    if lower.ends_with(".pgm.gz") {
        FileType::PgmGz
    } else if lower.ends_with(".pgm") {
        FileType::Pgm
    } else if lower.ends_with(".png.tar") || lower.ends_with(".tar") {
        FileType::PngTar
    } else if lower.ends_with(".png") {
        FileType::Png
    } else if lower.ends_with(".h5") || lower.ends_with(".hdf5") {
        FileType::Hdf5
    } else {
        FileType::Unknown
    }
}
