//! Decode options and their YAML configuration file.
//!
//! ```yaml
//! options:
//!   first_frame_only: false
//!   minimal_metadata: true
//!   extraction_dir: /scratch/asi
//! capabilities:
//!   partial_archive_extraction: false
//! ```
//!
//! Every field is optional; missing ones take their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use hdf5_parser::Hdf5DecodeOptions;
use imager_common::MetadataLevel;
use pgm_parser::PgmDecodeOptions;
use png_parser::{DecoderCapabilities, PngDecodeOptions};
use serde::{Deserialize, Serialize};

/// Per-call decode options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Decode only the first frame of each file
    pub first_frame_only: bool,
    /// Skip metadata extraction entirely
    pub no_metadata: bool,
    /// Populate only the timing fields
    pub minimal_metadata: bool,
    /// Skip the existence check before decoding
    pub assume_files_exist: bool,
    /// Leave extracted archive members on disk
    pub keep_extracted_files: bool,
    /// Parent of per-archive extraction directories (system temp dir if unset)
    pub extraction_dir: Option<PathBuf>,
}

impl DecodeOptions {
    /// `no_metadata` wins over `minimal_metadata`.
    pub fn metadata_level(&self) -> MetadataLevel {
        MetadataLevel::from_flags(self.no_metadata, self.minimal_metadata)
    }

    pub(crate) fn pgm(&self) -> PgmDecodeOptions {
        PgmDecodeOptions {
            first_frame_only: self.first_frame_only,
            metadata: self.metadata_level(),
        }
    }

    pub(crate) fn png(&self) -> PngDecodeOptions {
        PngDecodeOptions {
            first_frame_only: self.first_frame_only,
            metadata: self.metadata_level(),
            keep_extracted_files: self.keep_extracted_files,
            extraction_dir: self.extraction_dir.clone(),
        }
    }

    pub(crate) fn hdf5(&self) -> Hdf5DecodeOptions {
        Hdf5DecodeOptions {
            first_frame_only: self.first_frame_only,
            metadata: self.metadata_level(),
        }
    }
}

/// Host configuration for an [`Ingester`](crate::Ingester).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub options: DecodeOptions,
    pub capabilities: DecoderCapabilities,
}

impl IngestConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read ingest config from {:?}", path.as_ref()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid ingest config in {:?}", path.as_ref()))
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: IngestConfig =
            serde_yaml::from_str(content).with_context(|| "Failed to parse ingest config YAML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.options.extraction_dir {
            if !dir.is_dir() {
                bail!("extraction_dir {:?} is not a directory", dir);
            }
        }
        Ok(())
    }
}
