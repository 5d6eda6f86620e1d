//! Per-frame acquisition metadata.
//!
//! Each source format records a different set of fields, so the metadata is a
//! sum type over the three source kinds. The fields every kind carries live in
//! [`CommonMeta`] and are reachable through [`FrameMetadata::common`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::{epoch_seconds, format_timestamp, parse_timestamp};

/// Which container a frame was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pgm,
    Png,
    Hdf5,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Pgm => write!(f, "pgm"),
            SourceKind::Png => write!(f, "png"),
            SourceKind::Hdf5 => write!(f, "hdf5"),
        }
    }
}

/// How much metadata a decoder should recover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataLevel {
    /// Pixels only.
    None,
    /// Timing fields only (exposure start and durations).
    Minimal,
    #[default]
    Full,
}

impl MetadataLevel {
    pub fn from_flags(no_metadata: bool, minimal_metadata: bool) -> Self {
        if no_metadata {
            MetadataLevel::None
        } else if minimal_metadata {
            MetadataLevel::Minimal
        } else {
            MetadataLevel::Full
        }
    }

    pub fn wanted(self) -> bool {
        self != MetadataLevel::None
    }
}

/// Fields shared by every metadata kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommonMeta {
    /// Site identifier, e.g. `gill`
    pub site_uid: String,
    /// Imager/device identifier, e.g. `themis19` or `rgb-04`
    pub device_uid: String,
    /// Exposure start as written in (or derived from) the source
    pub exposure_start_string: String,
    /// Exposure start, seconds since the Unix epoch
    pub exposure_start_epoch: f64,
    /// Requested exposure duration in seconds
    pub exposure_duration_request: f64,
    /// Actual exposure duration in seconds
    pub exposure_duration_actual: f64,
}

impl CommonMeta {
    /// Set both exposure-start representations from one instant.
    pub fn set_exposure_start(&mut self, start: &DateTime<Utc>) {
        self.exposure_start_string = format_timestamp(start);
        self.exposure_start_epoch = epoch_seconds(start);
    }

    /// Exposure start as a `DateTime`, if the stored string parses.
    pub fn exposure_start(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.exposure_start_string)
    }
}

/// CCD readout geometry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CcdGeometry {
    /// Full sensor width in pixels
    pub xsize: Option<u32>,
    /// Full sensor height in pixels
    pub ysize: Option<u32>,
    pub center_x: Option<f64>,
    pub center_y: Option<f64>,
    /// Readout window width
    pub width: Option<u32>,
    /// Readout window height
    pub height: Option<u32>,
    pub xoffset: Option<u32>,
    pub yoffset: Option<u32>,
    pub xbin: Option<u32>,
    pub ybin: Option<u32>,
}

/// Metadata recovered from PGM comment blocks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PgmMeta {
    #[serde(flatten)]
    pub common: CommonMeta,
    pub ccd: CcdGeometry,
    pub mode_uid: Option<String>,
    /// Raw comment text the fields were parsed from
    pub comments: String,
}

/// Metadata derived from PNG member filenames.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PngMeta {
    #[serde(flatten)]
    pub common: CommonMeta,
    /// Acquisition mode, e.g. `full`
    pub mode_uid: String,
}

/// Metadata recovered from HDF5 attribute trees.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Hdf5Meta {
    #[serde(flatten)]
    pub common: CommonMeta,
    pub ccd: CcdGeometry,
    pub geographic_latitude: f64,
    pub geographic_longitude: f64,
    /// File-level attributes merged with frame-level ones (frame wins)
    pub comments: BTreeMap<String, AttrValue>,
}

/// Metadata for one frame, tagged by source kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FrameMetadata {
    Pgm(PgmMeta),
    Png(PngMeta),
    Hdf5(Hdf5Meta),
}

impl FrameMetadata {
    pub fn kind(&self) -> SourceKind {
        match self {
            FrameMetadata::Pgm(_) => SourceKind::Pgm,
            FrameMetadata::Png(_) => SourceKind::Png,
            FrameMetadata::Hdf5(_) => SourceKind::Hdf5,
        }
    }

    pub fn common(&self) -> &CommonMeta {
        match self {
            FrameMetadata::Pgm(m) => &m.common,
            FrameMetadata::Png(m) => &m.common,
            FrameMetadata::Hdf5(m) => &m.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut CommonMeta {
        match self {
            FrameMetadata::Pgm(m) => &mut m.common,
            FrameMetadata::Png(m) => &mut m.common,
            FrameMetadata::Hdf5(m) => &mut m.common,
        }
    }

    /// CCD geometry, for the kinds that record it.
    pub fn ccd(&self) -> Option<&CcdGeometry> {
        match self {
            FrameMetadata::Pgm(m) => Some(&m.ccd),
            FrameMetadata::Hdf5(m) => Some(&m.ccd),
            FrameMetadata::Png(_) => None,
        }
    }
}

impl From<PgmMeta> for FrameMetadata {
    fn from(meta: PgmMeta) -> Self {
        FrameMetadata::Pgm(meta)
    }
}

impl From<PngMeta> for FrameMetadata {
    fn from(meta: PngMeta) -> Self {
        FrameMetadata::Png(meta)
    }
}

impl From<Hdf5Meta> for FrameMetadata {
    fn from(meta: Hdf5Meta) -> Self {
        FrameMetadata::Hdf5(meta)
    }
}

/// A free-form attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
    TextArray(Vec<String>),
}

impl AttrValue {
    /// Numeric value; text is parsed, single-element arrays are unwrapped.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            AttrValue::Text(s) => s.trim().parse().ok(),
            AttrValue::IntArray(v) if v.len() == 1 => Some(v[0] as f64),
            AttrValue::FloatArray(v) if v.len() == 1 => Some(v[0]),
            AttrValue::TextArray(v) if v.len() == 1 => v[0].trim().parse().ok(),
            _ => None,
        }
    }

    /// Text value; single-element text arrays are unwrapped.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s.trim()),
            AttrValue::TextArray(v) if v.len() == 1 => Some(v[0].trim()),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Text(s) => write!(f, "{}", s),
            AttrValue::IntArray(v) => write!(f, "{:?}", v),
            AttrValue::FloatArray(v) => write!(f, "{:?}", v),
            AttrValue::TextArray(v) => write!(f, "{:?}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_accessor_covers_all_kinds() {
        let mut png = FrameMetadata::from(PngMeta::default());
        png.common_mut().site_uid = "gill".to_string();
        assert_eq!(png.common().site_uid, "gill");
        assert_eq!(png.kind(), SourceKind::Png);
        assert!(png.ccd().is_none());

        let pgm = FrameMetadata::from(PgmMeta::default());
        assert!(pgm.ccd().is_some());
    }

    #[test]
    fn test_set_exposure_start() {
        let mut common = CommonMeta::default();
        let start = parse_timestamp("2021-11-04 06:00:03.003 UTC").unwrap();
        common.set_exposure_start(&start);
        assert_eq!(common.exposure_start_string, "2021-11-04 06:00:03.003 UTC");
        assert_eq!(common.exposure_start(), Some(start));
    }

    #[test]
    fn test_attr_value_coercions() {
        assert_eq!(AttrValue::Text(" 56.354 ".into()).as_f64(), Some(56.354));
        assert_eq!(AttrValue::FloatArray(vec![2.5]).as_f64(), Some(2.5));
        assert_eq!(AttrValue::FloatArray(vec![1.0, 2.0]).as_f64(), None);
        assert_eq!(AttrValue::TextArray(vec!["gill".into()]).as_text(), Some("gill"));
        assert_eq!(AttrValue::Int(3).as_text(), None);
    }

    #[test]
    fn test_metadata_serializes_with_kind_tag() {
        let mut meta = PngMeta::default();
        meta.common.site_uid = "rabb".into();
        meta.mode_uid = "full".into();
        let json = serde_json::to_value(FrameMetadata::from(meta)).unwrap();
        assert_eq!(json["kind"], "png");
        assert_eq!(json["site_uid"], "rabb");
        assert_eq!(json["mode_uid"], "full");
    }
}
