//! Metadata encoded in PNG member names.
//!
//! ```text
//! 20210101_060003_012_gill_rgb-04_3000ms_full.png
//! date     time   ms  site device exposure mode
//! ```

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use imager_common::{MetadataLevel, PngMeta};

use crate::error::{PngError, PngResult};

const MIN_TOKENS: usize = 7;

/// Fields parsed from one member name.
#[derive(Debug, Clone, PartialEq)]
pub struct PngFilename {
    pub exposure_start: DateTime<Utc>,
    pub site_uid: String,
    pub device_uid: String,
    /// Exposure duration in seconds
    pub exposure_duration: f64,
    pub mode_uid: String,
}

impl PngFilename {
    /// Parse a bare file name (no directory components).
    pub fn parse(name: &str) -> PngResult<Self> {
        let unrecognized = || PngError::UnrecognizedFilenameFormat(name.to_string());

        let tokens: Vec<&str> = name.split('_').collect();
        if tokens.len() < MIN_TOKENS {
            return Err(unrecognized());
        }

        let date = NaiveDate::parse_from_str(tokens[0], "%Y%m%d").map_err(|_| unrecognized())?;
        let time = NaiveTime::parse_from_str(tokens[1], "%H%M%S").map_err(|_| unrecognized())?;
        let millis: i64 = tokens[2].parse().map_err(|_| unrecognized())?;
        if !(0..1000).contains(&millis) {
            return Err(unrecognized());
        }
        let exposure_start = date.and_time(time).and_utc() + Duration::milliseconds(millis);

        let exposure_ms: f64 = tokens[5]
            .trim_end_matches(|c: char| c.is_ascii_alphabetic())
            .parse()
            .map_err(|_| unrecognized())?;

        let mode = tokens[6].split('.').next().unwrap_or(tokens[6]);
        if tokens[3].is_empty() || tokens[4].is_empty() || mode.is_empty() {
            return Err(unrecognized());
        }

        Ok(Self {
            exposure_start,
            site_uid: tokens[3].to_string(),
            device_uid: tokens[4].to_string(),
            exposure_duration: exposure_ms / 1000.0,
            mode_uid: mode.to_string(),
        })
    }

    /// Metadata record at the requested level (`None` yields the default).
    pub fn to_metadata(&self, level: MetadataLevel) -> PngMeta {
        let mut meta = PngMeta::default();
        if !level.wanted() {
            return meta;
        }
        meta.common.set_exposure_start(&self.exposure_start);
        meta.common.exposure_duration_request = self.exposure_duration;
        meta.common.exposure_duration_actual = self.exposure_duration;
        if level == MetadataLevel::Full {
            meta.common.site_uid = self.site_uid.clone();
            meta.common.device_uid = self.device_uid.clone();
            meta.mode_uid = self.mode_uid.clone();
        }
        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_full_name() {
        let f = PngFilename::parse("20210101_060003_012_gill_rgb-04_3000ms_full.png").unwrap();
        assert_eq!(f.exposure_start.year(), 2021);
        assert_eq!(f.exposure_start.hour(), 6);
        assert_eq!(f.exposure_start.second(), 3);
        assert_eq!(f.exposure_start.timestamp_subsec_millis(), 12);
        assert_eq!(f.site_uid, "gill");
        assert_eq!(f.device_uid, "rgb-04");
        assert_eq!(f.exposure_duration, 3.0);
        assert_eq!(f.mode_uid, "full");
    }

    #[test]
    fn test_too_few_tokens() {
        let err = PngFilename::parse("20210101_060003_012_gill_rgb-04.png").unwrap_err();
        assert!(matches!(err, PngError::UnrecognizedFilenameFormat(_)));
    }

    #[test]
    fn test_bad_date_token() {
        let err = PngFilename::parse("2021XX01_060003_012_gill_rgb-04_3000ms_full.png").unwrap_err();
        assert!(matches!(err, PngError::UnrecognizedFilenameFormat(_)));
    }

    #[test]
    fn test_metadata_levels() {
        let f = PngFilename::parse("20210101_060003_012_gill_rgb-04_3000ms_full.png").unwrap();

        let full = f.to_metadata(MetadataLevel::Full);
        assert_eq!(full.common.exposure_start_string, "2021-01-01 06:00:03.012 UTC");
        assert_eq!(full.mode_uid, "full");

        let minimal = f.to_metadata(MetadataLevel::Minimal);
        assert_eq!(minimal.common.exposure_duration_request, 3.0);
        assert!(minimal.common.site_uid.is_empty());
    }
}
