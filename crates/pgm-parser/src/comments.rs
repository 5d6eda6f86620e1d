//! Acquisition metadata embedded in PGM comment blocks.
//!
//! The imager firmware writes one labelled field per comment line, e.g.
//!
//! ```text
//! "Image request start" 2019-01-01 06:00:00.016 UTC
//! "Site unique ID" gill
//! "Exposure options" width=256 height=256 xoffset=0 yoffset=0 xbin=1 ybin=1 msec=1000
//! ```
//!
//! Labels are matched case-insensitively.

use imager_common::{parse_timestamp, MetadataLevel, PgmMeta};

use crate::error::{PgmError, PgmResult};

const IMAGE_REQUEST_START: &str = "\"image request start\"";
const SITE_UNIQUE_ID: &str = "\"site unique id\"";
const IMAGER_UNIQUE_ID: &str = "\"imager unique id\"";
const MODE_UNIQUE_ID: &str = "\"mode unique id\"";
const CCD_XSIZE: &str = "\"ccd xsize\"";
const CCD_YSIZE: &str = "\"ccd ysize\"";
const CCD_CENTER: &str = "\"ccd center\"";
const EXPOSURE_OPTIONS: &str = "\"exposure options\"";
const EXPOSURE_PLUS_READOUT: &str = "\"exposure plus readout\"";

/// Parse comment text into frame metadata.
///
/// With [`MetadataLevel::Minimal`] only the timing fields are filled in.
/// Fails with [`PgmError::MissingTimeInformation`] when no exposure start
/// can be found.
pub fn parse_comments(comments: &str, level: MetadataLevel) -> PgmResult<PgmMeta> {
    let lower = comments.to_lowercase();
    let mut meta = PgmMeta::default();
    let mut found_start = false;
    let mut actual_ms: Option<f64> = None;

    for line in lower.lines().map(str::trim) {
        if let Some(value) = labelled(line, IMAGE_REQUEST_START) {
            let stamp = value.split(" utc").next().unwrap_or(value);
            if let Some(start) = parse_timestamp(stamp) {
                meta.common.set_exposure_start(&start);
                found_start = true;
            }
        } else if let Some(value) = labelled(line, EXPOSURE_OPTIONS) {
            apply_exposure_options(&mut meta, value);
        } else if let Some(value) = labelled(line, EXPOSURE_PLUS_READOUT) {
            actual_ms = first_number(value);
        } else if level == MetadataLevel::Full {
            apply_descriptive_field(&mut meta, line);
        }
    }

    if !found_start {
        return Err(PgmError::MissingTimeInformation);
    }

    meta.common.exposure_duration_actual = actual_ms
        .map(|ms| ms / 1000.0)
        .unwrap_or(meta.common.exposure_duration_request);

    if level == MetadataLevel::Full {
        meta.comments = comments.to_string();
    } else {
        meta.ccd = Default::default();
    }
    Ok(meta)
}

fn apply_descriptive_field(meta: &mut PgmMeta, line: &str) {
    if let Some(value) = labelled(line, SITE_UNIQUE_ID) {
        meta.common.site_uid = first_word(value);
    } else if let Some(value) = labelled(line, IMAGER_UNIQUE_ID) {
        meta.common.device_uid = first_word(value);
    } else if let Some(value) = labelled(line, MODE_UNIQUE_ID) {
        meta.mode_uid = Some(first_word(value));
    } else if let Some(value) = labelled(line, CCD_XSIZE) {
        meta.ccd.xsize = first_number(value).map(|v| v as u32);
    } else if let Some(value) = labelled(line, CCD_YSIZE) {
        meta.ccd.ysize = first_number(value).map(|v| v as u32);
    } else if let Some(value) = labelled(line, CCD_CENTER) {
        let mut numbers = numbers(value);
        meta.ccd.center_x = numbers.next();
        meta.ccd.center_y = numbers.next();
    }
}

fn apply_exposure_options(meta: &mut PgmMeta, value: &str) {
    for pair in value.split(|c: char| c.is_whitespace() || c == ',') {
        let Some((key, raw)) = pair.split_once('=') else {
            continue;
        };
        let Ok(number) = raw.trim().parse::<f64>() else {
            continue;
        };
        match key.trim() {
            "width" => meta.ccd.width = Some(number as u32),
            "height" => meta.ccd.height = Some(number as u32),
            "xoffset" => meta.ccd.xoffset = Some(number as u32),
            "yoffset" => meta.ccd.yoffset = Some(number as u32),
            "xbin" => meta.ccd.xbin = Some(number as u32),
            "ybin" => meta.ccd.ybin = Some(number as u32),
            "msec" => meta.common.exposure_duration_request = number / 1000.0,
            _ => {}
        }
    }
}

/// Text following `label` when the line starts with it.
fn labelled<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    line.strip_prefix(label).map(str::trim)
}

fn first_word(value: &str) -> String {
    value
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_matches('"')
        .to_string()
}

fn numbers(value: &str) -> impl Iterator<Item = f64> + '_ {
    value
        .split(|c: char| c.is_whitespace() || c == ',' || c == '(' || c == ')')
        .filter_map(|token| {
            token
                .trim_end_matches(|c: char| c.is_ascii_alphabetic())
                .parse::<f64>()
                .ok()
        })
}

fn first_number(value: &str) -> Option<f64> {
    numbers(value).next()
}

#[cfg(test)]
mod tests {
    use super::*;

    const THEMIS_COMMENTS: &str = "\"Image request start\" 2019-01-01 06:00:00.016 UTC\n\
        \"Site unique ID\" gill\n\
        \"Imager unique ID\" themis19\n\
        \"Mode unique ID\" full\n\
        \"CCD xsize\" 1024\n\
        \"CCD ysize\" 1024\n\
        \"CCD center\" 511.5 512.0\n\
        \"Exposure options\" width=256 height=256 xoffset=2 yoffset=3 xbin=4 ybin=4 msec=1000\n\
        \"Exposure plus readout\" 1024 ms\n";

    #[test]
    fn test_full_metadata() {
        let meta = parse_comments(THEMIS_COMMENTS, MetadataLevel::Full).unwrap();
        assert_eq!(meta.common.exposure_start_string, "2019-01-01 06:00:00.016 UTC");
        assert_eq!(meta.common.site_uid, "gill");
        assert_eq!(meta.common.device_uid, "themis19");
        assert_eq!(meta.mode_uid.as_deref(), Some("full"));
        assert_eq!(meta.ccd.xsize, Some(1024));
        assert_eq!(meta.ccd.ysize, Some(1024));
        assert_eq!(meta.ccd.center_x, Some(511.5));
        assert_eq!(meta.ccd.center_y, Some(512.0));
        assert_eq!(meta.ccd.width, Some(256));
        assert_eq!(meta.ccd.xoffset, Some(2));
        assert_eq!(meta.ccd.yoffset, Some(3));
        assert_eq!(meta.ccd.xbin, Some(4));
        assert_eq!(meta.ccd.ybin, Some(4));
        assert_eq!(meta.common.exposure_duration_request, 1.0);
        assert_eq!(meta.common.exposure_duration_actual, 1.024);
        assert_eq!(meta.comments, THEMIS_COMMENTS);
    }

    #[test]
    fn test_minimal_metadata_keeps_only_timing() {
        let meta = parse_comments(THEMIS_COMMENTS, MetadataLevel::Minimal).unwrap();
        assert_eq!(meta.common.exposure_duration_request, 1.0);
        assert!(meta.common.exposure_start_epoch > 0.0);
        assert!(meta.common.site_uid.is_empty());
        assert_eq!(meta.ccd, Default::default());
        assert!(meta.comments.is_empty());
    }

    #[test]
    fn test_actual_defaults_to_request() {
        let comments = "\"Image request start\" 2019-01-01 06:00:00.016 UTC\n\
            \"Exposure options\" msec=2000\n";
        let meta = parse_comments(comments, MetadataLevel::Full).unwrap();
        assert_eq!(meta.common.exposure_duration_actual, 2.0);
    }

    #[test]
    fn test_missing_time() {
        let err = parse_comments("\"Site unique ID\" gill\n", MetadataLevel::Full).unwrap_err();
        assert!(matches!(err, PgmError::MissingTimeInformation));

        let err = parse_comments("", MetadataLevel::Minimal).unwrap_err();
        assert!(matches!(err, PgmError::MissingTimeInformation));
    }

    #[test]
    fn test_unparseable_time_counts_as_missing() {
        let err = parse_comments("\"Image request start\" sometime UTC\n", MetadataLevel::Full)
            .unwrap_err();
        assert!(matches!(err, PgmError::MissingTimeInformation));
    }
}
