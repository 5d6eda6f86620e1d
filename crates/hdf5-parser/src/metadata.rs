//! Promotion of HDF5 attributes to typed frame metadata.
//!
//! File-level (`/metadata/file`) and frame-level (`/metadata/frame/frameN`)
//! attributes are merged, frame keys winning. A fixed set of keys becomes
//! first-class [`Hdf5Meta`] fields; everything else stays in `comments`.

use std::collections::BTreeMap;

use imager_common::{parse_timestamp, AttrValue, Hdf5Meta, MetadataLevel};

use crate::error::{Hdf5Error, Hdf5Result};

pub const SITE_UNIQUE_ID: &str = "site_unique_id";
pub const IMAGER_UNIQUE_ID: &str = "imager_unique_id";
pub const GEOGRAPHIC_LATITUDE: &str = "geographic_latitude";
pub const GEOGRAPHIC_LONGITUDE: &str = "geographic_longitude";

/// Accepted names for the requested exposure length (ms), in lookup order.
pub const EXPOSURE_REQUEST_KEYS: [&str; 2] = ["exposure_length_requested_ms", "exposure_length_ms"];
pub const EXPOSURE_ACTUAL_KEY: &str = "exposure_length_actual_ms";

const CCD_XSIZE: &str = "ccd_xsize";
const CCD_YSIZE: &str = "ccd_ysize";
const CCD_XBIN: &str = "ccd_xbin";
const CCD_YBIN: &str = "ccd_ybin";

/// `file` overlaid with `frame`.
pub fn merge_attrs(
    file: &BTreeMap<String, AttrValue>,
    frame: BTreeMap<String, AttrValue>,
) -> BTreeMap<String, AttrValue> {
    let mut merged = file.clone();
    merged.extend(frame);
    merged
}

/// Build one frame's metadata from its timestamp and merged attributes.
pub fn frame_metadata(
    timestamp: &str,
    mut attrs: BTreeMap<String, AttrValue>,
    level: MetadataLevel,
) -> Hdf5Result<Hdf5Meta> {
    let mut meta = Hdf5Meta::default();

    let start = parse_timestamp(timestamp)
        .ok_or_else(|| Hdf5Error::InvalidFormat(format!("unparseable frame timestamp {:?}", timestamp)))?;
    meta.common.set_exposure_start(&start);

    let request_ms = EXPOSURE_REQUEST_KEYS
        .iter()
        .find_map(|key| attrs.remove(*key))
        .map(|v| number(&v, "exposure length"))
        .transpose()?
        .unwrap_or(0.0);
    let actual_ms = attrs
        .remove(EXPOSURE_ACTUAL_KEY)
        .map(|v| number(&v, EXPOSURE_ACTUAL_KEY))
        .transpose()?
        .unwrap_or(request_ms);
    meta.common.exposure_duration_request = request_ms / 1000.0;
    meta.common.exposure_duration_actual = actual_ms / 1000.0;

    if level != MetadataLevel::Full {
        return Ok(meta);
    }

    meta.common.site_uid = required_text(&mut attrs, SITE_UNIQUE_ID)?;
    meta.common.device_uid = required_text(&mut attrs, IMAGER_UNIQUE_ID)?;
    meta.geographic_latitude = required_number(&mut attrs, GEOGRAPHIC_LATITUDE)?;
    meta.geographic_longitude = required_number(&mut attrs, GEOGRAPHIC_LONGITUDE)?;

    meta.ccd.xsize = optional_u32(&mut attrs, CCD_XSIZE);
    meta.ccd.ysize = optional_u32(&mut attrs, CCD_YSIZE);
    meta.ccd.xbin = optional_u32(&mut attrs, CCD_XBIN);
    meta.ccd.ybin = optional_u32(&mut attrs, CCD_YBIN);

    meta.comments = attrs;
    Ok(meta)
}

fn required_text(attrs: &mut BTreeMap<String, AttrValue>, key: &str) -> Hdf5Result<String> {
    let value = attrs
        .remove(key)
        .ok_or_else(|| Hdf5Error::MissingRequiredAttribute(key.to_string()))?;
    Ok(match value.as_text() {
        Some(text) => text.to_string(),
        None => value.to_string(),
    })
}

fn required_number(attrs: &mut BTreeMap<String, AttrValue>, key: &str) -> Hdf5Result<f64> {
    let value = attrs
        .remove(key)
        .ok_or_else(|| Hdf5Error::MissingRequiredAttribute(key.to_string()))?;
    number(&value, key)
}

fn optional_u32(attrs: &mut BTreeMap<String, AttrValue>, key: &str) -> Option<u32> {
    let value = attrs.get(key)?.as_f64()?;
    attrs.remove(key);
    Some(value as u32)
}

fn number(value: &AttrValue, what: &str) -> Hdf5Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| Hdf5Error::InvalidFormat(format!("{} is not numeric: {}", what, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, AttrValue)]) -> BTreeMap<String, AttrValue> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn required() -> BTreeMap<String, AttrValue> {
        attrs(&[
            (SITE_UNIQUE_ID, AttrValue::Text("gill".into())),
            (IMAGER_UNIQUE_ID, AttrValue::Text("rgb-04".into())),
            (GEOGRAPHIC_LATITUDE, AttrValue::Float(56.35)),
            (GEOGRAPHIC_LONGITUDE, AttrValue::Text("-94.71".into())),
        ])
    }

    #[test]
    fn test_frame_keys_win() {
        let file = attrs(&[("a", AttrValue::Int(1)), ("b", AttrValue::Int(2))]);
        let frame = attrs(&[("b", AttrValue::Int(20))]);
        let merged = merge_attrs(&file, frame);
        assert_eq!(merged["a"], AttrValue::Int(1));
        assert_eq!(merged["b"], AttrValue::Int(20));
    }

    #[test]
    fn test_promotes_required_fields() {
        let mut a = required();
        a.insert("ccd_temperature".into(), AttrValue::Float(-10.0));
        a.insert("exposure_length_ms".into(), AttrValue::Int(3000));
        let meta = frame_metadata("2021-01-01 06:00:00.000000 UTC", a, MetadataLevel::Full).unwrap();
        assert_eq!(meta.common.site_uid, "gill");
        assert_eq!(meta.common.device_uid, "rgb-04");
        assert_eq!(meta.geographic_latitude, 56.35);
        assert_eq!(meta.geographic_longitude, -94.71);
        assert_eq!(meta.common.exposure_duration_request, 3.0);
        assert_eq!(meta.common.exposure_duration_actual, 3.0);
        assert_eq!(meta.comments.len(), 1);
        assert!(meta.comments.contains_key("ccd_temperature"));
    }

    #[test]
    fn test_missing_exposure_defaults_to_zero() {
        let meta = frame_metadata("2021-01-01 06:00:00 UTC", required(), MetadataLevel::Full).unwrap();
        assert_eq!(meta.common.exposure_duration_request, 0.0);
    }

    #[test]
    fn test_missing_required_attribute() {
        let mut a = required();
        a.remove(GEOGRAPHIC_LATITUDE);
        let err = frame_metadata("2021-01-01 06:00:00 UTC", a, MetadataLevel::Full).unwrap_err();
        assert!(matches!(err, Hdf5Error::MissingRequiredAttribute(ref k) if k == GEOGRAPHIC_LATITUDE));
    }

    #[test]
    fn test_minimal_skips_required_checks() {
        let meta = frame_metadata("2021-01-01 06:00:00 UTC", BTreeMap::new(), MetadataLevel::Minimal).unwrap();
        assert!(meta.common.site_uid.is_empty());
        assert!(meta.comments.is_empty());
        assert!(meta.common.exposure_start_epoch > 0.0);
    }

    #[test]
    fn test_bad_timestamp() {
        let err = frame_metadata("yesterday", required(), MetadataLevel::Full).unwrap_err();
        assert!(matches!(err, Hdf5Error::InvalidFormat(_)));
    }
}
