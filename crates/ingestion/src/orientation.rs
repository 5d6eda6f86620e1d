//! Per-dataset orientation table.
//!
//! Each instrument family writes its images in a different orientation. The
//! table below lists the flip that brings a dataset into the canonical
//! orientation; a wrong entry is silently wrong imagery, so every entry is
//! pinned by a test.
//!
//! TREx RGB PNG frames are already flipped by the PNG decoder, so their raw
//! datasets need no further transform here.

use imager_common::Flip;
use ndarray::{ArrayBase, Axis, Ix2, RawData};
use tracing::debug;

/// Flips applied to decoded image frames, keyed by dataset name.
pub const IMAGE_ORIENTATION: &[(&str, Flip)] = &[
    ("THEMIS_ASI_RAW", Flip::Vertical),
    ("REGO_RAW", Flip::Both),
    ("TREX_NIR_RAW", Flip::Vertical),
    ("TREX_BLUE_RAW", Flip::Vertical),
    ("TREX_RGB_RAW_NOMINAL", Flip::None),
    ("TREX_RGB_RAW_BURST", Flip::None),
];

/// Flips applied to skymap arrays (azimuth, elevation, lat/lon grids).
pub const SKYMAP_ORIENTATION: &[(&str, Flip)] = &[
    ("THEMIS_ASI_SKYMAP_IDLSAV", Flip::Vertical),
    ("REGO_SKYMAP_IDLSAV", Flip::Both),
    ("TREX_NIR_SKYMAP_IDLSAV", Flip::Vertical),
    ("TREX_BLUE_SKYMAP_IDLSAV", Flip::Vertical),
    ("TREX_RGB_SKYMAP_IDLSAV", Flip::Vertical),
];

/// Static lookup of canonical orientation per dataset name.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrientationNormalizer;

impl OrientationNormalizer {
    /// Flip for frames of `dataset`; unknown datasets are left as decoded.
    pub fn image_flip(dataset: &str) -> Flip {
        lookup(IMAGE_ORIENTATION, dataset)
    }

    /// Flip for skymap arrays of `dataset`.
    pub fn skymap_flip(dataset: &str) -> Flip {
        lookup(SKYMAP_ORIENTATION, dataset)
    }

    /// Flip a 2-D grid laid out as `(width, height)`.
    ///
    /// The flip reverses axis strides in place; no samples are moved.
    pub fn apply_to_grid<S: RawData>(grid: &mut ArrayBase<S, Ix2>, flip: Flip) {
        if flip.flips_horizontal() {
            grid.invert_axis(Axis(0));
        }
        if flip.flips_vertical() {
            grid.invert_axis(Axis(1));
        }
    }
}

fn lookup(table: &[(&str, Flip)], dataset: &str) -> Flip {
    match table.iter().find(|(name, _)| name.eq_ignore_ascii_case(dataset)) {
        Some((_, flip)) => *flip,
        None => {
            debug!(dataset = %dataset, "No orientation entry, leaving frames as decoded");
            Flip::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_image_orientation_pins() {
        assert_eq!(OrientationNormalizer::image_flip("THEMIS_ASI_RAW"), Flip::Vertical);
        assert_eq!(OrientationNormalizer::image_flip("REGO_RAW"), Flip::Both);
        assert_eq!(OrientationNormalizer::image_flip("TREX_NIR_RAW"), Flip::Vertical);
        assert_eq!(OrientationNormalizer::image_flip("TREX_BLUE_RAW"), Flip::Vertical);
        assert_eq!(OrientationNormalizer::image_flip("TREX_RGB_RAW_NOMINAL"), Flip::None);
        assert_eq!(OrientationNormalizer::image_flip("TREX_RGB_RAW_BURST"), Flip::None);
    }

    #[test]
    fn test_skymap_orientation_pins() {
        assert_eq!(OrientationNormalizer::skymap_flip("THEMIS_ASI_SKYMAP_IDLSAV"), Flip::Vertical);
        assert_eq!(OrientationNormalizer::skymap_flip("REGO_SKYMAP_IDLSAV"), Flip::Both);
        assert_eq!(OrientationNormalizer::skymap_flip("TREX_NIR_SKYMAP_IDLSAV"), Flip::Vertical);
        assert_eq!(OrientationNormalizer::skymap_flip("TREX_BLUE_SKYMAP_IDLSAV"), Flip::Vertical);
        assert_eq!(OrientationNormalizer::skymap_flip("TREX_RGB_SKYMAP_IDLSAV"), Flip::Vertical);
    }

    #[test]
    fn test_unknown_dataset_is_untouched() {
        assert_eq!(OrientationNormalizer::image_flip("SMILE_ASI_RAW"), Flip::None);
        assert_eq!(OrientationNormalizer::skymap_flip("THEMIS_ASI_RAW"), Flip::None);
    }

    #[test]
    fn test_lookup_ignores_case() {
        assert_eq!(OrientationNormalizer::image_flip("themis_asi_raw"), Flip::Vertical);
    }

    #[test]
    fn test_apply_to_grid() {
        // (width=2, height=3)
        let grid = array![[1, 2, 3], [4, 5, 6]];

        let mut vertical = grid.clone();
        OrientationNormalizer::apply_to_grid(&mut vertical, Flip::Vertical);
        assert_eq!(vertical, array![[3, 2, 1], [6, 5, 4]]);

        let mut horizontal = grid.clone();
        OrientationNormalizer::apply_to_grid(&mut horizontal, Flip::Horizontal);
        assert_eq!(horizontal, array![[4, 5, 6], [1, 2, 3]]);

        let mut both = grid.clone();
        OrientationNormalizer::apply_to_grid(&mut both, Flip::Both);
        assert_eq!(both, array![[6, 5, 4], [3, 2, 1]]);

        let mut none = grid.clone();
        OrientationNormalizer::apply_to_grid(&mut none, Flip::None);
        assert_eq!(none, grid);
    }
}
