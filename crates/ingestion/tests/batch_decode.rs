//! Decoding mixed batches of imager files through the ingester.

use std::path::PathBuf;

use imager_common::{Flip, FrameMetadata, SourceKind};
use ingestion::{DecodeError, DecodeOptions, FileType, Ingester};
use ndarray::Array4;
use png_parser::{DecoderCapabilities, PngFilename};
use test_utils::{
    create_test_frame_u16, init_test_tracing, temp_test_dir, write_hdf5_cube, write_pgm_file, write_rgb_png_tar,
    write_themis_pgm, Hdf5Cube,
};

const WIDTH: usize = 6;
const HEIGHT: usize = 4;

fn themis_file(dir: &std::path::Path, name: &str, frames: usize) -> PathBuf {
    write_themis_pgm(dir, name, frames, WIDTH, HEIGHT, "gill", "themis19").unwrap()
}

#[test]
fn test_themis_frames_flip_vertically() {
    init_test_tracing();
    let dir = temp_test_dir();
    let path = themis_file(dir.path(), "20140310_0600_gill_themis19_full.pgm.gz", 2);

    let set = Ingester::default()
        .decode("THEMIS_ASI_RAW", &[&path], &DecodeOptions::default())
        .unwrap();
    assert_eq!(set.dataset.orientation, Flip::Vertical);

    let pixels = set.pixels.as_u16().unwrap();
    assert_eq!(pixels.shape(), &[1, WIDTH, HEIGHT, 2]);
    for f in 0..2 {
        let raw = create_test_frame_u16(WIDTH, HEIGHT, u16::MAX, f as u16);
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                assert_eq!(pixels[[0, x, y, f]], raw[(HEIGHT - 1 - y) * WIDTH + x]);
            }
        }
    }
}

#[test]
fn test_rego_frames_flip_both_axes() {
    let dir = temp_test_dir();
    let path = write_themis_pgm(dir.path(), "20140310_0600_rank_rego-652_6300.pgm.gz", 1, WIDTH, HEIGHT, "rank", "rego-652")
        .unwrap();

    let set = Ingester::default()
        .decode("REGO_RAW", &[&path], &DecodeOptions::default())
        .unwrap();
    assert_eq!(set.dataset.orientation, Flip::Both);

    let pixels = set.pixels.as_u16().unwrap();
    let raw = create_test_frame_u16(WIDTH, HEIGHT, u16::MAX, 0);
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            assert_eq!(pixels[[0, x, y, 0]], raw[(HEIGHT - 1 - y) * WIDTH + (WIDTH - 1 - x)]);
        }
    }
}

#[test]
fn test_bad_file_skipped_siblings_decode() {
    let dir = temp_test_dir();
    let first = themis_file(dir.path(), "20140310_0600_gill_themis19_full.pgm.gz", 3);
    let bad = dir.path().join("20140310_0601_gill_themis19_full.pgm");
    write_pgm_file(&bad, b"P3\n1 1\n255\n0 0 0\n").unwrap();
    let last = themis_file(dir.path(), "20140310_0602_gill_themis19_full.pgm.gz", 2);

    let set = Ingester::default()
        .decode("THEMIS_ASI_RAW", &[&first, &bad, &last], &DecodeOptions::default())
        .unwrap();

    assert_eq!(set.len(), 5);
    assert_eq!(set.metadata.len(), 5);
    assert_eq!(set.failures.len(), 1);
    assert_eq!(set.failures[0].path, bad);
    assert!(matches!(set.failures[0].error, DecodeError::InvalidMagicNumber(ref m) if m == "P3"));

    assert_eq!(set.report.files.len(), 2);
    assert_eq!(set.report.total_frames, 5);
    let expected_bytes = std::fs::metadata(&first).unwrap().len() + std::fs::metadata(&last).unwrap().len();
    assert_eq!(set.report.total_bytes, expected_bytes);
    assert_eq!(set.report.files[0].file_type, FileType::PgmGz);
}

#[test]
fn test_missing_files_filtered_before_decoding() {
    let dir = temp_test_dir();
    let present = themis_file(dir.path(), "20140310_0600_gill_themis19_full.pgm.gz", 1);
    let missing = dir.path().join("20140310_0601_gill_themis19_full.pgm.gz");

    let set = Ingester::default()
        .decode("THEMIS_ASI_RAW", &[&missing, &present], &DecodeOptions::default())
        .unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set.failures.len(), 1);
    assert!(matches!(set.failures[0].error, DecodeError::Io(_)));

    let err = Ingester::default()
        .decode("THEMIS_ASI_RAW", &[&missing], &DecodeOptions::default())
        .unwrap_err();
    assert!(matches!(err, DecodeError::NoFilesFound));
}

#[test]
fn test_assume_files_exist_skips_precheck() {
    let dir = temp_test_dir();
    let missing = dir.path().join("20140310_0601_gill_themis19_full.pgm.gz");
    let options = DecodeOptions {
        assume_files_exist: true,
        ..Default::default()
    };

    let err = Ingester::default()
        .decode("THEMIS_ASI_RAW", &[&missing], &options)
        .unwrap_err();
    assert!(matches!(err, DecodeError::AllFilesFailed(1)));
}

#[test]
fn test_png_archives_first_frame_only() {
    let dir = temp_test_dir();
    let (a, sorted_a) = write_rgb_png_tar(dir.path(), "20210101_0600_gill_rgb-04_full.png.tar", 10, 4, 3).unwrap();
    let (b, _) = write_rgb_png_tar(dir.path(), "20210101_0601_gill_rgb-04_full.png.tar", 10, 4, 3).unwrap();
    let options = DecodeOptions {
        first_frame_only: true,
        extraction_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };

    let set = Ingester::default()
        .decode("TREX_RGB_RAW_NOMINAL", &[&a, &b], &options)
        .unwrap();

    assert_eq!(set.len(), 2);
    assert_eq!(set.metadata.len(), 2);
    assert_eq!(set.dataset.orientation, Flip::None);
    assert_eq!(set.pixels.shape(), [3, 4, 3, 2]);
    assert!(set.warnings.is_empty());

    let expected = PngFilename::parse(&sorted_a[0]).unwrap();
    assert_eq!(set.metadata[0].kind(), SourceKind::Png);
    assert_eq!(set.metadata[0].common().exposure_start(), Some(expected.exposure_start));
}

#[test]
fn test_capability_fallback_is_a_warning() {
    let dir = temp_test_dir();
    let (archive, _) = write_rgb_png_tar(dir.path(), "20210101_0600_gill_rgb-04_full.png.tar", 3, 4, 3).unwrap();
    let options = DecodeOptions {
        first_frame_only: true,
        ..Default::default()
    };

    let set = Ingester::new(DecoderCapabilities::full_extraction_only())
        .decode("TREX_RGB_RAW_NOMINAL", &[&archive], &options)
        .unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set.warnings.len(), 1);
    assert!(matches!(set.warnings[0], DecodeError::UnsupportedCapability(_)));
}

#[test]
fn test_hdf5_five_frames_all_gill() {
    let dir = temp_test_dir();
    let path = dir.path().join("20210101_0600_gill_nir-216_8000ms.h5");
    let cube = Array4::from_shape_fn((5, HEIGHT, WIDTH, 1), |(f, y, x, _)| (f * 100 + y * 10 + x) as u16);
    write_hdf5_cube(&path, &cube, &Hdf5Cube::standard("gill", 5)).unwrap();

    let set = Ingester::default()
        .decode("TREX_NIR_RAW", &[&path], &DecodeOptions::default())
        .unwrap();

    assert_eq!(set.len(), 5);
    assert_eq!(set.metadata.len(), 5);
    for meta in &set.metadata {
        assert!(matches!(meta, FrameMetadata::Hdf5(_)));
        assert_eq!(meta.common().site_uid, "gill");
    }

    // NIR frames are flipped vertically.
    let pixels = set.pixels.as_u16().unwrap();
    assert_eq!(pixels[[0, 2, 0, 3]], cube[[3, HEIGHT - 1, 2, 0]]);
}

#[test]
fn test_mixed_shapes_skip_the_odd_file() {
    let dir = temp_test_dir();
    let first = themis_file(dir.path(), "20140310_0600_gill_themis19_full.pgm.gz", 2);
    let odd = write_themis_pgm(dir.path(), "20140310_0601_gill_themis19_full.pgm.gz", 2, 3, 3, "gill", "themis19")
        .unwrap();

    let set = Ingester::default()
        .decode("THEMIS_ASI_RAW", &[&first, &odd], &DecodeOptions::default())
        .unwrap();
    assert_eq!(set.len(), 2);
    assert!(matches!(set.failures[0].error, DecodeError::ShapeMismatch(_)));
}

#[test]
fn test_no_metadata_is_idempotent() {
    let dir = temp_test_dir();
    let path = themis_file(dir.path(), "20140310_0600_gill_themis19_full.pgm.gz", 3);
    let options = DecodeOptions {
        no_metadata: true,
        ..Default::default()
    };

    let ingester = Ingester::default();
    let a = ingester.decode("THEMIS_ASI_RAW", &[&path], &options).unwrap();
    let b = ingester.decode("THEMIS_ASI_RAW", &[&path], &options).unwrap();
    assert!(a.metadata.is_empty());
    assert_eq!(a.pixels.as_u16(), b.pixels.as_u16());
}

#[test]
fn test_minimal_metadata_has_timing_only() {
    let dir = temp_test_dir();
    let path = themis_file(dir.path(), "20140310_0600_gill_themis19_full.pgm.gz", 2);
    let options = DecodeOptions {
        minimal_metadata: true,
        ..Default::default()
    };

    let set = Ingester::default()
        .decode("THEMIS_ASI_RAW", &[&path], &options)
        .unwrap();
    assert_eq!(set.metadata.len(), 2);
    let common = set.metadata[1].common();
    assert!(common.site_uid.is_empty());
    assert!(common.exposure_start().is_some());
    assert_eq!(common.exposure_duration_request, 1.0);
}
