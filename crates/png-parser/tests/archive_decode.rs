//! Decoding tar archives of PNG frames end to end.

use imager_common::MetadataLevel;
use png_parser::{
    DecoderCapabilities, ExtractionMode, PngDecodeOptions, PngDecoder, PngError, PngFilename,
};
use test_utils::{encode_png, init_test_tracing, png_member_name, temp_test_dir, write_rgb_png_tar, write_tar, PngPixels};

fn options_in(dir: &std::path::Path, first_frame_only: bool) -> PngDecodeOptions {
    PngDecodeOptions {
        first_frame_only,
        extraction_dir: Some(dir.to_path_buf()),
        ..Default::default()
    }
}

fn dir_is_empty(dir: &std::path::Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

#[test]
fn test_first_frame_of_ten() {
    init_test_tracing();
    let dir = temp_test_dir();
    let scratch = dir.path().join("scratch");
    std::fs::create_dir(&scratch).unwrap();
    let (archive, sorted) = write_rgb_png_tar(dir.path(), "20210101_0600_gill_rgb-04_full.png.tar", 10, 4, 3).unwrap();

    let decoded = PngDecoder::default()
        .decode_file(&archive, &options_in(&scratch, true))
        .unwrap();

    assert_eq!(decoded.frames.len(), 1);
    assert_eq!(decoded.frames.metadata().len(), 1);
    assert_eq!(decoded.extraction, Some(ExtractionMode::FirstMember));

    let expected = PngFilename::parse(&sorted[0]).unwrap();
    let meta = &decoded.frames.metadata()[0];
    assert_eq!(meta.common().exposure_start(), Some(expected.exposure_start));
    assert!(dir_is_empty(&scratch), "extracted files left behind");
}

#[test]
fn test_all_frames_in_name_order() {
    let dir = temp_test_dir();
    let scratch = dir.path().join("scratch");
    std::fs::create_dir(&scratch).unwrap();
    let (archive, sorted) = write_rgb_png_tar(dir.path(), "a.png.tar", 10, 4, 3).unwrap();

    let decoded = PngDecoder::default()
        .decode_file(&archive, &options_in(&scratch, false))
        .unwrap();

    assert_eq!(decoded.frames.len(), 10);
    assert_eq!(decoded.frames.capacity(), 10);
    assert_eq!(decoded.frames.shape().channels, 3);
    assert_eq!(decoded.bytes_read, std::fs::metadata(&archive).unwrap().len());

    let starts: Vec<_> = decoded
        .frames
        .metadata()
        .iter()
        .map(|m| m.common().exposure_start())
        .collect();
    let expected: Vec<_> = sorted
        .iter()
        .map(|n| Some(PngFilename::parse(n).unwrap().exposure_start))
        .collect();
    assert_eq!(starts, expected);
    assert!(dir_is_empty(&scratch));
}

#[test]
fn test_capability_fallback_gives_same_frame() {
    let dir = temp_test_dir();
    let (archive, _) = write_rgb_png_tar(dir.path(), "a.png.tar", 4, 2, 2).unwrap();
    let options = options_in(dir.path(), true);

    let partial = PngDecoder::default().decode_file(&archive, &options).unwrap();
    let fallback = PngDecoder::new(DecoderCapabilities::full_extraction_only())
        .decode_file(&archive, &options)
        .unwrap();

    assert!(fallback.used_fallback());
    assert!(!partial.used_fallback());
    assert_eq!(fallback.frames.len(), 1);
    let (a, _) = partial.frames.into_parts().unwrap();
    let (b, _) = fallback.frames.into_parts().unwrap();
    assert_eq!(a.as_u8(), b.as_u8());
}

#[test]
fn test_bad_member_cleans_up() {
    let dir = temp_test_dir();
    let scratch = dir.path().join("scratch");
    std::fs::create_dir(&scratch).unwrap();

    let good = png_member_name("20210101", "060000", 0, "gill", "rgb-04", 3000, "full");
    let bad = png_member_name("20210101", "060003", 0, "gill", "rgb-04", 3000, "full");
    let archive = dir.path().join("broken.png.tar");
    write_tar(
        &archive,
        &[
            (good, encode_png(2, 2, PngPixels::Rgb8(vec![7; 12]))),
            (bad, b"truncated".to_vec()),
        ],
    )
    .unwrap();

    let err = PngDecoder::default()
        .decode_file(&archive, &options_in(&scratch, false))
        .unwrap_err();
    assert!(matches!(err, PngError::Image(_)));
    assert!(err.is_structural());
    assert!(dir_is_empty(&scratch));
}

#[test]
fn test_keep_extracted_files() {
    let dir = temp_test_dir();
    let scratch = dir.path().join("scratch");
    std::fs::create_dir(&scratch).unwrap();
    let (archive, _) = write_rgb_png_tar(dir.path(), "a.png.tar", 2, 2, 2).unwrap();

    let options = PngDecodeOptions {
        keep_extracted_files: true,
        metadata: MetadataLevel::None,
        ..options_in(&scratch, false)
    };
    PngDecoder::default().decode_file(&archive, &options).unwrap();
    assert!(!dir_is_empty(&scratch));
}
