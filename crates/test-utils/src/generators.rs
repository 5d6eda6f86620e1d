//! Test data generators for synthetic imager frames.
//!
//! The pixel patterns are asymmetric in both axes so that a wrong flip, or a
//! transposed axis, changes the result.

/// Creates a 16-bit test frame whose values span `0..=maxval`.
///
/// Each pixel is `((row * width + col) * 37 + offset) % (maxval + 1)`.
pub fn create_test_frame_u16(width: usize, height: usize, maxval: u16, offset: u16) -> Vec<u16> {
    let modulus = u32::from(maxval) + 1;
    (0..width * height)
        .map(|i| ((i as u32 * 37 + u32::from(offset)) % modulus) as u16)
        .collect()
}

/// Comment block in the style written by THEMIS imager firmware.
///
/// `start` is a `YYYY-MM-DD HH:MM:SS.mmm` timestamp. Lines carry no leading
/// `#`; [`create_pgm_frame`] adds it.
pub fn themis_comments(site: &str, imager: &str, start: &str, exposure_ms: u32) -> String {
    format!(
        "\"Image request start\" {start} UTC\n\
         \"Site unique ID\" {site}\n\
         \"Imager unique ID\" {imager}\n\
         \"Mode unique ID\" full\n\
         \"CCD xsize\" 1024\n\
         \"CCD ysize\" 1024\n\
         \"CCD center\" 511.5 511.5\n\
         \"Exposure options\" width=256 height=256 xoffset=0 yoffset=0 xbin=1 ybin=1 msec={exposure_ms}\n\
         \"Exposure plus readout\" {readout} ms\n",
        readout = exposure_ms + 24,
    )
}

/// Serializes one PGM frame.
///
/// Samples are written as 8-bit when `maxval <= 255`, otherwise as 16-bit
/// big-endian (binary) or decimal text (ASCII).
pub fn create_pgm_frame(
    binary: bool,
    width: usize,
    height: usize,
    maxval: u16,
    comments: &str,
    samples: &[u16],
) -> Vec<u8> {
    assert_eq!(samples.len(), width * height, "sample count must match dimensions");

    let mut out = if binary { b"P5\n".to_vec() } else { b"P2\n".to_vec() };
    for line in comments.lines() {
        out.push(b'#');
        out.extend_from_slice(line.as_bytes());
        out.push(b'\n');
    }
    out.extend_from_slice(format!("{} {}\n{}\n", width, height, maxval).as_bytes());

    if binary {
        for &sample in samples {
            if maxval > 255 {
                out.extend_from_slice(&sample.to_be_bytes());
            } else {
                out.push(sample as u8);
            }
        }
    } else {
        for row in samples.chunks(width) {
            let line: Vec<String> = row.iter().map(u16::to_string).collect();
            out.extend_from_slice(line.join(" ").as_bytes());
            out.push(b'\n');
        }
    }
    out
}

/// PNG member name in the `YYYYMMDD_HHMMSS_mmm_SITE_DEVICE_EXPms_MODE.png` grammar.
pub fn png_member_name(
    date: &str,
    time: &str,
    millis: u32,
    site: &str,
    device: &str,
    exposure_ms: u32,
    mode: &str,
) -> String {
    format!(
        "{}_{}_{:03}_{}_{}_{}ms_{}.png",
        date, time, millis, site, device, exposure_ms, mode
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_frame_u16_respects_maxval() {
        let frame = create_test_frame_u16(16, 16, 4095, 3);
        assert_eq!(frame.len(), 256);
        assert!(frame.iter().all(|&v| v <= 4095));
        assert_eq!(frame[0], 3);
    }

    #[test]
    fn test_create_pgm_frame_binary_header() {
        let bytes = create_pgm_frame(true, 2, 1, 255, "hello", &[1, 2]);
        assert_eq!(bytes, b"P5\n#hello\n2 1\n255\n\x01\x02");
    }

    #[test]
    fn test_create_pgm_frame_wide_ascii() {
        let bytes = create_pgm_frame(false, 2, 1, 1000, "", &[5, 999]);
        assert_eq!(bytes, b"P2\n2 1\n1000\n5 999\n");
    }

    #[test]
    fn test_png_member_name() {
        let name = png_member_name("20210101", "060000", 12, "gill", "rgb-04", 3000, "full");
        assert_eq!(name, "20210101_060000_012_gill_rgb-04_3000ms_full.png");
    }

    #[test]
    fn test_themis_comments_have_timing() {
        let comments = themis_comments("gill", "themis19", "2014-03-10 06:00:00.000", 1000);
        assert!(comments.starts_with("\"Image request start\" 2014-03-10 06:00:00.000 UTC"));
        assert!(comments.contains("msec=1000"));
    }
}
