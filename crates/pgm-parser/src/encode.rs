//! PGM re-encoding.
//!
//! Writes a canonical header (`magic`, comments, `width height`, `maxval`)
//! followed by the pixel section. Binary 16-bit samples are big-endian; ASCII
//! samples are space-separated with one image row per line.

use std::io::Write;

use imager_common::{AnyFrame, FrameError, Sample};

use crate::error::{PgmError, PgmResult};
use crate::reader::PgmFormat;

/// Encode one monochrome frame.
///
/// `maxval` must match the frame's sample width: at most 255 for 8-bit frames
/// and above 255 for 16-bit frames.
pub fn encode_frame(
    format: PgmFormat,
    frame: &AnyFrame,
    maxval: u16,
    comments: &str,
) -> PgmResult<Vec<u8>> {
    let shape = frame.shape();
    if shape.channels != 1 {
        return Err(FrameError::UnsupportedChannels(shape.channels).into());
    }
    check_depth(frame, maxval)?;

    let mut out = Vec::with_capacity(32 + comments.len() + shape.sample_count() * 2);
    out.extend_from_slice(format.magic());
    out.push(b'\n');
    for line in comments.lines() {
        writeln!(out, "#{}", line)?;
    }
    writeln!(out, "{} {}", shape.width, shape.height)?;
    writeln!(out, "{}", maxval)?;
    encode_pixels(format, frame, &mut out)?;
    Ok(out)
}

/// Append just the pixel section of `frame` to `out`.
pub fn encode_pixels(format: PgmFormat, frame: &AnyFrame, out: &mut Vec<u8>) -> PgmResult<()> {
    match (format, frame) {
        (PgmFormat::Binary, AnyFrame::U8(f)) => out.extend_from_slice(f.as_slice()),
        (PgmFormat::Binary, AnyFrame::U16(f)) => {
            for sample in f.as_slice() {
                out.extend_from_slice(&sample.to_be_bytes());
            }
        }
        (PgmFormat::Ascii, AnyFrame::U8(f)) => write_ascii(out, f.as_slice(), f.shape().width)?,
        (PgmFormat::Ascii, AnyFrame::U16(f)) => write_ascii(out, f.as_slice(), f.shape().width)?,
    }
    Ok(())
}

fn write_ascii<T: Sample + std::fmt::Display>(
    out: &mut Vec<u8>,
    samples: &[T],
    width: usize,
) -> PgmResult<()> {
    for row in samples.chunks(width.max(1)) {
        let mut first = true;
        for sample in row {
            if !first {
                out.push(b' ');
            }
            write!(out, "{}", sample)?;
            first = false;
        }
        out.push(b'\n');
    }
    Ok(())
}

fn check_depth(frame: &AnyFrame, maxval: u16) -> PgmResult<()> {
    let wide = maxval > 255;
    let bits = frame.bits();
    if maxval == 0 || wide != (bits == 16) {
        return Err(PgmError::InvalidDimensions {
            width: frame.shape().width as u64,
            height: frame.shape().height as u64,
            maxval: u64::from(maxval),
        });
    }
    Ok(())
}
