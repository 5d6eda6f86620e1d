//! PGM frame reader.
//!
//! A stream is a concatenation of PGM frames. Each frame is read by a small
//! state machine:
//!
//! ```text
//! ReadMagic -> ReadHeaderTokens -> ReadPixelData -> Done
//! ```
//!
//! Header tokens are ASCII integers separated by whitespace; a `#` starts a
//! comment running to end of line. Comment text is kept because this
//! instrument family writes its acquisition parameters there.

use std::io::{BufRead, ErrorKind, Read};

use imager_common::{AnyFrame, Frame, FrameShape};

use crate::error::{PgmError, PgmResult};

/// Upper bound on buffer space reserved before pixel data actually arrives.
const MAX_PREALLOC: usize = 1 << 20;

/// Pixel encoding selected by the magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PgmFormat {
    /// `P2`: whitespace-separated ASCII samples
    Ascii,
    /// `P5`: raw binary samples, big-endian when 16-bit
    Binary,
}

impl PgmFormat {
    pub fn magic(self) -> &'static [u8; 2] {
        match self {
            PgmFormat::Ascii => b"P2",
            PgmFormat::Binary => b"P5",
        }
    }
}

/// Parsed header of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgmHeader {
    pub format: PgmFormat,
    pub width: usize,
    pub height: usize,
    pub maxval: u16,
    /// Comment lines without their leading `#`, newline-terminated
    pub comments: String,
}

impl PgmHeader {
    /// Samples are 16-bit when maxval exceeds 255.
    pub fn is_wide(&self) -> bool {
        self.maxval > 255
    }

    /// Size of the pixel section for binary frames.
    pub fn binary_len(&self) -> usize {
        let bytes_per_sample = if self.is_wide() { 2 } else { 1 };
        self.width
            .saturating_mul(self.height)
            .saturating_mul(bytes_per_sample)
    }
}

/// One decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PgmFrame {
    pub header: PgmHeader,
    pub pixels: AnyFrame,
}

enum State {
    ReadMagic,
    ReadHeaderTokens(PgmFormat),
    ReadPixelData(PgmHeader),
    Done(PgmFrame),
}

/// Reads consecutive PGM frames from a buffered stream.
pub struct PgmReader<R> {
    inner: R,
    frames_read: usize,
}

impl<R: BufRead> PgmReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            frames_read: 0,
        }
    }

    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    /// Read the next frame, or `None` at a clean end of stream.
    pub fn next_frame(&mut self) -> PgmResult<Option<PgmFrame>> {
        let mut state = State::ReadMagic;
        loop {
            state = match state {
                State::ReadMagic => match self.read_magic()? {
                    Some(format) => State::ReadHeaderTokens(format),
                    None => return Ok(None),
                },
                State::ReadHeaderTokens(format) => State::ReadPixelData(self.read_header(format)?),
                State::ReadPixelData(header) => {
                    let pixels = self.read_pixels(&header)?;
                    State::Done(PgmFrame { header, pixels })
                }
                State::Done(frame) => {
                    self.frames_read += 1;
                    return Ok(Some(frame));
                }
            };
        }
    }

    fn peek_byte(&mut self) -> PgmResult<Option<u8>> {
        loop {
            match self.inner.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn next_byte(&mut self) -> PgmResult<Option<u8>> {
        let byte = self.peek_byte()?;
        if byte.is_some() {
            self.inner.consume(1);
        }
        Ok(byte)
    }

    fn read_magic(&mut self) -> PgmResult<Option<PgmFormat>> {
        // ASCII frames usually end with a newline before the next magic.
        let first = loop {
            match self.next_byte()? {
                None => return Ok(None),
                Some(b) if b.is_ascii_whitespace() => continue,
                Some(b) => break b,
            }
        };
        let second = self.next_byte()?.ok_or(PgmError::TruncatedHeader)?;

        match [first, second] {
            [b'P', b'2'] => Ok(Some(PgmFormat::Ascii)),
            [b'P', b'5'] => Ok(Some(PgmFormat::Binary)),
            other => Err(PgmError::InvalidMagicNumber(
                String::from_utf8_lossy(&other).into_owned(),
            )),
        }
    }

    fn read_header(&mut self, format: PgmFormat) -> PgmResult<PgmHeader> {
        let mut tokens = [0u64; 3];
        let mut found = 0;
        let mut comments = String::new();

        while found < tokens.len() {
            let byte = self.next_byte()?.ok_or(PgmError::TruncatedHeader)?;
            match byte {
                b if b.is_ascii_whitespace() => {}
                b'#' => self.read_comment(&mut comments)?,
                b if b.is_ascii_digit() => {
                    tokens[found] = self.read_header_integer(b)?;
                    found += 1;
                }
                other => {
                    return Err(PgmError::MalformedHeader(format!(
                        "unexpected byte 0x{:02x} in header",
                        other
                    )))
                }
            }
        }

        // Exactly one whitespace byte separates maxval from the pixel data.
        match self.peek_byte()? {
            Some(b) if b.is_ascii_whitespace() => self.inner.consume(1),
            Some(b) => {
                return Err(PgmError::MalformedHeader(format!(
                    "expected whitespace after maxval, found 0x{:02x}",
                    b
                )))
            }
            None => {}
        }

        let [width, height, maxval] = tokens;
        let bytes_per_sample = if maxval > 255 { 2 } else { 1 };
        let pixel_bytes = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(bytes_per_sample))
            .filter(|&n| n <= isize::MAX as u64 && usize::try_from(n).is_ok());
        if width == 0
            || height == 0
            || maxval == 0
            || maxval > u64::from(u16::MAX)
            || pixel_bytes.is_none()
        {
            return Err(PgmError::InvalidDimensions {
                width,
                height,
                maxval,
            });
        }

        Ok(PgmHeader {
            format,
            width: width as usize,
            height: height as usize,
            maxval: maxval as u16,
            comments,
        })
    }

    fn read_comment(&mut self, comments: &mut String) -> PgmResult<()> {
        let mut line = Vec::new();
        loop {
            match self.next_byte()?.ok_or(PgmError::TruncatedHeader)? {
                b'\n' => break,
                b'\r' => {}
                b => line.push(b),
            }
        }
        comments.push_str(&String::from_utf8_lossy(&line));
        comments.push('\n');
        Ok(())
    }

    fn read_header_integer(&mut self, first: u8) -> PgmResult<u64> {
        let mut value = u64::from(first - b'0');
        while let Some(b) = self.peek_byte()? {
            if !b.is_ascii_digit() {
                break;
            }
            self.inner.consume(1);
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(b - b'0')))
                .ok_or_else(|| PgmError::MalformedHeader("header integer overflows".into()))?;
        }
        Ok(value)
    }

    fn read_pixels(&mut self, header: &PgmHeader) -> PgmResult<AnyFrame> {
        let shape = FrameShape::mono(header.width, header.height);
        match header.format {
            PgmFormat::Binary => self.read_binary_pixels(header, shape),
            PgmFormat::Ascii => self.read_ascii_pixels(header, shape),
        }
    }

    fn read_binary_pixels(&mut self, header: &PgmHeader, shape: FrameShape) -> PgmResult<AnyFrame> {
        let expected = header.binary_len();
        let mut raw = Vec::with_capacity(expected.min(MAX_PREALLOC));
        read_up_to(&mut self.inner, expected, &mut raw)?;
        let read = raw.len();
        if read != expected {
            return Err(PgmError::TruncatedPixelData { expected, read });
        }

        if header.is_wide() {
            let samples = raw
                .chunks_exact(2)
                .map(|b| u16::from_be_bytes([b[0], b[1]]))
                .collect();
            Ok(Frame::from_raw(shape, samples)?.into())
        } else {
            Ok(Frame::from_raw(shape, raw)?.into())
        }
    }

    fn read_ascii_pixels(&mut self, header: &PgmHeader, shape: FrameShape) -> PgmResult<AnyFrame> {
        let count = header.width.saturating_mul(header.height);
        let mut samples: Vec<u16> = Vec::with_capacity(count.min(MAX_PREALLOC));

        while samples.len() < count {
            let byte = match self.next_byte()? {
                Some(b) => b,
                None => {
                    return Err(PgmError::TruncatedPixelData {
                        expected: count,
                        read: samples.len(),
                    })
                }
            };
            if byte.is_ascii_whitespace() {
                continue;
            }
            if !byte.is_ascii_digit() {
                return Err(PgmError::MalformedPixelData(format!(
                    "unexpected byte 0x{:02x} at sample {}",
                    byte,
                    samples.len()
                )));
            }
            let value = self
                .read_header_integer(byte)
                .map_err(|_| PgmError::MalformedPixelData("sample overflows".into()))?;
            if value > u64::from(header.maxval) {
                return Err(PgmError::MalformedPixelData(format!(
                    "sample {} exceeds maxval {}",
                    value, header.maxval
                )));
            }
            samples.push(value as u16);
        }

        if header.is_wide() {
            Ok(Frame::from_raw(shape, samples)?.into())
        } else {
            let narrow = samples.into_iter().map(|v| v as u8).collect();
            Ok(Frame::from_raw(shape, narrow)?.into())
        }
    }
}

/// Append at most `limit` bytes to `buf`; fewer only at end of stream.
fn read_up_to<R: Read>(reader: &mut R, limit: usize, buf: &mut Vec<u8>) -> std::io::Result<()> {
    Read::take(reader, limit as u64).read_to_end(buf)?;
    Ok(())
}
