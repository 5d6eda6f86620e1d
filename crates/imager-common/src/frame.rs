//! Single-exposure pixel frames.

use std::fmt;

use ndarray::ArrayView3;
use serde::{Deserialize, Serialize};

use crate::error::{FrameError, FrameResult};

/// Unsigned pixel sample types the imagers produce.
pub trait Sample: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Sample width in bits.
    const BITS: u8;
}

impl Sample for u8 {
    const BITS: u8 = 8;
}

impl Sample for u16 {
    const BITS: u8 = 16;
}

/// Shape of one frame: channel count and spatial extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameShape {
    pub channels: usize,
    pub width: usize,
    pub height: usize,
}

impl FrameShape {
    pub fn new(channels: usize, width: usize, height: usize) -> FrameResult<Self> {
        match channels {
            1 | 3 => Ok(Self {
                channels,
                width,
                height,
            }),
            other => Err(FrameError::UnsupportedChannels(other)),
        }
    }

    /// Monochrome shape.
    pub fn mono(width: usize, height: usize) -> Self {
        Self {
            channels: 1,
            width,
            height,
        }
    }

    /// Three-channel (RGB) shape.
    pub fn rgb(width: usize, height: usize) -> Self {
        Self {
            channels: 3,
            width,
            height,
        }
    }

    /// Number of samples in one frame.
    pub fn sample_count(&self) -> usize {
        self.channels * self.width * self.height
    }

    /// Number of samples in one stored row.
    pub fn row_len(&self) -> usize {
        self.channels * self.width
    }
}

impl fmt::Display for FrameShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.channels, self.width, self.height)
    }
}

/// Spatial flip applied to a frame or grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flip {
    #[default]
    None,
    /// Mirror left/right (reverse the width axis).
    Horizontal,
    /// Mirror top/bottom (reverse the height axis).
    Vertical,
    Both,
}

impl Flip {
    pub fn flips_horizontal(self) -> bool {
        matches!(self, Flip::Horizontal | Flip::Both)
    }

    pub fn flips_vertical(self) -> bool {
        matches!(self, Flip::Vertical | Flip::Both)
    }
}

/// One exposure worth of pixels.
///
/// Samples are kept row-major as `(height, width, channels)`; [`Frame::view`]
/// presents them as `(channels, width, height)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<T> {
    shape: FrameShape,
    data: Vec<T>,
}

impl<T: Sample> Frame<T> {
    pub fn from_raw(shape: FrameShape, data: Vec<T>) -> FrameResult<Self> {
        let expected = shape.sample_count();
        if data.len() != expected {
            return Err(FrameError::LengthMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Zero-filled frame.
    pub fn zeros(shape: FrameShape) -> Self {
        Self {
            shape,
            data: vec![T::default(); shape.sample_count()],
        }
    }

    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<T> {
        self.data
    }

    /// Sample at `(channel, x, y)`.
    pub fn get(&self, channel: usize, x: usize, y: usize) -> Option<T> {
        if channel >= self.shape.channels || x >= self.shape.width || y >= self.shape.height {
            return None;
        }
        self.data
            .get((y * self.shape.width + x) * self.shape.channels + channel)
            .copied()
    }

    /// View with axes `(channels, width, height)`.
    pub fn view(&self) -> FrameResult<ArrayView3<'_, T>> {
        raw_view(self.shape, &self.data)
    }

    /// Flip the frame in place.
    pub fn flip(&mut self, flip: Flip) {
        flip_samples(self.shape, &mut self.data, flip);
    }
}

pub(crate) fn raw_view<T>(shape: FrameShape, data: &[T]) -> FrameResult<ArrayView3<'_, T>> {
    ArrayView3::from_shape((shape.height, shape.width, shape.channels), data)
        .map(|view| view.reversed_axes())
        .map_err(|_| FrameError::LengthMismatch {
            shape,
            expected: shape.sample_count(),
            actual: data.len(),
        })
}

/// Flip a row-major `(height, width, channels)` sample buffer in place.
pub fn flip_samples<T>(shape: FrameShape, data: &mut [T], flip: Flip) {
    let row_len = shape.row_len();
    if row_len == 0 || shape.height == 0 {
        return;
    }

    if flip.flips_vertical() {
        for y in 0..shape.height / 2 {
            let mirror = shape.height - 1 - y;
            let (top, bottom) = data.split_at_mut(mirror * row_len);
            top[y * row_len..(y + 1) * row_len].swap_with_slice(&mut bottom[..row_len]);
        }
    }

    if flip.flips_horizontal() {
        let channels = shape.channels;
        for row in data.chunks_exact_mut(row_len) {
            for x in 0..shape.width / 2 {
                let mirror = shape.width - 1 - x;
                for c in 0..channels {
                    row.swap(x * channels + c, mirror * channels + c);
                }
            }
        }
    }
}

/// A frame of either sample width.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyFrame {
    U8(Frame<u8>),
    U16(Frame<u16>),
}

impl AnyFrame {
    pub fn shape(&self) -> FrameShape {
        match self {
            AnyFrame::U8(f) => f.shape(),
            AnyFrame::U16(f) => f.shape(),
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            AnyFrame::U8(_) => <u8 as Sample>::BITS,
            AnyFrame::U16(_) => <u16 as Sample>::BITS,
        }
    }

    pub fn flip(&mut self, flip: Flip) {
        match self {
            AnyFrame::U8(f) => f.flip(flip),
            AnyFrame::U16(f) => f.flip(flip),
        }
    }
}

impl From<Frame<u8>> for AnyFrame {
    fn from(frame: Frame<u8>) -> Self {
        AnyFrame::U8(frame)
    }
}

impl From<Frame<u16>> for AnyFrame {
    fn from(frame: Frame<u16>) -> Self {
        AnyFrame::U16(frame)
    }
}
