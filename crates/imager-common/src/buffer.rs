//! Growable frame store.
//!
//! Decoders don't know how many frames a batch holds until every file has
//! been opened, so frames land in an [`AccumulationBuffer`] that grows
//! occasionally instead of once per frame. Shape is fixed at creation and kept
//! next to the capacity, so appending never reshapes anything.

use ndarray::{Array4, ArrayView3, ArrayView4};

use crate::error::{FrameError, FrameResult};
use crate::frame::{flip_samples, raw_view, AnyFrame, Flip, Frame, FrameShape, Sample};
use crate::metadata::FrameMetadata;

/// Frames added per growth step when frames arrive one at a time from a PGM stream.
pub const PGM_CHUNK_FRAMES: usize = 20;

/// How the buffer grows when an append would exceed its capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthPolicy {
    /// Add a fixed number of frames.
    Chunked(usize),
    /// Double the capacity.
    Doubling,
}

/// Contiguous frame store with a running count.
///
/// `capacity() >= len()` always holds; [`trim`](Self::trim) cuts the storage
/// back to exactly the frames held.
#[derive(Debug, Clone)]
pub struct AccumulationBuffer<T> {
    shape: FrameShape,
    policy: GrowthPolicy,
    data: Vec<T>,
    capacity: usize,
    count: usize,
    metadata: Vec<FrameMetadata>,
}

impl<T: Sample> AccumulationBuffer<T> {
    pub fn new(shape: FrameShape, policy: GrowthPolicy) -> Self {
        Self {
            shape,
            policy,
            data: Vec::new(),
            capacity: 0,
            count: 0,
            metadata: Vec::new(),
        }
    }

    pub fn with_capacity(shape: FrameShape, policy: GrowthPolicy, capacity: usize) -> Self {
        let mut buffer = Self::new(shape, policy);
        buffer.reserve(capacity);
        buffer
    }

    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    pub fn policy(&self) -> GrowthPolicy {
        self.policy
    }

    /// Number of frames held.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of frames the storage can hold without growing.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn metadata(&self) -> &[FrameMetadata] {
        &self.metadata
    }

    /// Make room for at least `capacity` frames. Never shrinks.
    pub fn reserve(&mut self, capacity: usize) {
        if capacity > self.capacity {
            self.resize_storage(capacity);
        }
    }

    fn resize_storage(&mut self, capacity: usize) {
        self.data
            .resize(capacity * self.shape.sample_count(), T::default());
        self.capacity = capacity;
    }

    fn grow(&mut self) {
        let next = match self.policy {
            GrowthPolicy::Chunked(step) => self.capacity + step.max(1),
            GrowthPolicy::Doubling => (self.capacity * 2).max(1),
        };
        self.resize_storage(next);
    }

    /// Append one frame and, optionally, its metadata.
    ///
    /// Metadata is all-or-nothing: once a frame has been appended without
    /// metadata, later records are rejected, and vice versa.
    pub fn append(&mut self, frame: &Frame<T>, metadata: Option<FrameMetadata>) -> FrameResult<()> {
        if frame.shape() != self.shape {
            return Err(FrameError::ShapeMismatch {
                expected: self.shape,
                actual: frame.shape(),
            });
        }
        self.append_samples(frame.as_slice(), metadata)
    }

    /// Append one frame given as raw row-major samples.
    pub fn append_samples(
        &mut self,
        samples: &[T],
        metadata: Option<FrameMetadata>,
    ) -> FrameResult<()> {
        let frame_len = self.shape.sample_count();
        if samples.len() != frame_len {
            return Err(FrameError::LengthMismatch {
                shape: self.shape,
                expected: frame_len,
                actual: samples.len(),
            });
        }
        self.check_metadata_alignment(metadata.is_some())?;

        if self.count == self.capacity {
            self.grow();
        }
        let start = self.count * frame_len;
        self.data[start..start + frame_len].copy_from_slice(samples);
        self.count += 1;
        if let Some(meta) = metadata {
            self.metadata.push(meta);
        }
        Ok(())
    }

    fn check_metadata_alignment(&self, has_metadata: bool) -> FrameResult<()> {
        let expected = if has_metadata { self.count } else { 0 };
        if self.metadata.len() != expected {
            return Err(FrameError::MetadataMisaligned {
                frames: self.count + 1,
                metadata: self.metadata.len() + usize::from(has_metadata),
            });
        }
        Ok(())
    }

    /// Append every frame (and metadata record) held by `other`.
    pub fn extend_from(&mut self, other: &AccumulationBuffer<T>) -> FrameResult<()> {
        if other.shape != self.shape {
            return Err(FrameError::ShapeMismatch {
                expected: self.shape,
                actual: other.shape,
            });
        }
        if other.count == 0 {
            return Ok(());
        }
        let with_metadata = !other.metadata.is_empty();
        let expected = if with_metadata { self.count } else { 0 };
        if (with_metadata && other.metadata.len() != other.count)
            || self.metadata.len() != expected
        {
            return Err(FrameError::MetadataMisaligned {
                frames: self.count + other.count,
                metadata: self.metadata.len() + other.metadata.len(),
            });
        }

        let needed = self.count + other.count;
        while self.capacity < needed {
            self.grow();
        }
        let frame_len = self.shape.sample_count();
        let start = self.count * frame_len;
        let len = other.count * frame_len;
        self.data[start..start + len].copy_from_slice(&other.data[..len]);
        self.count = needed;
        self.metadata.extend(other.metadata.iter().cloned());
        Ok(())
    }

    /// Keep the first `count` frames and drop spare capacity.
    ///
    /// A `count` larger than [`len`](Self::len) is clamped. Appending after a
    /// trim grows the storage again without touching existing frames.
    pub fn trim(&mut self, count: usize) {
        let count = count.min(self.count);
        self.count = count;
        self.metadata.truncate(count);
        self.resize_storage(count);
        self.data.shrink_to_fit();
    }

    /// Samples of frame `index`, row-major.
    pub fn frame_samples(&self, index: usize) -> Option<&[T]> {
        if index >= self.count {
            return None;
        }
        let frame_len = self.shape.sample_count();
        Some(&self.data[index * frame_len..(index + 1) * frame_len])
    }

    /// View of frame `index` with axes `(channels, width, height)`.
    pub fn frame(&self, index: usize) -> Option<ArrayView3<'_, T>> {
        self.frame_samples(index)
            .and_then(|samples| raw_view(self.shape, samples).ok())
    }

    /// View of the held frames with axes `(channels, width, height, frames)`.
    pub fn view(&self) -> FrameResult<ArrayView4<'_, T>> {
        let len = self.count * self.shape.sample_count();
        let samples = self.data.get(..len).unwrap_or(&[]);
        ArrayView4::from_shape(
            (self.count, self.shape.height, self.shape.width, self.shape.channels),
            samples,
        )
        .map(|view| view.reversed_axes())
        .map_err(|_| self.storage_mismatch(samples.len()))
    }

    fn storage_mismatch(&self, actual: usize) -> FrameError {
        FrameError::LengthMismatch {
            shape: self.shape,
            expected: self.count * self.shape.sample_count(),
            actual,
        }
    }

    /// Flip every held frame in place.
    pub fn flip_all(&mut self, flip: Flip) {
        if flip == Flip::None {
            return;
        }
        let frame_len = self.shape.sample_count();
        if frame_len == 0 {
            return;
        }
        let len = self.count * frame_len;
        for frame in self.data[..len].chunks_exact_mut(frame_len) {
            flip_samples(self.shape, frame, flip);
        }
    }

    /// Trim and hand back the cube `(channels, width, height, frames)` plus metadata.
    pub fn into_parts(mut self) -> FrameResult<(Array4<T>, Vec<FrameMetadata>)> {
        let count = self.count;
        self.trim(count);
        let shape = self.shape;
        let mismatch = self.storage_mismatch(self.data.len());
        let cube = Array4::from_shape_vec(
            (count, shape.height, shape.width, shape.channels),
            self.data,
        )
        .map_err(|_| mismatch)?
        .reversed_axes();
        Ok((cube, self.metadata))
    }
}

/// An accumulation buffer of either sample width.
#[derive(Debug, Clone)]
pub enum FrameBuffer {
    U8(AccumulationBuffer<u8>),
    U16(AccumulationBuffer<u16>),
}

impl FrameBuffer {
    /// Empty buffer sized for frames shaped like `frame`.
    pub fn for_frame(frame: &AnyFrame, policy: GrowthPolicy) -> Self {
        match frame {
            AnyFrame::U8(f) => FrameBuffer::U8(AccumulationBuffer::new(f.shape(), policy)),
            AnyFrame::U16(f) => FrameBuffer::U16(AccumulationBuffer::new(f.shape(), policy)),
        }
    }

    /// Empty buffer with the same shape and depth as `other`.
    pub fn like(other: &FrameBuffer, policy: GrowthPolicy) -> Self {
        match other {
            FrameBuffer::U8(b) => FrameBuffer::U8(AccumulationBuffer::new(b.shape(), policy)),
            FrameBuffer::U16(b) => FrameBuffer::U16(AccumulationBuffer::new(b.shape(), policy)),
        }
    }

    pub fn shape(&self) -> FrameShape {
        match self {
            FrameBuffer::U8(b) => b.shape(),
            FrameBuffer::U16(b) => b.shape(),
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            FrameBuffer::U8(_) => <u8 as Sample>::BITS,
            FrameBuffer::U16(_) => <u16 as Sample>::BITS,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FrameBuffer::U8(b) => b.len(),
            FrameBuffer::U16(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        match self {
            FrameBuffer::U8(b) => b.capacity(),
            FrameBuffer::U16(b) => b.capacity(),
        }
    }

    pub fn metadata(&self) -> &[FrameMetadata] {
        match self {
            FrameBuffer::U8(b) => b.metadata(),
            FrameBuffer::U16(b) => b.metadata(),
        }
    }

    pub fn reserve(&mut self, capacity: usize) {
        match self {
            FrameBuffer::U8(b) => b.reserve(capacity),
            FrameBuffer::U16(b) => b.reserve(capacity),
        }
    }

    pub fn append(&mut self, frame: &AnyFrame, metadata: Option<FrameMetadata>) -> FrameResult<()> {
        match (self, frame) {
            (FrameBuffer::U8(b), AnyFrame::U8(f)) => b.append(f, metadata),
            (FrameBuffer::U16(b), AnyFrame::U16(f)) => b.append(f, metadata),
            (buffer, frame) => Err(FrameError::DepthMismatch {
                expected: buffer.bits(),
                actual: frame.bits(),
            }),
        }
    }

    pub fn extend_from(&mut self, other: &FrameBuffer) -> FrameResult<()> {
        match (self, other) {
            (FrameBuffer::U8(a), FrameBuffer::U8(b)) => a.extend_from(b),
            (FrameBuffer::U16(a), FrameBuffer::U16(b)) => a.extend_from(b),
            (a, b) => Err(FrameError::DepthMismatch {
                expected: a.bits(),
                actual: b.bits(),
            }),
        }
    }

    pub fn trim(&mut self, count: usize) {
        match self {
            FrameBuffer::U8(b) => b.trim(count),
            FrameBuffer::U16(b) => b.trim(count),
        }
    }

    pub fn flip_all(&mut self, flip: Flip) {
        match self {
            FrameBuffer::U8(b) => b.flip_all(flip),
            FrameBuffer::U16(b) => b.flip_all(flip),
        }
    }

    pub fn into_parts(self) -> FrameResult<(PixelCube, Vec<FrameMetadata>)> {
        match self {
            FrameBuffer::U8(b) => {
                let (cube, meta) = b.into_parts()?;
                Ok((PixelCube::U8(cube), meta))
            }
            FrameBuffer::U16(b) => {
                let (cube, meta) = b.into_parts()?;
                Ok((PixelCube::U16(cube), meta))
            }
        }
    }
}

/// Final image cube with axes `(channels, width, height, frames)`.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelCube {
    U8(Array4<u8>),
    U16(Array4<u16>),
}

impl PixelCube {
    /// `[channels, width, height, frames]`
    pub fn shape(&self) -> [usize; 4] {
        let dims = match self {
            PixelCube::U8(a) => a.shape(),
            PixelCube::U16(a) => a.shape(),
        };
        [dims[0], dims[1], dims[2], dims[3]]
    }

    pub fn frame_count(&self) -> usize {
        self.shape()[3]
    }

    pub fn bits(&self) -> u8 {
        match self {
            PixelCube::U8(_) => <u8 as Sample>::BITS,
            PixelCube::U16(_) => <u16 as Sample>::BITS,
        }
    }

    pub fn as_u8(&self) -> Option<&Array4<u8>> {
        match self {
            PixelCube::U8(a) => Some(a),
            PixelCube::U16(_) => None,
        }
    }

    pub fn as_u16(&self) -> Option<&Array4<u16>> {
        match self {
            PixelCube::U16(a) => Some(a),
            PixelCube::U8(_) => None,
        }
    }
}
