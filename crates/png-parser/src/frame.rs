//! Single PNG frame decoding.

use std::path::Path;

use image::DynamicImage;
use imager_common::{AnyFrame, Flip, Frame, FrameShape};

use crate::error::{PngError, PngResult};

/// Decode one PNG file into a frame in canonical orientation.
///
/// PNG frames from this instrument family are stored upside down relative to
/// the other formats, so every channel is flipped vertically after decoding.
pub fn read_png_frame(path: &Path) -> PngResult<AnyFrame> {
    let image = image::open(path)?;
    let mut frame = to_frame(image)?;
    frame.flip(Flip::Vertical);
    Ok(frame)
}

fn to_frame(image: DynamicImage) -> PngResult<AnyFrame> {
    let frame: AnyFrame = match image {
        DynamicImage::ImageLuma8(buf) => {
            let shape = FrameShape::mono(buf.width() as usize, buf.height() as usize);
            Frame::from_raw(shape, buf.into_raw())?.into()
        }
        DynamicImage::ImageLuma16(buf) => {
            let shape = FrameShape::mono(buf.width() as usize, buf.height() as usize);
            Frame::from_raw(shape, buf.into_raw())?.into()
        }
        DynamicImage::ImageRgb8(buf) => {
            let shape = FrameShape::rgb(buf.width() as usize, buf.height() as usize);
            Frame::from_raw(shape, buf.into_raw())?.into()
        }
        DynamicImage::ImageRgb16(buf) => {
            let shape = FrameShape::rgb(buf.width() as usize, buf.height() as usize);
            Frame::from_raw(shape, buf.into_raw())?.into()
        }
        other => return Err(PngError::UnsupportedPixelLayout(format!("{:?}", other.color()))),
    };
    Ok(frame)
}
