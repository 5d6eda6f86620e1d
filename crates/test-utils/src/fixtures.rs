//! Fixture writers for the three container formats.
//!
//! Everything is generated at test time into a caller-provided directory
//! (normally a [`temp_test_dir`](crate::temp_test_dir)), so no binary test
//! data lives in the repository.

use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use flate2::write::GzEncoder;
use flate2::Compression;
use hdf5::types::VarLenUnicode;
use image::{DynamicImage, ImageBuffer, ImageOutputFormat, Luma, Rgb};
use ndarray::{Array, Array1, Dimension};

use crate::generators::{create_pgm_frame, create_test_frame_u16, png_member_name, themis_comments};

/// Writes `bytes` to `path`, gzip-compressing when the name ends in `.gz`.
pub fn write_pgm_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let file = File::create(path)?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        let mut encoder = GzEncoder::new(file, Compression::fast());
        encoder.write_all(bytes)?;
        encoder.finish()?;
    } else {
        let mut file = file;
        file.write_all(bytes)?;
    }
    Ok(())
}

/// Writes a THEMIS-style multi-frame 16-bit PGM file (`maxval` 65535).
///
/// Frame `i` starts `i` seconds after 06:00:00 and its pixels are
/// `create_test_frame_u16(width, height, 65535, i)`.
pub fn write_themis_pgm(
    dir: &Path,
    name: &str,
    frames: usize,
    width: usize,
    height: usize,
    site: &str,
    imager: &str,
) -> std::io::Result<PathBuf> {
    let mut bytes = Vec::new();
    for i in 0..frames {
        let start = format!("2014-03-10 06:00:{:02}.000", i % 60);
        let comments = themis_comments(site, imager, &start, 1000);
        let samples = create_test_frame_u16(width, height, u16::MAX, i as u16);
        bytes.extend(create_pgm_frame(true, width, height, u16::MAX, &comments, &samples));
    }
    let path = dir.join(name);
    write_pgm_file(&path, &bytes)?;
    Ok(path)
}

/// Pixel content for one PNG fixture.
#[derive(Debug, Clone)]
pub enum PngPixels {
    Gray8(Vec<u8>),
    Gray16(Vec<u16>),
    Rgb8(Vec<u8>),
    Rgb16(Vec<u16>),
}

/// Encodes a PNG image in memory.
pub fn encode_png(width: u32, height: u32, pixels: PngPixels) -> Vec<u8> {
    let image = match pixels {
        PngPixels::Gray8(data) => DynamicImage::ImageLuma8(
            ImageBuffer::<Luma<u8>, _>::from_raw(width, height, data).expect("gray8 buffer size"),
        ),
        PngPixels::Gray16(data) => DynamicImage::ImageLuma16(
            ImageBuffer::<Luma<u16>, _>::from_raw(width, height, data).expect("gray16 buffer size"),
        ),
        PngPixels::Rgb8(data) => DynamicImage::ImageRgb8(
            ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, data).expect("rgb8 buffer size"),
        ),
        PngPixels::Rgb16(data) => DynamicImage::ImageRgb16(
            ImageBuffer::<Rgb<u16>, _>::from_raw(width, height, data).expect("rgb16 buffer size"),
        ),
    };
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .expect("PNG encoding to memory");
    bytes
}

/// Writes a tar archive holding `members` in the given order.
pub fn write_tar(path: &Path, members: &[(String, Vec<u8>)]) -> std::io::Result<()> {
    let mut builder = tar::Builder::new(File::create(path)?);
    for (name, bytes) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, bytes.as_slice())?;
    }
    builder.into_inner()?.flush()
}

/// Writes a `.png.tar` of `frames` 8-bit RGB frames taken one second apart
/// from 06:00:00, with the members stored in reverse lexicographic order.
///
/// Returns the archive path and the member names sorted ascending.
pub fn write_rgb_png_tar(
    dir: &Path,
    name: &str,
    frames: usize,
    width: u32,
    height: u32,
) -> std::io::Result<(PathBuf, Vec<String>)> {
    let mut members: Vec<(String, Vec<u8>)> = (0..frames)
        .map(|i| {
            let member = png_member_name(
                "20210101",
                &format!("0600{:02}", i % 60),
                (i * 3 % 1000) as u32,
                "gill",
                "rgb-04",
                3000,
                "full",
            );
            let pixels: Vec<u8> = (0..(width * height * 3) as usize)
                .map(|p| ((p + i) % 256) as u8)
                .collect();
            (member, encode_png(width, height, PngPixels::Rgb8(pixels)))
        })
        .collect();

    let mut sorted: Vec<String> = members.iter().map(|(n, _)| n.clone()).collect();
    sorted.sort();
    members.reverse();

    let path = dir.join(name);
    write_tar(&path, &members)?;
    Ok((path, sorted))
}

/// Attribute value written into HDF5 fixtures.
#[derive(Debug, Clone)]
pub enum FixtureAttr {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for FixtureAttr {
    fn from(v: i64) -> Self {
        FixtureAttr::Int(v)
    }
}

impl From<f64> for FixtureAttr {
    fn from(v: f64) -> Self {
        FixtureAttr::Float(v)
    }
}

impl From<&str> for FixtureAttr {
    fn from(v: &str) -> Self {
        FixtureAttr::Text(v.to_string())
    }
}

/// Layout of an imager HDF5 cube.
#[derive(Debug, Clone, Default)]
pub struct Hdf5Cube {
    /// One timestamp per frame for `/data/timestamp`
    pub timestamps: Vec<String>,
    /// Attributes on `/metadata/file`
    pub file_attrs: Vec<(String, FixtureAttr)>,
    /// Attributes on `/metadata/frame/frame{N}`
    pub frame_attrs: Vec<Vec<(String, FixtureAttr)>>,
}

impl Hdf5Cube {
    /// Cube metadata in the layout written by the TREx/RGB pipeline.
    pub fn standard(site: &str, frames: usize) -> Self {
        let timestamps = (0..frames)
            .map(|i| format!("2021-01-01 06:00:{:02}.000000 UTC", i * 3 % 60))
            .collect();
        let file_attrs = vec![
            ("site_unique_id".to_string(), FixtureAttr::from(site)),
            ("imager_unique_id".to_string(), FixtureAttr::from("rgb-04")),
            ("geographic_latitude".to_string(), FixtureAttr::from(56.3494)),
            ("geographic_longitude".to_string(), FixtureAttr::from(-94.7078)),
            ("project_unique_id".to_string(), FixtureAttr::from("trex")),
        ];
        let frame_attrs = (0..frames)
            .map(|i| {
                vec![
                    ("exposure_length_requested_ms".to_string(), FixtureAttr::from(3000.0)),
                    ("exposure_length_actual_ms".to_string(), FixtureAttr::from(2999.5)),
                    ("ccd_temperature".to_string(), FixtureAttr::from(-10.0 - i as f64)),
                    ("frame_number".to_string(), FixtureAttr::from(i as i64)),
                ]
            })
            .collect();
        Hdf5Cube {
            timestamps,
            file_attrs,
            frame_attrs,
        }
    }
}

/// Writes `images` to `/data/images` plus the groups described by `cube`.
///
/// `images` is stored as given, i.e. `(frames, height, width[, channels])`.
pub fn write_hdf5_cube<T, D>(path: &Path, images: &Array<T, D>, cube: &Hdf5Cube) -> hdf5::Result<()>
where
    T: hdf5::H5Type,
    D: Dimension,
{
    let file = hdf5::File::create(path)?;
    let data = file.create_group("data")?;
    data.new_dataset_builder().with_data(images).create("images")?;

    let stamps = cube
        .timestamps
        .iter()
        .map(|s| to_var_len_unicode(s))
        .collect::<hdf5::Result<Vec<_>>>()?;
    data.new_dataset_builder()
        .with_data(&Array1::from(stamps))
        .create("timestamp")?;

    let metadata = file.create_group("metadata")?;
    let file_group = metadata.create_group("file")?;
    write_attrs(&file_group, &cube.file_attrs)?;

    let frame_root = metadata.create_group("frame")?;
    for (i, attrs) in cube.frame_attrs.iter().enumerate() {
        let group = frame_root.create_group(&format!("frame{}", i))?;
        write_attrs(&group, attrs)?;
    }
    Ok(())
}

fn write_attrs(group: &hdf5::Group, attrs: &[(String, FixtureAttr)]) -> hdf5::Result<()> {
    for (name, value) in attrs {
        match value {
            FixtureAttr::Int(v) => group.new_attr::<i64>().create(name.as_str())?.write_scalar(v)?,
            FixtureAttr::Float(v) => group.new_attr::<f64>().create(name.as_str())?.write_scalar(v)?,
            FixtureAttr::Text(v) => group
                .new_attr::<VarLenUnicode>()
                .create(name.as_str())?
                .write_scalar(&to_var_len_unicode(v)?)?,
        }
    }
    Ok(())
}

fn to_var_len_unicode(value: &str) -> hdf5::Result<VarLenUnicode> {
    VarLenUnicode::from_str(value).map_err(|e| hdf5::Error::from(format!("invalid utf-8 attribute: {e}")))
}
