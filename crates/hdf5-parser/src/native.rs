//! Low-level HDF5 access: error silencing, attribute walking and cube reads.

use std::collections::BTreeMap;
use std::sync::Once;

use hdf5::types::{FixedAscii, FixedUnicode, IntSize, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Attribute, Container, Dataset, Group, H5Type};
use imager_common::AttrValue;
use ndarray::s;
use tracing::debug;

use crate::error::{Hdf5Error, Hdf5Result};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when probing for optional
/// frame groups that don't exist). This creates confusing log spam like:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Gloc.c line 421 in H5G_loc_find(): object 'frame7' doesn't exist
/// ```
///
/// This function disables that output by calling H5Eset_auto2 with null handlers.
/// It only needs to be called once per process, but is safe to call multiple times.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Sample width of an image dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleWidth {
    U8,
    U16,
}

/// Sample width of `dataset`, which must hold 8- or 16-bit unsigned integers.
pub fn sample_width(dataset: &Dataset) -> Hdf5Result<SampleWidth> {
    match dataset.dtype()?.to_descriptor()? {
        TypeDescriptor::Unsigned(IntSize::U1) => Ok(SampleWidth::U8),
        TypeDescriptor::Unsigned(IntSize::U2) => Ok(SampleWidth::U16),
        other => Err(Hdf5Error::InvalidFormat(format!(
            "image samples must be 8- or 16-bit unsigned, found {:?}",
            other
        ))),
    }
}

/// Read an image cube stored as `(frames, height, width[, channels])`.
///
/// Returns the row-major samples and the dataset shape. With `first_only`,
/// only the first frame is read and the returned shape has one frame.
pub fn read_cube<T: H5Type + Copy>(dataset: &Dataset, first_only: bool) -> Hdf5Result<(Vec<T>, Vec<usize>)> {
    let mut shape = dataset.shape();
    if !(3..=4).contains(&shape.len()) {
        return Err(Hdf5Error::InvalidFormat(format!(
            "image dataset must be 3-D or 4-D, found shape {:?}",
            shape
        )));
    }
    if shape[0] == 0 {
        return Err(Hdf5Error::MissingData("image dataset holds no frames".into()));
    }
    if shape[1..].contains(&0) {
        return Err(Hdf5Error::InvalidFormat(format!(
            "image dataset has an empty frame dimension, shape {:?}",
            shape
        )));
    }

    if !first_only || shape[0] == 1 {
        return Ok((dataset.read_raw::<T>()?, shape));
    }

    let samples = if shape.len() == 3 {
        dataset
            .read_slice::<T, _, ndarray::Ix3>(s![0..1, .., ..])?
            .into_raw_vec_and_offset()
            .0
    } else {
        dataset
            .read_slice::<T, _, ndarray::Ix4>(s![0..1, .., .., ..])?
            .into_raw_vec_and_offset()
            .0
    };
    shape[0] = 1;
    Ok((samples, shape))
}

/// Every attribute of `group` that maps onto an [`AttrValue`].
///
/// Attributes of other types (compound, enum, reference) are skipped.
pub fn read_group_attrs(group: &Group) -> Hdf5Result<BTreeMap<String, AttrValue>> {
    let mut attrs = BTreeMap::new();
    for name in group.attr_names()? {
        let attr = group.attr(&name)?;
        match read_attr_value(&attr)? {
            Some(value) => {
                attrs.insert(name, value);
            }
            None => debug!(group = %group.name(), attribute = %name, "Skipping attribute of unsupported type"),
        }
    }
    Ok(attrs)
}

fn read_attr_value(attr: &Attribute) -> Hdf5Result<Option<AttrValue>> {
    let scalar = attr.is_scalar() || attr.size() == 1;
    let value = match attr.dtype()?.to_descriptor()? {
        TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) => {
            let values = attr.read_raw::<i64>()?;
            match (scalar, values.as_slice()) {
                (true, [v]) => AttrValue::Int(*v),
                _ => AttrValue::IntArray(values),
            }
        }
        TypeDescriptor::Float(_) => {
            let values = attr.read_raw::<f64>()?;
            match (scalar, values.as_slice()) {
                (true, [v]) => AttrValue::Float(*v),
                _ => AttrValue::FloatArray(values),
            }
        }
        TypeDescriptor::VarLenUnicode
        | TypeDescriptor::VarLenAscii
        | TypeDescriptor::FixedUnicode(_)
        | TypeDescriptor::FixedAscii(_) => match read_text(attr)? {
            Some(values) => text_value(values, scalar),
            None => return Ok(None),
        },
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn text_value(values: Vec<String>, scalar: bool) -> AttrValue {
    let mut values: Vec<String> = values
        .into_iter()
        .map(|s| s.trim_end_matches('\0').to_string())
        .collect();
    if scalar && values.len() == 1 {
        AttrValue::Text(values.remove(0))
    } else {
        AttrValue::TextArray(values)
    }
}

/// Longest fixed-length string read without truncation.
const FIXED_TEXT_LEN: usize = 256;

/// Every element of a string-typed container, or `None` for other types.
///
/// HDF5 cannot convert between fixed- and variable-length strings, so each
/// storage kind is read as itself.
fn read_text(container: &Container) -> Hdf5Result<Option<Vec<String>>> {
    let values = match container.dtype()?.to_descriptor()? {
        TypeDescriptor::VarLenUnicode => container
            .read_raw::<VarLenUnicode>()?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        TypeDescriptor::VarLenAscii => container
            .read_raw::<VarLenAscii>()?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        TypeDescriptor::FixedUnicode(_) => container
            .read_raw::<FixedUnicode<FIXED_TEXT_LEN>>()?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        TypeDescriptor::FixedAscii(_) => container
            .read_raw::<FixedAscii<FIXED_TEXT_LEN>>()?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        _ => return Ok(None),
    };
    Ok(Some(values))
}

/// One string per frame from a 1-D string dataset.
pub fn read_strings(dataset: &Dataset) -> Hdf5Result<Vec<String>> {
    read_text(dataset)?.ok_or_else(|| {
        Hdf5Error::InvalidFormat(format!("{} must hold strings", dataset.name()))
    })
}
