//! Import of source volumes from a DICOM series.
//!
//! Slices keep their stored sample type (8-bit, signed or unsigned 16-bit),
//! so an imported volume still needs the cast to double before it can be
//! enhanced. Slices are stacked along the normal of the image plane given by
//! ImageOrientationPatient; InstanceNumber and then the file name are used
//! when positions are missing.

use std::fs;
use std::path::{Path, PathBuf};

use dicom::object::{DefaultDicomObject, Tag, open_file};
use dicom::pixeldata::{
    ConvertOptions, ModalityLutOption, PixelDecoder, PixelRepresentation, VoiLutOption,
};
use dicom_dictionary_std::tags;
use ndarray::{Array2, Array3, ArrayView2, Axis, s};
use rayon::prelude::*;
use thiserror::Error;

use crate::enums::ScalarType;
use crate::volume::{Volume, VoxelData};

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("No DICOM slices found in '{}'", .0.display())]
    NoSlices(PathBuf),

    #[error("Slice {index} is {found:?} pixels, expected {expected:?}")]
    SliceShape {
        index: usize,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Slice {index} stores {found} samples, expected {expected}")]
    MixedScalarTypes {
        index: usize,
        expected: ScalarType,
        found: ScalarType,
    },

    #[error(
        "'{}' has unsupported pixel data ({bits_allocated} bits allocated, \
         {samples_per_pixel} samples per pixel, signed: {signed})",
        .path.display()
    )]
    UnsupportedPixelFormat {
        path: PathBuf,
        bits_allocated: u16,
        samples_per_pixel: u16,
        signed: bool,
    },

    #[error("Failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: dicom::object::ReadError,
    },

    #[error("Failed to decode pixel data of '{}': {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: dicom::pixeldata::Error,
    },

    #[error("Slices could not be stacked: {0}")]
    Stack(#[from] ndarray::ShapeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Name given to imported volumes without a series description.
const DEFAULT_VOLUME_NAME: &str = "Volume";

/// Normal of an axial slice, used when ImageOrientationPatient is missing.
const AXIAL_NORMAL: [f64; 3] = [0.0, 0.0, 1.0];

#[derive(Debug)]
enum SliceSamples {
    U8(Array2<u8>),
    I16(Array2<i16>),
    U16(Array2<u16>),
}

impl SliceSamples {
    fn dim(&self) -> (usize, usize) {
        match self {
            SliceSamples::U8(samples) => samples.dim(),
            SliceSamples::I16(samples) => samples.dim(),
            SliceSamples::U16(samples) => samples.dim(),
        }
    }

    fn scalar_type(&self) -> ScalarType {
        match self {
            SliceSamples::U8(_) => ScalarType::U8,
            SliceSamples::I16(_) => ScalarType::I16,
            SliceSamples::U16(_) => ScalarType::U16,
        }
    }
}

/// One decoded file of the series with the attributes needed to place it.
#[derive(Debug)]
struct Slice {
    file_name: PathBuf,
    samples: SliceSamples,
    position: Option<[f64; 3]>,
    orientation: Option<[f64; 6]>,
    instance_number: Option<i32>,
    /// PixelSpacing as stored: (row spacing, column spacing).
    pixel_spacing: Option<(f64, f64)>,
    thickness: Option<f64>,
    description: Option<String>,
}

/// How the slices of a series ended up ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SliceOrder {
    Position,
    InstanceNumber,
    FileName,
}

pub struct VolumeLoader;

impl VolumeLoader {
    /// Load every `.dcm` file of a directory as one volume.
    pub fn load_from_directory(path: impl AsRef<Path>) -> Result<Volume, VolumeLoaderError> {
        let path = path.as_ref();
        let mut paths: Vec<_> = fs::read_dir(path)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(VolumeLoaderError::NoSlices(path.to_path_buf()));
        }
        paths.sort();
        Self::load_from_file_paths(&paths)
    }

    /// Load the given files as the slices of one volume. Files are decoded
    /// in parallel.
    pub fn load_from_file_paths(paths: &[PathBuf]) -> Result<Volume, VolumeLoaderError> {
        let mut slices = paths
            .par_iter()
            .map(|path| Self::read_slice(path))
            .collect::<Result<Vec<_>, _>>()?;
        if slices.is_empty() {
            return Err(VolumeLoaderError::NoSlices(PathBuf::new()));
        }

        let order = Self::order_slices(&mut slices);
        let voxels = Self::stack_slices(&slices)?;
        let spacing = Self::spacing(&slices);
        let origin = slices[0].position.map_or((0.0, 0.0, 0.0), |[x, y, z]| (x, y, z));
        let name = slices
            .iter()
            .find_map(|slice| slice.description.clone())
            .unwrap_or_else(|| DEFAULT_VOLUME_NAME.to_string());

        tracing::debug!(
            %name,
            dim = ?voxels.dim(),
            scalar_type = %voxels.scalar_type(),
            ?spacing,
            ?order,
            "DICOM series loaded"
        );
        Ok(Volume::new(name, voxels, spacing, origin))
    }

    fn read_slice(path: &Path) -> Result<Slice, VolumeLoaderError> {
        let object = open_file(path).map_err(|source| VolumeLoaderError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let decode_error = |source: dicom::pixeldata::Error| VolumeLoaderError::Decode {
            path: path.to_path_buf(),
            source,
        };
        let decoded = object.decode_pixel_data().map_err(decode_error)?;

        // Raw stored values; no rescale and no windowing.
        let options = ConvertOptions::new()
            .with_modality_lut(ModalityLutOption::None)
            .with_voi_lut(VoiLutOption::Identity);
        let signed = decoded.pixel_representation() == PixelRepresentation::Signed;
        let samples = match (decoded.bits_allocated(), signed, decoded.samples_per_pixel()) {
            (8, false, 1) => SliceSamples::U8(
                decoded
                    .to_ndarray_with_options::<u8>(&options)
                    .map_err(decode_error)?
                    .slice_move(s![0, .., .., 0]),
            ),
            (16, true, 1) => SliceSamples::I16(
                decoded
                    .to_ndarray_with_options::<i16>(&options)
                    .map_err(decode_error)?
                    .slice_move(s![0, .., .., 0]),
            ),
            (16, false, 1) => SliceSamples::U16(
                decoded
                    .to_ndarray_with_options::<u16>(&options)
                    .map_err(decode_error)?
                    .slice_move(s![0, .., .., 0]),
            ),
            (bits_allocated, signed, samples_per_pixel) => {
                return Err(VolumeLoaderError::UnsupportedPixelFormat {
                    path: path.to_path_buf(),
                    bits_allocated,
                    samples_per_pixel,
                    signed,
                });
            }
        };

        Ok(Slice {
            file_name: path.file_name().map(PathBuf::from).unwrap_or_default(),
            samples,
            position: floats(&object, tags::IMAGE_POSITION_PATIENT)
                .and_then(|values| match values.as_slice() {
                    [x, y, z, ..] => Some([*x, *y, *z]),
                    _ => None,
                }),
            orientation: floats(&object, tags::IMAGE_ORIENTATION_PATIENT)
                .and_then(|values| <[f64; 6]>::try_from(values.get(..6)?).ok()),
            instance_number: object
                .element(tags::INSTANCE_NUMBER)
                .ok()
                .and_then(|element| element.to_int::<i32>().ok()),
            pixel_spacing: floats(&object, tags::PIXEL_SPACING).and_then(|values| {
                match values.as_slice() {
                    [row, column, ..] => Some((*row, *column)),
                    _ => None,
                }
            }),
            thickness: floats(&object, tags::SLICE_THICKNESS)
                .and_then(|values| values.first().copied()),
            description: object
                .element(tags::SERIES_DESCRIPTION)
                .ok()
                .and_then(|element| element.to_str().ok())
                .map(|description| description.trim().to_string())
                .filter(|description| !description.is_empty()),
        })
    }

    fn slice_normal(slices: &[Slice]) -> [f64; 3] {
        slices
            .iter()
            .find_map(|slice| slice.orientation)
            .and_then(|orientation| normal_of(&orientation))
            .unwrap_or(AXIAL_NORMAL)
    }

    fn order_slices(slices: &mut [Slice]) -> SliceOrder {
        if slices.iter().all(|slice| slice.position.is_some()) {
            let normal = Self::slice_normal(slices);
            let distance = |slice: &Slice| slice.position.map_or(0.0, |p| dot(&p, &normal));
            slices.sort_by(|a, b| distance(a).total_cmp(&distance(b)));
            SliceOrder::Position
        } else if slices.iter().all(|slice| slice.instance_number.is_some()) {
            slices.sort_by_key(|slice| slice.instance_number);
            SliceOrder::InstanceNumber
        } else {
            tracing::warn!("slices lack position and instance number, ordering by file name");
            slices.sort_by(|a, b| a.file_name.cmp(&b.file_name));
            SliceOrder::FileName
        }
    }

    fn stack_slices(slices: &[Slice]) -> Result<VoxelData, VolumeLoaderError> {
        let Some(first) = slices.first() else {
            return Err(VolumeLoaderError::NoSlices(PathBuf::new()));
        };
        let expected_dim = first.samples.dim();
        let expected_type = first.samples.scalar_type();
        for (index, slice) in slices.iter().enumerate() {
            let found = slice.samples.dim();
            if found != expected_dim {
                return Err(VolumeLoaderError::SliceShape {
                    index,
                    expected: expected_dim,
                    found,
                });
            }
            let found = slice.samples.scalar_type();
            if found != expected_type {
                return Err(VolumeLoaderError::MixedScalarTypes {
                    index,
                    expected: expected_type,
                    found,
                });
            }
        }

        let samples = slices.iter().map(|slice| &slice.samples);
        Ok(match first.samples {
            SliceSamples::U8(_) => VoxelData::U8(stack(samples.filter_map(|samples| match samples {
                SliceSamples::U8(frame) => Some(frame.view()),
                _ => None,
            }))?),
            SliceSamples::I16(_) => VoxelData::I16(stack(samples.filter_map(|samples| match samples {
                SliceSamples::I16(frame) => Some(frame.view()),
                _ => None,
            }))?),
            SliceSamples::U16(_) => VoxelData::U16(stack(samples.filter_map(|samples| match samples {
                SliceSamples::U16(frame) => Some(frame.view()),
                _ => None,
            }))?),
        })
    }

    /// Volume spacing in (x, y, z). PixelSpacing lists the row spacing (y)
    /// first. Slice spacing comes from the distance between the first two
    /// positions, then SliceThickness.
    fn spacing(slices: &[Slice]) -> (f64, f64, f64) {
        let (row, column) = slices
            .iter()
            .find_map(|slice| slice.pixel_spacing)
            .unwrap_or_else(|| {
                tracing::warn!("series has no pixel spacing, assuming 1 mm");
                (1.0, 1.0)
            });

        let normal = Self::slice_normal(slices);
        let between_positions = match slices {
            [first, second, ..] => first
                .position
                .zip(second.position)
                .map(|(a, b)| (dot(&b, &normal) - dot(&a, &normal)).abs())
                .filter(|distance| distance.is_finite() && *distance > 0.0),
            _ => None,
        };
        let slice_spacing = between_positions
            .or_else(|| {
                slices
                    .iter()
                    .find_map(|slice| slice.thickness)
                    .filter(|thickness| *thickness > 0.0)
            })
            .unwrap_or(1.0);

        (column, row, slice_spacing)
    }
}

fn floats(object: &DefaultDicomObject, tag: Tag) -> Option<Vec<f64>> {
    object.element(tag).ok()?.to_multi_float64().ok()
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Unit normal of the plane spanned by the row and column direction
/// cosines, or `None` if they are parallel.
fn normal_of(orientation: &[f64; 6]) -> Option<[f64; 3]> {
    let [rx, ry, rz, cx, cy, cz] = *orientation;
    let normal = [ry * cz - rz * cy, rz * cx - rx * cz, rx * cy - ry * cx];
    let length = dot(&normal, &normal).sqrt();
    (length > f64::EPSILON).then(|| normal.map(|v| v / length))
}

fn stack<'a, T: Clone + 'a>(
    frames: impl Iterator<Item = ArrayView2<'a, T>>,
) -> Result<Array3<T>, VolumeLoaderError> {
    let frames: Vec<_> = frames.collect();
    Ok(ndarray::stack(Axis(0), &frames)?)
}
