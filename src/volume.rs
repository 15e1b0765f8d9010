use crate::enums::{FlipAxis, Orientation, ScalarType};
use crate::interpolator::Interpolator;

use image::{GrayImage, ImageBuffer};
use ndarray::{Array2, Array3, ArrayView2, Zip, s};
use rayon::prelude::*;

/// Voxel buffer in (depth, height, width) order.
#[derive(Debug, Clone, PartialEq)]
pub enum VoxelData {
    U8(Array3<u8>),
    I16(Array3<i16>),
    U16(Array3<u16>),
    F32(Array3<f32>),
    Double(Array3<f64>),
}

fn cast_to_f64<T>(data: &Array3<T>) -> Array3<f64>
where
    T: Copy + Into<f64> + Send + Sync,
{
    Zip::from(data).par_map_collect(|&v| v.into())
}

fn slice_to_f64<T>(data: &Array3<T>, index: usize, orientation: Orientation) -> Array2<f64>
where
    T: Copy + Into<f64>,
{
    let slice = match orientation {
        Orientation::Axial => data.slice(s![index, .., ..]),
        Orientation::Coronal => data.slice(s![.., index, ..]),
        Orientation::Sagittal => data.slice(s![.., .., index]),
    };
    slice.mapv(|v| v.into())
}

impl VoxelData {
    pub fn dim(&self) -> (usize, usize, usize) {
        match self {
            Self::U8(data) => data.dim(),
            Self::I16(data) => data.dim(),
            Self::U16(data) => data.dim(),
            Self::F32(data) => data.dim(),
            Self::Double(data) => data.dim(),
        }
    }

    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Self::U8(_) => ScalarType::U8,
            Self::I16(_) => ScalarType::I16,
            Self::U16(_) => ScalarType::U16,
            Self::F32(_) => ScalarType::F32,
            Self::Double(_) => ScalarType::Double,
        }
    }

    /// Double precision copy of the samples.
    pub fn to_double(&self) -> Array3<f64> {
        match self {
            Self::U8(data) => cast_to_f64(data),
            Self::I16(data) => cast_to_f64(data),
            Self::U16(data) => cast_to_f64(data),
            Self::F32(data) => cast_to_f64(data),
            Self::Double(data) => data.clone(),
        }
    }

    /// Double precision copy mirrored along `axis`, in standard layout.
    pub fn to_double_flipped(&self, axis: FlipAxis) -> Array3<f64> {
        let mut data = self.to_double();
        data.invert_axis(axis.array_axis());
        data.as_standard_layout().into_owned()
    }

    fn slice(&self, index: usize, orientation: Orientation) -> Array2<f64> {
        match self {
            Self::U8(data) => slice_to_f64(data, index, orientation),
            Self::I16(data) => slice_to_f64(data, index, orientation),
            Self::U16(data) => slice_to_f64(data, index, orientation),
            Self::F32(data) => slice_to_f64(data, index, orientation),
            Self::Double(data) => slice_to_f64(data, index, orientation),
        }
    }
}

/// An image volume with its geometry.
///
/// `spacing` and `origin` are in (x, y, z) order while the buffer is indexed
/// (depth, height, width), i.e. (z, y, x). The generation counter increases
/// every time the samples change so viewers can tell stale frames apart.
#[derive(Debug, Clone)]
pub struct Volume {
    name: String,
    data: VoxelData,
    spacing: (f64, f64, f64),
    origin: (f64, f64, f64),
    generation: u64,
}

impl Volume {
    pub fn new(
        name: impl Into<String>,
        data: VoxelData,
        spacing: (f64, f64, f64),
        origin: (f64, f64, f64),
    ) -> Self {
        Self {
            name: name.into(),
            data,
            spacing,
            origin,
            generation: 0,
        }
    }

    /// A zero-filled double precision volume.
    pub fn zeros(
        name: impl Into<String>,
        dim: (usize, usize, usize),
        spacing: (f64, f64, f64),
        origin: (f64, f64, f64),
    ) -> Self {
        Self::new(name, VoxelData::Double(Array3::zeros(dim)), spacing, origin)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn spacing(&self) -> (f64, f64, f64) {
        self.spacing
    }

    pub fn origin(&self) -> (f64, f64, f64) {
        self.origin
    }

    pub fn scalar_type(&self) -> ScalarType {
        self.data.scalar_type()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &VoxelData {
        &self.data
    }

    /// Double precision samples, if that is what the volume holds.
    pub fn samples(&self) -> Option<&Array3<f64>> {
        match &self.data {
            VoxelData::Double(data) => Some(data),
            _ => None,
        }
    }

    /// Mutable double precision samples, for an engine writing its result.
    pub fn samples_mut(&mut self) -> Option<&mut Array3<f64>> {
        match &mut self.data {
            VoxelData::Double(data) => Some(data),
            _ => None,
        }
    }

    /// Swap in a new sample buffer, keeping name and geometry.
    pub fn replace_data(&mut self, data: VoxelData) {
        self.data = data;
        self.mark_modified();
    }

    pub(crate) fn set_geometry(&mut self, spacing: (f64, f64, f64), origin: (f64, f64, f64)) {
        self.spacing = spacing;
        self.origin = origin;
    }

    pub fn mark_modified(&mut self) {
        self.generation += 1;
    }

    /// Physical extent (x, y, z) covered by the volume.
    pub fn extent(&self) -> (f64, f64, f64) {
        let (depth, height, width) = self.dim();
        (
            width as f64 * self.spacing.0,
            height as f64 * self.spacing.1,
            depth as f64 * self.spacing.2,
        )
    }

    pub fn slice_count(&self, orientation: Orientation) -> usize {
        let dim = self.dim();
        match orientation {
            Orientation::Axial => dim.0,
            Orientation::Coronal => dim.1,
            Orientation::Sagittal => dim.2,
        }
    }

    pub fn get_slice_from_axis(
        &self,
        index: usize,
        orientation: Orientation,
    ) -> Option<Array2<f64>> {
        if index >= self.slice_count(orientation) {
            return None;
        }
        Some(self.data.slice(index, orientation))
    }

    fn get_output_dimensions(&self, orientation: Orientation) -> (u32, u32) {
        let interpolated_dim = Interpolator::get_isotropic_dimensions(self.spacing, self.dim());
        // Always return (width, height) - standard image convention
        match orientation {
            Orientation::Axial => (interpolated_dim.2, interpolated_dim.1),
            Orientation::Coronal => (interpolated_dim.2, interpolated_dim.0),
            Orientation::Sagittal => (interpolated_dim.1, interpolated_dim.0),
        }
    }

    /// Render one slice as an 8-bit image, resampled to isotropic pixels and
    /// windowed to the slice's own value range.
    pub fn get_image_from_axis(&self, index: usize, orientation: Orientation) -> Option<GrayImage> {
        let slice = self.get_slice_from_axis(index, orientation)?;
        let (slice_height, slice_width) = slice.dim();
        if slice_height == 0 || slice_width == 0 {
            return None;
        }
        let (width, height) = self.get_output_dimensions(orientation);
        let window = Window::of(&slice.view());

        if (width as usize, height as usize) == (slice_width, slice_height) {
            let pixels = slice.iter().map(|&v| window.to_u8(v)).collect();
            return ImageBuffer::from_raw(width, height, pixels);
        }
        Self::interpolate_slice(&slice.view(), width, height, &window)
    }

    fn interpolate_slice(
        slice: &ArrayView2<'_, f64>,
        width: u32,
        height: u32,
        window: &Window,
    ) -> Option<GrayImage> {
        let (slice_height, slice_width) = slice.dim();

        let pixel_data: Vec<u8> = (0..height)
            .into_par_iter()
            .flat_map_iter(|y| {
                (0..width).map(move |x| {
                    let norm_x = (x as f64 + 0.5) / width as f64;
                    let norm_y = (y as f64 + 0.5) / height as f64;

                    let src_x = (norm_x * slice_width as f64 - 0.5)
                        .clamp(0.0, (slice_width - 1) as f64);
                    let src_y = (norm_y * slice_height as f64 - 0.5)
                        .clamp(0.0, (slice_height - 1) as f64);

                    window.to_u8(Interpolator::bilinear_interpolate(slice, src_y, src_x))
                })
            })
            .collect();

        ImageBuffer::from_raw(width, height, pixel_data)
    }
}

/// Linear mapping of a value range onto 0..=255.
struct Window {
    low: f64,
    high: f64,
}

impl Window {
    fn of(slice: &ArrayView2<'_, f64>) -> Self {
        let (low, high) = slice
            .iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        Self { low, high }
    }

    #[inline]
    fn to_u8(&self, value: f64) -> u8 {
        if self.high <= self.low {
            return 0;
        }
        ((value - self.low) / (self.high - self.low) * 255.0).clamp(0.0, 255.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn ramp() -> Volume {
        let data = Array3::from_shape_fn((2, 3, 4), |(z, y, x)| (z * 100 + y * 10 + x) as u16);
        Volume::new("US", VoxelData::U16(data), (1.0, 1.0, 1.0), (0.0, 0.0, 0.0))
    }

    #[test]
    fn cast_preserves_values() {
        let volume = ramp();
        let double = volume.data().to_double();
        assert_eq!(double[[1, 2, 3]], 123.0);
        assert_eq!(volume.scalar_type(), ScalarType::U16);
    }

    #[test]
    fn flip_mirrors_requested_axis() {
        let volume = ramp();
        let flipped = volume.data().to_double_flipped(FlipAxis::X);
        assert_eq!(flipped[[0, 0, 0]], 3.0);
        assert_eq!(flipped[[1, 2, 3]], 120.0);
        let flipped = volume.data().to_double_flipped(FlipAxis::Z);
        assert_eq!(flipped[[0, 0, 0]], 100.0);
        assert!(flipped.is_standard_layout());
    }

    #[test]
    fn slice_index_out_of_range_is_none() {
        let volume = ramp();
        assert!(volume.get_slice_from_axis(2, Orientation::Axial).is_none());
        assert!(volume.get_slice_from_axis(3, Orientation::Sagittal).is_some());
    }

    #[test]
    fn rendered_slice_spans_full_range() {
        let volume = ramp();
        let image = volume.get_image_from_axis(0, Orientation::Axial).unwrap();
        assert_eq!(image.dimensions(), (4, 3));
        assert_eq!(image.get_pixel(0, 0).0[0], 0);
        assert_eq!(image.get_pixel(3, 2).0[0], 255);
    }

    #[test]
    fn anisotropic_slice_is_resampled() {
        let data = Array3::<f64>::zeros((2, 3, 4));
        let volume = Volume::new("US", VoxelData::Double(data), (1.0, 1.0, 2.0), (0.0, 0.0, 0.0));
        let image = volume.get_image_from_axis(1, Orientation::Coronal).unwrap();
        assert_eq!(image.dimensions(), (4, 4));
    }

    #[test]
    fn replacing_data_bumps_generation() {
        let mut volume = ramp();
        volume.replace_data(VoxelData::Double(Array3::zeros((2, 3, 4))));
        assert_eq!(volume.generation(), 1);
        assert_eq!(volume.scalar_type(), ScalarType::Double);
    }
}
