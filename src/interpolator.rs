use ndarray::ArrayView2;

pub(crate) struct Interpolator;

impl Interpolator {
    /// Dimensions (depth, height, width) a volume takes up when every axis
    /// is resampled to the finest spacing.
    pub(crate) fn get_isotropic_dimensions(
        spacing: (f64, f64, f64),
        original_dim: (usize, usize, usize),
    ) -> (u32, u32, u32) {
        let (x_spacing, y_spacing, z_spacing) = spacing;
        let min_spacing = x_spacing.min(y_spacing).min(z_spacing);
        if min_spacing.is_nan() || min_spacing <= 0.0 {
            return (
                original_dim.0 as u32,
                original_dim.1 as u32,
                original_dim.2 as u32,
            );
        }
        let inv_min_spacing = 1.0 / min_spacing;

        // original_dim is (depth, height, width) corresponding to (z, y, x)
        let new_x = (original_dim.2 as f64 * x_spacing * inv_min_spacing).round() as u32;
        let new_y = (original_dim.1 as f64 * y_spacing * inv_min_spacing).round() as u32;
        let new_z = (original_dim.0 as f64 * z_spacing * inv_min_spacing).round() as u32;

        (new_z.max(1), new_y.max(1), new_x.max(1))
    }

    #[inline]
    pub(crate) fn bilinear_interpolate(slice: &ArrayView2<f64>, y: f64, x: f64) -> f64 {
        let (height, width) = slice.dim();

        let y0 = (y.floor() as usize).min(height - 1);
        let x0 = (x.floor() as usize).min(width - 1);
        let y1 = (y0 + 1).min(height - 1);
        let x1 = (x0 + 1).min(width - 1);

        let dy = y - y0 as f64;
        let dx = x - x0 as f64;
        let one_minus_dx = 1.0 - dx;
        let one_minus_dy = 1.0 - dy;

        let v0 = slice[[y0, x0]].mul_add(one_minus_dx, slice[[y0, x1]] * dx);
        let v1 = slice[[y1, x0]].mul_add(one_minus_dx, slice[[y1, x1]] * dx);

        v0.mul_add(one_minus_dy, v1 * dy)
    }
}
