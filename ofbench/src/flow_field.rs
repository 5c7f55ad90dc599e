//! # Dense optical flow field

use nalgebra::*;

/// Dense optical flow field.
///
/// Holds one `(dx, dy)` displacement per pixel, in pixels, stored in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowField {
    vf: Matrix2xX<f32>,
    width: usize,
}

impl FlowField {
    /// Field of `width * height` zero displacements.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            vf: Matrix2xX::repeat(width * height, 0f32),
            width,
        }
    }

    /// Build a field from the displacement `f(x, y)` of every pixel.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> Vector2<f32>,
    ) -> Self {
        let mut field = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                field.set_motion(x, y, f(x, y));
            }
        }
        field
    }

    /// `(width, height)` in pixels. A zero-width field reports `(0, 0)`.
    pub fn dim(&self) -> (usize, usize) {
        if self.width == 0 {
            (0, 0)
        } else {
            (self.width, self.vf.ncols() / self.width)
        }
    }

    /// Number of pixels covered.
    pub fn size(&self) -> usize {
        self.vf.ncols()
    }

    /// Raw displacements as interleaved `dx, dy` pairs, one row after another.
    pub fn as_slice(&self) -> &[f32] {
        self.vf.as_slice()
    }

    pub fn set_motion(&mut self, x: usize, y: usize, motion: Vector2<f32>) {
        self.vf.set_column(self.width * y + x, &motion);
    }

    /// Displacement of pixel `(x, y)`.
    pub fn get_motion(&self, x: usize, y: usize) -> Vector2<f32> {
        self.vf.column(self.width * y + x).into()
    }

    pub fn is_zero(&self) -> bool {
        self.vf.iter().all(|v| *v == 0.0)
    }

    /// No component is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.vf.iter().all(|v| v.is_finite())
    }

    /// Largest displacement length, in pixels.
    pub fn max_magnitude(&self) -> f32 {
        self.vf
            .column_iter()
            .map(|c| c.magnitude())
            .fold(0.0, f32::max)
    }

    /// `(x, y, displacement)` for every pixel, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Vector2<f32>)> + '_ {
        let (width, height) = self.dim();
        (0..height).flat_map(move |y| (0..width).map(move |x| (x, y, self.get_motion(x, y))))
    }
}
