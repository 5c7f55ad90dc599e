//! # Backward warping
//!
//! Resamples an image (or a flow field) through a displacement field. Output pixel `(x, y)` is
//! pulled from `(x - dx, y - dy)` of the input using bilinear interpolation.

use crate::error::{Error, Result};
use crate::flow_field::FlowField;
use image::{GrayImage, Luma, Rgb, RgbImage};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Policy for samples that fall outside the input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Border {
    /// Clamp coordinates to the nearest edge pixel.
    #[default]
    Replicate,
    /// Treat everything outside the input as zero.
    Zero,
}

/// Buffer that can be resampled by [`warp`].
pub trait Warp: Sized {
    /// Number of channels per pixel.
    const CHANNELS: usize;

    fn dim(&self) -> (usize, usize);

    /// Read channel `c` of the pixel at integer coordinates.
    fn texel(&self, x: usize, y: usize, c: usize) -> f32;

    /// Build a new buffer of given size, where `f(x, y, c)` gives every channel value.
    fn build(width: usize, height: usize, f: impl FnMut(usize, usize, usize) -> f32) -> Self;
}

impl Warp for FlowField {
    const CHANNELS: usize = 2;

    fn dim(&self) -> (usize, usize) {
        FlowField::dim(self)
    }

    fn texel(&self, x: usize, y: usize, c: usize) -> f32 {
        self.get_motion(x, y)[c]
    }

    fn build(width: usize, height: usize, mut f: impl FnMut(usize, usize, usize) -> f32) -> Self {
        FlowField::from_fn(width, height, |x, y| Vector2::new(f(x, y, 0), f(x, y, 1)))
    }
}

impl Warp for GrayImage {
    const CHANNELS: usize = 1;

    fn dim(&self) -> (usize, usize) {
        (self.width() as usize, self.height() as usize)
    }

    fn texel(&self, x: usize, y: usize, _: usize) -> f32 {
        self.get_pixel(x as u32, y as u32)[0] as f32
    }

    fn build(width: usize, height: usize, mut f: impl FnMut(usize, usize, usize) -> f32) -> Self {
        GrayImage::from_fn(width as u32, height as u32, |x, y| {
            Luma([to_u8(f(x as usize, y as usize, 0))])
        })
    }
}

impl Warp for RgbImage {
    const CHANNELS: usize = 3;

    fn dim(&self) -> (usize, usize) {
        (self.width() as usize, self.height() as usize)
    }

    fn texel(&self, x: usize, y: usize, c: usize) -> f32 {
        self.get_pixel(x as u32, y as u32)[c] as f32
    }

    fn build(width: usize, height: usize, mut f: impl FnMut(usize, usize, usize) -> f32) -> Self {
        RgbImage::from_fn(width as u32, height as u32, |x, y| {
            let (x, y) = (x as usize, y as usize);
            Rgb([to_u8(f(x, y, 0)), to_u8(f(x, y, 1)), to_u8(f(x, y, 2))])
        })
    }
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Sample channel `c` at fractional coordinates.
fn bilinear<T: Warp>(img: &T, x: f32, y: f32, c: usize, border: Border) -> f32 {
    let (w, h) = img.dim();

    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as isize, y0 as isize);

    let fetch = |px: isize, py: isize| -> f32 {
        match border {
            Border::Replicate => {
                let px = px.clamp(0, w as isize - 1) as usize;
                let py = py.clamp(0, h as isize - 1) as usize;
                img.texel(px, py, c)
            }
            Border::Zero => {
                if (0..w as isize).contains(&px) && (0..h as isize).contains(&py) {
                    img.texel(px as usize, py as usize, c)
                } else {
                    0.0
                }
            }
        }
    };

    // Skip neighbours with zero weight, so integer coordinates reproduce the input exactly.
    let mut acc = fetch(x0, y0) * (1.0 - fx) * (1.0 - fy);
    if fx != 0.0 {
        acc += fetch(x0 + 1, y0) * fx * (1.0 - fy);
    }
    if fy != 0.0 {
        acc += fetch(x0, y0 + 1) * (1.0 - fx) * fy;
    }
    if fx != 0.0 && fy != 0.0 {
        acc += fetch(x0 + 1, y0 + 1) * fx * fy;
    }
    acc
}

/// Backward-warp `image` through `field`.
///
/// Neither input is modified. A zero field returns an exact copy of `image`.
///
/// # Arguments
///
/// * `image` - buffer to resample.
/// * `field` - displacement to apply, must match `image` dimensions.
/// * `border` - policy for samples falling outside the image.
pub fn warp<T: Warp>(image: &T, field: &FlowField, border: Border) -> Result<T> {
    let (w, h) = image.dim();

    if field.dim() != (w, h) {
        return Err(Error::DimensionMismatch {
            expected: (w, h),
            got: field.dim(),
        });
    }

    let mut source = (usize::MAX, usize::MAX, 0.0, 0.0);

    Ok(T::build(w, h, |x, y, c| {
        if (source.0, source.1) != (x, y) {
            let m = field.get_motion(x, y);
            source = (x, y, x as f32 - m.x, y as f32 - m.y);
        }
        bilinear(image, source.2, source.3, c, border)
    }))
}

/// Carry a flow field one step forward in time.
///
/// The field is warped by itself, producing the motion-compensated guess for the next
/// estimation step.
pub fn propagate(flow: &FlowField, border: Border) -> Result<FlowField> {
    warp(flow, flow, border)
}
