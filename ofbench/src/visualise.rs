//! # Flow field visualisation
//!
//! A field is drawn two ways: sparse arrows on top of the source frame, and a dense colour
//! coding where hue is the direction and brightness (or saturation) is the magnitude. Both are
//! put side by side in a single [`Composite`].

use crate::prelude::v1::*;
use image::{GenericImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use std::f32::consts::PI;

const ARROW_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Text to be overlaid on a composite at a fixed position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caption {
    pub text: String,
    /// Bottom-left corner of the text, in pixels.
    pub origin: (i32, i32),
}

/// Side by side arrow and dense visualisation.
///
/// The caption is kept as text, rasterising it is up to the sink or display.
#[derive(Clone, Debug, PartialEq)]
pub struct Composite {
    pub image: RgbImage,
    pub caption: Caption,
}

/// Draw the field as arrows sampled on a regular grid.
///
/// Samples are taken every `step` pixels, starting at `step / 2` on both axes. Each sample is a
/// line from the grid point to `(x + dx, y + dy)` with a dot at the grid point. Lines leaving
/// the frame are cut at its edge. `frame` is not modified.
pub fn draw_arrows(frame: &Frame, field: &FlowField, step: usize) -> RgbImage {
    let mut vis = frame.to_rgb();
    let (w, h) = field.dim();
    let step = step.max(1);
    let canvas = vis.dimensions();

    for y in (step / 2..h).step_by(step) {
        for x in (step / 2..w).step_by(step) {
            let m = field.get_motion(x, y);
            let start = (x as f32, y as f32);
            let end = clip_to_canvas(start, (x as f32 + m.x, y as f32 + m.y), canvas);
            let end = (end.0.round(), end.1.round());
            draw_line_segment_mut(&mut vis, start, end, ARROW_COLOR);
            draw_filled_circle_mut(&mut vis, (x as i32, y as i32), 1, ARROW_COLOR);
        }
    }

    vis
}

/// Shorten the segment from `start` to `end` so that it ends inside a `(w, h)` canvas.
///
/// `start` must be on the canvas. Non-finite ends collapse onto `start`.
fn clip_to_canvas(start: (f32, f32), end: (f32, f32), (w, h): (u32, u32)) -> (f32, f32) {
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);

    if !(dx.is_finite() && dy.is_finite()) {
        return start;
    }

    let reach = |p: f32, d: f32, len: u32| {
        if d > 0.0 {
            (len as f32 - 1.0 - p) / d
        } else if d < 0.0 {
            -p / d
        } else {
            1.0
        }
    };

    let t = reach(start.0, dx, w).min(reach(start.1, dy, h)).clamp(0.0, 1.0);

    (start.0 + dx * t, start.1 + dy * t)
}

/// Convert a hue in degrees, saturation and value in `[0; 1]` to RGB.
fn hsv_to_rgb(hue: f32, sat: f32, val: f32) -> Rgb<u8> {
    let hue = hue.rem_euclid(360.0) / 60.0;
    let c = val * sat;
    let x = c * (1.0 - (hue % 2.0 - 1.0).abs());
    let m = val - c;

    let (r, g, b) = match hue as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let to_u8 = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;

    Rgb([to_u8(r), to_u8(g), to_u8(b)])
}

/// Draw the field as a dense colour image.
///
/// Direction is mapped to hue, magnitude (times `magnitude_scale`, clipped at 255) to value on
/// a dark background, or to saturation on a light one. The other channel is kept at maximum.
pub fn draw_dense(field: &FlowField, dark_background: bool, magnitude_scale: f32) -> RgbImage {
    let (w, h) = field.dim();

    RgbImage::from_fn(w as u32, h as u32, |x, y| {
        let m = field.get_motion(x as usize, y as usize);
        let hue = (m.y.atan2(m.x) + PI).to_degrees();
        let level = (m.magnitude() * magnitude_scale).min(255.0) / 255.0;

        if dark_background {
            hsv_to_rgb(hue, 1.0, level)
        } else {
            hsv_to_rgb(hue, level, 1.0)
        }
    })
}

/// Place the arrow and dense images side by side and attach a caption.
pub fn compose(arrows: &RgbImage, dense: &RgbImage, caption: Caption) -> Result<Composite> {
    if arrows.dimensions() != dense.dimensions() {
        let dim = |img: &RgbImage| (img.width() as usize, img.height() as usize);
        return Err(Error::DimensionMismatch {
            expected: dim(arrows),
            got: dim(dense),
        });
    }

    let (w, h) = arrows.dimensions();
    let mut image = RgbImage::new(w * 2, h);

    image
        .copy_from(arrows, 0, 0)
        .and_then(|_| image.copy_from(dense, w, 0))
        .map_err(|e| Error::Backend(e.into()))?;

    Ok(Composite { image, caption })
}

/// Caption text shown on every composite.
pub fn caption_text(algorithm: &str, fps: f64) -> String {
    format!("ALG: {algorithm}, FPS: {:.2}", fps)
}
