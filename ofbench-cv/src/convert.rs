//! Conversions between OpenCV matrices and harness types.
//!
//! OpenCV stores colour frames as BGR, the harness as RGB.

use image::{GrayImage, RgbImage};
use nalgebra as na;
use ofbench::prelude::v1::*;
use opencv::core::{Point2f, Scalar, Size, Vec3b, CV_32FC2, CV_8UC1, CV_8UC3};
use opencv::prelude::*;

fn new_mat(width: usize, height: usize, typ: i32) -> anyhow::Result<Mat> {
    Ok(Mat::new_size_with_default(
        Size::new(width as _, height as _),
        typ,
        Scalar::all(0.0),
    )?)
}

/// Copy a BGR frame into an RGB image.
pub fn mat_to_rgb(mat: &Mat) -> anyhow::Result<RgbImage> {
    let mut out = RgbImage::new(mat.cols() as _, mat.rows() as _);

    for (x, y, px) in out.enumerate_pixels_mut() {
        let bgr: &Vec3b = mat.at_2d(y as _, x as _)?;
        px.0 = [bgr[2], bgr[1], bgr[0]];
    }

    Ok(out)
}

/// Copy an RGB image into a BGR matrix.
pub fn rgb_to_mat(image: &RgbImage) -> anyhow::Result<Mat> {
    let mut mat = new_mat(image.width() as _, image.height() as _, CV_8UC3)?;

    for (x, y, px) in image.enumerate_pixels() {
        let bgr = mat.at_2d_mut::<Vec3b>(y as _, x as _)?;
        bgr[0] = px[2];
        bgr[1] = px[1];
        bgr[2] = px[0];
    }

    Ok(mat)
}

fn gray_to_mat(image: &GrayImage) -> anyhow::Result<Mat> {
    let mut mat = new_mat(image.width() as _, image.height() as _, CV_8UC1)?;

    for (x, y, px) in image.enumerate_pixels() {
        *mat.at_2d_mut::<u8>(y as _, x as _)? = px[0];
    }

    Ok(mat)
}

/// Convert a frame to a single or three channel 8-bit matrix.
pub fn frame_to_mat(frame: &Frame) -> anyhow::Result<Mat> {
    match frame {
        Frame::Gray(image) => gray_to_mat(image),
        Frame::Color(image) => rgb_to_mat(image),
    }
}

/// Convert a field to a `CV_32FC2` matrix.
pub fn flow_to_mat(field: &FlowField) -> anyhow::Result<Mat> {
    let (w, h) = field.dim();
    let mut mat = new_mat(w, h, CV_32FC2)?;

    for (x, y, motion) in field.iter() {
        let pt = mat.at_2d_mut::<Point2f>(y as _, x as _)?;
        pt.x = motion.x;
        pt.y = motion.y;
    }

    Ok(mat)
}

/// Convert a `CV_32FC2` matrix to a field.
pub fn mat_to_flow(mat: &Mat) -> anyhow::Result<FlowField> {
    if mat.typ() != CV_32FC2 {
        return Err(anyhow!("unexpected flow matrix type {}", mat.typ()));
    }

    let (w, h) = (mat.cols() as usize, mat.rows() as usize);
    let mut field = FlowField::new(w, h);

    for y in 0..h {
        for x in 0..w {
            let pt: &Point2f = mat.at_2d(y as _, x as _)?;
            field.set_motion(x, y, na::Vector2::new(pt.x, pt.y));
        }
    }

    Ok(field)
}
