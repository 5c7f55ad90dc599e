//! # Video frames

use image::{imageops, DynamicImage, GrayImage, RgbImage};

/// Single decoded video frame.
///
/// Estimators either consume grayscale or color input, thus a frame may be in either form.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Gray(GrayImage),
    Color(RgbImage),
}

impl Frame {
    /// Get width and height of the frame.
    pub fn dim(&self) -> (usize, usize) {
        let (w, h) = match self {
            Self::Gray(img) => img.dimensions(),
            Self::Color(img) => img.dimensions(),
        };
        (w as usize, h as usize)
    }

    pub fn is_gray(&self) -> bool {
        matches!(self, Self::Gray(_))
    }

    /// Convert the frame to grayscale.
    ///
    /// Color frames are converted using Rec. 709 luma weights.
    pub fn to_gray(&self) -> GrayImage {
        match self {
            Self::Gray(img) => img.clone(),
            Self::Color(img) => imageops::grayscale(img),
        }
    }

    /// Convert the frame to RGB.
    pub fn to_rgb(&self) -> RgbImage {
        match self {
            Self::Gray(img) => DynamicImage::ImageLuma8(img.clone()).into_rgb8(),
            Self::Color(img) => img.clone(),
        }
    }

    /// Prepare the frame for an estimator.
    ///
    /// # Arguments
    ///
    /// * `gray` - whether the estimator requires grayscale input.
    pub fn for_estimator(&self, gray: bool) -> Self {
        match (self, gray) {
            (Self::Color(_), true) => Self::Gray(self.to_gray()),
            _ => self.clone(),
        }
    }
}

impl From<GrayImage> for Frame {
    fn from(img: GrayImage) -> Self {
        Self::Gray(img)
    }
}

impl From<RgbImage> for Frame {
    fn from(img: RgbImage) -> Self {
        Self::Color(img)
    }
}
