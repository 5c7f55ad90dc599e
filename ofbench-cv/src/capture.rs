//! Video input and output through `videoio`.

use crate::convert::{mat_to_rgb, rgb_to_mat};
use image::RgbImage;
use log::*;
use ofbench::prelude::v1::*;
use opencv::core::{Point, Scalar, Size};
use opencv::imgproc;
use opencv::prelude::*;
use opencv::videoio::*;
use std::path::{Path, PathBuf};

const CAPTION_SCALE: f64 = 3.0;
const CAPTION_THICKNESS: i32 = 3;

/// Composite as a BGR matrix with the caption drawn on top.
pub fn render_composite(frame: &Composite) -> anyhow::Result<Mat> {
    let mut mat = rgb_to_mat(&frame.image)?;
    let (x, y) = frame.caption.origin;

    imgproc::put_text(
        &mut mat,
        &frame.caption.text,
        Point::new(x, y),
        imgproc::FONT_HERSHEY_PLAIN,
        CAPTION_SCALE,
        // Magenta, in BGR order.
        Scalar::new(255.0, 0.0, 255.0, 0.0),
        CAPTION_THICKNESS,
        imgproc::LINE_8,
        false,
    )?;

    Ok(mat)
}

/// Frames from a file or a capture device.
pub struct CvSource {
    capture: VideoCapture,
    frame: Mat,
}

impl CvSource {
    pub fn open(spec: &SourceSpec) -> anyhow::Result<Self> {
        let capture = match spec {
            SourceSpec::Device(idx) => VideoCapture::new(*idx as _, CAP_ANY)?,
            SourceSpec::File(path) => VideoCapture::from_file(&path.to_string_lossy(), CAP_ANY)?,
        };

        if !capture.is_opened()? {
            return Err(anyhow!("unable to open {}", spec));
        }

        Ok(Self {
            capture,
            frame: Default::default(),
        })
    }
}

impl VideoSource for CvSource {
    fn read_frame(&mut self) -> anyhow::Result<Option<RgbImage>> {
        if !self.capture.read(&mut self.frame)? || self.frame.rows() == 0 {
            return Ok(None);
        }

        mat_to_rgb(&self.frame).map(Some)
    }

    fn frame_rate(&self) -> Option<f64> {
        self.capture
            .get(CAP_PROP_FPS)
            .ok()
            .filter(|fps| *fps > 0.0)
    }

    fn frame_size(&self) -> (usize, usize) {
        let w = self.capture.get(CAP_PROP_FRAME_WIDTH).unwrap_or_default();
        let h = self.capture.get(CAP_PROP_FRAME_HEIGHT).unwrap_or_default();
        (w as _, h as _)
    }
}

impl Drop for CvSource {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            warn!("unable to release capture: {}", e);
        }
    }
}

/// Encoded video file.
pub struct CvSink {
    path: PathBuf,
    writer: VideoWriter,
    size: Size,
}

impl CvSink {
    pub fn create(path: &Path, fourcc: &str, format: SinkFormat) -> anyhow::Result<Self> {
        let mut code = fourcc.chars().chain(std::iter::repeat(' '));
        let fourcc = VideoWriter::fourcc(
            code.next().unwrap_or(' '),
            code.next().unwrap_or(' '),
            code.next().unwrap_or(' '),
            code.next().unwrap_or(' '),
        )?;

        let size = Size::new(format.width as _, format.height as _);

        let writer = VideoWriter::new(
            &path.to_string_lossy(),
            fourcc,
            format.frame_rate,
            size,
            true,
        )?;

        if !writer.is_opened()? {
            return Err(anyhow!("unable to create {}", path.display()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            size,
        })
    }
}

impl VideoSink for CvSink {
    fn write_frame(&mut self, frame: &Composite) -> anyhow::Result<()> {
        let mat = render_composite(frame)?;

        if mat.size()? != self.size {
            return Err(anyhow!(
                "frame of {:?} does not fit {} ({:?})",
                mat.size()?,
                self.path.display(),
                self.size
            ));
        }

        self.writer.write(&mat)?;
        Ok(())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.writer.release()?;
        info!("wrote {}", self.path.display());
        Ok(())
    }
}
