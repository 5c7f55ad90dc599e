//! # Media collaborators
//!
//! Video decoding, encoding and on-screen display are provided by a backend. The harness only
//! sees these traits.

use crate::prelude::v1::*;
use image::RgbImage;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where frames come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceSpec {
    /// Live capture device index.
    Device(u32),
    /// Video file.
    File(PathBuf),
}

impl Default for SourceSpec {
    fn default() -> Self {
        Self::Device(0)
    }
}

impl SourceSpec {
    /// Interpret a command line token.
    ///
    /// Pure digit strings select a capture device, anything else is a file path.
    pub fn parse(token: &str) -> Self {
        if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(idx) = token.parse() {
                return Self::Device(idx);
            }
        }
        Self::File(token.into())
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Device(idx) => write!(f, "device {idx}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Sequential video frame source.
///
/// The source is released when dropped.
pub trait VideoSource {
    /// Read the next frame.
    ///
    /// Returns `Ok(None)` once the stream is exhausted. Device errors are returned as `Err`, and
    /// are treated as the end of the stream by the runner.
    fn read_frame(&mut self) -> anyhow::Result<Option<RgbImage>>;

    /// Get the framerate of the stream.
    ///
    /// This will return `Some(framerate)` if it is known. On realtime streams it may
    /// not always be known. In such cases, `None` is returned.
    fn frame_rate(&self) -> Option<f64>;

    /// Get width and height of the frames.
    fn frame_size(&self) -> (usize, usize);
}

/// Properties of an output video.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SinkFormat {
    pub frame_rate: f64,
    pub width: usize,
    pub height: usize,
}

/// Video output.
pub trait VideoSink {
    /// Append a frame. The caption has to be drawn by the sink.
    fn write_frame(&mut self, frame: &Composite) -> anyhow::Result<()>;

    /// Flush and close the output.
    fn close(&mut self) -> anyhow::Result<()>;
}

/// Preview surface.
///
/// The window is destroyed when dropped.
pub trait Display {
    /// Show a frame. The caption has to be drawn by the display.
    fn show(&mut self, frame: &Composite) -> anyhow::Result<()>;

    /// Wait at most `timeout` for a key press.
    fn poll_key(&mut self, timeout: Duration) -> anyhow::Result<Option<i32>>;
}

/// Opens sources, sinks and displays.
pub trait MediaBackend {
    fn open_source(&mut self, spec: &SourceSpec) -> anyhow::Result<Box<dyn VideoSource>>;

    fn open_sink(&mut self, path: &Path, format: SinkFormat)
        -> anyhow::Result<Box<dyn VideoSink>>;

    fn open_display(&mut self, title: &str) -> anyhow::Result<Box<dyn Display>>;
}
