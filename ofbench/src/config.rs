//! # Harness settings

use crate::warp::Border;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunable behaviour of the runner and its outputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Grid spacing of the arrow overlay, in pixels.
    pub arrow_step: usize,
    /// Encode magnitude as brightness on black instead of saturation on white.
    pub dark_background: bool,
    /// Multiplier applied to flow magnitude before clipping at 255.
    pub magnitude_scale: f32,
    /// Initial state of temporal propagation.
    pub propagate: bool,
    /// Border policy used when warping the previous flow.
    pub warp_border: Border,
    /// How long to wait for a key press each frame, in milliseconds.
    pub key_poll_ms: u64,
    /// Caption position on the composite.
    pub caption_origin: (i32, i32),
    /// Extension of the per-algorithm output videos.
    pub output_extension: String,
    /// FourCC code of the output codec.
    pub output_fourcc: String,
    /// Catalog index selected when none is given.
    pub default_algorithm: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            arrow_step: 16,
            dark_background: false,
            magnitude_scale: 4.0,
            propagate: false,
            warp_border: Border::Replicate,
            key_poll_ms: 5,
            caption_origin: (10, 70),
            output_extension: "mp4".into(),
            output_fourcc: "XVID".into(),
            default_algorithm: 1,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file.
    ///
    /// Missing fields take their default value.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("unable to open settings {}", path.display()))?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("invalid settings in {}", path.display()))
    }

    pub fn key_poll(&self) -> Duration {
        Duration::from_millis(self.key_poll_ms)
    }
}
