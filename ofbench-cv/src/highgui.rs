//! Preview window.

use crate::capture::render_composite;
use log::*;
use ofbench::prelude::v1::*;
use opencv::highgui;
use std::time::Duration;

pub struct Window {
    title: String,
}

impl Window {
    pub fn open(title: &str) -> anyhow::Result<Self> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self {
            title: title.to_string(),
        })
    }
}

impl Display for Window {
    fn show(&mut self, frame: &Composite) -> anyhow::Result<()> {
        let mat = render_composite(frame)?;
        highgui::imshow(&self.title, &mat)?;
        Ok(())
    }

    fn poll_key(&mut self, timeout: Duration) -> anyhow::Result<Option<i32>> {
        // wait_key(0) would block forever.
        let ms = (timeout.as_millis() as i32).max(1);
        let key = highgui::wait_key(ms)?;
        Ok(Some(key).filter(|k| *k >= 0))
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_window(&self.title) {
            warn!("unable to destroy window {}: {}", self.title, e);
        }
    }
}
