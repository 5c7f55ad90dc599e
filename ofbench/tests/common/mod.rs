//! In-memory media backend and recording estimators.

#![allow(dead_code)]

use image::{Rgb, RgbImage};
use ofbench::prelude::v1::*;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const WIDTH: usize = 32;
pub const HEIGHT: usize = 24;
pub const ESC: i32 = 27;

/// Everything the backend was asked to do.
#[derive(Default, Debug)]
pub struct MediaLog {
    pub opened_sources: Vec<SourceSpec>,
    pub released_sources: usize,
    pub opened_sinks: Vec<(PathBuf, SinkFormat)>,
    pub written: Vec<(PathBuf, (u32, u32), String)>,
    pub closed_sinks: Vec<PathBuf>,
    pub displays_opened: usize,
    pub displays_closed: usize,
    pub shown: usize,
    pub polls: usize,
}

impl MediaLog {
    pub fn written_to(&self, path: &Path) -> Vec<&(PathBuf, (u32, u32), String)> {
        self.written.iter().filter(|(p, _, _)| p == path).collect()
    }
}

/// Synthetic media: every source yields `frames` frames of a moving gradient.
pub struct SyntheticMedia {
    pub frames: usize,
    pub frame_rate: Option<f64>,
    /// Key returned by each successive poll, `None` once exhausted.
    pub keys: Rc<RefCell<VecDeque<Option<i32>>>>,
    pub log: Rc<RefCell<MediaLog>>,
    pub fail_sink: bool,
    /// Frame number (1-based) whose read fails with a device error.
    pub fail_read_at: Option<usize>,
}

impl SyntheticMedia {
    pub fn new(frames: usize) -> Self {
        Self {
            frames,
            frame_rate: Some(25.0),
            keys: Default::default(),
            log: Default::default(),
            fail_sink: false,
            fail_read_at: None,
        }
    }

    /// Press `key` on poll number `poll` (1-based, one poll per frame).
    pub fn press_at(self, poll: usize, key: i32) -> Self {
        {
            let mut keys = self.keys.borrow_mut();
            if keys.len() < poll {
                keys.resize(poll, None);
            }
            keys[poll - 1] = Some(key);
        }
        self
    }
}

struct SyntheticSource {
    remaining: usize,
    index: usize,
    frame_rate: Option<f64>,
    fail_read_at: Option<usize>,
    log: Rc<RefCell<MediaLog>>,
}

impl VideoSource for SyntheticSource {
    fn read_frame(&mut self) -> anyhow::Result<Option<RgbImage>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        self.index += 1;

        if self.fail_read_at == Some(self.index) {
            return Err(anyhow!("device disconnected"));
        }

        let shift = self.index as u32;
        Ok(Some(RgbImage::from_fn(
            WIDTH as u32,
            HEIGHT as u32,
            |x, y| Rgb([((x + shift) * 7) as u8, (y * 9) as u8, 128]),
        )))
    }

    fn frame_rate(&self) -> Option<f64> {
        self.frame_rate
    }

    fn frame_size(&self) -> (usize, usize) {
        (WIDTH, HEIGHT)
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        self.log.borrow_mut().released_sources += 1;
    }
}

struct RecordingSink {
    path: PathBuf,
    log: Rc<RefCell<MediaLog>>,
}

impl VideoSink for RecordingSink {
    fn write_frame(&mut self, frame: &Composite) -> anyhow::Result<()> {
        self.log.borrow_mut().written.push((
            self.path.clone(),
            frame.image.dimensions(),
            frame.caption.text.clone(),
        ));
        Ok(())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.log.borrow_mut().closed_sinks.push(self.path.clone());
        Ok(())
    }
}

struct ScriptedDisplay {
    keys: Rc<RefCell<VecDeque<Option<i32>>>>,
    log: Rc<RefCell<MediaLog>>,
}

impl Display for ScriptedDisplay {
    fn show(&mut self, _: &Composite) -> anyhow::Result<()> {
        self.log.borrow_mut().shown += 1;
        Ok(())
    }

    fn poll_key(&mut self, _: Duration) -> anyhow::Result<Option<i32>> {
        self.log.borrow_mut().polls += 1;
        Ok(self.keys.borrow_mut().pop_front().flatten())
    }
}

impl Drop for ScriptedDisplay {
    fn drop(&mut self) {
        self.log.borrow_mut().displays_closed += 1;
    }
}

impl MediaBackend for SyntheticMedia {
    fn open_source(&mut self, spec: &SourceSpec) -> anyhow::Result<Box<dyn VideoSource>> {
        self.log.borrow_mut().opened_sources.push(spec.clone());
        Ok(Box::new(SyntheticSource {
            remaining: self.frames,
            index: 0,
            frame_rate: self.frame_rate,
            fail_read_at: self.fail_read_at,
            log: self.log.clone(),
        }))
    }

    fn open_sink(
        &mut self,
        path: &Path,
        format: SinkFormat,
    ) -> anyhow::Result<Box<dyn VideoSink>> {
        if self.fail_sink {
            return Err(anyhow!("disk full"));
        }
        self.log
            .borrow_mut()
            .opened_sinks
            .push((path.to_path_buf(), format));
        Ok(Box::new(RecordingSink {
            path: path.to_path_buf(),
            log: self.log.clone(),
        }))
    }

    fn open_display(&mut self, _: &str) -> anyhow::Result<Box<dyn Display>> {
        self.log.borrow_mut().displays_opened += 1;
        Ok(Box::new(ScriptedDisplay {
            keys: self.keys.clone(),
            log: self.log.clone(),
        }))
    }
}

/// Single estimator invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub algorithm: &'static str,
    pub guess: Option<FlowField>,
    pub prev_gray: bool,
    pub curr_gray: bool,
    pub dim: (usize, usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behaviour {
    /// Return a constant non-zero field.
    Succeed,
    /// Always return an error.
    Fail,
    /// Return a field of the wrong size.
    WrongSize,
    /// Return a field of infinite displacements.
    NonFinite,
}

pub type Calls = Arc<Mutex<Vec<Call>>>;

struct RecordingEstimator {
    algorithm: &'static str,
    behaviour: Behaviour,
    calls: Calls,
}

impl FlowEstimator for RecordingEstimator {
    fn calc(
        &mut self,
        prev: &Frame,
        curr: &Frame,
        guess: Option<&FlowField>,
    ) -> anyhow::Result<FlowField> {
        let (w, h) = curr.dim();

        self.calls.lock().unwrap().push(Call {
            algorithm: self.algorithm,
            guess: guess.cloned(),
            prev_gray: prev.is_gray(),
            curr_gray: curr.is_gray(),
            dim: (w, h),
        });

        match self.behaviour {
            Behaviour::Succeed => Ok(FlowField::from_fn(w, h, |_, _| {
                nalgebra::Vector2::new(1.0, -0.5)
            })),
            Behaviour::Fail => Err(anyhow!("{} diverged", self.algorithm)),
            Behaviour::WrongSize => Ok(FlowField::new(w + 1, h)),
            Behaviour::NonFinite => Ok(FlowField::from_fn(w, h, |_, _| {
                nalgebra::Vector2::new(f32::INFINITY, 0.0)
            })),
        }
    }
}

/// Registry whose estimators record every call.
pub fn recording_registry(behaviour: Behaviour) -> (Registry, Calls) {
    let calls = Calls::default();
    let shared = calls.clone();

    let registry = Registry::new(move |desc| {
        Ok(Box::new(RecordingEstimator {
            algorithm: desc.name,
            behaviour,
            calls: shared.clone(),
        }) as Box<dyn FlowEstimator>)
    });

    (registry, calls)
}
