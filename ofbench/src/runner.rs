//! # Flow runner
//!
//! Drives one estimator over one video source, frame by frame. The previous frame and the
//! previous flow are carried between steps, and the previous flow may be warped forward to be
//! used as the initial guess of the next estimation.

use crate::config::Settings;
use crate::error::MissingSetting;
use crate::estimator::estimate;
use crate::media::{Display, MediaBackend, SinkFormat, SourceSpec, VideoSink, VideoSource};
use crate::prelude::v1::*;
use crate::utils::{calc_perf, step_fps};
use crate::visualise::{caption_text, compose, draw_arrows, draw_dense, Caption};
use crate::warp::{propagate, Border};
use log::*;
use std::path::Path;
use std::time::{Duration, Instant};

/// Rate given to sinks when the source does not report one.
const FALLBACK_FRAME_RATE: f64 = 30.0;

/// Lifecycle of a runner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunnerStatus {
    /// Algorithm or input is missing.
    Unconfigured,
    /// Ready to run.
    Ready,
    /// Inside `run`.
    Running,
    /// Last run ended normally, either at the end of the stream or by request.
    Stopped,
    /// Last run ended because of a source, sink or display error.
    Failed,
}

/// Interactive command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Exit,
    TogglePropagation,
    SelectAlgorithm(usize),
}

impl Command {
    pub const ESC: i32 = 27;

    /// Map a key code to a command.
    ///
    /// Only the low byte of the key code is looked at.
    pub fn from_key(key: i32) -> Option<Self> {
        match key & 0xff {
            Self::ESC => Some(Self::Exit),
            k if k == b't' as i32 => Some(Self::TogglePropagation),
            k if (b'0' as i32..=b'9' as i32).contains(&k) => {
                Some(Self::SelectAlgorithm((k - b'0' as i32) as usize))
            }
            _ => None,
        }
    }
}

/// Per-run state of the runner.
///
/// Only the current and the previous frame are ever retained.
#[derive(Debug)]
pub struct RunnerState {
    propagation: bool,
    interactive: bool,
    previous_frame: Option<Frame>,
    previous_flow: Option<FlowField>,
    current_frame: Option<Frame>,
    first_frame: bool,
    frames: usize,
}

impl RunnerState {
    pub fn new(propagation: bool, interactive: bool) -> Self {
        Self {
            propagation,
            interactive,
            previous_frame: None,
            previous_flow: None,
            current_frame: None,
            first_frame: true,
            frames: 0,
        }
    }

    pub fn propagation(&self) -> bool {
        self.propagation
    }

    pub fn interactive(&self) -> bool {
        self.interactive
    }

    /// Number of frames read in the current run.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Last frame handed to the estimator, converted to the estimator's colour space.
    pub fn previous_frame(&self) -> Option<&Frame> {
        self.previous_frame.as_ref()
    }

    /// Last computed flow field.
    pub fn previous_flow(&self) -> Option<&FlowField> {
        self.previous_flow.as_ref()
    }

    /// Drop retained frames and flow.
    fn release(&mut self) {
        self.previous_frame = None;
        self.previous_flow = None;
        self.current_frame = None;
    }

    /// Perform a single step of the frame loop.
    fn advance(
        &mut self,
        source: &mut dyn VideoSource,
        desc: &AlgorithmDescriptor,
        estimator: &mut dyn FlowEstimator,
        border: Border,
    ) -> Step<'_> {
        let image = match source.read_frame() {
            Ok(Some(image)) => image,
            Ok(None) => return Step::Exhausted,
            Err(e) => {
                warn!("unable to read frame {}: {}", self.frames + 1, e);
                return Step::Exhausted;
            }
        };

        self.frames += 1;

        let frame = Frame::Color(image);
        let input = frame.for_estimator(desc.requires_gray);

        let (w, h) = input.dim();

        let prev = match self.previous_frame.take() {
            Some(prev) if !self.first_frame => prev,
            _ => {
                self.previous_frame = Some(input);
                self.previous_flow = Some(FlowField::new(w, h));
                self.current_frame = Some(frame);
                self.first_frame = false;
                return Step::Skipped;
            }
        };

        let guess = match (self.propagation, &self.previous_flow) {
            (true, Some(flow)) => match propagate(flow, border) {
                Ok(guess) => Some(guess),
                Err(e) => {
                    warn!("unable to propagate flow: {}", e);
                    None
                }
            },
            _ => None,
        };

        let started = Instant::now();
        let result = estimate(estimator, &prev, &input, guess.as_ref());
        let elapsed = started.elapsed();

        let (flow, failed) = match result {
            Ok(flow) => (flow, false),
            Err(e) => {
                warn!("{} on frame {}: {}", desc.name, self.frames, e);
                (FlowField::new(w, h), true)
            }
        };

        trace!(
            "frame {}: {:?} ({} guess), max motion {:.2}",
            self.frames,
            elapsed,
            if guess.is_some() { "with" } else { "no" },
            flow.max_magnitude()
        );

        self.previous_frame = Some(input);
        let flow = &*self.previous_flow.insert(flow);
        let frame = &*self.current_frame.insert(frame);

        Step::Estimated(Estimate {
            frame,
            flow,
            elapsed,
            failed,
            guided: guess.is_some(),
        })
    }
}

/// Result of a single runner step.
pub enum Step<'a> {
    /// The source has no more frames.
    Exhausted,
    /// First frame since the run started, nothing was estimated.
    Skipped,
    Estimated(Estimate<'a>),
}

/// Flow estimated in a single step.
pub struct Estimate<'a> {
    /// Frame as read from the source.
    pub frame: &'a Frame,
    pub flow: &'a FlowField,
    /// Time spent inside the estimator.
    pub elapsed: Duration,
    /// The estimator failed, and `flow` is all zero.
    pub failed: bool,
    /// A propagated guess was passed to the estimator.
    pub guided: bool,
}

/// Outcome of a single `run`.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    /// Algorithm active when the run ended.
    pub algorithm: Option<&'static str>,
    pub frames: usize,
    pub composed: usize,
    pub failures: usize,
    /// Estimation time of every non-skipped step.
    pub times: Vec<Duration>,
    pub cancelled: bool,
}

impl RunSummary {
    fn record(&mut self, estimate: &Estimate) {
        self.composed += 1;
        self.times.push(estimate.elapsed);
        if estimate.failed {
            self.failures += 1;
        }
    }
}

/// Build the arrow and dense composite for an estimate.
pub fn render(estimate: &Estimate, algorithm: &str, settings: &Settings) -> Result<Composite> {
    let arrows = draw_arrows(estimate.frame, estimate.flow, settings.arrow_step);
    let dense = draw_dense(
        estimate.flow,
        settings.dark_background,
        settings.magnitude_scale,
    );

    let caption = Caption {
        text: caption_text(algorithm, step_fps(estimate.elapsed)),
        origin: settings.caption_origin,
    };

    compose(&arrows, &dense, caption)
}

/// Runs an estimator over a video source.
pub struct FlowRunner<'a> {
    registry: &'a Registry,
    settings: Settings,
    source: Option<SourceSpec>,
    algorithm: Option<(AlgorithmDescriptor, Box<dyn FlowEstimator>)>,
    state: RunnerState,
    status: RunnerStatus,
}

impl<'a> FlowRunner<'a> {
    pub fn new(registry: &'a Registry, settings: Settings) -> Self {
        Self {
            registry,
            state: RunnerState::new(settings.propagate, false),
            settings,
            source: None,
            algorithm: None,
            status: RunnerStatus::Unconfigured,
        }
    }

    pub fn status(&self) -> RunnerStatus {
        self.status
    }

    pub fn state(&self) -> &RunnerState {
        &self.state
    }

    /// Descriptor of the active algorithm.
    pub fn algorithm(&self) -> Option<&AlgorithmDescriptor> {
        self.algorithm.as_ref().map(|(desc, _)| desc)
    }

    /// Check that both an algorithm and an input are set.
    pub fn readiness(&self) -> Result<()> {
        if self.algorithm.is_none() {
            Err(Error::Configuration(MissingSetting::Algorithm))
        } else if self.source.is_none() {
            Err(Error::Configuration(MissingSetting::Input))
        } else {
            Ok(())
        }
    }

    fn refresh_status(&mut self) {
        if self.status != RunnerStatus::Running {
            self.status = if self.readiness().is_ok() {
                RunnerStatus::Ready
            } else {
                RunnerStatus::Unconfigured
            };
        }
    }

    /// Set the input and restart from the first frame.
    pub fn set_source(&mut self, source: SourceSpec) {
        self.source = Some(source);
        self.state = RunnerState::new(self.state.propagation, self.state.interactive);
        self.refresh_status();
    }

    /// Switch to another algorithm.
    ///
    /// A fresh estimator is built for the selection. On failure the previous selection stays
    /// active. Frame and flow history is left intact, so the next step continues from where the
    /// previous algorithm left off.
    pub fn select_algorithm(&mut self, id: &AlgorithmId) -> Result<AlgorithmDescriptor> {
        let selected = self.registry.resolve(id).and_then(|desc| {
            let estimator = self.registry.instantiate(&desc)?;
            Ok((desc, estimator))
        });

        match selected {
            Ok((desc, estimator)) => {
                info!("using {}", desc.name);
                self.algorithm = Some((desc, estimator));
                self.refresh_status();
                Ok(desc)
            }
            Err(e) => {
                warn!(
                    "{}, keeping {}",
                    e,
                    self.algorithm().map(|d| d.name).unwrap_or("no algorithm")
                );
                Err(e)
            }
        }
    }

    /// Set the input and the algorithm.
    ///
    /// Returns a configuration error if either is still missing afterwards.
    pub fn configure(
        &mut self,
        source: Option<SourceSpec>,
        algorithm: Option<&AlgorithmId>,
    ) -> Result<()> {
        if let Some(source) = source {
            self.set_source(source);
        }

        let selected = algorithm.map(|id| self.select_algorithm(id)).transpose();

        let ready = self.readiness();
        if let Err(e) = &ready {
            error!("{}", e);
        }

        selected.and(ready)
    }

    /// Toggle temporal propagation.
    pub fn toggle_propagation(&mut self) -> bool {
        self.state.propagation = !self.state.propagation;
        info!(
            "temporal propagation is {}",
            if self.state.propagation { "on" } else { "off" }
        );
        self.state.propagation
    }

    /// Apply an interactive command.
    ///
    /// Returns `false` if the run should end.
    pub fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Exit => return false,
            Command::TogglePropagation => {
                self.toggle_propagation();
            }
            Command::SelectAlgorithm(idx) if idx < self.registry.catalog().count() => {
                let _ = self.select_algorithm(&idx.into());
            }
            Command::SelectAlgorithm(idx) => debug!("ignoring algorithm {}", idx),
        }
        true
    }

    /// Perform a single step on the source.
    pub fn step(&mut self, source: &mut dyn VideoSource) -> Result<Step<'_>> {
        let (desc, estimator) = self
            .algorithm
            .as_mut()
            .ok_or(Error::Configuration(MissingSetting::Algorithm))?;

        Ok(self
            .state
            .advance(source, desc, estimator.as_mut(), self.settings.warp_border))
    }

    /// Run the estimator over the whole input.
    ///
    /// Every composed frame is written to `output` if given. With a `display` the run is
    /// interactive: frames are shown and key presses are handled after every step.
    ///
    /// The source is released and the output closed on every exit path.
    pub fn run(
        &mut self,
        media: &mut dyn MediaBackend,
        output: Option<&Path>,
        display: Option<&mut dyn Display>,
    ) -> Result<RunSummary> {
        if let Err(e) = self.readiness() {
            error!("{}", e);
            return Err(e);
        }

        let spec = self
            .source
            .clone()
            .ok_or(Error::Configuration(MissingSetting::Input))?;

        let mut source = media.open_source(&spec).map_err(|e| {
            error!("unable to open {}: {}", spec, e);
            self.status = RunnerStatus::Failed;
            Error::Backend(e)
        })?;

        let mut sink = match output {
            Some(path) => {
                let (w, h) = source.frame_size();
                let format = SinkFormat {
                    frame_rate: source.frame_rate().unwrap_or(FALLBACK_FRAME_RATE),
                    width: w * 2,
                    height: h,
                };

                match media.open_sink(path, format) {
                    Ok(sink) => Some(sink),
                    Err(e) => {
                        error!("unable to open {}: {}", path.display(), e);
                        self.status = RunnerStatus::Failed;
                        return Err(Error::Backend(e));
                    }
                }
            }
            None => None,
        };

        info!(
            "running {} on {}",
            self.algorithm().map(|d| d.name).unwrap_or(""),
            spec
        );

        self.state = RunnerState::new(self.state.propagation, display.is_some());
        self.status = RunnerStatus::Running;

        let result = self.drive(
            source.as_mut(),
            sink.as_mut().map(|s| s.as_mut() as &mut dyn VideoSink),
            display,
        );

        drop(source);
        self.state.release();

        let closed = sink.as_mut().map(|s| s.close()).unwrap_or(Ok(()));

        let result = match (result, closed) {
            (Ok(summary), Ok(())) => Ok(summary),
            (Ok(_), Err(e)) => Err(Error::Backend(e)),
            (Err(e), closed) => {
                if let Err(ce) = closed {
                    error!("unable to close output: {}", ce);
                }
                Err(e)
            }
        };

        match &result {
            Ok(summary) => {
                self.status = RunnerStatus::Stopped;
                let (total, avg_ms) = calc_perf(&summary.times);
                info!(
                    "{}: {} frames, {} composed, {} failed, {:.03} s total, {:.03} ms avg",
                    summary.algorithm.unwrap_or(""),
                    summary.frames,
                    summary.composed,
                    summary.failures,
                    total,
                    avg_ms
                );
            }
            Err(e) => {
                self.status = RunnerStatus::Failed;
                error!("run aborted: {}", e);
            }
        }

        result
    }

    fn drive(
        &mut self,
        source: &mut dyn VideoSource,
        mut sink: Option<&mut dyn VideoSink>,
        mut display: Option<&mut dyn Display>,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        loop {
            let (desc, estimator) = self
                .algorithm
                .as_mut()
                .ok_or(Error::Configuration(MissingSetting::Algorithm))?;
            let desc = *desc;

            let composite = match self.state.advance(
                source,
                &desc,
                estimator.as_mut(),
                self.settings.warp_border,
            ) {
                Step::Exhausted => break,
                Step::Skipped => None,
                Step::Estimated(estimate) => {
                    summary.record(&estimate);
                    Some(render(&estimate, desc.name, &self.settings)?)
                }
            };

            if let (Some(composite), Some(sink)) = (&composite, sink.as_mut()) {
                sink.write_frame(composite)?;
            }

            if let Some(display) = display.as_mut() {
                if let Some(composite) = &composite {
                    display.show(composite)?;
                }

                let key = display.poll_key(self.settings.key_poll())?;

                if let Some(cmd) = key.and_then(Command::from_key) {
                    if !self.handle_command(cmd) {
                        info!("run cancelled");
                        summary.cancelled = true;
                        break;
                    }
                }
            }
        }

        summary.frames = self.state.frames;
        summary.algorithm = self.algorithm().map(|d| d.name);

        Ok(summary)
    }
}
