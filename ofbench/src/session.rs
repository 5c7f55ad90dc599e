//! # Session controller
//!
//! Top level entry: either a single interactive run with a preview window, or a batch run
//! that renders one comparison video per catalog algorithm.

use crate::media::{Display, MediaBackend, SourceSpec};
use crate::prelude::v1::*;
use log::*;
use std::path::{Path, PathBuf};

/// Title of the preview window.
pub const WINDOW_TITLE: &str = "flow";

const INTERACT: &str = "interact";
const TEST_ALL: &str = "testAll";

/// What the session should do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Preview a single algorithm and accept keyboard commands.
    Interact { algorithm: AlgorithmId },
    /// Render every algorithm of the catalog to its own video.
    TestAll,
}

/// Parsed command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub source: SourceSpec,
    pub mode: Mode,
}

impl Invocation {
    /// Parse the `[<source>] [<mode>]` command line tokens.
    ///
    /// # Arguments
    ///
    /// * `source` - file path or capture device index, device 0 if absent.
    /// * `mode` - `interact` (default), `testAll`, or an algorithm index to interact with.
    /// * `default_algorithm` - index used in interactive mode when the mode does not give one.
    pub fn from_tokens(
        source: Option<&str>,
        mode: Option<&str>,
        default_algorithm: usize,
    ) -> Result<Self> {
        let source = source.map(SourceSpec::parse).unwrap_or_default();

        let mode = match mode.unwrap_or(INTERACT) {
            INTERACT => Mode::Interact {
                algorithm: default_algorithm.into(),
            },
            TEST_ALL => Mode::TestAll,
            token if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) => {
                Mode::Interact {
                    algorithm: token
                        .parse()
                        .map_err(|_| Error::UnknownMode(token.to_string()))?,
                }
            }
            token => return Err(Error::UnknownMode(token.to_string())),
        };

        Ok(Self { source, mode })
    }
}

/// Output file for an algorithm, next to the source: `<stem>_<algorithm>.<extension>`.
pub fn output_path(source: &Path, algorithm: &str, extension: &str) -> PathBuf {
    let mut name = source.file_stem().unwrap_or_default().to_os_string();
    name.push(format!("_{algorithm}.{extension}"));
    source.with_file_name(name)
}

/// Result of one algorithm in a batch.
#[derive(Debug)]
pub struct BatchEntry {
    pub algorithm: &'static str,
    pub output: PathBuf,
    pub result: Result<RunSummary>,
}

/// Results of a batch session, in catalog order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }
}

/// Outcome of [`Session::execute`].
#[derive(Debug)]
pub enum SessionReport {
    Interactive(RunSummary),
    Batch(BatchReport),
}

/// Dispatches between interactive and batch sessions.
pub struct Session<'a> {
    registry: &'a Registry,
    settings: Settings,
}

impl<'a> Session<'a> {
    pub fn new(registry: &'a Registry, settings: Settings) -> Self {
        Self { registry, settings }
    }

    /// Run what the invocation asks for.
    pub fn execute(
        &self,
        media: &mut dyn MediaBackend,
        invocation: &Invocation,
    ) -> Result<SessionReport> {
        match &invocation.mode {
            Mode::Interact { algorithm } => self
                .run_interactive(media, invocation.source.clone(), algorithm)
                .map(SessionReport::Interactive),
            Mode::TestAll => self
                .run_batch(media, &invocation.source)
                .map(SessionReport::Batch),
        }
    }

    /// Preview a single algorithm.
    ///
    /// The preview window is opened only once the runner is fully configured, and destroyed
    /// when the run ends.
    pub fn run_interactive(
        &self,
        media: &mut dyn MediaBackend,
        source: SourceSpec,
        algorithm: &AlgorithmId,
    ) -> Result<RunSummary> {
        let mut runner = FlowRunner::new(self.registry, self.settings.clone());
        runner.configure(Some(source), Some(algorithm))?;

        let mut display = media.open_display(WINDOW_TITLE)?;

        let summary = runner.run(media, None, Some(display.as_mut() as &mut dyn Display));

        drop(display);

        summary
    }

    /// Render every algorithm of the catalog to a video next to the source.
    ///
    /// The source is decoded from the start for every algorithm, and each algorithm gets a
    /// fresh runner. A failing algorithm does not stop the remaining ones.
    pub fn run_batch(
        &self,
        media: &mut dyn MediaBackend,
        source: &SourceSpec,
    ) -> Result<BatchReport> {
        let path = match source {
            SourceSpec::File(path) => path,
            SourceSpec::Device(device) => {
                let e = Error::InvalidModeForSource {
                    mode: TEST_ALL,
                    device: *device,
                };
                error!("{}", e);
                return Err(e);
            }
        };

        let mut report = BatchReport::default();

        for desc in self.registry.list() {
            info!("Running {}", desc.name);

            let output = output_path(path, desc.name, &self.settings.output_extension);

            let mut runner = FlowRunner::new(self.registry, self.settings.clone());

            let result = runner
                .configure(Some(source.clone()), Some(&desc.index.into()))
                .and_then(|_| runner.run(media, Some(&output), None));

            if let Err(e) = &result {
                warn!("{} failed: {}", desc.name, e);
            }

            report.entries.push(BatchEntry {
                algorithm: desc.name,
                output,
                result,
            });
        }

        info!(
            "Done: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );

        Ok(report)
    }
}
