//! Run and compare OpenCV dense optical flow estimators on a video or a camera.
//!
//! Interactive keys: `t` toggles temporal propagation, `1`-`8` switch algorithm, `ESC` exits.

use clap::{crate_authors, crate_version, Arg, Command};
use log::*;
use ofbench::prelude::v1::*;
use ofbench::session::SessionReport;
use std::path::Path;

mod capture;
mod convert;
mod estimators;
mod highgui;

/// OpenCV backed media.
struct CvMedia {
    fourcc: String,
}

impl MediaBackend for CvMedia {
    fn open_source(&mut self, spec: &SourceSpec) -> anyhow::Result<Box<dyn VideoSource>> {
        Ok(Box::new(capture::CvSource::open(spec)?))
    }

    fn open_sink(
        &mut self,
        path: &Path,
        format: SinkFormat,
    ) -> anyhow::Result<Box<dyn VideoSink>> {
        Ok(Box::new(capture::CvSink::create(path, &self.fourcc, format)?))
    }

    fn open_display(&mut self, title: &str) -> anyhow::Result<Box<dyn Display>> {
        Ok(Box::new(highgui::Window::open(title)?))
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = Command::new("ofbench-cv")
        .version(crate_version!())
        .author(crate_authors!())
        .arg(Arg::new("source").help("video file, or camera index (default: 0)"))
        .arg(Arg::new("mode").help("interact (default), testAll, or an algorithm index"))
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .takes_value(true)
                .help("JSON settings file"),
        )
        .arg(
            Arg::new("propagate")
                .long("propagate")
                .short('p')
                .help("start with temporal propagation on"),
        )
        .arg(
            Arg::new("dark-background")
                .long("dark-background")
                .short('d')
                .help("encode magnitude as brightness on black"),
        )
        .arg(
            Arg::new("step")
                .long("step")
                .short('s')
                .takes_value(true)
                .help("arrow grid spacing in pixels"),
        )
        .get_matches();

    let mut settings = match matches.value_of("config") {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    if matches.is_present("propagate") {
        settings.propagate = true;
    }

    if matches.is_present("dark-background") {
        settings.dark_background = true;
    }

    if let Some(step) = matches.value_of("step") {
        settings.arrow_step = step.parse()?;
    }

    let invocation = Invocation::from_tokens(
        matches.value_of("source"),
        matches.value_of("mode"),
        settings.default_algorithm,
    )?;

    let registry = Registry::new(estimators::create);

    info!(
        "algorithms: {}",
        registry
            .list()
            .map(|d| format!("{}={}", d.index, d.name))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut media = CvMedia {
        fourcc: settings.output_fourcc.clone(),
    };

    match Session::new(&registry, settings).execute(&mut media, &invocation)? {
        SessionReport::Interactive(summary) => {
            info!("{} frames", summary.frames);
        }
        SessionReport::Batch(report) => {
            for entry in &report.entries {
                match &entry.result {
                    Ok(summary) => info!(
                        "{}: {} frames -> {}",
                        entry.algorithm,
                        summary.composed,
                        entry.output.display()
                    ),
                    Err(e) => error!("{}: {}", entry.algorithm, e),
                }
            }

            if report.failed() > 0 {
                return Err(anyhow!("{} algorithms failed", report.failed()));
            }
        }
    }

    Ok(())
}
