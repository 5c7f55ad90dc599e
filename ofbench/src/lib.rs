//! # Optical Flow Bench
//!
//! This library drives dense optical flow estimators over video, frame by frame, and renders
//! their output for live inspection or side by side comparison. The estimators themselves, and
//! video input and output, are provided by a backend implementing the traits in [`media`] and
//! [`estimator`].
//!
//! The easiest way to use the library is to import its prelude:
//!
//! ```
//! use ofbench::prelude::v1::*;
//! ```

pub mod config;
pub mod error;
pub mod estimator;
pub mod flow_field;
pub mod frame;
pub mod media;
pub mod registry;
pub mod runner;
pub mod session;
pub mod utils;
pub mod visualise;
pub mod warp;

pub mod prelude {
    pub mod v1 {
        pub use crate::{
            config::Settings,
            error::{Error, Result},
            estimator::FlowEstimator,
            flow_field::FlowField,
            frame::Frame,
            media::{Display, MediaBackend, SinkFormat, SourceSpec, VideoSink, VideoSource},
            registry::{AlgorithmDescriptor, AlgorithmId, Registry},
            runner::{FlowRunner, RunSummary},
            session::{Invocation, Mode, Session},
            visualise::{Caption, Composite},
        };
        pub use anyhow::anyhow;
    }
}
