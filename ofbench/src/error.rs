//! # Error types

use thiserror::Error;

/// Precondition that was missing when a run was requested.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingSetting {
    #[error("algorithm not set")]
    Algorithm,
    #[error("input not set")]
    Input,
}

/// Errors produced by the harness.
#[derive(Error, Debug)]
pub enum Error {
    /// The runner was asked to run without an algorithm or an input.
    #[error("configuration error: {0}")]
    Configuration(MissingSetting),

    /// The identifier does not name an implemented catalog entry.
    #[error("unknown algorithm {0}")]
    UnknownAlgorithm(String),

    /// An estimator failed on a frame pair.
    #[error("estimation failed: {0}")]
    Estimation(#[source] anyhow::Error),

    /// Batch mode was requested against a live capture device.
    #[error("mode {mode} requires a file input, got capture device {device}")]
    InvalidModeForSource { mode: &'static str, device: u32 },

    /// The mode token on the command line is not recognised.
    #[error("unknown mode {0:?}")]
    UnknownMode(String),

    /// Two buffers that must share dimensions do not.
    #[error("dimension mismatch: expected {expected:?}, got {got:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },

    /// Failure reported by a media collaborator (source, sink or display).
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
