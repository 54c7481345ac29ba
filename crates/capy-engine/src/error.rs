//! Error types for capy-engine

use std::num::{ParseFloatError, ParseIntError};
use std::process::ExitStatus;

/// Errors raised while setting up or querying a data source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{program} exited with {status}")]
    CommandFailed { program: String, status: ExitStatus },

    #[error("unexpected output: {0:?}")]
    UnexpectedOutput(String),

    #[error("integer parse error: {0}")]
    ParseInt(#[from] ParseIntError),

    #[error("float parse error: {0}")]
    ParseFloat(#[from] ParseFloatError),

    #[error("watch error: {0}")]
    Watch(String),

    #[error("missing field: {0}")]
    MissingField(&'static str),
}

/// Errors raised by a display sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{program} exited with {status}")]
    CommandFailed { program: String, status: ExitStatus },
}
