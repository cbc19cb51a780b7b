use std::path::PathBuf;
use thiserror::Error;

use crate::processor::ProcessingStatus;

/// Reasons the stream selector can refuse a probed file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No video stream found")]
    NoVideoStream,

    #[error("No matching streams found for the requested languages")]
    NoMatchingStreams,
}

/// Errors that abort the processing of a single file.
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Probe failed for '{}': {reason}", .path.display())]
    Probe { path: PathBuf, reason: String },

    #[error("Stream selection failed for '{}': {source}", .path.display())]
    Selection {
        path: PathBuf,
        #[source]
        source: SelectionError,
    },

    #[error("Remux failed for '{}': {reason}", .path.display())]
    Remux { path: PathBuf, reason: String },

    #[error("Verification failed for '{}': {reason}", .path.display())]
    Verification { path: PathBuf, reason: String },

    #[error("Unusable output path '{}': {reason}", .path.display())]
    Output { path: PathBuf, reason: String },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: ProcessingStatus,
        to: ProcessingStatus,
    },
}

impl ProcessingError {
    pub fn probe(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Probe { path: path.into(), reason: reason.into() }
    }

    pub fn remux(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Remux { path: path.into(), reason: reason.into() }
    }

    pub fn verification(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Verification { path: path.into(), reason: reason.into() }
    }

    pub fn output(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Output { path: path.into(), reason: reason.into() }
    }
}

/// Crate-level errors: configuration, pre-flight and I/O around the batch.
#[derive(Error, Debug)]
pub enum TrackstripError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Required tool not found on PATH: {0}")]
    ToolNotFound(String),

    #[error("Unable to create output directory '{}': {source}", .path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input path does not exist: {}", .0.display())]
    InputNotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, TrackstripError>;
