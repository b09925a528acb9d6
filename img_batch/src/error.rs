//! Error types for batch conversion.
//!
//! `JobError` is raised while building a job and stops the run before any file
//! is touched. `UnitError` belongs to a single (input, format) unit and is only
//! ever recorded in that unit's outcome.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Input directory not found or unreadable: {}", path.display())]
    DirectoryNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Output directory is not writable: {} ({reason})", path.display())]
    OutputDirUnwritable { path: PathBuf, reason: String },

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("No output format selected")]
    NoTargetFormats,

    #[error("Invalid scale factor {0}: must be a positive percentage")]
    InvalidScale(f64),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("No free output name for {base} after 9999 conflicting names")]
    NameSpaceExhausted { base: String },

    #[error("Failed to decode image: {0}")]
    DecodeFailure(String),

    #[error("Failed to encode image: {0}")]
    EncodeFailure(String),

    #[error("Failed to write output: {0}")]
    WriteFailure(String),
}

impl UnitError {
    /// Stable identifier used in log lines and the JSON report.
    pub fn kind(&self) -> &'static str {
        match self {
            UnitError::NameSpaceExhausted { .. } => "NameSpaceExhausted",
            UnitError::DecodeFailure(_) => "DecodeFailure",
            UnitError::EncodeFailure(_) => "EncodeFailure",
            UnitError::WriteFailure(_) => "WriteFailure",
        }
    }
}

pub type Result<T> = std::result::Result<T, JobError>;
