//! Error types for the republish pipeline.
//!
//! Failures come in two classes. [`AbortError`] means the run stopped before any entry
//! was published. [`EntryError`] belongs to a single entry and is collected into the
//! run report while iteration continues. [`PipelineError`] tags the two so callers can
//! tell "nothing happened" from "partially happened".

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::contract::SourceReference;
use crate::pipeline::RunReport;

/// Errors reported by an [`crate::contract::ObjectStore`].
///
/// The pipeline treats every kind as an opaque failure and never retries.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("transient store failure: {0}")]
    Transient(String),
}

/// Why a single entry was not published.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryError {
    /// The entry's uncompressed size is over the configured limit.
    #[error("entry is {size} bytes, over the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    /// The entry's bytes could not be decoded from the archive.
    #[error("could not read entry from archive: {message}")]
    Read { message: String },

    /// The store rejected the upload.
    #[error("publish failed: {error}")]
    Publish { error: StoreError },
}

/// Fatal failures: the run ended before publishing anything.
#[derive(Error, Debug)]
pub enum AbortError {
    #[error("run cancelled before processing started")]
    Cancelled,

    #[error("could not create staging file under {path}")]
    Staging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("download of {archive} failed")]
    DownloadFailed {
        archive: SourceReference,
        #[source]
        error: StoreError,
    },

    #[error("{archive} is not a readable archive")]
    InvalidArchive {
        archive: SourceReference,
        #[source]
        source: zip::result::ZipError,
    },
}

/// Result of a run that did not fully succeed.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Aborted(#[from] AbortError),

    #[error(
        "run for {} incomplete: {} published, {} failed",
        .0.source, .0.processed, .0.failures.len()
    )]
    Incomplete(RunReport),
}

impl PipelineError {
    /// The partial report, when some entries may have been published.
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            PipelineError::Aborted(_) => None,
            PipelineError::Incomplete(report) => Some(report),
        }
    }
}
