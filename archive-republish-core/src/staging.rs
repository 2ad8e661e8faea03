//! Local staging copies of downloaded archives.
//!
//! ZIP readers need random access to the central directory at the end of the file, so
//! every archive is materialised on local disk first. The staging file is a
//! [`tempfile::NamedTempFile`]: it is removed when dropped, which covers every early
//! return in the pipeline.
//!
//! Layout: `<staging_dir>/<bucket>/<key parent dirs>/<key file name>.<random>.staging`.
//! The path is derived from the source so operators can tell which archive a leftover
//! directory belonged to; the random part keeps concurrent runs of the same key apart.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::contract::SourceReference;
use crate::error::AbortError;

/// Create an empty, uniquely named staging file for `source` under `staging_dir`.
///
/// Missing intermediate directories are created.
pub fn stage(staging_dir: &Path, source: &SourceReference) -> Result<NamedTempFile, AbortError> {
    let (dir, file_name) = staging_location(staging_dir, source);

    fs::create_dir_all(&dir).map_err(|e| AbortError::Staging {
        path: dir.clone(),
        source: e,
    })?;

    let staged = tempfile::Builder::new()
        .prefix(&format!("{file_name}."))
        .suffix(".staging")
        .tempfile_in(&dir)
        .map_err(|e| AbortError::Staging {
            path: dir.clone(),
            source: e,
        })?;

    debug!(path = %staged.path().display(), archive = %source, "Created staging file");
    Ok(staged)
}

/// Directory and file-name prefix used for `source`.
///
/// Key segments that could escape `staging_dir` (`..`, empty, `.`) are dropped.
pub fn staging_location(staging_dir: &Path, source: &SourceReference) -> (PathBuf, String) {
    let mut dir = staging_dir.join(sanitise_segment(&source.bucket));
    let mut segments: Vec<&str> = source
        .key
        .split('/')
        .filter(|s| !matches!(*s, "" | "." | ".."))
        .collect();
    let file_name = segments
        .pop()
        .map(sanitise_segment)
        .unwrap_or_else(|| "archive".to_string());
    for segment in segments {
        dir.push(sanitise_segment(segment));
    }
    (dir, file_name)
}

fn sanitise_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| if c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
