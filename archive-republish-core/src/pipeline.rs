//! High-level pipeline: download, open, filter, read and publish for one archive.
//!
//! This module wires the store client, the staging area, the archive reader, the entry
//! filter and the key deriver into a single run:
//!   - Stages the source archive on local disk via [`ObjectStore::download`]
//!   - Opens it as a ZIP archive and walks its entries in native order
//!   - Skips entries the [`EntryFilter`] rejects; reads the rest into memory (bounded)
//!   - Publishes each accepted entry to the key produced by [`KeyDeriver`]
//!   - Aggregates a [`RunReport`] of what was published, skipped and failed
//!
//! # Error Handling
//! Staging, download and archive-open failures abort the run with
//! [`PipelineError::Aborted`] before anything is published. Per-entry failures are
//! collected and the run continues; any of them turns the result into
//! [`PipelineError::Incomplete`] carrying the full report.
//!
//! # Cancellation
//! The [`CancellationToken`] is checked before staging and before each entry. A run is
//! never interrupted in the middle of an entry.
//!
//! # Cleanup
//! The staging copy is owned by the [`ArchiveHandle`] (or, before it is opened, by a
//! temp-file guard), so it is removed on every exit path.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::archive::ArchiveHandle;
use crate::cancel::CancellationToken;
use crate::config::PipelineConfig;
use crate::contract::{DestinationReference, ObjectStore, SourceReference};
use crate::error::{AbortError, EntryError, PipelineError};
use crate::filter::EntryFilter;
use crate::key::KeyDeriver;
use crate::staging;

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub source: SourceReference,
    /// Entries published successfully.
    pub processed: usize,
    /// Entries rejected by the filter.
    pub skipped: usize,
    pub published: Vec<DestinationReference>,
    pub failures: Vec<EntryFailure>,
    /// Set when the run stopped before reaching the end of the archive.
    pub stopped: Option<StopReason>,
}

impl RunReport {
    fn new(source: SourceReference) -> Self {
        Self {
            source,
            processed: 0,
            skipped: 0,
            published: Vec::new(),
            failures: Vec::new(),
            stopped: None,
        }
    }

    /// True when every accepted entry was published and the archive was fully walked.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.stopped.is_none()
    }
}

/// An accepted entry that was not published.
///
/// Carries enough to re-run just this entry: its name, the destination it was meant for,
/// and why it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryFailure {
    pub entry_name: String,
    pub destination: DestinationReference,
    pub error: EntryError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Cancelled,
    FailFast,
}

/// Extract-and-republish pipeline over an injected store client.
pub struct Pipeline<S> {
    store: S,
    config: PipelineConfig,
    filter: EntryFilter,
    deriver: KeyDeriver,
}

impl<S> Pipeline<S>
where
    S: ObjectStore,
{
    pub fn new(store: S, config: PipelineConfig) -> Self {
        let filter = EntryFilter::from_config(&config.filter);
        let deriver = KeyDeriver::new(filter.media_type())
            .with_destination_bucket(config.destination_bucket.clone());
        Self {
            store,
            config,
            filter,
            deriver,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one archive end to end.
    pub async fn run(
        &self,
        source: &SourceReference,
        cancel: &CancellationToken,
    ) -> Result<RunReport, PipelineError> {
        info!(bucket = %source.bucket, key = %source.key, "[REPUBLISH] Starting run");

        if cancel.is_cancelled() {
            warn!(archive = %source, "[REPUBLISH] Cancelled before staging");
            return Err(AbortError::Cancelled.into());
        }

        // --- Step 1: Stage and download ---
        let staged = staging::stage(&self.config.staging_dir, source).map_err(|e| {
            error!(
                error = ?e,
                archive = %source,
                "[REPUBLISH][ERROR] Could not create staging file"
            );
            e
        })?;
        debug!(path = %staged.path().display(), "[REPUBLISH] Downloading archive");

        if let Err(e) = self.store.download(source, staged.path()).await {
            error!(error = %e, archive = %source, "[REPUBLISH][ERROR] Download failed");
            return Err(AbortError::DownloadFailed {
                archive: source.clone(),
                error: e,
            }
            .into());
        }

        // --- Step 2: Open ---
        let mut archive = ArchiveHandle::open(staged).map_err(|e| {
            error!(error = %e, archive = %source, "[REPUBLISH][ERROR] Not a readable archive");
            AbortError::InvalidArchive {
                archive: source.clone(),
                source: e,
            }
        })?;
        info!(entries = archive.len(), "[REPUBLISH] Opened archive");

        // --- Step 3: Walk entries ---
        let mut report = RunReport::new(source.clone());
        loop {
            let Some(entry) = archive.next_entry() else {
                break;
            };
            // Only a run with entries left counts as stopped.
            if cancel.is_cancelled() {
                warn!(
                    processed = report.processed,
                    entry = %entry.name(),
                    "[REPUBLISH] Cancelled at entry boundary"
                );
                report.stopped = Some(StopReason::Cancelled);
                break;
            }

            let entry_name = entry.name().to_owned();
            if !self.filter.accepts(&entry_name) {
                debug!(entry = %entry_name, "[REPUBLISH] Skipping entry rejected by filter");
                report.skipped += 1;
                continue;
            }

            let destination = self.deriver.derive(source, &entry_name);
            let content = match entry.read(self.config.max_entry_bytes) {
                Ok(content) => content,
                Err(e) => {
                    warn!(
                        entry = %entry_name,
                        error = %e,
                        "[REPUBLISH] Entry not readable, skipping"
                    );
                    report.failures.push(EntryFailure {
                        entry_name,
                        destination,
                        error: e,
                    });
                    continue;
                }
            };

            let size = content.len();
            match self.store.upload(content, &destination).await {
                Ok(()) => {
                    info!(
                        entry = %entry_name,
                        destination = %destination,
                        size,
                        "[REPUBLISH] Published entry"
                    );
                    report.processed += 1;
                    report.published.push(destination);
                }
                Err(e) => {
                    error!(
                        entry = %entry_name,
                        destination = %destination,
                        error = %e,
                        "[REPUBLISH][ERROR] Publish failed"
                    );
                    report.failures.push(EntryFailure {
                        entry_name,
                        destination,
                        error: EntryError::Publish { error: e },
                    });
                    if self.config.fail_fast {
                        report.stopped = Some(StopReason::FailFast);
                        break;
                    }
                }
            }
        }

        // --- Step 4: Release the staging copy ---
        let staging_path = archive.path().to_path_buf();
        if let Err(e) = archive.close() {
            warn!(
                error = %e,
                path = %staging_path.display(),
                "[REPUBLISH] Could not remove staging file"
            );
        }

        info!(
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failures.len(),
            "[REPUBLISH] Run finished"
        );

        if report.is_success() {
            Ok(report)
        } else {
            Err(PipelineError::Incomplete(report))
        }
    }
}
