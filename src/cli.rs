///
/// This module implements the CLI for archive-republish: argument parsing, source
/// resolution, client construction, cancellation wiring and report output.
///
/// All pipeline logic lives in the [`archive-republish-core`] crate. This module is glue.
///
/// ## How To Use
/// - Command line: `archive-republish republish --event event.json` or
///   `archive-republish republish --bucket b --key folder/1.zip`.
/// - Programmatic/integration use: call [`run`] with a constructed [`Cli`], or
///   [`republish`] with any `ObjectStore`.
///
/// [`archive-republish-core`]: ../../archive-republish-core/
use crate::event::load_event;
use crate::load_config::{default_config, load_config};
use crate::s3::S3Store;
use anyhow::Result;
use archive_republish_core::cancel::CancellationToken;
use archive_republish_core::config::PipelineConfig;
use archive_republish_core::contract::{ObjectStore, SourceReference};
use archive_republish_core::error::PipelineError;
use archive_republish_core::pipeline::{Pipeline, RunReport};
use clap::{Parser, Subcommand};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

/// CLI for archive-republish: extract matching archive entries and publish them as objects.
#[derive(Parser)]
#[clap(
    name = "archive-republish",
    version,
    about = "Extract matching entries from an archive in object storage and republish each as its own object"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process one archive named by an event file or by bucket and key
    Republish {
        /// Path to the YAML config file (defaults apply when omitted)
        #[clap(long)]
        config: Option<PathBuf>,
        /// Path to a JSON trigger event (S3 notification or {"bucket","key"})
        #[clap(long, conflicts_with_all = ["bucket", "key"])]
        event: Option<PathBuf>,
        /// Bucket holding the archive
        #[clap(long, requires = "key")]
        bucket: Option<String>,
        /// Object key of the archive, already unescaped
        #[clap(long, requires = "bucket")]
        key: Option<String>,
        /// Stop between entries once this many seconds have passed
        #[clap(long)]
        deadline_secs: Option<u64>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Republish {
            config,
            event,
            bucket,
            key,
            deadline_secs,
        } => {
            let source = resolve_source(event, bucket, key)?;
            let config = match config {
                Some(path) => load_config(path)?,
                None => default_config()?,
            };
            tracing::info!(command = "republish", archive = %source, "Starting republish");

            let store = S3Store::connect(&config.store).await;
            let cancel = arm_cancellation(deadline_secs.map(Duration::from_secs));
            let report = republish(store, config.pipeline, &source, &cancel).await?;
            tracing::info!(
                command = "republish",
                processed = report.processed,
                "Republish complete"
            );
            Ok(())
        }
    }
}

fn resolve_source(
    event: Option<PathBuf>,
    bucket: Option<String>,
    key: Option<String>,
) -> Result<SourceReference> {
    match (event, bucket, key) {
        (Some(path), _, _) => load_event(path),
        (None, Some(bucket), Some(key)) => Ok(SourceReference::new(bucket, key)),
        _ => anyhow::bail!("Either --event or both --bucket and --key must be given"),
    }
}

/// Run the pipeline for `source`, print the report as JSON on stdout, and turn any
/// failure into an error.
pub async fn republish<S>(
    store: S,
    config: PipelineConfig,
    source: &SourceReference,
    cancel: &CancellationToken,
) -> Result<RunReport>
where
    S: ObjectStore,
{
    let pipeline = Pipeline::new(store, config);
    match pipeline.run(source, cancel).await {
        Ok(report) => {
            print_report(&report)?;
            Ok(report)
        }
        Err(PipelineError::Incomplete(report)) => {
            print_report(&report)?;
            for failure in &report.failures {
                tracing::error!(
                    entry = %failure.entry_name,
                    destination = %failure.destination,
                    error = %failure.error,
                    "Entry not republished"
                );
            }
            Err(anyhow::Error::new(PipelineError::Incomplete(report)))
        }
        Err(e) => {
            tracing::error!(error = %e, "Republish aborted");
            Err(anyhow::Error::new(e))
        }
    }
}

fn print_report(report: &RunReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Exit status after a forced interrupt (128 + SIGINT).
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// How the interrupt watcher finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptOutcome {
    /// Signals could not be received; the token was left alone.
    SignalUnavailable,
    /// First interrupt cancelled the token and no second one arrived.
    Cancelled,
    /// A second interrupt arrived while the run was still going.
    Forced,
}

/// Cancel `token` on the first interrupt and report a second one as [`InterruptOutcome::Forced`].
///
/// The token is only checked between entries, so a stalled transfer needs the second
/// interrupt to stop the process.
pub async fn watch_interrupts<F, Fut>(
    mut next_interrupt: F,
    token: CancellationToken,
) -> InterruptOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = next_interrupt().await {
        tracing::warn!(error = %e, "Could not listen for interrupts");
        return InterruptOutcome::SignalUnavailable;
    }
    tracing::warn!(
        "Interrupt received, stopping at the next entry boundary; interrupt again to exit"
    );
    token.cancel();

    match next_interrupt().await {
        Ok(()) => {
            tracing::error!("Second interrupt received, exiting immediately");
            InterruptOutcome::Forced
        }
        Err(_) => InterruptOutcome::Cancelled,
    }
}

/// Token cancelled by Ctrl-C or, when given, after `deadline`. A second Ctrl-C exits.
pub fn arm_cancellation(deadline: Option<Duration>) -> CancellationToken {
    let token = CancellationToken::new();

    let on_signal = token.clone();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, on_signal).await == InterruptOutcome::Forced {
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    });

    if let Some(deadline) = deadline {
        let on_deadline = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            tracing::warn!(
                deadline_secs = deadline.as_secs(),
                "Deadline reached, stopping at the next entry boundary"
            );
            on_deadline.cancel();
        });
    }

    token
}
