use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::NamedTempFile;

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("archive-republish").expect("Binary exists");
    cmd.env_remove("S3_ACCESS_KEY_ID")
        .env_remove("S3_SECRET_ACCESS_KEY")
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn help_lists_republish_subcommand() {
    bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("republish"));
}

#[test]
fn republish_without_source_fails_with_usage_hint() {
    bin()
        .arg("republish")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--event").and(predicate::str::contains("--bucket")));
}

#[test]
fn bucket_without_key_is_rejected_by_argument_parser() {
    bin()
        .args(["republish", "--bucket", "b"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn event_conflicts_with_bucket_and_key() {
    let event = NamedTempFile::new().expect("temp event");
    write(event.path(), r#"{"bucket":"b","key":"k.zip"}"#).unwrap();
    bin()
        .args(["republish", "--bucket", "b", "--key", "k.zip", "--event"])
        .arg(event.path())
        .assert()
        .failure()
        .code(2);
}

#[test]
fn unreadable_event_file_fails_before_any_network_call() {
    bin()
        .args(["republish", "--event", "/definitely/not/here.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read event file"));
}

#[test]
fn invalid_config_file_is_reported() {
    let config = NamedTempFile::new().expect("temp config");
    write(config.path(), b"pipeline: [:::").unwrap();
    bin()
        .args(["republish", "--bucket", "b", "--key", "k.zip", "--config"])
        .arg(config.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config YAML"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Layer that records the debug rendering of every event.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use archive_republish::cli::{run, Cli, Commands};

    // No source given, so the run fails right after start-up.
    let cli = Cli {
        command: Commands::Republish {
            config: None,
            event: None,
            bucket: None,
            key: None,
            deadline_secs: None,
        },
    };

    assert!(run(cli).await.is_err());

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}

#[test]
fn log_format_parsing_falls_back_to_human() {
    use archive_republish::logging::OutputFormat;
    assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
    assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
    assert_eq!("pretty".parse::<OutputFormat>(), Ok(OutputFormat::Human));
}

mod interrupts {
    use archive_republish::cli::{watch_interrupts, InterruptOutcome};
    use archive_republish_core::cancel::CancellationToken;
    use std::io;

    /// Signal source yielding `Ok` for the first `interrupts` calls, then an error.
    fn signals(interrupts: usize) -> impl FnMut() -> std::future::Ready<io::Result<()>> {
        let mut calls = 0;
        move || {
            calls += 1;
            std::future::ready(if calls <= interrupts {
                Ok(())
            } else {
                Err(io::Error::other("signal stream closed"))
            })
        }
    }

    #[tokio::test]
    async fn first_interrupt_cancels_run() {
        let token = CancellationToken::new();
        let outcome = watch_interrupts(signals(1), token.clone()).await;
        assert_eq!(outcome, InterruptOutcome::Cancelled);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn second_interrupt_forces_exit() {
        let token = CancellationToken::new();
        let outcome = watch_interrupts(signals(2), token.clone()).await;
        assert_eq!(outcome, InterruptOutcome::Forced);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn unavailable_signals_leave_token_alone() {
        let token = CancellationToken::new();
        let outcome = watch_interrupts(signals(0), token.clone()).await;
        assert_eq!(outcome, InterruptOutcome::SignalUnavailable);
        assert!(!token.is_cancelled());
    }
}
