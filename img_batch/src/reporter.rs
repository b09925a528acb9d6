//! Per-unit outcomes, live progress events and the persisted run log.

use crate::error::UnitError;
use crate::formats::TargetFormat;
use serde::Serialize;
use shared_utils::BatchCounts;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

pub const LOG_FILE_NAME: &str = "image_conversion_log.txt";
pub const JSON_REPORT_FILE_NAME: &str = "image_conversion_log.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Succeeded => "succeeded",
            OutcomeStatus::Failed => "failed",
        }
    }
}

/// Result of one (input, format) unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    /// Position of the unit in planning order.
    pub index: usize,
    pub input: PathBuf,
    pub format: TargetFormat,
    pub result: Result<PathBuf, UnitError>,
}

impl FileOutcome {
    pub fn succeeded(index: usize, input: &Path, format: TargetFormat, output: PathBuf) -> Self {
        Self {
            index,
            input: input.to_path_buf(),
            format,
            result: Ok(output),
        }
    }

    pub fn failed(index: usize, input: &Path, format: TargetFormat, error: UnitError) -> Self {
        Self {
            index,
            input: input.to_path_buf(),
            format,
            result: Err(error),
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        match self.result {
            Ok(_) => OutcomeStatus::Succeeded,
            Err(_) => OutcomeStatus::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn output(&self) -> Option<&Path> {
        self.result.as_ref().ok().map(PathBuf::as_path)
    }

    pub fn error(&self) -> Option<&UnitError> {
        self.result.as_ref().err()
    }
}

/// Snapshot handed to observers after each unit completes.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub processed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcome: FileOutcome,
}

pub trait ProgressObserver: Send {
    fn on_progress(&mut self, event: &ProgressEvent);
}

impl<F> ProgressObserver for F
where
    F: FnMut(&ProgressEvent) + Send,
{
    fn on_progress(&mut self, event: &ProgressEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub outcomes: Vec<FileOutcome>,
    pub counts: BatchCounts,
    /// Units planned for the run, including those never started.
    pub total_units: usize,
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.counts.succeeded
    }

    pub fn failed(&self) -> usize {
        self.counts.failed
    }
}

/// Collects outcomes for one run and fans progress out to observers.
#[derive(Default)]
pub struct Reporter {
    observers: Vec<Box<dyn ProgressObserver>>,
    outcomes: Vec<FileOutcome>,
    counts: BatchCounts,
    total: usize,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_observer<O>(&mut self, observer: O)
    where
        O: ProgressObserver + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Resets the run state; observers stay registered.
    pub fn start(&mut self, total: usize) {
        self.total = total;
        self.outcomes.clear();
        self.counts = BatchCounts::new();
    }

    pub fn on_unit_complete(&mut self, outcome: FileOutcome) {
        match &outcome.result {
            Ok(output) => {
                self.counts.success();
                tracing::info!(
                    input = %outcome.input.display(),
                    output = %output.display(),
                    format = %outcome.format,
                    "Converted"
                );
            }
            Err(error) => {
                self.counts.fail();
                tracing::warn!(
                    input = %outcome.input.display(),
                    format = %outcome.format,
                    kind = error.kind(),
                    error = %error,
                    "Conversion failed"
                );
            }
        }
        self.outcomes.push(outcome.clone());

        let event = ProgressEvent {
            processed: self.outcomes.len(),
            total: self.total,
            succeeded: self.counts.succeeded,
            failed: self.counts.failed,
            outcome,
        };
        for observer in self.observers.iter_mut() {
            observer.on_progress(&event);
        }
    }

    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    /// Hands the recorded outcomes over as a summary, ordered by unit index.
    pub fn finish(&mut self, cancelled: bool) -> BatchSummary {
        let mut outcomes = std::mem::take(&mut self.outcomes);
        outcomes.sort_by_key(|o| o.index);
        BatchSummary {
            outcomes,
            counts: std::mem::take(&mut self.counts),
            total_units: self.total,
            cancelled,
        }
    }
}

/// Renders the run log: one tab-separated line per outcome, in summary order.
///
/// `status  format  input  output-or-error`
pub fn finalize(summary: &BatchSummary) -> String {
    let mut text = String::new();
    for outcome in &summary.outcomes {
        let detail = match &outcome.result {
            Ok(output) => output.display().to_string(),
            Err(error) => format!("{}: {}", error.kind(), error),
        };
        // Writing into a String cannot fail.
        let _ = writeln!(
            text,
            "{}\t{}\t{}\t{}",
            outcome.status().as_str(),
            outcome.format,
            outcome.input.display(),
            detail
        );
    }
    text
}

/// Writes the finalized log into `dir`, replacing any previous run's log.
pub fn write_log(summary: &BatchSummary, dir: &Path) -> std::io::Result<PathBuf> {
    let path = dir.join(LOG_FILE_NAME);
    std::fs::write(&path, finalize(summary))?;
    Ok(path)
}

#[derive(Debug, Serialize)]
struct UnitRecord<'a> {
    input: &'a Path,
    format: TargetFormat,
    status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    total_units: usize,
    counts: &'a BatchCounts,
    cancelled: bool,
    units: Vec<UnitRecord<'a>>,
}

/// Writes the machine-readable report into `dir`, replacing any previous one.
pub fn write_json_report(summary: &BatchSummary, dir: &Path) -> std::io::Result<PathBuf> {
    let report = JsonReport {
        generated_at: chrono::Local::now().to_rfc3339(),
        total_units: summary.total_units,
        counts: &summary.counts,
        cancelled: summary.cancelled,
        units: summary
            .outcomes
            .iter()
            .map(|o| UnitRecord {
                input: &o.input,
                format: o.format,
                status: o.status(),
                output: o.output(),
                error_kind: o.error().map(UnitError::kind),
                error: o.error().map(ToString::to_string),
            })
            .collect(),
    };

    let path = dir.join(JSON_REPORT_FILE_NAME);
    let mut writer = std::io::BufWriter::new(std::fs::File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, &report)?;
    writer.flush()?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn ok(index: usize, name: &str) -> FileOutcome {
        FileOutcome::succeeded(
            index,
            &PathBuf::from(format!("/in/{}.png", name)),
            TargetFormat::Jpeg,
            PathBuf::from(format!("/out/{}.jpg", name)),
        )
    }

    fn bad(index: usize, name: &str) -> FileOutcome {
        FileOutcome::failed(
            index,
            &PathBuf::from(format!("/in/{}.png", name)),
            TargetFormat::Jpeg,
            UnitError::DecodeFailure("corrupt header".to_string()),
        )
    }

    #[test]
    fn test_counts_and_order() {
        let mut reporter = Reporter::new();
        reporter.start(3);
        reporter.on_unit_complete(ok(0, "a"));
        reporter.on_unit_complete(bad(1, "b"));
        reporter.on_unit_complete(ok(2, "c"));

        assert_eq!(reporter.processed(), 3);
        let summary = reporter.finish(false);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.total_units, 3);
        assert!(!summary.cancelled);
        let indices: Vec<usize> = summary.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_finish_orders_by_index() {
        let mut reporter = Reporter::new();
        reporter.start(3);
        reporter.on_unit_complete(ok(2, "c"));
        reporter.on_unit_complete(ok(0, "a"));
        reporter.on_unit_complete(ok(1, "b"));

        let summary = reporter.finish(false);
        let indices: Vec<usize> = summary.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_observer_sees_every_unit() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut reporter = Reporter::new();
        reporter.register_observer(move |event: &ProgressEvent| {
            sink.lock().unwrap().push((
                event.processed,
                event.total,
                event.failed,
                event.outcome.status(),
            ));
        });
        reporter.start(2);
        reporter.on_unit_complete(bad(0, "a"));
        reporter.on_unit_complete(ok(1, "b"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (1, 2, 1, OutcomeStatus::Failed),
                (2, 2, 1, OutcomeStatus::Succeeded)
            ]
        );
    }

    #[test]
    fn test_finalize_lines() {
        let mut reporter = Reporter::new();
        reporter.start(2);
        reporter.on_unit_complete(ok(0, "a"));
        reporter.on_unit_complete(bad(1, "b"));
        let summary = reporter.finish(false);

        let log = finalize(&summary);
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "succeeded\tjpg\t/in/a.png\t/out/a.jpg");
        assert_eq!(
            lines[1],
            "failed\tjpg\t/in/b.png\tDecodeFailure: Failed to decode image: corrupt header"
        );
    }

    #[test]
    fn test_finalize_empty_summary() {
        let summary = Reporter::new().finish(false);
        assert_eq!(finalize(&summary), "");
    }

    #[test]
    fn test_write_log_overwrites() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(LOG_FILE_NAME), "stale content\n".repeat(50)).unwrap();

        let mut reporter = Reporter::new();
        reporter.start(1);
        reporter.on_unit_complete(ok(0, "a"));
        let summary = reporter.finish(false);

        let path = write_log(&summary, temp.path()).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), finalize(&summary));
    }

    #[test]
    fn test_json_report() {
        let temp = TempDir::new().unwrap();
        let mut reporter = Reporter::new();
        reporter.start(3);
        reporter.on_unit_complete(ok(0, "a"));
        reporter.on_unit_complete(bad(1, "b"));
        let summary = reporter.finish(true);

        let path = write_json_report(&summary, temp.path()).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();

        assert_eq!(value["total_units"], 3);
        assert_eq!(value["cancelled"], true);
        assert_eq!(value["counts"]["succeeded"], 1);
        assert_eq!(value["units"][0]["status"], "succeeded");
        assert_eq!(value["units"][0]["format"], "jpeg");
        assert_eq!(value["units"][1]["error_kind"], "DecodeFailure");
        assert!(value["units"][1].get("output").is_none());
    }

    #[test]
    fn test_json_report_larger_than_write_buffer() {
        let temp = TempDir::new().unwrap();
        let mut reporter = Reporter::new();
        reporter.start(500);
        for i in 0..500 {
            reporter.on_unit_complete(ok(i, &format!("image_{:04}", i)));
        }
        let summary = reporter.finish(false);

        let path = write_json_report(&summary, temp.path()).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.len() > 8 * 1024);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["units"].as_array().unwrap().len(), 500);
    }

    #[test]
    fn test_json_report_into_missing_dir_fails() {
        let temp = TempDir::new().unwrap();
        let summary = Reporter::new().finish(false);
        assert!(write_json_report(&summary, &temp.path().join("missing")).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn finalize_is_pure(flags in prop::collection::vec(any::<bool>(), 0..40)) {
            let mut reporter = Reporter::new();
            reporter.start(flags.len());
            for (i, success) in flags.iter().enumerate() {
                let name = format!("f{}", i);
                reporter.on_unit_complete(if *success { ok(i, &name) } else { bad(i, &name) });
            }
            let summary = reporter.finish(false);

            let first = finalize(&summary);
            let second = finalize(&summary.clone());
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.lines().count(), flags.len());
            prop_assert_eq!(
                first.lines().filter(|l| l.starts_with("failed")).count(),
                flags.iter().filter(|s| !**s).count()
            );
        }
    }
}
