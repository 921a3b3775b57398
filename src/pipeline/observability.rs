use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::PipelineError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal, e.g. a skipped row).
    Warning,
    /// Error-level event (run failed).
    Error,
    /// Critical error (I/O or resource failures).
    Critical,
}

/// Context about a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Description of the source (usually its path).
    pub source: String,
    /// Description of the sink (usually its path).
    pub sink: String,
    /// Operator names, in chain order.
    pub operators: Vec<String>,
}

/// Stats reported when a run finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStats {
    /// Records pulled from the source.
    pub records_read: u64,
    /// Records that reached the sink.
    pub records_written: u64,
    /// Records dropped by an operator.
    pub records_dropped: u64,
    /// Undecodable rows skipped under [`super::RowDecodePolicy::Skip`].
    pub rows_skipped: u64,
}

/// Observer interface for pipeline outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait PipelineObserver: Send + Sync {
    /// Called when a run succeeds.
    fn on_success(&self, _ctx: &RunContext, _stats: RunStats) {}

    /// Called when a run fails.
    fn on_failure(&self, _ctx: &RunContext, _severity: Severity, _error: &PipelineError) {}

    /// Called when a run failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &RunContext, severity: Severity, error: &PipelineError) {
        self.on_failure(ctx, severity, error)
    }

    /// Called for every undecodable row that the run skips.
    fn on_row_skipped(&self, _ctx: &RunContext, _row: u64, _error: &PipelineError) {}
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        })
    }
}

/// Forwards every callback to each inner observer, in order.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }

    fn each(&self, call: impl Fn(&dyn PipelineObserver)) {
        self.observers.iter().for_each(|o| call(o.as_ref()));
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompositeObserver({} observers)", self.observers.len())
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_success(&self, ctx: &RunContext, stats: RunStats) {
        self.each(|o| o.on_success(ctx, stats));
    }

    fn on_failure(&self, ctx: &RunContext, severity: Severity, error: &PipelineError) {
        self.each(|o| o.on_failure(ctx, severity, error));
    }

    fn on_alert(&self, ctx: &RunContext, severity: Severity, error: &PipelineError) {
        self.each(|o| o.on_alert(ctx, severity, error));
    }

    fn on_row_skipped(&self, ctx: &RunContext, row: u64, error: &PipelineError) {
        self.each(|o| o.on_row_skipped(ctx, row, error));
    }
}

/// `source => op | op => sink`
fn route(ctx: &RunContext) -> String {
    if ctx.operators.is_empty() {
        format!("{} => {}", ctx.source, ctx.sink)
    } else {
        format!("{} => {} => {}", ctx.source, ctx.operators.join(" | "), ctx.sink)
    }
}

fn success_line(ctx: &RunContext, stats: RunStats) -> String {
    format!(
        "{}: finished, {} in, {} out, {} dropped, {} skipped",
        route(ctx),
        stats.records_read,
        stats.records_written,
        stats.records_dropped,
        stats.rows_skipped
    )
}

fn failure_line(ctx: &RunContext, severity: Severity, error: &PipelineError) -> String {
    format!("{}: {severity} failure: {error}", route(ctx))
}

fn skip_line(ctx: &RunContext, row: u64, error: &PipelineError) -> String {
    format!("{}: skipped line {row}: {error}", ctx.source)
}

/// Writes one line per event to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl PipelineObserver for StdErrObserver {
    fn on_success(&self, ctx: &RunContext, stats: RunStats) {
        eprintln!("record-pipe: {}", success_line(ctx, stats));
    }

    fn on_failure(&self, ctx: &RunContext, severity: Severity, error: &PipelineError) {
        eprintln!("record-pipe: {}", failure_line(ctx, severity, error));
    }

    fn on_alert(&self, ctx: &RunContext, severity: Severity, error: &PipelineError) {
        eprintln!("record-pipe: ALERT {}", failure_line(ctx, severity, error));
    }

    fn on_row_skipped(&self, ctx: &RunContext, row: u64, error: &PipelineError) {
        eprintln!("record-pipe: {} {}", Severity::Warning, skip_line(ctx, row, error));
    }
}

/// Appends timestamped event lines to a log file.
///
/// Logging is best-effort: a log file that cannot be opened or written never fails the run.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn log(&self, line: String) {
        let _guard = self.lock.lock().ok();
        let opened = OpenOptions::new().create(true).append(true).open(&self.path);
        if let Ok(mut f) = opened {
            let _ = writeln!(f, "{} {line}", unix_ts());
        }
    }
}

impl PipelineObserver for FileObserver {
    fn on_success(&self, ctx: &RunContext, stats: RunStats) {
        self.log(success_line(ctx, stats));
    }

    fn on_failure(&self, ctx: &RunContext, severity: Severity, error: &PipelineError) {
        self.log(failure_line(ctx, severity, error));
    }

    fn on_alert(&self, ctx: &RunContext, severity: Severity, error: &PipelineError) {
        self.log(format!("ALERT {}", failure_line(ctx, severity, error)));
    }

    fn on_row_skipped(&self, ctx: &RunContext, row: u64, error: &PipelineError) {
        self.log(skip_line(ctx, row, error));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Severity assigned to a run failure.
pub(crate) fn severity_for_error(e: &PipelineError) -> Severity {
    match e {
        PipelineError::Resource { .. } | PipelineError::Io(_) => Severity::Critical,
        PipelineError::Csv(err) => match err.kind() {
            csv::ErrorKind::Io(_) => Severity::Critical,
            _ => Severity::Error,
        },
        PipelineError::Json(err) if err.is_io() => Severity::Critical,
        PipelineError::Json(_)
        | PipelineError::FieldNotFound { .. }
        | PipelineError::InvalidHeader { .. }
        | PipelineError::RowDecode { .. }
        | PipelineError::FieldSetDivergence { .. }
        | PipelineError::DuplicateField { .. }
        | PipelineError::Config { .. } => Severity::Error,
    }
}
