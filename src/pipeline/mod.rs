//! Pipeline driver.
//!
//! A [`Pipeline`] is an ordered chain of [`Operator`]s. [`Pipeline::run`] wires it between one
//! [`RecordSource`] and one [`RecordSink`] and drives it strictly one record at a time:
//!
//! 1. pull the next record from the source
//! 2. thread it through every operator in declared order; a [`Outcome::Dropped`] short-circuits
//!    the rest of the chain for that row
//! 3. hand a surviving record to the sink
//! 4. only then pull the next record
//!
//! There is no batching and no reordering buffer, so output order equals input order and at
//! most one record is in flight at any time ([`MetricsSnapshot::max_in_flight`]).
//!
//! On the first unrecovered error the sink is aborted (an [`crate::sink::OutputFile`] removes
//! its partial file), the observer is notified and the error is returned.

mod metrics;
mod observability;

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::sink::{CsvSink, RecordSink, SinkOptions};
use crate::source::{CsvSource, RecordSource, SourceOptions};
use crate::transform::{Derive, Filter, Operator, Outcome, Select};
use crate::types::{FieldOrder, Record};

pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use observability::{
    CompositeObserver, FileObserver, PipelineObserver, RunContext, RunStats, Severity, StdErrObserver,
};

use observability::severity_for_error;

/// What the driver does with a row the codec cannot decode.
///
/// The policy is fixed for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowDecodePolicy {
    /// Abort the run on the first undecodable row.
    #[default]
    FailFast,
    /// Skip the row, report it to the observer and continue.
    Skip,
}

/// Options controlling a pipeline run.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct PipelineOptions {
    /// Policy for undecodable rows.
    pub row_decode: RowDecodePolicy,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn PipelineObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: Severity,
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("row_decode", &self.row_decode)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            row_decode: RowDecodePolicy::FailFast,
            observer: None,
            alert_at_or_above: Severity::Critical,
        }
    }
}

/// An ordered chain of operators, runnable between a source and a sink.
///
/// ```rust
/// use record_pipeline::pipeline::Pipeline;
/// use record_pipeline::sink::{CsvSink, SinkOptions};
/// use record_pipeline::source::{CsvSource, SourceOptions};
/// use record_pipeline::types::FieldOrder;
///
/// let input = "id,producto,precio\n1,Espresso,2.50\n2,Latte,3.20\n";
/// let source = CsvSource::from_reader("menu", input.as_bytes(), &SourceOptions::default()).unwrap();
/// let mut sink = CsvSink::new("out", Vec::new(), &SinkOptions::default());
///
/// let pipeline = Pipeline::new()
///     .filter(|r| r.get("producto") != Some("Latte"))
///     .select(FieldOrder::new(["producto", "precio"]).unwrap());
/// let stats = pipeline.run(source, &mut sink).unwrap();
///
/// assert_eq!(stats.records_written, 1);
/// let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
/// assert_eq!(out, "producto,precio\nEspresso,2.50\n");
/// ```
pub struct Pipeline {
    operators: Vec<Box<dyn Operator>>,
    options: PipelineOptions,
    metrics: Arc<PipelineMetrics>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("operators", &self.operator_names())
            .field("options", &self.options)
            .finish()
    }
}

impl Pipeline {
    /// An empty chain: running it copies source to sink unchanged.
    pub fn new() -> Self {
        Self::with_options(PipelineOptions::default())
    }

    pub fn with_options(options: PipelineOptions) -> Self {
        Self {
            operators: Vec::new(),
            options,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Append any operator to the chain.
    pub fn then(mut self, operator: impl Operator + 'static) -> Self {
        self.operators.push(Box::new(operator));
        self
    }

    /// Append a [`Select`].
    pub fn select(self, fields: FieldOrder) -> Self {
        self.then(Select::new(fields))
    }

    /// Append a [`Filter`].
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.then(Filter::new(predicate))
    }

    /// Append a [`Derive`].
    pub fn derive<F>(self, field: impl Into<String>, function: F) -> PipelineResult<Self>
    where
        F: Fn(&Record) -> String + Send + Sync + 'static,
    {
        Ok(self.then(Derive::new(field, function)?))
    }

    /// Operator names, in chain order.
    pub fn operator_names(&self) -> Vec<String> {
        self.operators.iter().map(|o| o.name().to_string()).collect()
    }

    /// Get a handle to real-time run metrics.
    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Thread one record through the whole chain.
    pub fn apply(&self, record: Record) -> PipelineResult<Outcome> {
        let mut current = record;
        for op in &self.operators {
            match op.apply(current)? {
                Outcome::Kept(next) => current = next,
                Outcome::Dropped => return Ok(Outcome::Dropped),
            }
        }
        Ok(Outcome::Kept(current))
    }

    /// Drive `source` through the chain into `sink` until the source is exhausted.
    ///
    /// On success the sink has been finished and the returned stats report how many records
    /// reached it. On failure the sink has been aborted.
    ///
    /// When an observer is configured, this function reports:
    ///
    /// - `on_row_skipped` for each row skipped under [`RowDecodePolicy::Skip`]
    /// - `on_success` on success, with run stats
    /// - `on_failure` on failure, with a computed severity
    /// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
    pub fn run<Src, Snk>(&self, source: Src, sink: &mut Snk) -> PipelineResult<RunStats>
    where
        Src: RecordSource,
        Snk: RecordSink + ?Sized,
    {
        let ctx = RunContext {
            source: source.name(),
            sink: sink.name(),
            operators: self.operator_names(),
        };

        let start = Instant::now();
        self.metrics.begin_run();

        let result = self.drive(&ctx, source, sink);
        if result.is_err() {
            sink.abort();
        }

        self.metrics.end_run(start.elapsed());

        if let Some(obs) = self.options.observer.as_ref() {
            match &result {
                Ok(stats) => obs.on_success(&ctx, *stats),
                Err(e) => {
                    let sev = severity_for_error(e);
                    obs.on_failure(&ctx, sev, e);
                    if sev >= self.options.alert_at_or_above {
                        obs.on_alert(&ctx, sev, e);
                    }
                }
            }
        }

        result
    }

    fn drive<Src, Snk>(&self, ctx: &RunContext, source: Src, sink: &mut Snk) -> PipelineResult<RunStats>
    where
        Src: RecordSource,
        Snk: RecordSink + ?Sized,
    {
        let mut stats = RunStats::default();

        for item in source {
            let record = match item {
                Ok(record) => record,
                Err(e) => match (self.options.row_decode, skippable_row(&e)) {
                    (RowDecodePolicy::Skip, Some(row)) => {
                        stats.rows_skipped += 1;
                        self.metrics.on_row_skipped();
                        if let Some(obs) = self.options.observer.as_ref() {
                            obs.on_row_skipped(ctx, row, &e);
                        }
                        continue;
                    }
                    _ => return Err(e),
                },
            };

            stats.records_read += 1;
            self.metrics.on_record_read();

            match self.apply(record)? {
                Outcome::Kept(record) => {
                    sink.write(&record)?;
                    stats.records_written += 1;
                    self.metrics.on_record_written();
                }
                Outcome::Dropped => {
                    stats.records_dropped += 1;
                    self.metrics.on_record_dropped();
                }
            }
        }

        sink.finish()?;
        Ok(stats)
    }
}

fn skippable_row(e: &PipelineError) -> Option<u64> {
    match e {
        PipelineError::RowDecode { row, .. } => Some(*row),
        _ => None,
    }
}

/// Copy every record of a CSV file into another, unchanged.
pub fn copy_csv(input: impl AsRef<Path>, output: impl AsRef<Path>) -> PipelineResult<RunStats> {
    let source = CsvSource::open(input, &SourceOptions::default())?;
    let mut sink = CsvSink::create(output, &SinkOptions::default())?;
    Pipeline::new().run(source, &mut sink)
}

/// Copy a CSV file keeping only `fields`, in that order.
///
/// The output header is `fields` even when the input has no data rows.
pub fn select_csv(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    fields: &FieldOrder,
) -> PipelineResult<RunStats> {
    let source = CsvSource::open(input, &SourceOptions::default())?;
    let sink_options = SinkOptions {
        fields: Some(fields.clone()),
        ..Default::default()
    };
    let mut sink = CsvSink::create(output, &sink_options)?;
    Pipeline::new().select(fields.clone()).run(source, &mut sink)
}
