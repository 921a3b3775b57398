use std::fs;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use record_pipeline::pipeline::{
    FileObserver, Pipeline, PipelineObserver, PipelineOptions, RowDecodePolicy, RunContext, RunStats, Severity,
};
use record_pipeline::sink::{CsvSink, SinkOptions};
use record_pipeline::source::{from_results, CsvSource, SourceOptions};
use record_pipeline::types::{FieldOrder, Record};
use record_pipeline::PipelineError;

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<RunStats>>,
    failures: Mutex<Vec<Severity>>,
    alerts: Mutex<Vec<Severity>>,
    skipped: Mutex<Vec<u64>>,
}

impl PipelineObserver for RecordingObserver {
    fn on_success(&self, _ctx: &RunContext, stats: RunStats) {
        self.successes.lock().unwrap().push(stats);
    }

    fn on_failure(&self, _ctx: &RunContext, severity: Severity, _error: &PipelineError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &RunContext, severity: Severity, _error: &PipelineError) {
        self.alerts.lock().unwrap().push(severity);
    }

    fn on_row_skipped(&self, _ctx: &RunContext, row: u64, _error: &PipelineError) {
        self.skipped.lock().unwrap().push(row);
    }
}

fn options(obs: &Arc<RecordingObserver>) -> PipelineOptions {
    PipelineOptions {
        observer: Some(obs.clone()),
        alert_at_or_above: Severity::Critical,
        ..Default::default()
    }
}

fn menu_source() -> CsvSource<fs::File> {
    CsvSource::open("tests/fixtures/entrada.csv", &SourceOptions::default()).unwrap()
}

#[test]
fn observer_receives_failure_and_alert_on_critical_io_error() {
    let obs = Arc::new(RecordingObserver::default());
    let source = from_results(vec![
        Ok(Record::try_from_pairs([("id", "1")]).unwrap()),
        Err(PipelineError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "upstream went away"))),
    ]);
    let mut sink = CsvSink::new("mem", Vec::new(), &SinkOptions::default());

    let err = Pipeline::with_options(options(&obs)).run(source, &mut sink).unwrap_err();
    assert!(matches!(err, PipelineError::Io(_)));

    assert_eq!(*obs.failures.lock().unwrap(), vec![Severity::Critical]);
    assert_eq!(*obs.alerts.lock().unwrap(), vec![Severity::Critical]);
    assert!(obs.successes.lock().unwrap().is_empty());
}

#[test]
fn observer_receives_failure_without_alert_for_schema_error() {
    let obs = Arc::new(RecordingObserver::default());
    let mut sink = CsvSink::new("mem", Vec::new(), &SinkOptions::default());

    let pipeline =
        Pipeline::with_options(options(&obs)).select(FieldOrder::new(["definitely_missing"]).unwrap());
    let err = pipeline.run(menu_source(), &mut sink).unwrap_err();
    assert!(err.is_schema_error());

    assert_eq!(*obs.failures.lock().unwrap(), vec![Severity::Error]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn lower_alert_threshold_alerts_on_schema_errors() {
    let obs = Arc::new(RecordingObserver::default());
    let mut sink = CsvSink::new("mem", Vec::new(), &SinkOptions::default());

    let pipeline = Pipeline::with_options(PipelineOptions {
        alert_at_or_above: Severity::Error,
        ..options(&obs)
    })
    .select(FieldOrder::new(["definitely_missing"]).unwrap());
    let _ = pipeline.run(menu_source(), &mut sink).unwrap_err();

    assert_eq!(*obs.alerts.lock().unwrap(), vec![Severity::Error]);
}

#[test]
fn observer_sees_success_stats_and_skipped_rows() {
    let obs = Arc::new(RecordingObserver::default());
    let source = CsvSource::open("tests/fixtures/irregular.csv", &SourceOptions::default()).unwrap();
    let mut sink = CsvSink::new("mem", Vec::new(), &SinkOptions::default());

    let pipeline = Pipeline::with_options(PipelineOptions {
        row_decode: RowDecodePolicy::Skip,
        ..options(&obs)
    });
    pipeline.run(source, &mut sink).unwrap();

    assert_eq!(*obs.skipped.lock().unwrap(), vec![3]);
    assert_eq!(
        *obs.successes.lock().unwrap(),
        vec![RunStats {
            records_read: 2,
            records_written: 2,
            records_dropped: 0,
            rows_skipped: 1,
        }]
    );
    assert!(obs.failures.lock().unwrap().is_empty());
}

#[test]
fn file_observer_appends_run_events() {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let log = std::env::temp_dir().join(format!("record-pipeline-observer-{nanos}.log"));
    let obs: Arc<dyn PipelineObserver> = Arc::new(FileObserver::new(&log));

    let run = |fields: &[&str]| {
        let mut sink = CsvSink::new("mem", Vec::new(), &SinkOptions::default());
        Pipeline::with_options(PipelineOptions {
            observer: Some(obs.clone()),
            ..Default::default()
        })
        .select(FieldOrder::new(fields.iter().copied()).unwrap())
        .run(menu_source(), &mut sink)
    };
    run(&["producto"]).unwrap();
    run(&["stock"]).unwrap_err();

    let text = fs::read_to_string(&log).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("=> select => mem: finished, 4 in, 4 out, 0 dropped, 0 skipped"));
    assert!(lines[1].contains("=> select => mem: error failure: schema mismatch"));
    assert!(lines[1].contains("'stock'"));
    let _ = fs::remove_file(&log);
}

#[test]
fn metrics_track_the_last_run() {
    let pipeline = Pipeline::new().filter(|r| r.get("producto") != Some("Latte"));
    let mut sink = CsvSink::new("mem", Vec::new(), &SinkOptions::default());
    pipeline.run(menu_source(), &mut sink).unwrap();

    let snap = pipeline.metrics().snapshot();
    assert_eq!(snap.records_read, 4);
    assert_eq!(snap.records_written, 3);
    assert_eq!(snap.records_dropped, 1);
    assert_eq!(snap.max_in_flight, 1);
    assert!(snap.to_string().contains("written=3"));
}
