use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Real-time counters for a pipeline run.
///
/// The driver updates these while records flow; callers can snapshot them at any time, including
/// from inside an operator.
pub struct PipelineMetrics {
    run_id: AtomicU64,
    elapsed_ns: AtomicU64,

    records_read: AtomicU64,
    records_written: AtomicU64,
    records_dropped: AtomicU64,
    rows_skipped: AtomicU64,

    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            elapsed_ns: AtomicU64::new(0),
            records_read: AtomicU64::new(0),
            records_written: AtomicU64::new(0),
            records_dropped: AtomicU64::new(0),
            rows_skipped: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn begin_run(&self) {
        let _ = self.run_id.fetch_add(1, Ordering::SeqCst);

        self.elapsed_ns.store(0, Ordering::SeqCst);
        self.records_read.store(0, Ordering::SeqCst);
        self.records_written.store(0, Ordering::SeqCst);
        self.records_dropped.store(0, Ordering::SeqCst);
        self.rows_skipped.store(0, Ordering::SeqCst);
        self.in_flight.store(0, Ordering::SeqCst);
        self.max_in_flight.store(0, Ordering::SeqCst);
    }

    pub fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns
            .store(elapsed.as_nanos().min(u64::MAX as u128) as u64, Ordering::SeqCst);
        self.in_flight.store(0, Ordering::SeqCst);
    }

    /// A record was pulled from the source and entered the operator chain.
    pub fn on_record_read(&self) {
        let _ = self.records_read.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        update_max_usize(&self.max_in_flight, now);
    }

    /// The in-flight record was committed by the sink.
    pub fn on_record_written(&self) {
        let _ = self.records_written.fetch_add(1, Ordering::SeqCst);
        let _ = self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// The in-flight record was dropped by an operator.
    pub fn on_record_dropped(&self) {
        let _ = self.records_dropped.fetch_add(1, Ordering::SeqCst);
        let _ = self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn on_row_skipped(&self) {
        let _ = self.rows_skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        let elapsed = if elapsed_ns > 0 {
            Some(Duration::from_nanos(elapsed_ns))
        } else {
            None
        };

        MetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed,
            records_read: self.records_read.load(Ordering::SeqCst),
            records_written: self.records_written.load(Ordering::SeqCst),
            records_dropped: self.records_dropped.load(Ordering::SeqCst),
            rows_skipped: self.rows_skipped.load(Ordering::SeqCst),
            in_flight: self.in_flight.load(Ordering::SeqCst),
            max_in_flight: self.max_in_flight.load(Ordering::SeqCst),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn update_max_usize(dst: &AtomicUsize, now: usize) {
    loop {
        let cur = dst.load(Ordering::SeqCst);
        if now <= cur {
            break;
        }
        if dst
            .compare_exchange(cur, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            break;
        }
    }
}

/// Immutable snapshot of [`PipelineMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub records_read: u64,
    pub records_written: u64,
    pub records_dropped: u64,
    pub rows_skipped: u64,
    pub in_flight: usize,
    pub max_in_flight: usize,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, read={}, written={}, dropped={}, skipped={}, max_in_flight={}, elapsed={:?}",
            self.run_id,
            self.records_read,
            self.records_written,
            self.records_dropped,
            self.rows_skipped,
            self.max_in_flight,
            self.elapsed
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::PipelineMetrics;

    #[test]
    fn in_flight_tracks_read_minus_released() {
        let m = PipelineMetrics::new();
        m.begin_run();
        m.on_record_read();
        assert_eq!(m.snapshot().in_flight, 1);
        m.on_record_written();
        m.on_record_read();
        m.on_record_dropped();

        let snap = m.snapshot();
        assert_eq!(snap.records_read, 2);
        assert_eq!(snap.records_written, 1);
        assert_eq!(snap.records_dropped, 1);
        assert_eq!(snap.in_flight, 0);
        assert_eq!(snap.max_in_flight, 1);
        assert_eq!(snap.run_id, 1);
    }

    #[test]
    fn begin_run_resets_counters() {
        let m = PipelineMetrics::new();
        m.begin_run();
        m.on_record_read();
        m.on_row_skipped();
        m.end_run(Duration::from_millis(1));
        assert!(m.snapshot().elapsed.is_some());

        m.begin_run();
        let snap = m.snapshot();
        assert_eq!(snap.run_id, 2);
        assert_eq!(snap.records_read, 0);
        assert_eq!(snap.rows_skipped, 0);
        assert_eq!(snap.elapsed, None);
        assert!(snap.to_string().starts_with("run_id=2, read=0"));
    }
}
