//! Record sources.
//!
//! A source is a lazy, single-pass, forward-only sequence of [`Record`]s. Sources are plain
//! [`Iterator`]s yielding `PipelineResult<Record>`, so a decode failure on one row surfaces as an
//! `Err` item without ending the sequence; the pipeline driver decides what to do with it.
//!
//! - [`csv`]: delimited-text files and readers
//! - [`from_records`] / [`from_results`]: in-memory sequences (tests, generated data)

pub mod csv;

pub use self::csv::CsvSource;

use crate::error::PipelineResult;
use crate::types::Record;

/// A named, lazy sequence of records.
pub trait RecordSource: Iterator<Item = PipelineResult<Record>> {
    /// Human-readable description used in observer callbacks (e.g. the input path).
    fn name(&self) -> String;
}

/// Options controlling how delimited-text sources are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceOptions {
    /// Field delimiter byte.
    pub delimiter: u8,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// Adapts any iterator of record results into a [`RecordSource`].
#[derive(Debug, Clone)]
pub struct IterSource<I> {
    name: String,
    inner: I,
}

impl<I> IterSource<I> {
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<I> Iterator for IterSource<I>
where
    I: Iterator<Item = PipelineResult<Record>>,
{
    type Item = PipelineResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl<I> RecordSource for IterSource<I>
where
    I: Iterator<Item = PipelineResult<Record>>,
{
    fn name(&self) -> String {
        self.name.clone()
    }
}

/// A source over already-decoded records.
pub fn from_records<I>(records: I) -> IterSource<impl Iterator<Item = PipelineResult<Record>>>
where
    I: IntoIterator<Item = Record>,
{
    from_results(records.into_iter().map(Ok))
}

/// A source over record results, letting callers inject decode failures.
pub fn from_results<I>(results: I) -> IterSource<I::IntoIter>
where
    I: IntoIterator<Item = PipelineResult<Record>>,
{
    IterSource {
        name: "<memory>".to_string(),
        inner: results.into_iter(),
    }
}
