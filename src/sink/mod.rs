//! Record sinks.
//!
//! A sink accepts records one at a time and commits them to a [`Destination`], emitting the
//! header (for formats that have one) exactly once, before the first data row. The header
//! ordering is either configured up front ([`SinkOptions::fields`]) or taken from the first
//! record that reaches the sink. Every later record is laid out in that ordering according to
//! the run-wide [`FieldSetPolicy`].
//!
//! - [`csv`]: delimited text
//! - [`jsonl`]: one JSON object per line
//! - [`output`]: [`OutputFile`], a file destination that only appears at its final path once
//!   the sink finishes successfully

pub mod csv;
pub mod jsonl;
mod layout;
pub mod output;

pub use self::csv::CsvSink;
pub use self::jsonl::JsonLinesSink;
pub use self::output::{Destination, OutputFile};

use serde::{Deserialize, Serialize};

use crate::error::PipelineResult;
use crate::types::{FieldOrder, Record};

/// A consumer of records.
pub trait RecordSink {
    /// Commit one record.
    fn write(&mut self, record: &Record) -> PipelineResult<()>;

    /// Flush buffered output and release the destination as complete.
    fn finish(&mut self) -> PipelineResult<()>;

    /// Release the destination as incomplete after a failed run.
    fn abort(&mut self) {}

    /// Human-readable description used in observer callbacks (e.g. the output path).
    fn name(&self) -> String;
}

/// What the sink does with a record whose field set differs from the established header.
///
/// The policy is fixed for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSetPolicy {
    /// Any missing or extra field fails the run with
    /// [`crate::PipelineError::FieldSetDivergence`].
    #[default]
    Strict,
    /// Missing fields are written as empty values; extra fields fail the run.
    FillMissing,
    /// Missing fields are written as empty values; extra fields are dropped.
    FillMissingIgnoreExtra,
}

/// Line terminator written after each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminator {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    Crlf,
}

/// Options controlling sink behavior.
///
/// Use [`Default`] for common cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkOptions {
    /// Field delimiter byte (delimited-text sinks only).
    pub delimiter: u8,
    /// Row terminator.
    pub terminator: Terminator,
    /// Explicit header ordering. If `None`, the first record's natural ordering is used.
    pub fields: Option<FieldOrder>,
    /// Divergence policy for the whole run.
    pub field_set_policy: FieldSetPolicy,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            terminator: Terminator::Lf,
            fields: None,
            field_set_policy: FieldSetPolicy::Strict,
        }
    }
}
