//! Delimited-text sink.

use std::io;
use std::path::Path;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{FieldOrder, Record};

use super::layout::HeaderLayout;
use super::output::{Destination, OutputFile};
use super::{RecordSink, SinkOptions, Terminator};

/// Writes records as CSV: one header line, then one line per record.
///
/// Quoting of separators, quotes and embedded newlines is left to the `csv` crate's
/// "quote when necessary" rule.
pub struct CsvSink<W: Destination> {
    name: String,
    writer: Option<csv::Writer<W>>,
    finished: Option<W>,
    layout: HeaderLayout,
}

impl CsvSink<OutputFile> {
    /// Create a sink writing to `path` (via [`OutputFile`]).
    pub fn create(path: impl AsRef<Path>, options: &SinkOptions) -> PipelineResult<Self> {
        let path = path.as_ref();
        let out = OutputFile::create(path)?;
        Ok(Self::new(path.display().to_string(), out, options))
    }
}

impl<W: Destination> CsvSink<W> {
    /// Wrap any destination.
    pub fn new(name: impl Into<String>, destination: W, options: &SinkOptions) -> Self {
        let terminator = match options.terminator {
            Terminator::Lf => csv::Terminator::Any(b'\n'),
            Terminator::Crlf => csv::Terminator::CRLF,
        };
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .delimiter(options.delimiter)
            .terminator(terminator)
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(destination);

        Self {
            name: name.into(),
            writer: Some(writer),
            finished: None,
            layout: HeaderLayout::new(options.fields.clone(), options.field_set_policy),
        }
    }

    /// The header ordering, once configured or inferred.
    pub fn header(&self) -> Option<&FieldOrder> {
        self.layout.order()
    }

    /// The destination, available after a successful [`RecordSink::finish`].
    pub fn into_inner(self) -> Option<W> {
        self.finished
    }
}

impl<W: Destination> RecordSink for CsvSink<W> {
    fn write(&mut self, record: &Record) -> PipelineResult<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| PipelineError::config("csv sink is already closed"))?;

        let header_written = match self.layout.establish(record) {
            Some(order) => {
                writer.write_record(order.iter())?;
                true
            }
            None => false,
        };
        if header_written {
            self.layout.mark_emitted();
        }

        let values = self.layout.project(record)?;
        writer.write_record(&values)?;
        Ok(())
    }

    fn finish(&mut self) -> PipelineResult<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };

        // An explicit ordering still gets its header when no record arrived.
        let header_written = match self.layout.pending_header() {
            Some(order) => {
                writer.write_record(order.iter())?;
                true
            }
            None => false,
        };
        if header_written {
            self.layout.mark_emitted();
        }

        writer.flush()?;
        let mut destination = writer
            .into_inner()
            .map_err(|e| PipelineError::Io(io::Error::new(e.error().kind(), e.to_string())))?;
        destination.commit()?;
        self.finished = Some(destination);
        Ok(())
    }

    fn abort(&mut self) {
        // Dropping an uncommitted destination releases it as incomplete.
        self.writer.take();
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}
