//! JSON Lines sink: one JSON object per record, keys in header order.

use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{FieldOrder, Record};

use super::layout::HeaderLayout;
use super::output::{Destination, OutputFile};
use super::{RecordSink, SinkOptions, Terminator};

/// Writes records as newline-delimited JSON objects.
///
/// There is no header line, but the key ordering is established exactly like a CSV header:
/// configured, or taken from the first record, and enforced with the same
/// [`super::FieldSetPolicy`].
pub struct JsonLinesSink<W: Destination> {
    name: String,
    writer: Option<BufWriter<W>>,
    finished: Option<W>,
    layout: HeaderLayout,
    terminator: &'static [u8],
}

impl JsonLinesSink<OutputFile> {
    /// Create a sink writing to `path` (via [`OutputFile`]).
    pub fn create(path: impl AsRef<Path>, options: &SinkOptions) -> PipelineResult<Self> {
        let path = path.as_ref();
        let out = OutputFile::create(path)?;
        Ok(Self::new(path.display().to_string(), out, options))
    }
}

impl<W: Destination> JsonLinesSink<W> {
    /// Wrap any destination.
    pub fn new(name: impl Into<String>, destination: W, options: &SinkOptions) -> Self {
        Self {
            name: name.into(),
            writer: Some(BufWriter::new(destination)),
            finished: None,
            layout: HeaderLayout::new(options.fields.clone(), options.field_set_policy),
            terminator: match options.terminator {
                Terminator::Lf => b"\n",
                Terminator::Crlf => b"\r\n",
            },
        }
    }

    /// The key ordering, once configured or inferred.
    pub fn header(&self) -> Option<&FieldOrder> {
        self.layout.order()
    }

    /// The destination, available after a successful [`RecordSink::finish`].
    pub fn into_inner(self) -> Option<W> {
        self.finished
    }
}

struct OrderedRow<'a> {
    names: &'a FieldOrder,
    values: &'a [&'a str],
}

impl Serialize for OrderedRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.names.iter().zip(self.values.iter()) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<W: Destination> RecordSink for JsonLinesSink<W> {
    fn write(&mut self, record: &Record) -> PipelineResult<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| PipelineError::config("json lines sink is already closed"))?;

        if self.layout.establish(record).is_some() {
            self.layout.mark_emitted();
        }
        let values = self.layout.project(record)?;
        let names = match self.layout.order() {
            Some(o) => o,
            None => return Err(PipelineError::config("sink header ordering not established")),
        };

        serde_json::to_writer(
            &mut *writer,
            &OrderedRow {
                names,
                values: &values,
            },
        )?;
        writer.write_all(self.terminator)?;
        Ok(())
    }

    fn finish(&mut self) -> PipelineResult<()> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        let mut destination = writer
            .into_inner()
            .map_err(|e| PipelineError::Io(io::Error::new(e.error().kind(), e.to_string())))?;
        destination.commit()?;
        self.finished = Some(destination);
        Ok(())
    }

    fn abort(&mut self) {
        self.writer.take();
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}
