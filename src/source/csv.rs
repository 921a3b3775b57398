//! Delimited-text source.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::error::{PipelineError, PipelineResult};
use crate::types::Record;

use super::{RecordSource, SourceOptions};

/// Streams records out of CSV data, one row per [`Iterator::next`] call.
///
/// Rules:
///
/// - The first non-empty line is the header; its names must be non-empty and unique.
/// - Every data row must have the header's arity; a ragged or non-UTF-8 row yields
///   [`PipelineError::RowDecode`] and the source moves on to the following row.
/// - An I/O failure while reading ends the sequence.
pub struct CsvSource<R> {
    name: String,
    reader: csv::Reader<R>,
    header: Vec<String>,
    row: StringRecord,
    rows_read: u64,
    done: bool,
}

impl CsvSource<File> {
    /// Open a CSV file.
    ///
    /// Fails with [`PipelineError::Resource`] if the file cannot be opened, before any record is
    /// produced.
    pub fn open(path: impl AsRef<Path>, options: &SourceOptions) -> PipelineResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| PipelineError::Resource {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(path.display().to_string(), file, options)
    }
}

impl<R: Read> CsvSource<R> {
    /// Wrap an arbitrary reader; the header row is read immediately.
    pub fn from_reader(name: impl Into<String>, reader: R, options: &SourceOptions) -> PipelineResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(options.delimiter)
            .from_reader(reader);

        let header = read_header(&mut reader)?;

        Ok(Self {
            name: name.into(),
            reader,
            header,
            row: StringRecord::new(),
            rows_read: 0,
            done: false,
        })
    }

    /// Field names from the header row, in file order.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    fn decode_current(&self) -> Record {
        let fields = self
            .header
            .iter()
            .zip(self.row.iter())
            .map(|(name, value)| (name.clone(), value.to_owned()))
            .collect();
        Record::from_validated(fields)
    }
}

fn read_header<R: Read>(reader: &mut csv::Reader<R>) -> PipelineResult<Vec<String>> {
    let raw = match reader.headers() {
        Ok(h) => h.clone(),
        Err(e) => {
            return Err(match e.kind() {
                csv::ErrorKind::Io(_) => PipelineError::Csv(e),
                _ => PipelineError::InvalidHeader {
                    message: e.to_string(),
                },
            });
        }
    };

    let mut header: Vec<String> = Vec::with_capacity(raw.len());
    for (idx, name) in raw.iter().enumerate() {
        if name.is_empty() {
            return Err(PipelineError::InvalidHeader {
                message: format!("column {} has an empty name", idx + 1),
            });
        }
        if header.iter().any(|h| h == name) {
            return Err(PipelineError::InvalidHeader {
                message: format!("column name '{name}' appears more than once"),
            });
        }
        header.push(name.to_owned());
    }
    Ok(header)
}

impl<R: Read> Iterator for CsvSource<R> {
    type Item = PipelineResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        // 1-based line number for users; +1 again because header is line 1.
        let fallback_line = self.rows_read + 2;
        self.rows_read += 1;

        match self.reader.read_record(&mut self.row) {
            Ok(true) => Some(Ok(self.decode_current())),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                    self.done = true;
                    return Some(Err(PipelineError::Csv(e)));
                }
                let row = e.position().map(|p| p.line()).unwrap_or(fallback_line);
                Some(Err(PipelineError::RowDecode { row, source: e }))
            }
        }
    }
}

impl<R: Read> RecordSource for CsvSource<R> {
    fn name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::CsvSource;
    use crate::source::SourceOptions;
    use crate::PipelineError;

    fn source(input: &str) -> CsvSource<&[u8]> {
        CsvSource::from_reader("test", input.as_bytes(), &SourceOptions::default()).unwrap()
    }

    #[test]
    fn yields_records_in_file_order_with_header_names() {
        let mut src = source("id,producto\n1,Espresso\n2,Latte\n");
        assert_eq!(src.header(), &["id".to_string(), "producto".to_string()]);

        let first = src.next().unwrap().unwrap();
        assert_eq!(first.names().collect::<Vec<_>>(), vec!["id", "producto"]);
        assert_eq!(first.get("producto"), Some("Espresso"));

        let second = src.next().unwrap().unwrap();
        assert_eq!(second.get("id"), Some("2"));

        assert!(src.next().is_none());
        assert!(src.next().is_none());
    }

    #[test]
    fn quoted_values_with_separators_stay_one_field() {
        let mut src = source("id,descripcion\n1,\"Café negro, intenso\"\n");
        let r = src.next().unwrap().unwrap();
        assert_eq!(r.len(), 2);
        assert_eq!(r.get("descripcion"), Some("Café negro, intenso"));
    }

    #[test]
    fn ragged_row_is_reported_and_the_sequence_continues() {
        let mut src = source("a,b\n1,2\n3\n4,5\n");
        assert!(src.next().unwrap().is_ok());
        match src.next().unwrap() {
            Err(PipelineError::RowDecode { row, .. }) => assert_eq!(row, 3),
            other => panic!("expected RowDecode, got {other:?}"),
        }
        let last = src.next().unwrap().unwrap();
        assert_eq!(last.get("a"), Some("4"));
        assert!(src.next().is_none());
    }

    #[test]
    fn invalid_utf8_row_is_reported_and_the_sequence_continues() {
        let input: &[u8] = b"a,b\n1,2\n\xff\xfe,3\n4,5\n";
        let mut src = CsvSource::from_reader("test", input, &SourceOptions::default()).unwrap();
        assert!(src.next().unwrap().is_ok());
        match src.next().unwrap() {
            Err(PipelineError::RowDecode { row, .. }) => assert_eq!(row, 3),
            other => panic!("expected RowDecode, got {other:?}"),
        }
        assert_eq!(src.next().unwrap().unwrap().get("a"), Some("4"));
        assert!(src.next().is_none());
    }

    #[test]
    fn duplicate_header_names_are_rejected() {
        let err = CsvSource::from_reader("test", "a,a\n1,2\n".as_bytes(), &SourceOptions::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("invalid header"));
    }

    #[test]
    fn empty_input_yields_nothing() {
        let mut src = source("");
        assert!(src.header().is_empty());
        assert!(src.next().is_none());
    }

    #[test]
    fn custom_delimiter() {
        let opts = SourceOptions { delimiter: b';' };
        let mut src = CsvSource::from_reader("test", "a;b\n1;2,5\n".as_bytes(), &opts).unwrap();
        let r = src.next().unwrap().unwrap();
        assert_eq!(r.get("b"), Some("2,5"));
    }
}
