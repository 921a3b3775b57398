//! `record-pipeline` is a small library for streaming tabular records from a source, through an
//! ordered chain of operators, into a sink, one record at a time and without materializing the
//! dataset.
//!
//! The primary entrypoint is [`pipeline::Pipeline`], which wires a [`source::RecordSource`] to a
//! [`sink::RecordSink`]. For the common file-to-file cases use [`copy_csv`], [`select_csv`] or
//! a declarative [`config::PipelineConfig`] run with [`config::run_config`].
//!
//! ## Data model
//!
//! - [`types::Record`]: an ordered mapping from field name to string value. Field order is
//!   load-bearing: it decides output column order.
//! - [`types::FieldOrder`]: an explicit sequence of unique field names.
//!
//! ## Operators
//!
//! - [`transform::select()`]: keep exactly the listed fields, in the listed order. Naming a
//!   field the record lacks is a schema error that aborts the run.
//! - [`transform::filter()`]: keep or drop a record.
//! - [`transform::derive()`]: add or overwrite one computed field.
//!
//! Each operator yields a [`transform::Outcome`]: `Kept(record)` or `Dropped`.
//!
//! ## Quick example: reorder columns
//!
//! ```rust
//! use record_pipeline::pipeline::Pipeline;
//! use record_pipeline::sink::{CsvSink, SinkOptions};
//! use record_pipeline::source::{CsvSource, SourceOptions};
//! use record_pipeline::types::FieldOrder;
//!
//! # fn main() -> Result<(), record_pipeline::PipelineError> {
//! let input = "id,producto,precio,descripcion\n1,Espresso,2.50,\"Café negro, intenso\"\n";
//! let source = CsvSource::from_reader("menu", input.as_bytes(), &SourceOptions::default())?;
//! let mut sink = CsvSink::new("report", Vec::new(), &SinkOptions::default());
//!
//! let fields = FieldOrder::new(["descripcion", "producto", "precio", "id"])?;
//! let stats = Pipeline::new().select(fields).run(source, &mut sink)?;
//! assert_eq!(stats.records_written, 1);
//!
//! let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
//! assert_eq!(out, "descripcion,producto,precio,id\n\"Café negro, intenso\",Espresso,2.50,1\n");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error policies
//!
//! Every error aborts the run, except:
//!
//! - undecodable rows under [`pipeline::RowDecodePolicy::Skip`]
//! - field-set divergence under a lenient [`sink::FieldSetPolicy`]
//!
//! Both policies are fixed for a whole run. File sinks write to a `.partial` file that only
//! replaces the requested output once the run succeeds.
//!
//! ## Modules
//!
//! - [`types`]: records and field orderings
//! - [`source`]: record sources (CSV, in-memory)
//! - [`transform`]: operators
//! - [`sink`]: record sinks (CSV, JSON Lines) and output files
//! - [`pipeline`]: the driver, observers and metrics
//! - [`config`]: JSON pipeline configs
//! - [`error`]: the error type shared by all of the above

pub mod config;
pub mod error;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod transform;
pub mod types;

pub use error::{PipelineError, PipelineResult};
pub use pipeline::{copy_csv, select_csv};
