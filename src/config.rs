//! Declarative pipelines loaded from JSON.
//!
//! A [`PipelineConfig`] names an input CSV file, an output file and an ordered list of steps:
//!
//! ```json
//! {
//!   "input": "entrada.csv",
//!   "output": "salida.csv",
//!   "steps": [
//!     { "op": "filter", "field": "precio", "condition": { "not_equals": "" } },
//!     { "op": "select", "fields": ["descripcion", "producto", "precio", "id"] },
//!     { "op": "derive", "name": "producto_mayus", "value": { "upper": "producto" } }
//!   ]
//! }
//! ```
//!
//! Relative paths are resolved against the directory of the config file when it is loaded with
//! [`PipelineConfig::from_path`]. The output format is inferred from the output extension unless
//! `format` is given.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::{Pipeline, PipelineOptions, RowDecodePolicy, RunStats};
use crate::sink::{CsvSink, FieldSetPolicy, JsonLinesSink, SinkOptions, Terminator};
use crate::source::{CsvSource, SourceOptions};
use crate::transform::{Derive, Filter};
use crate::types::{FieldOrder, Record};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Comma-separated values.
    Csv,
    /// Newline-delimited JSON objects.
    JsonLines,
}

impl OutputFormat {
    /// Parse an output format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" | "txt" => Some(Self::Csv),
            "jsonl" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Keep-condition for a `filter` step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Equals(String),
    NotEquals(String),
    Contains(String),
    NotEmpty,
}

impl Condition {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Equals(v) => value == v,
            Self::NotEquals(v) => value != v,
            Self::Contains(v) => value.contains(v.as_str()),
            Self::NotEmpty => !value.is_empty(),
        }
    }
}

/// Separator-joined concatenation of several fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Concat {
    pub fields: Vec<String>,
    #[serde(default)]
    pub separator: String,
}

/// How a `derive` step computes its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueExpr {
    /// Value of another field.
    Copy(String),
    /// A fixed string.
    Constant(String),
    Concat(Concat),
    /// Another field, uppercased.
    Upper(String),
    /// Another field, lowercased.
    Lower(String),
}

impl ValueExpr {
    pub fn evaluate(&self, record: &Record) -> PipelineResult<String> {
        match self {
            Self::Copy(field) => field_value(record, field).map(str::to_owned),
            Self::Constant(v) => Ok(v.clone()),
            Self::Concat(c) => {
                let mut parts = Vec::with_capacity(c.fields.len());
                for field in &c.fields {
                    parts.push(field_value(record, field)?);
                }
                Ok(parts.join(c.separator.as_str()))
            }
            Self::Upper(field) => field_value(record, field).map(str::to_uppercase),
            Self::Lower(field) => field_value(record, field).map(str::to_lowercase),
        }
    }
}

fn field_value<'r>(record: &'r Record, field: &str) -> PipelineResult<&'r str> {
    record.get(field).ok_or_else(|| PipelineError::FieldNotFound {
        field: field.to_owned(),
        available: record.available_names(),
    })
}

/// One step of a declarative pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum StepConfig {
    Select { fields: Vec<String> },
    Filter { field: String, condition: Condition },
    Derive { name: String, value: ValueExpr },
}

fn default_delimiter() -> char {
    ','
}

/// A complete pipeline description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Input CSV file.
    pub input: PathBuf,
    /// Output file.
    pub output: PathBuf,
    /// If `None`, inferred from the output extension.
    #[serde(default)]
    pub format: Option<OutputFormat>,
    /// Field delimiter for input and CSV output (ASCII).
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub terminator: Terminator,
    /// Explicit output ordering; if `None`, inferred from the first record reaching the sink.
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub field_set_policy: FieldSetPolicy,
    #[serde(default)]
    pub row_decode: RowDecodePolicy,
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

impl PipelineConfig {
    /// Parse a config from JSON text; paths are kept as written.
    pub fn from_json_str(json: &str) -> PipelineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a config file, resolving relative paths against its directory.
    pub fn from_path(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| PipelineError::Resource {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json_str(&text)?;
        if let Some(base) = path.parent() {
            config.input = resolve(base, &config.input);
            config.output = resolve(base, &config.output);
        }
        Ok(config)
    }

    /// The output format, explicit or inferred from the output extension.
    pub fn output_format(&self) -> PipelineResult<OutputFormat> {
        if let Some(f) = self.format {
            return Ok(f);
        }
        let ext = self
            .output
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                PipelineError::config(format!(
                    "cannot infer output format: path has no extension ({})",
                    self.output.display()
                ))
            })?;
        OutputFormat::from_extension(ext).ok_or_else(|| {
            PipelineError::config(format!(
                "cannot infer output format from extension '{ext}' for path ({})",
                self.output.display()
            ))
        })
    }

    fn delimiter_byte(&self) -> PipelineResult<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(PipelineError::config(format!(
                "delimiter '{}' is not a single ASCII character",
                self.delimiter
            )))
        }
    }

    pub fn source_options(&self) -> PipelineResult<SourceOptions> {
        Ok(SourceOptions {
            delimiter: self.delimiter_byte()?,
        })
    }

    pub fn sink_options(&self) -> PipelineResult<SinkOptions> {
        let fields = match &self.fields {
            Some(names) => Some(FieldOrder::new(names.iter().cloned())?),
            None => None,
        };
        Ok(SinkOptions {
            delimiter: self.delimiter_byte()?,
            terminator: self.terminator,
            fields,
            field_set_policy: self.field_set_policy,
        })
    }

    /// Build the operator chain described by `steps`.
    ///
    /// `options.row_decode` is replaced by the config's own policy.
    pub fn build_pipeline(&self, options: PipelineOptions) -> PipelineResult<Pipeline> {
        let mut pipeline = Pipeline::with_options(PipelineOptions {
            row_decode: self.row_decode,
            ..options
        });

        for step in &self.steps {
            pipeline = match step {
                StepConfig::Select { fields } => pipeline.select(FieldOrder::new(fields.iter().cloned())?),
                StepConfig::Filter { field, condition } => {
                    let field_name = field.clone();
                    let condition = condition.clone();
                    let op = Filter::try_new(move |r| Ok(condition.matches(field_value(r, &field_name)?)))
                        .named(format!("filter({field})"));
                    pipeline.then(op)
                }
                StepConfig::Derive { name, value } => {
                    let value = value.clone();
                    pipeline.then(Derive::try_new(name.clone(), move |r| value.evaluate(r))?)
                }
            };
        }
        Ok(pipeline)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Execute a [`PipelineConfig`]: open the input, build the chain, write the output.
///
/// Configuration problems are reported before any file is opened.
pub fn run_config(config: &PipelineConfig, options: PipelineOptions) -> PipelineResult<RunStats> {
    let format = config.output_format()?;
    let source_options = config.source_options()?;
    let sink_options = config.sink_options()?;
    let pipeline = config.build_pipeline(options)?;

    let source = CsvSource::open(&config.input, &source_options)?;
    match format {
        OutputFormat::Csv => {
            let mut sink = CsvSink::create(&config.output, &sink_options)?;
            pipeline.run(source, &mut sink)
        }
        OutputFormat::JsonLines => {
            let mut sink = JsonLinesSink::create(&config.output, &sink_options)?;
            pipeline.run(source, &mut sink)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Condition, OutputFormat, PipelineConfig, StepConfig, ValueExpr};
    use crate::pipeline::{PipelineOptions, RowDecodePolicy};
    use crate::sink::FieldSetPolicy;
    use crate::transform::Outcome;
    use crate::types::Record;

    const CONFIG: &str = r#"{
        "input": "entrada.csv",
        "output": "salida.jsonl",
        "field_set_policy": "fill_missing",
        "row_decode": "skip",
        "steps": [
            { "op": "filter", "field": "producto", "condition": { "not_equals": "Latte" } },
            { "op": "select", "fields": ["producto", "precio"] },
            { "op": "derive", "name": "resumen",
              "value": { "concat": { "fields": ["producto", "precio"], "separator": " @ " } } }
        ]
    }"#;

    fn record(producto: &str) -> Record {
        Record::try_from_pairs([("id", "1"), ("producto", producto), ("precio", "2.50")]).unwrap()
    }

    #[test]
    fn parses_steps_and_defaults() {
        let cfg = PipelineConfig::from_json_str(CONFIG).unwrap();
        assert_eq!(cfg.delimiter, ',');
        assert_eq!(cfg.field_set_policy, FieldSetPolicy::FillMissing);
        assert_eq!(cfg.row_decode, RowDecodePolicy::Skip);
        assert_eq!(cfg.output_format().unwrap(), OutputFormat::JsonLines);
        assert_eq!(
            cfg.steps[0],
            StepConfig::Filter {
                field: "producto".to_string(),
                condition: Condition::NotEquals("Latte".to_string()),
            }
        );
    }

    #[test]
    fn built_pipeline_applies_steps_in_order() {
        let cfg = PipelineConfig::from_json_str(CONFIG).unwrap();
        let pipeline = cfg.build_pipeline(PipelineOptions::default()).unwrap();
        assert_eq!(pipeline.operator_names(), vec!["filter(producto)", "select", "derive"]);

        assert_eq!(pipeline.apply(record("Latte")).unwrap(), Outcome::Dropped);
        let kept = pipeline.apply(record("Mocha")).unwrap().into_record().unwrap();
        assert_eq!(kept.names().collect::<Vec<_>>(), vec!["producto", "precio", "resumen"]);
        assert_eq!(kept.get("resumen"), Some("Mocha @ 2.50"));
    }

    #[test]
    fn filter_on_unknown_field_is_a_schema_error() {
        let cfg = PipelineConfig::from_json_str(
            r#"{"input":"a.csv","output":"b.csv",
                "steps":[{"op":"filter","field":"stock","condition":"not_empty"}]}"#,
        )
        .unwrap();
        let pipeline = cfg.build_pipeline(PipelineOptions::default()).unwrap();
        assert!(pipeline.apply(record("Mocha")).unwrap_err().is_schema_error());
    }

    #[test]
    fn value_expressions() {
        let r = record("Mocha");
        assert_eq!(ValueExpr::Upper("producto".into()).evaluate(&r).unwrap(), "MOCHA");
        assert_eq!(ValueExpr::Lower("producto".into()).evaluate(&r).unwrap(), "mocha");
        assert_eq!(ValueExpr::Copy("precio".into()).evaluate(&r).unwrap(), "2.50");
        assert_eq!(ValueExpr::Constant("EUR".into()).evaluate(&r).unwrap(), "EUR");
        assert!(ValueExpr::Copy("nada".into()).evaluate(&r).is_err());
    }

    #[test]
    fn rejects_bad_configs() {
        assert!(PipelineConfig::from_json_str(r#"{"input":"a.csv"}"#).is_err());
        assert!(PipelineConfig::from_json_str(r#"{"input":"a.csv","output":"b.csv","bogus":1}"#).is_err());

        // Typos inside steps are rejected too, not silently defaulted.
        assert!(PipelineConfig::from_json_str(
            r#"{"input":"a.csv","output":"b.csv","steps":[{"op":"select","fields":["id"],"bogus":1}]}"#,
        )
        .is_err());
        assert!(PipelineConfig::from_json_str(
            r#"{"input":"a.csv","output":"b.csv","steps":[{"op":"derive","name":"x",
                "value":{"concat":{"fields":["id"],"separatr":"-"}}}]}"#,
        )
        .is_err());

        let cfg = PipelineConfig::from_json_str(r#"{"input":"a.csv","output":"b.parquet"}"#).unwrap();
        assert!(cfg.output_format().unwrap_err().to_string().contains("cannot infer output format"));

        let cfg = PipelineConfig::from_json_str(r#"{"input":"a.csv","output":"b.csv","delimiter":"§"}"#).unwrap();
        assert!(cfg.source_options().is_err());

        let cfg = PipelineConfig::from_json_str(
            r#"{"input":"a.csv","output":"b.csv","steps":[{"op":"select","fields":["a","a"]}]}"#,
        )
        .unwrap();
        assert!(cfg.build_pipeline(PipelineOptions::default()).is_err());
    }
}
