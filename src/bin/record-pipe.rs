//! CLI tool to run record pipelines over CSV files.
//!
//! Usage:
//!   record-pipe copy <input.csv> <output.csv>
//!   record-pipe select <input.csv> <output.csv> --fields descripcion,producto,precio,id
//!   record-pipe show <input.csv>
//!   record-pipe run <pipeline.json>
//!
//! Errors are printed on stderr and the process exits with status 1.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use record_pipeline::config::{run_config, PipelineConfig};
use record_pipeline::pipeline::{
    CompositeObserver, FileObserver, Pipeline, PipelineObserver, PipelineOptions, RowDecodePolicy, RunStats,
    Severity, StdErrObserver,
};
use record_pipeline::sink::{CsvSink, FieldSetPolicy, JsonLinesSink, SinkOptions, Terminator};
use record_pipeline::source::{CsvSource, SourceOptions};
use record_pipeline::types::FieldOrder;
use record_pipeline::{PipelineError, PipelineResult};

#[derive(Debug, Parser)]
#[command(name = "record-pipe", version, about = "Stream CSV records through select/filter/derive pipelines")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Field delimiter (single ASCII character).
    #[arg(long, global = true, default_value_t = ',')]
    delimiter: char,

    /// Write `\r\n` line endings instead of `\n`.
    #[arg(long, global = true)]
    crlf: bool,

    /// Skip rows the CSV decoder rejects instead of aborting.
    #[arg(long, global = true)]
    skip_bad_rows: bool,

    /// Log run events (including skipped rows) to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Also append run events to this log file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Copy records unchanged.
    Copy { input: PathBuf, output: PathBuf },
    /// Keep only the given fields, in the given order.
    Select {
        input: PathBuf,
        output: PathBuf,
        /// Comma-separated field list, e.g. `producto,precio`.
        #[arg(long, short)]
        fields: String,
    },
    /// Print records as JSON lines on stdout.
    Show { input: PathBuf },
    /// Run a JSON pipeline config.
    Run { config: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match execute(&cli) {
        Ok(stats) => {
            eprintln!(
                "Processed {} -> {} records ({} dropped, {} skipped)",
                stats.records_read, stats.records_written, stats.records_dropped, stats.rows_skipped
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli) -> PipelineResult<RunStats> {
    let options = pipeline_options(&cli.common);
    let delimiter = delimiter_byte(cli.common.delimiter)?;
    let source_options = SourceOptions { delimiter };
    let sink_options = SinkOptions {
        delimiter,
        terminator: if cli.common.crlf { Terminator::Crlf } else { Terminator::Lf },
        ..Default::default()
    };

    match &cli.command {
        Command::Copy { input, output } => {
            let source = CsvSource::open(input, &source_options)?;
            let mut sink = CsvSink::create(output, &sink_options)?;
            Pipeline::with_options(options).run(source, &mut sink)
        }
        Command::Select { input, output, fields } => {
            let fields = FieldOrder::parse_list(fields)?;
            let source = CsvSource::open(input, &source_options)?;
            let mut sink = CsvSink::create(
                output,
                &SinkOptions {
                    fields: Some(fields.clone()),
                    ..sink_options
                },
            )?;
            Pipeline::with_options(options).select(fields).run(source, &mut sink)
        }
        Command::Show { input } => {
            let source = CsvSource::open(input, &source_options)?;
            let mut sink = JsonLinesSink::new(
                "<stdout>",
                io::stdout(),
                &SinkOptions {
                    field_set_policy: FieldSetPolicy::FillMissingIgnoreExtra,
                    ..sink_options
                },
            );
            Pipeline::with_options(options).run(source, &mut sink)
        }
        Command::Run { config } => {
            let config = PipelineConfig::from_path(config)?;
            run_config(&config, options)
        }
    }
}

fn pipeline_options(common: &CommonArgs) -> PipelineOptions {
    let mut observers: Vec<Arc<dyn PipelineObserver>> = Vec::new();
    if common.verbose {
        observers.push(Arc::new(StdErrObserver));
    }
    if let Some(path) = &common.log_file {
        observers.push(Arc::new(FileObserver::new(path)));
    }

    PipelineOptions {
        row_decode: if common.skip_bad_rows {
            RowDecodePolicy::Skip
        } else {
            RowDecodePolicy::FailFast
        },
        observer: if observers.is_empty() {
            None
        } else {
            Some(Arc::new(CompositeObserver::new(observers)))
        },
        alert_at_or_above: Severity::Critical,
    }
}

fn delimiter_byte(c: char) -> PipelineResult<u8> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err(PipelineError::Config {
            message: format!("delimiter '{c}' is not a single ASCII character"),
        })
    }
}
