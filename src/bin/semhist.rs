//! semhist - Command-line interface for semantic-history
//!
//! Commands:
//! - transform: Map semantic history documents into JSONL records
//! - records: Map a raw location history document into JSONL fixes
//! - validate: Report malformed timeline entries
//! - schema: Print the output table schema
//! - doctor: Diagnose timezone configuration

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use semantic_history::pipeline::{discover_inputs, records_to_sink, BatchStats, SemanticProcessor};
use semantic_history::schema::TimelineAdapter;
use semantic_history::sink::JsonlSink;
use semantic_history::timezone::{parse_timezone, TimezoneLookup, TzfLookup};
use semantic_history::types::{table_schema, PARTITION_COLUMN};
use semantic_history::{ComputeError, PRODUCER_NAME, VERSION};
use tracing_subscriber::EnvFilter;

/// semhist - Flatten location history into line-delimited records
#[derive(Parser)]
#[command(name = "semhist")]
#[command(version = VERSION)]
#[command(about = "Flatten location-history timelines into JSONL records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map semantic history documents into JSONL records
    Transform {
        /// Input files or directories (use - for stdin)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Timezone for records without a start point (IANA format)
        #[arg(long, env = "SEMHIST_DEFAULT_TZ", default_value = "UTC")]
        default_timezone: String,
    },

    /// Map a raw location history document (Records.json) into JSONL fixes
    Records {
        /// Input file path (use - for stdin)
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Report malformed timeline entries without writing output
    Validate {
        /// Input files or directories (use - for stdin)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the output table schema
    Schema {
        /// Output as a loader-compatible JSON field list
        #[arg(long)]
        json: bool,
    },

    /// Diagnose timezone configuration
    Doctor {
        /// Timezone for records without a start point (IANA format)
        #[arg(long, env = "SEMHIST_DEFAULT_TZ", default_value = "UTC")]
        default_timezone: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), SemhistCliError> {
    match cli.command {
        Commands::Transform {
            inputs,
            output,
            default_timezone,
        } => cmd_transform(&inputs, &output, &default_timezone),

        Commands::Records { input, output } => cmd_records(&input, &output),

        Commands::Validate { inputs, json } => cmd_validate(&inputs, json),

        Commands::Schema { json } => cmd_schema(json),

        Commands::Doctor {
            default_timezone,
            json,
        } => cmd_doctor(&default_timezone, json),
    }
}

fn cmd_transform(
    inputs: &[PathBuf],
    output: &Path,
    default_timezone: &str,
) -> Result<(), SemhistCliError> {
    let inputs = discover_inputs(inputs)?;
    if inputs.is_empty() {
        return Err(SemhistCliError::NoInputs);
    }

    let mut processor = SemanticProcessor::new(default_timezone)?;
    tracing::info!(
        inputs = inputs.len(),
        default_tz = %processor.normalizer().default_timezone(),
        "transforming"
    );

    let stats = if is_stdio(output) {
        let mut sink = JsonlSink::stdout();
        transform_into(&mut processor, &inputs, &mut sink)?;
        sink.finish()?;
        processor.stats()
    } else {
        let mut sink = JsonlSink::create(output)?;
        transform_into(&mut processor, &inputs, &mut sink)?;
        sink.finish()?;
        processor.stats()
    };

    report_stats("transform", &stats, output);
    Ok(())
}

fn transform_into<W: io::Write>(
    processor: &mut SemanticProcessor,
    inputs: &[PathBuf],
    sink: &mut JsonlSink<W>,
) -> Result<(), SemhistCliError> {
    for input in inputs {
        if is_stdio(input) {
            processor.process_str(&read_input(input)?, sink)?;
        } else {
            processor.process_file(input, sink)?;
        }
    }
    Ok(())
}

fn cmd_records(input: &Path, output: &Path) -> Result<(), SemhistCliError> {
    let raw_json = read_input(input)?;

    let stats = if is_stdio(output) {
        let mut sink = JsonlSink::stdout();
        let stats = records_to_sink(&raw_json, &mut sink)?;
        sink.finish()?;
        stats
    } else {
        let mut sink = JsonlSink::create(output)?;
        let stats = records_to_sink(&raw_json, &mut sink)?;
        sink.finish()?;
        stats
    };

    report_stats("records", &stats, output);
    Ok(())
}

fn cmd_validate(inputs: &[PathBuf], json: bool) -> Result<(), SemhistCliError> {
    let inputs = discover_inputs(inputs)?;
    if inputs.is_empty() {
        return Err(SemhistCliError::NoInputs);
    }

    let mut files = Vec::new();
    for input in &inputs {
        let document = TimelineAdapter::parse_document(&read_input(input)?)?;
        let results = TimelineAdapter::validate_entries(&document);
        files.push(FileValidation {
            path: input.display().to_string(),
            total_entries: document.timeline_objects.len(),
            malformed_entries: results.len(),
            errors: results
                .iter()
                .map(|r| ValidationErrorDetail {
                    index: r.index,
                    error: r.error.to_string(),
                })
                .collect(),
        });
    }

    let report = ValidationReport {
        total_entries: files.iter().map(|f| f.total_entries).sum(),
        malformed_entries: files.iter().map(|f| f.malformed_entries).sum(),
        files,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Files:             {}", report.files.len());
        println!("Total entries:     {}", report.total_entries);
        println!("Malformed entries: {}", report.malformed_entries);

        for file in report.files.iter().filter(|f| f.malformed_entries > 0) {
            println!("\n{}:", file.path);
            for err in &file.errors {
                println!("  - entry {}: {}", err.index, err.error);
            }
        }
    }

    if report.malformed_entries > 0 {
        Err(SemhistCliError::ValidationFailed(report.malformed_entries))
    } else {
        Ok(())
    }
}

fn cmd_schema(json: bool) -> Result<(), SemhistCliError> {
    let columns = table_schema();

    if json {
        println!("{}", serde_json::to_string_pretty(&columns)?);
    } else {
        println!("Output Schema: {} {}", PRODUCER_NAME, VERSION);
        println!();
        println!("One JSON object per line, partitioned by day on `{}`:", PARTITION_COLUMN);
        println!();
        for column in &columns {
            println!(
                "  {:<16} {:<10} {:<9} {}",
                column.name, column.column_type, column.mode, column.description
            );
        }
    }

    Ok(())
}

fn cmd_doctor(default_timezone: &str, json: bool) -> Result<(), SemhistCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} {}", PRODUCER_NAME, VERSION),
    });

    checks.push(match parse_timezone(default_timezone) {
        Ok(tz) => DoctorCheck {
            name: "default_timezone".to_string(),
            status: CheckStatus::Ok,
            message: format!("Default timezone {}", tz.name()),
        },
        Err(e) => DoctorCheck {
            name: "default_timezone".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        },
    });

    // Greenwich should always resolve
    let lookup = TzfLookup::new();
    let candidates = lookup.candidates(51.4779, -0.0015);
    checks.push(match candidates.first() {
        Some(name) if parse_timezone(name).is_ok() => DoctorCheck {
            name: "timezone_lookup".to_string(),
            status: CheckStatus::Ok,
            message: format!("Coordinate lookup resolved Greenwich to {}", name),
        },
        Some(name) => DoctorCheck {
            name: "timezone_lookup".to_string(),
            status: CheckStatus::Warning,
            message: format!("Coordinate lookup returned unknown zone {}", name),
        },
        None => DoctorCheck {
            name: "timezone_lookup".to_string(),
            status: CheckStatus::Error,
            message: "Coordinate lookup returned no zone".to_string(),
        },
    });

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass files as inputs)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (use - as input)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("semhist Doctor Report");
        println!("=====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(SemhistCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn is_stdio(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn read_input(input: &Path) -> Result<String, SemhistCliError> {
    if is_stdio(input) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        fs::read_to_string(input).map_err(|e| SemhistCliError::Input(input.to_path_buf(), e))
    }
}

fn report_stats(command: &str, stats: &BatchStats, output: &Path) {
    tracing::info!(command, ?stats, "run complete");
    eprintln!(
        "Wrote {} records to {} ({} entries read, {} skipped)",
        stats.written,
        if is_stdio(output) { "stdout".to_string() } else { output.display().to_string() },
        stats.entries,
        stats.skipped
    );
}

// Error types

#[derive(Debug)]
enum SemhistCliError {
    Io(io::Error),
    Input(PathBuf, io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoInputs,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for SemhistCliError {
    fn from(e: io::Error) -> Self {
        SemhistCliError::Io(e)
    }
}

impl From<ComputeError> for SemhistCliError {
    fn from(e: ComputeError) -> Self {
        SemhistCliError::Compute(e)
    }
}

impl From<serde_json::Error> for SemhistCliError {
    fn from(e: serde_json::Error) -> Self {
        SemhistCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<SemhistCliError> for CliError {
    fn from(e: SemhistCliError) -> Self {
        match e {
            SemhistCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            SemhistCliError::Input(path, e) => CliError {
                code: "INPUT_ERROR".to_string(),
                message: format!("{}: {}", path.display(), e),
                hint: Some("Check that the input file exists and is readable".to_string()),
            },
            SemhistCliError::Compute(ComputeError::InvalidTimezone(msg)) => CliError {
                code: "INVALID_TIMEZONE".to_string(),
                message: msg,
                hint: Some("Use an IANA name such as America/Los_Angeles".to_string()),
            },
            SemhistCliError::Compute(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure inputs are location history JSON exports".to_string()),
            },
            SemhistCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            SemhistCliError::NoInputs => CliError {
                code: "NO_INPUTS".to_string(),
                message: "No input documents found".to_string(),
                hint: Some("Directories are searched for *.json files".to_string()),
            },
            SemhistCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} timeline entries are malformed", count),
                hint: Some("Malformed entries are skipped by 'semhist transform'".to_string()),
            },
            SemhistCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_entries: usize,
    malformed_entries: usize,
    files: Vec<FileValidation>,
}

#[derive(serde::Serialize)]
struct FileValidation {
    path: String,
    total_entries: usize,
    malformed_entries: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
