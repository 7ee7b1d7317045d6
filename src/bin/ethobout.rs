//! Ethobout CLI - Command-line interface for the bout engine
//!
//! Commands:
//! - transform: Process observation logs into the analysis report (batch mode)
//! - validate: Validate observation records against the input contract
//! - schema: Print schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ethobout::schema::{RawEvent, RecordReader, REQUIRED_COLUMNS};
use ethobout::{
    analyze_events, EngineConfig, EngineError, InterboutGrouping, MergeScope, ENGINE_VERSION,
};

/// Ethobout - Reconstruct behavioral bouts from START/STOP observation logs
#[derive(Parser)]
#[command(name = "ethobout")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Turn observation event logs into bout statistics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process observation logs into the analysis report (batch mode)
    Transform {
        /// Input file path(s); records are concatenated (use - for stdin)
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "tsv")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "auto")]
        output_format: OutputFormat,

        /// Load engine configuration from a JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Gap tolerance between intervals of one bout, in seconds
        #[arg(long)]
        gap_tolerance: Option<f64>,

        /// Bout merge scope
        #[arg(long, value_enum)]
        merge_scope: Option<MergeScopeArg>,

        /// Discard matched intervals shorter than this many seconds
        #[arg(long)]
        min_interval: Option<f64>,

        /// Interbout gap grouping
        #[arg(long, value_enum)]
        interbout_grouping: Option<InterboutGroupingArg>,
    },

    /// Validate observation records against the input contract
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "tsv")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Tab-separated values with a header row
    Tsv,
    /// Comma-separated values with a header row
    Csv,
    /// JSON array of records
    Json,
    /// Newline-delimited JSON (one record per line)
    Ndjson,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Pretty JSON on an interactive terminal, compact otherwise
    Auto,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum MergeScopeArg {
    /// Merge per (subject, observation date)
    ObservationDate,
    /// Merge per subject across all dates
    Subject,
}

#[derive(Clone, Copy, ValueEnum)]
enum InterboutGroupingArg {
    /// Gaps against the previous interval of the same behavior
    WithinBehavior,
    /// Gaps against the previous interval of any behavior
    AcrossBehaviors,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaType {
    /// Input contract (observation log columns)
    Input,
    /// Output structure (analysis report)
    Output,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), BoutCliError> {
    match cli.command {
        Commands::Transform {
            input,
            output,
            input_format,
            output_format,
            config,
            gap_tolerance,
            merge_scope,
            min_interval,
            interbout_grouping,
        } => {
            let config = build_config(
                config.as_deref(),
                gap_tolerance,
                merge_scope,
                min_interval,
                interbout_grouping,
            )?;
            cmd_transform(&input, &output, input_format, output_format, config)
        }

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Schema { schema_type } => {
            cmd_schema(schema_type);
            Ok(())
        }
    }
}

/// Start from the config file when given, then apply flag overrides.
fn build_config(
    config_path: Option<&Path>,
    gap_tolerance: Option<f64>,
    merge_scope: Option<MergeScopeArg>,
    min_interval: Option<f64>,
    interbout_grouping: Option<InterboutGroupingArg>,
) -> Result<EngineConfig, BoutCliError> {
    let mut config = match config_path {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            EngineConfig::from_json(&json)?
        }
        None => EngineConfig::default(),
    };

    if let Some(gap) = gap_tolerance {
        config.gap_tolerance_sec = gap;
    }
    if let Some(scope) = merge_scope {
        config.merge_scope = match scope {
            MergeScopeArg::ObservationDate => MergeScope::ObservationDate,
            MergeScopeArg::Subject => MergeScope::Subject,
        };
    }
    if let Some(min) = min_interval {
        config.min_interval_sec = Some(min);
    }
    if let Some(grouping) = interbout_grouping {
        config.interbout_grouping = match grouping {
            InterboutGroupingArg::WithinBehavior => InterboutGrouping::WithinBehavior,
            InterboutGroupingArg::AcrossBehaviors => InterboutGrouping::AcrossBehaviors,
        };
    }

    Ok(config)
}

fn cmd_transform(
    inputs: &[PathBuf],
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: EngineConfig,
) -> Result<(), BoutCliError> {
    let mut events: Vec<RawEvent> = Vec::new();
    for input in inputs {
        let data = read_input(input)?;
        events.extend(parse_events(&data, input_format)?);
    }

    if events.is_empty() {
        return Err(BoutCliError::NoEvents);
    }

    let report = analyze_events(&events, config)?;

    let to_stdout = output.to_string_lossy() == "-";
    let pretty = match output_format {
        OutputFormat::Auto => to_stdout && atty::is(atty::Stream::Stdout),
        OutputFormat::Json => false,
        OutputFormat::JsonPretty => true,
    };
    let output_data = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    if to_stdout {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    json: bool,
) -> Result<(), BoutCliError> {
    let data = read_input(input)?;
    let events = parse_events(&data, input_format)?;

    let failures = RecordReader::validate_events(&events);
    let report = ValidationReport {
        total_records: events.len(),
        valid_records: events.len() - failures.len(),
        invalid_records: failures.len(),
        errors: failures
            .iter()
            .map(|(index, error)| ValidationErrorDetail {
                index: *index,
                subject: events[*index].subject.clone(),
                error: error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Record {} (subject '{}'): {}",
                    err.index, err.subject, err.error
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(BoutCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType) {
    match schema_type {
        SchemaType::Input => {
            println!("Input contract: observation event records");
            println!();
            println!("Required columns (delimited input; extra columns are ignored):");
            for column in REQUIRED_COLUMNS {
                println!("  - {}", column);
            }
            println!();
            println!("Behavior type must be START or STOP; Time is numeric seconds");
            println!("from the start of the observation. A behavior label may encode");
            println!("a modifier as 'behavior_modifier'.");
        }
        SchemaType::Output => {
            println!("Output: analysis report (JSON)");
            println!();
            println!("- producer: {{ name, version, instance_id }}");
            println!("- computed_at_utc, config");
            println!("- subjects: per-subject table bundles:");
            println!("  - Matched intervals, Bouts, Duration statistics,");
            println!("    Bout statistics, Interbout duration statistics,");
            println!("    Time proportions");
            println!("- failures: [{{ subject, error }}]");
            println!("- combined: all-subjects views of each table, with a");
            println!("  Subject column and columns sorted by name");
        }
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, BoutCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_events(data: &str, format: InputFormat) -> Result<Vec<RawEvent>, BoutCliError> {
    let events = match format {
        InputFormat::Tsv => RecordReader::parse_delimited(data, '\t')?,
        InputFormat::Csv => RecordReader::parse_delimited(data, ',')?,
        InputFormat::Json => RecordReader::parse_array(data)?,
        InputFormat::Ndjson => RecordReader::parse_ndjson(data)?,
    };
    Ok(events)
}

// Error types

#[derive(Debug)]
enum BoutCliError {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    NoEvents,
    ValidationFailed(usize),
}

impl From<io::Error> for BoutCliError {
    fn from(e: io::Error) -> Self {
        BoutCliError::Io(e)
    }
}

impl From<EngineError> for BoutCliError {
    fn from(e: EngineError) -> Self {
        BoutCliError::Engine(e)
    }
}

impl From<serde_json::Error> for BoutCliError {
    fn from(e: serde_json::Error) -> Self {
        BoutCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<BoutCliError> for CliError {
    fn from(e: BoutCliError) -> Self {
        match e {
            BoutCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            BoutCliError::Engine(EngineError::MissingColumns(cols)) => CliError {
                code: "SCHEMA_ERROR".to_string(),
                message: format!("missing required columns: {}", cols.join(", ")),
                hint: Some("Run 'ethobout schema input' for the expected columns".to_string()),
            },
            BoutCliError::Engine(EngineError::InvalidConfig(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Check the configuration file and flags".to_string()),
            },
            BoutCliError::Engine(e) => CliError {
                code: "ENGINE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the input records".to_string()),
            },
            BoutCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            BoutCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No records found in input".to_string(),
                hint: Some("Ensure the input files are not empty".to_string()),
            },
            BoutCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} record(s) failed validation", count),
                hint: Some("Fix the reported records and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    subject: String,
    error: String,
}
