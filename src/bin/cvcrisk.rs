//! cvcrisk - Command-line interface for CVC Sentinel
//!
//! Commands:
//! - assess: Assess capture requests from a file (batch mode)
//! - run: Process tagged telemetry/capture submissions from stdin (streaming mode)
//! - doctor: Diagnose configuration and state files
//! - schema: Describe input and output formats

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Once;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cvc_sentinel::config::THRESHOLDS_ENV;
use cvc_sentinel::pipeline::{CaptureRequest, ProcessorState, Submission, SurveillanceProcessor};
use cvc_sentinel::{EngineConfig, RiskThresholds, ENGINE_VERSION, PRODUCER_NAME};

/// Environment variable holding the log filter
const LOG_ENV: &str = "CVC_LOG";

/// cvcrisk - Deterministic CLABSI and venous-resistance risk scoring
#[derive(Parser)]
#[command(name = "cvcrisk")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Score central venous catheter captures", long_about = None)]
struct Cli {
    /// Band thresholds as JSON, e.g. '{"greenMax":3,"yellowMax":6}' (overrides RISK_BAND_THRESHOLDS)
    #[arg(long, global = true)]
    thresholds: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess capture requests (batch mode)
    Assess {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Load processor state from file
        #[arg(long)]
        load_state: Option<PathBuf>,

        /// Save processor state to file after processing
        #[arg(long)]
        save_state: Option<PathBuf>,
    },

    /// Process tagged submissions from stdin (streaming mode)
    Run {
        /// Load processor state from file
        #[arg(long)]
        load_state: Option<PathBuf>,

        /// Save processor state to file on exit
        #[arg(long)]
        save_state: Option<PathBuf>,

        /// Buffer output instead of flushing after each record
        #[arg(long)]
        no_flush: bool,
    },

    /// Diagnose configuration and state files
    Doctor {
        /// Check a processor state file
        #[arg(long)]
        state: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Describe input and output formats
    Schema {
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one capture per line)
    Ndjson,
    /// JSON array of captures
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one payload per line)
    Ndjson,
    /// JSON array of payloads
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Capture and telemetry submissions
    Input,
    /// Assessment payload
    Output,
}

fn main() -> ExitCode {
    init_tracing();
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

/// Logs go to stderr so stdout stays machine-readable
fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new("cvc_sentinel=info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init();
    });
}

fn engine_config(thresholds: Option<&str>) -> Result<EngineConfig, SentinelCliError> {
    match thresholds {
        // Explicit flags are strict; the environment degrades to defaults
        Some(raw) => Ok(EngineConfig::new(RiskThresholds::try_parse(raw)?)),
        None => Ok(EngineConfig::from_env()),
    }
}

fn run(cli: Cli) -> Result<(), SentinelCliError> {
    let config = engine_config(cli.thresholds.as_deref())?;

    match cli.command {
        Commands::Assess {
            input,
            output,
            input_format,
            output_format,
            load_state,
            save_state,
        } => cmd_assess(
            config,
            &input,
            &output,
            input_format,
            output_format,
            load_state.as_deref(),
            save_state.as_deref(),
        ),

        Commands::Run {
            load_state,
            save_state,
            no_flush,
        } => cmd_run(config, load_state.as_deref(), save_state.as_deref(), !no_flush),

        Commands::Doctor { state, json } => cmd_doctor(state.as_deref(), json),

        Commands::Schema { schema_type } => cmd_schema(schema_type),
    }
}

fn new_processor(
    config: EngineConfig,
    load_state: Option<&Path>,
) -> Result<SurveillanceProcessor, SentinelCliError> {
    let mut processor = SurveillanceProcessor::new(config);
    if let Some(path) = load_state {
        let state_json = fs::read_to_string(path)?;
        processor.load_state(&state_json)?;
        debug!(path = %path.display(), "loaded processor state");
    }
    Ok(processor)
}

fn persist_state(
    processor: &SurveillanceProcessor,
    save_state: Option<&Path>,
) -> Result<(), SentinelCliError> {
    if let Some(path) = save_state {
        fs::write(path, processor.save_state()?)?;
        debug!(path = %path.display(), "saved processor state");
    }
    Ok(())
}

fn cmd_assess(
    config: EngineConfig,
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    load_state: Option<&Path>,
    save_state: Option<&Path>,
) -> Result<(), SentinelCliError> {
    let input_data = if input.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let requests: Vec<CaptureRequest> = match input_format {
        InputFormat::Ndjson => input_data
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| {
                    SentinelCliError::ParseError(format!("Line {}: {}", index + 1, e))
                })
            })
            .collect::<Result<_, _>>()?,
        InputFormat::Json => serde_json::from_str(&input_data)?,
    };

    if requests.is_empty() {
        return Err(SentinelCliError::NoCaptures);
    }

    let mut processor = new_processor(config, load_state)?;
    let payloads = requests
        .iter()
        .map(|request| processor.assess(request))
        .collect::<Result<Vec<_>, _>>()?;
    info!(count = payloads.len(), "assessed captures");

    let formatted = format_output(&payloads, &output_format)?;
    if output.as_os_str() == "-" {
        let mut stdout = io::stdout();
        write!(stdout, "{}", formatted)?;
        stdout.flush()?;
    } else {
        fs::write(output, formatted)?;
    }

    persist_state(&processor, save_state)
}

fn cmd_run(
    config: EngineConfig,
    load_state: Option<&Path>,
    save_state: Option<&Path>,
    flush: bool,
) -> Result<(), SentinelCliError> {
    let mut processor = new_processor(config, load_state)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let submission: Submission = serde_json::from_str(trimmed).map_err(|e| {
            SentinelCliError::ParseError(format!("Failed to parse submission: {}", e))
        })?;

        let outcome = processor.process_submission(&submission)?;
        writeln!(stdout, "{}", serde_json::to_string(&outcome)?)?;
        if flush {
            stdout.flush()?;
        }
    }
    stdout.flush()?;

    persist_state(&processor, save_state)
}

fn cmd_doctor(state: Option<&Path>, json: bool) -> Result<(), SentinelCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Engine version {}", ENGINE_VERSION),
    });

    // Band thresholds
    let thresholds_check = match std::env::var(THRESHOLDS_ENV) {
        Err(_) => DoctorCheck {
            name: "thresholds".to_string(),
            status: CheckStatus::Ok,
            message: format!("{} not set, using defaults", THRESHOLDS_ENV),
        },
        Ok(raw) => match RiskThresholds::try_parse(&raw) {
            Ok(t) => DoctorCheck {
                name: "thresholds".to_string(),
                status: CheckStatus::Ok,
                message: format!("greenMax {} / yellowMax {}", t.green_max, t.yellow_max),
            },
            Err(e) => DoctorCheck {
                name: "thresholds".to_string(),
                status: CheckStatus::Warning,
                message: format!("{} (defaults will be used)", e),
            },
        },
    };
    checks.push(thresholds_check);

    if let Some(path) = state {
        let state_check = if !path.exists() {
            DoctorCheck {
                name: "state".to_string(),
                status: CheckStatus::Warning,
                message: "State file does not exist".to_string(),
            }
        } else {
            match fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str::<ProcessorState>(&content) {
                    Ok(_) => DoctorCheck {
                        name: "state".to_string(),
                        status: CheckStatus::Ok,
                        message: "State file valid".to_string(),
                    },
                    Err(e) => DoctorCheck {
                        name: "state".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Invalid state JSON: {}", e),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "state".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read state file: {}", e),
                },
            }
        };
        checks.push(state_check);
    }

    // Check stdin is available (for streaming mode)
    let stdin_message = if atty::is(atty::Stream::Stdin) {
        "stdin is a TTY (interactive mode)"
    } else {
        "stdin is a pipe (streaming mode ready)"
    };
    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: stdin_message.to_string(),
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("cvcrisk Doctor Report");
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
        Err(SentinelCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), SentinelCliError> {
    match schema_type {
        SchemaType::Input => {
            println!("Capture request (assess, or run with \"kind\": \"capture\"):");
            println!("- patient_id, insertion_date, captured_at (RFC 3339)");
            println!("- patient_factors: {{ agitation, extremes_age_weight_obesity, comorbidities, immune_nutrition }}");
            println!("- safety_checklist: {{ caps_closed, gloves_worn, no_abnormalities, dressing_intact }}");
            println!("- telemetry (optional): see below");
            println!("- signals (optional): {{ erythema, drainage, ooze, moisture (0-3), dressing_lift (0-100), chg_patch, maceration }}");
            println!("- vision_reply (optional): free-text model reply containing a signals object");
            println!("- trend_deterioration (optional, 0-3), night_mode_assist, risk_phase_override (early|late)");
            println!();
            println!("Telemetry submission (run with \"kind\": \"telemetry\"):");
            println!("- patient_id, submitted_at");
            println!("- telemetry: {{ traction_pulls_yellow, traction_pulls_red, dressing_changed, catheter_changed, flushing_done, adaptive_traction_alert }}");
            println!();
            println!("camelCase keys are accepted throughout.");
        }
        SchemaType::Output => {
            println!("Assessment payload:");
            println!("- payload_version");
            println!("- producer: {{ name, version, instance_id }}");
            println!("- provenance: {{ patient_id, captured_at_utc, days_since_insertion }}");
            println!("- quality: {{ vision_available, defaulted_fields, dressing_failure }}");
            println!("- snapshot: {{ clisa_score, predictive_clabsi_score, predictive_clabsi_band,");
            println!("              predictive_venous_resistance_band, recommended_action, risk_phase,");
            println!("              early_clabsi_score, late_clabsi_score, trend_penalty, ... }}");
            println!("- alerts: [{{ type, severity, reason, recommended_action }}]");
        }
    }

    Ok(())
}

fn format_output<T: Serialize>(outputs: &[T], format: &OutputFormat) -> Result<String, SentinelCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for output in outputs {
                lines.push(serde_json::to_string(output)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(outputs)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(outputs)?),
    }
}

// Error types

#[derive(Debug)]
enum SentinelCliError {
    Io(io::Error),
    Compute(cvc_sentinel::ComputeError),
    Json(serde_json::Error),
    NoCaptures,
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for SentinelCliError {
    fn from(e: io::Error) -> Self {
        SentinelCliError::Io(e)
    }
}

impl From<cvc_sentinel::ComputeError> for SentinelCliError {
    fn from(e: cvc_sentinel::ComputeError) -> Self {
        SentinelCliError::Compute(e)
    }
}

impl From<serde_json::Error> for SentinelCliError {
    fn from(e: serde_json::Error) -> Self {
        SentinelCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<SentinelCliError> for CliError {
    fn from(e: SentinelCliError) -> Self {
        match e {
            SentinelCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            SentinelCliError::Compute(cvc_sentinel::ComputeError::InvalidConfig(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Thresholds need greenMax below yellowMax".to_string()),
            },
            SentinelCliError::Compute(e) => CliError {
                code: "COMPUTE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'cvcrisk schema input' for the expected fields".to_string()),
            },
            SentinelCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            SentinelCliError::NoCaptures => CliError {
                code: "NO_CAPTURES".to_string(),
                message: "No captures found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            SentinelCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            SentinelCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
