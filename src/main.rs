//! Command-line interface for dae

#[cfg(feature = "cli")]
use clap::{ArgAction, Parser};

#[cfg(feature = "cli")]
use serde::Serialize;
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};

#[cfg(feature = "cli")]
use dae::validators::{DaeValidator, Finding, ResultCode, ValidatorOptions};
#[cfg(feature = "cli")]
use dae::{Document, Location};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "dae-validator")]
#[command(author, version, about = "COLLADA document validator", long_about = None)]
struct Cli {
    /// COLLADA documents to validate
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Validate against this schema only, instead of the bundled and extension schemas
    #[arg(short, long, value_name = "SCHEMA")]
    schema: Option<PathBuf>,

    /// Directory holding the bundled COLLADA schemas (defaults to the executable's directory)
    #[arg(long, value_name = "DIR")]
    schema_dir: Option<PathBuf>,

    /// Output results as JSON
    #[arg(short, long)]
    json: bool,

    /// Allow remote extension schemas to be fetched
    #[arg(long)]
    allow_remote: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only set the exit status
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[cfg(feature = "cli")]
#[derive(Serialize, Debug)]
struct FileReport {
    file: String,
    code: ResultCode,
    exit_status: i32,
    findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    log::debug!("Command-line args: {:?}", cli);

    let mut options = ValidatorOptions::new().with_allow_remote(cli.allow_remote);
    if let Some(dir) = &cli.schema_dir {
        options = options.with_schema_dir(dir);
    }

    let mut status = 0;
    let mut reports = Vec::with_capacity(cli.files.len());
    for file in &cli.files {
        let report = validate_file(file, cli.schema.as_deref(), &options);
        status |= report.exit_status;

        if !cli.json && !cli.quiet {
            print_summary(&report);
        }
        reports.push(report);
    }

    if cli.json {
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                status |= ResultCode::FAILURE.exit_status();
            }
        }
    }

    std::process::exit(status);
}

/// Console logging; findings are reported through the log records.
#[cfg(feature = "cli")]
fn init_logging(cli: &Cli) {
    let default_level = if cli.quiet {
        "off"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

#[cfg(feature = "cli")]
fn validate_file(file: &Path, schema: Option<&Path>, options: &ValidatorOptions) -> FileReport {
    let name = file.display().to_string();

    let doc = match Document::from_file(file, &options.limits) {
        Ok(doc) => doc,
        Err(e) => {
            log::error!("{}: {}", name, e);
            return FileReport {
                file: name,
                code: ResultCode::FAILURE,
                exit_status: ResultCode::FAILURE.exit_status(),
                findings: Vec::new(),
                error: Some(e.to_string()),
            };
        }
    };

    let validator = DaeValidator::with_options(&doc, options.clone());
    let report = match schema {
        Some(path) => {
            let mut report = validator.check_schema(Some(&Location::Path(path.to_path_buf())));
            report.merge(validator.check_unique_ids());
            report
        }
        None => validator.check_all(),
    };

    FileReport {
        file: name,
        code: report.code(),
        exit_status: report.exit_status(),
        findings: report.findings().to_vec(),
        error: None,
    }
}

#[cfg(feature = "cli")]
fn print_summary(report: &FileReport) {
    if !report.code.is_success() {
        println!("{}: FAILED ({} problems)", report.file, report.findings.len().max(1));
    } else if report.code.contains(ResultCode::SCHEMA_UNAVAILABLE) {
        println!("{}: OK (some schemas could not be loaded)", report.file);
    } else {
        println!("{}: OK", report.file);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
