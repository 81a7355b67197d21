// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// qrprint: print a QR label for a URL.
//
// Entry point. Initialises logging, resolves settings, runs one request
// through the pipeline and maps the outcome to an exit code.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use qrprint_app::pipeline::{Pipeline, PipelineOutcome, PipelineReport};
use qrprint_app::services::settings::{self, Overrides};
use qrprint_core::error::{QrPrintError, Result};
use qrprint_core::human_errors::humanize_error;
use qrprint_core::types::{PaperSize, PrintRequest, PrinterTarget};
use qrprint_core::AppConfig;
use qrprint_document::PageInspector;
use qrprint_print::{IppSpooler, PrintSpooler, RecordingSpooler};

/// Exit status for a printed label.
const EXIT_PRINTED: u8 = 0;
/// Exit status for a request that was valid but did not print.
const EXIT_PIPELINE_FAILED: u8 = 1;
/// Exit status for bad input or configuration.
const EXIT_USAGE: u8 = 2;

/// qrprint - encode a URL as a QR code and print it with a description
#[derive(Parser, Debug)]
#[command(name = "qrprint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// URL to encode (http or https)
    #[arg(long, required_unless_present_any = ["list_printers", "save_printer"])]
    url: Option<String>,

    /// Text printed under the code, at most 200 characters
    #[arg(long, required_unless_present_any = ["list_printers", "save_printer"])]
    description: Option<String>,

    /// Printer URI or CUPS queue name (overrides config and environment)
    #[arg(long)]
    printer: Option<String>,

    /// Settings file (defaults to qrprint.json in the data directory)
    #[arg(long, value_name = "FILE")]
    config: Option<std::path::PathBuf>,

    /// Also write the composed PDF to FILE
    #[arg(long, value_name = "FILE")]
    output: Option<std::path::PathBuf>,

    /// Write the QR code bitmap as PNG to FILE
    #[arg(long, value_name = "FILE")]
    preview: Option<std::path::PathBuf>,

    /// Run every stage against an in-memory spooler; nothing is printed
    #[arg(long)]
    dry_run: bool,

    /// List the printers the spooler knows about and exit
    #[arg(long)]
    list_printers: bool,

    /// Store --printer as the default printer in the settings file
    #[arg(long, requires = "printer")]
    save_printer: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", humanize_error(&e));
            ExitCode::from(exit_status(&e))
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let overrides = Overrides {
        config_path: cli.config.clone(),
        printer: cli.printer.clone(),
    };

    if cli.save_printer
        && let Some(printer) = cli.printer.as_deref()
    {
        let path = overrides.config_path();
        settings::save_default_printer(&path, printer)?;
        println!("Printer '{}' saved as default in {}.", printer.trim(), path.display());
        if cli.url.is_none() && !cli.list_printers {
            return Ok(ExitCode::SUCCESS);
        }
    }

    let config = Arc::new(settings::load(&overrides)?);

    if cli.list_printers {
        return list_printers(&config).await;
    }

    let (Some(url), Some(description)) = (cli.url.as_deref(), cli.description.as_deref()) else {
        return Err(QrPrintError::InvalidRequest(
            "both --url and --description are required".into(),
        ));
    };
    let request = PrintRequest::new(url, description)?;

    let spooler: Arc<dyn PrintSpooler> = if cli.dry_run {
        info!("dry run: jobs go to an in-memory spooler");
        Arc::new(dry_run_spooler(&config))
    } else {
        Arc::new(IppSpooler::new(&config.printer))
    };

    let report = Pipeline::new(Arc::clone(&config), spooler).run(&request).await;
    Ok(ExitCode::from(finish(&cli, &report, config.paper_size)))
}

/// Report how the run went, then write any requested files.
///
/// The exit status follows the print outcome alone: a file that cannot be
/// written is logged and does not undo a job the printer already accepted.
fn finish(cli: &Cli, report: &PipelineReport, paper: PaperSize) -> u8 {
    let status = match &report.outcome {
        PipelineOutcome::Succeeded { message, .. } => {
            if cli.dry_run {
                println!("{message} (dry run, nothing was sent)");
            } else {
                println!("{message}");
            }
            EXIT_PRINTED
        }
        PipelineOutcome::Failed { stage, error } => {
            eprintln!("Failed at {stage}: {}", humanize_error(error));
            EXIT_PIPELINE_FAILED
        }
    };

    if let Err(e) = write_artifacts(cli, report, paper) {
        warn!(error = %e, "requested output files were not written");
        eprintln!("Warning: {}", humanize_error(&e));
    }
    status
}

/// Print the enumerated printers, first (the automatic choice) on top.
async fn list_printers(config: &AppConfig) -> Result<ExitCode> {
    let printers = IppSpooler::new(&config.printer).list_printers().await?;
    if printers.is_empty() {
        println!("No printers found. Please check your CUPS setup.");
        return Ok(ExitCode::from(EXIT_PIPELINE_FAILED));
    }
    for printer in printers {
        println!("{}\t{}", printer.identifier, printer.uri);
    }
    Ok(ExitCode::SUCCESS)
}

/// Spooler used for `--dry-run`.
///
/// With no printer configured it lists one placeholder queue on the CUPS
/// server so resolution still has something to pick.
fn dry_run_spooler(config: &AppConfig) -> RecordingSpooler {
    let configured = config
        .printer
        .printer
        .as_deref()
        .map(str::trim)
        .is_some_and(|printer| !printer.is_empty());
    if configured {
        return RecordingSpooler::empty();
    }
    RecordingSpooler::new(vec![PrinterTarget {
        identifier: "dry-run".into(),
        uri: format!(
            "{}/printers/dry-run",
            config.printer.cups_server.trim_end_matches('/')
        ),
    }])
}

/// Write `--output` and `--preview` files for whatever the run produced.
fn write_artifacts(cli: &Cli, report: &PipelineReport, paper: PaperSize) -> Result<()> {
    if let Some(path) = cli.output.as_deref() {
        match report.document.as_deref() {
            Some(document) => {
                PageInspector::from_bytes(document)?.verify_single_page(paper.dimensions_mm())?;
                write_file(path, document)?;
            }
            None => warn!(path = %path.display(), "no document was composed, --output skipped"),
        }
    }

    if let Some(path) = cli.preview.as_deref() {
        match &report.code {
            Some(code) => write_file(path, &code.to_png_bytes()?)?,
            None => warn!(path = %path.display(), "no code was encoded, --preview skipped"),
        }
    }
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "file written");
    Ok(())
}

fn exit_status(error: &QrPrintError) -> u8 {
    match error {
        QrPrintError::InvalidRequest(_) | QrPrintError::Config(_) | QrPrintError::Serialization(_) => {
            EXIT_USAGE
        }
        _ => EXIT_PIPELINE_FAILED,
    }
}
