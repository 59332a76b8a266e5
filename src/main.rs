//! Smart Triage: command-line entry point.
//!
//! Reads one patient JSON object from a file (or stdin), runs the triage
//! pipeline and prints the result as pretty JSON.
//!
//! ```bash
//! smart-triage patient.json --ehr history.csv
//! echo '{"Age": 70, "Heart_Rate": 140}' | smart-triage
//! ```

use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use smart_triage::adapters::sanitize::SanitizingMakeWriter;
use smart_triage::adapters::{load_ehr_csv, ModelBundle};
use smart_triage::config::{LogMode, TriageConfig};
use smart_triage::{PatientInput, TriageService};

#[derive(Debug, PartialEq, Eq)]
struct Args {
    patient: Option<PathBuf>,
    ehr: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run(Args),
    Help,
}

fn usage() -> String {
    "Usage: smart-triage [patient.json] [--ehr <history.csv>]".to_string()
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Command> {
    let mut parsed = Args {
        patient: None,
        ehr: None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--ehr" => {
                let path = args.next().with_context(usage)?;
                parsed.ehr = Some(PathBuf::from(path));
            }
            "-h" | "--help" => return Ok(Command::Help),
            _ if parsed.patient.is_none() => parsed.patient = Some(PathBuf::from(arg)),
            _ => bail!(usage()),
        }
    }
    Ok(Command::Run(parsed))
}

fn main() -> Result<()> {
    let args = match parse_args(std::env::args().skip(1))? {
        Command::Run(args) => args,
        Command::Help => {
            println!("{}", usage());
            return Ok(());
        }
    };
    let config = TriageConfig::from_env();

    // Results go to stdout, so logs never do.
    let (writer, _guard) = if config.log_mode == LogMode::File {
        if let Some(parent) = config.log_file.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)
            .with_context(|| format!("Failed to open log file {:?}", config.log_file))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stderr())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting Smart Triage...");

    let bundle = ModelBundle::load(&config.model_dir, &config.bundle_options()?)
        .with_context(|| format!("Failed to load model bundle from {:?}", config.model_dir))?;
    let mut service = TriageService::new(bundle.into_models());
    if let Some(path) = &config.ehr_fallback_csv {
        service = service.with_fallback_ehr(load_ehr_csv(path)?);
    }

    let request_ehr = args.ehr.as_deref().map(load_ehr_csv).transpose()?;

    let raw = match &args.patient {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read patient file {path:?}"))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let value: serde_json::Value = serde_json::from_str(&raw).context("Patient input is not valid JSON")?;
    let input = PatientInput::from_value(value);

    let result = service.predict_patient(&input, request_ehr.as_ref())?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    tracing::info!("Smart Triage finished.");
    Ok(())
}
