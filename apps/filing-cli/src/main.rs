//! Filing CLI
//!
//! `scrutinize` prints the sorted defects of an intake; `compile` runs a
//! resolution and compilation plan and saves the exported filing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use filing_cli::capabilities::{FileTranslator, TextLayerOcr};
use filing_cli::config::{load_intake, load_plan, load_rules};
use filing_core::{ExportFormat, FilingPipeline, Translator};
use scrutiny_engine::ScrutinyEngine;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "filing-cli")]
#[command(version, about = "Pre-filing scrutiny and compilation of court filings")]
struct Args {
    /// Court rules JSON (falls back to FILING_RULES, then defaults)
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the defects found in an intake as JSON
    Scrutinize {
        #[arg(long)]
        intake: PathBuf,
    },
    /// Resolve, compile, package and export a filing
    Compile {
        #[arg(long)]
        intake: PathBuf,

        /// Pipeline plan JSON
        #[arg(long)]
        plan: PathBuf,

        /// Output directory
        #[arg(long)]
        out: PathBuf,

        /// Output file name, extension optional
        #[arg(long)]
        name: String,

        #[arg(long, value_enum, default_value = "pdf")]
        format: FormatArg,

        /// Directory of prepared translations (<document_id>[.<lang>].txt)
        #[arg(long)]
        translations: Option<PathBuf>,

        /// Also write the audit chain as JSON
        #[arg(long)]
        audit: Option<PathBuf>,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Pdf,
    Doc,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Pdf => ExportFormat::Pdf,
            FormatArg::Doc => ExportFormat::Doc,
        }
    }
}

fn write_audit(pipeline: &FilingPipeline, path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let json = pipeline.audit().to_json().map_err(anyhow::Error::msg)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write audit chain {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // stdout carries JSON output, logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let rules = load_rules(args.rules.as_deref())?;
    let engine = ScrutinyEngine::new(rules);

    match args.command {
        Command::Scrutinize { intake } => {
            let intake = load_intake(&intake)?;
            let defects = engine.scrutinize(&intake)?;
            println!("{}", serde_json::to_string_pretty(&defects)?);
        }
        Command::Compile {
            intake,
            plan,
            out,
            name,
            format,
            translations,
            audit,
        } => {
            let intake = load_intake(&intake)?;
            let plan = load_plan(&plan)?;

            let translator = match translations {
                Some(dir) => {
                    let translator = FileTranslator::load(&dir, &intake).with_context(|| {
                        format!("Failed to read translations from {}", dir.display())
                    })?;
                    if translator.is_empty() {
                        tracing::warn!(
                            dir = %dir.display(),
                            "No translation files match intake documents"
                        );
                    }
                    translator
                }
                None => FileTranslator::default(),
            };
            let translator: Arc<dyn Translator> = Arc::new(translator);
            let ocr = Arc::new(TextLayerOcr::new(&intake));
            let filing_id = format!("{} v. {}", intake.petitioner, intake.respondent);
            let pipeline = FilingPipeline::new(engine, translator, ocr, &filing_id);

            // The audit chain is written even when the plan fails
            let result = pipeline.execute(intake, &plan).await;
            write_audit(&pipeline, audit.as_deref())?;
            let filing = result?;

            let path = pipeline.save(&filing, format.into(), &out, &name)?;
            write_audit(&pipeline, audit.as_deref())?;

            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "package_id": filing.package_id,
                    "path": path,
                    "manifest": filing.manifest,
                    "index": filing.index_text(),
                }))?
            );
        }
    }

    Ok(())
}
