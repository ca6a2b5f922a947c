//! Command-line surface for readme-pdf.
//!
//! Strictly glue: argument parsing, configuration loading, output directory
//! setup and a printed summary. The export itself lives in [`crate::synchronise`].
use crate::download::GithubClient;
use crate::html_to_pdf::FontSet;
use crate::load_config::{load_config, ConfigOverrides};
use crate::preprocess::ReadmeProcessor;
use crate::synchronise::{export, ExportReport, RepositoryOutcome};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI for readme-pdf: archive every README of a GitHub account as PDF.
#[derive(Parser)]
#[clap(
    name = "readme-pdf",
    version,
    about = "Export the README of every repository of a GitHub account to styled PDFs"
)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[clap(long, short, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export all READMEs of an account into a directory of PDFs
    Export {
        /// Path to an optional YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
        /// GitHub account whose repositories are exported
        #[clap(long)]
        account: Option<String>,
        /// Directory receiving <repo_name>.pdf files
        #[clap(long)]
        output_dir: Option<PathBuf>,
        /// Repositories processed at once
        #[clap(long)]
        concurrency: Option<usize>,
        /// TrueType/OpenType font for all text (default: bundled Helvetica/Courier)
        #[clap(long)]
        font: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Export {
            config,
            account,
            output_dir,
            concurrency,
            font,
        } => {
            let overrides = ConfigOverrides {
                account,
                output_dir,
                concurrency,
                font,
            };
            let config = load_config(config.as_deref(), overrides)
                .context("failed to load configuration")?;

            let fonts = match &config.font {
                Some(path) => FontSet::from_file(path)
                    .with_context(|| format!("failed to load font {}", path.display()))?,
                None => FontSet::standard(),
            };

            std::fs::create_dir_all(&config.output_dir).with_context(|| {
                format!(
                    "failed to create output directory {}",
                    config.output_dir.display()
                )
            })?;

            let client = GithubClient::new(config.github.clone())?;
            let processor = ReadmeProcessor::new(client.clone(), config.output_dir.clone())
                .with_fonts(fonts);

            println!("Export starting for {}...", config.account);
            tracing::info!(command = "export", account = %config.account, "Starting export");
            match export(&config, &client, &client, &processor).await {
                Ok(report) => {
                    print_report(&report);
                    tracing::info!(command = "export", "Export complete");
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "export", error = %e, "Export failed");
                    Err(anyhow::Error::new(e).context("export failed"))
                }
            }
        }
    }
}

fn print_report(report: &ExportReport) {
    println!(
        "Export complete for {}: {} exported, {} failed.",
        report.account,
        report.exported_count(),
        report.failed_count()
    );
    for outcome in &report.outcomes {
        match outcome {
            RepositoryOutcome::Exported(file) => {
                println!("  ok      {} -> {}", file.repo_name, file.path.display())
            }
            RepositoryOutcome::Failed { repo_name, error } => {
                println!("  failed  {repo_name}: {error}")
            }
        }
    }
}
