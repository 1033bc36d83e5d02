//! Command-line entry point for the ingestion pipeline
//!
//! Run with: cargo run -p doc-ingest -- --InputPath "./docs/*.pdf"

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgAction, Parser};
use doc_ingest::{IngestConfig, Pipeline, PipelineEvent, PipelineOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ingest PDF documents into source-tagged chunks, tables and images
#[derive(Debug, Parser)]
#[command(name = "doc-ingest", version, about)]
struct Cli {
    /// File path or glob pattern to ingest (e.g. "docs/**/*.pdf")
    #[arg(long = "InputPath", visible_alias = "input-path", short = 'i', value_name = "PATH")]
    input_path: String,

    /// Text extraction backend: auto, pdf_extract, lopdf
    #[arg(long = "parser_name", visible_alias = "parser-name", default_value = "auto")]
    parser_name: String,

    /// Chunking strategy: fixed, sentence, page
    #[arg(long = "chunking_strategy", visible_alias = "chunking-strategy", default_value = "fixed")]
    chunking_strategy: String,

    /// Retrieval strategy recorded for the indexer: vector, keyword, hybrid
    #[arg(long = "retrieval_strategy", visible_alias = "retrieval-strategy", default_value = "vector")]
    retrieval_strategy: String,

    /// TOML configuration file (defaults to $DOC_INGEST_CONFIG)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override chunking.chunk_size
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Override chunking.chunk_overlap
    #[arg(long)]
    chunk_overlap: Option<usize>,

    /// Write the run report as JSON
    #[arg(long, short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,

    /// Save extracted images into this directory
    #[arg(long, value_name = "DIR")]
    image_dir: Option<PathBuf>,

    /// Skip image extraction
    #[arg(long, action = ArgAction::SetTrue)]
    no_images: bool,

    /// Fail when the input matches no supported files
    #[arg(long, action = ArgAction::SetTrue)]
    require_files: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// Load the config file, then apply command-line overrides
    fn load_config(&self) -> anyhow::Result<IngestConfig> {
        let mut config = IngestConfig::load(self.config.as_deref()).context("failed to load configuration")?;

        if let Some(size) = self.chunk_size {
            config.chunking.chunk_size = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            config.chunking.chunk_overlap = overlap;
        }
        if let Some(dir) = &self.image_dir {
            config.images.output_dir = Some(dir.clone());
        }
        if self.no_images {
            config.images.enabled = false;
        }
        if self.require_files {
            config.require_files = true;
        }
        Ok(config)
    }
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "doc_ingest=info",
        1 => "doc_ingest=debug",
        _ => "doc_ingest=trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.load_config()?;

    let pipeline = Pipeline::new(PipelineOptions {
        parser_name: cli.parser_name.clone(),
        chunking_strategy: cli.chunking_strategy.clone(),
        retrieval_strategy: cli.retrieval_strategy.clone(),
        config,
    })
    .context("invalid pipeline options")?;

    let report = pipeline.run_with_progress(&cli.input_path, |event| {
        if let PipelineEvent::FileStarted { .. } = event {
            println!("{}", event);
        }
    })?;

    if let Some(output) = &cli.output {
        report
            .write_json(output)
            .with_context(|| format!("failed to write report to {}", output.display()))?;
        tracing::info!("Report written to {}", output.display());
    }

    println!("{}", report.summary());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
