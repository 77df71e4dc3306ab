//! Keypack CLI - evaluates transport compression over sorted key-value records
//!
//! Reads records from a JSON-lines file (or stdin), or generates a
//! synthetic scan, slices them into batches and prints the compression
//! statistics of every codec for every batch.
//!
//! ```text
//! keypack --input scan.jsonl --batch-size 10000
//! keypack --generate 5000 --codec relative-key --codec deflated-relative-key --json
//! ```

mod runner;
mod source;

use anyhow::{Context, Result};
use clap::Parser;
use keypack_core::{batches, AnalyzerConfig, CodecKind, StatisticsTotals};
use runner::{emit_totals, OutputFormat, Runner};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "keypack")]
#[command(about = "Evaluate transport compression of sorted key-value scans", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON-lines record file; stdin when neither this nor --generate is given
    #[arg(short, long, conflicts_with = "generate")]
    input: Option<PathBuf>,

    /// Generate this many synthetic records instead of reading input
    #[arg(short, long)]
    generate: Option<usize>,

    /// Records per batch [default: 1000]
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Codec to evaluate; repeat for several [default: all]
    #[arg(short, long = "codec")]
    codecs: Vec<CodecKind>,

    /// zlib level for the deflating codecs (0-9) [default: 6]
    #[arg(long)]
    deflate_level: Option<u32>,

    /// Batches evaluated concurrently [default: number of CPUs]
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Round-trip every batch through every codec and fail on mismatch
    #[arg(long)]
    verify: bool,

    /// Print statistics as JSON lines
    #[arg(long)]
    json: bool,

    /// Analyzer configuration file (JSON); flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn analyzer_config(&self) -> Result<AnalyzerConfig> {
        let mut config = match &self.config {
            Some(path) => AnalyzerConfig::from_json_file(path)
                .with_context(|| format!("loading config {:?}", path))?,
            None => AnalyzerConfig::default(),
        };

        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(level) = self.deflate_level {
            config.deflate_level = level;
        }
        if !self.codecs.is_empty() {
            config.codecs = self.codecs.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.analyzer_config()?;
    let jobs = cli.jobs.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    info!(
        batch_size = config.batch_size,
        deflate_level = config.deflate_level,
        codecs = ?config.codecs,
        jobs,
        "starting keypack analyzer"
    );

    let runner = Runner::new(config.build_codecs(), jobs, cli.verify);
    let mut stdout = io::stdout().lock();

    let totals = if let Some(count) = cli.generate {
        info!("Generating {} synthetic records", count);
        let records = source::generate(count);
        runner
            .run(batches(records, config.batch_size)?, format, &mut stdout)
            .await?
    } else {
        let reader: Box<dyn BufRead> = match &cli.input {
            Some(path) => {
                let file = File::open(path).with_context(|| format!("opening {:?}", path))?;
                Box::new(BufReader::new(file))
            }
            None => Box::new(io::stdin().lock()),
        };
        analyze_lines(&runner, reader, config.batch_size, format, &mut stdout).await?
    };

    emit_totals(&totals, format, &mut stdout)?;
    Ok(())
}

/// Evaluate JSON-lines input, stopping at the first unreadable record
///
/// Reports for batches completed before the bad line are still written.
async fn analyze_lines<R: BufRead, W: Write>(
    runner: &Runner,
    reader: R,
    batch_size: usize,
    format: OutputFormat,
    out: &mut W,
) -> Result<StatisticsTotals> {
    let mut read_error = None;
    let records = source::json_lines(reader).map_while(|r| match r {
        Ok(record) => Some(record),
        Err(e) => {
            read_error = Some(e);
            None
        }
    });
    let totals = runner.run(batches(records, batch_size)?, format, out).await?;

    match read_error {
        Some(e) => Err(e.context("input stopped early")),
        None => Ok(totals),
    }
}
