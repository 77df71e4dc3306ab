//! Parallel evaluation of batches
//!
//! Batches are independent, so each one is evaluated on tokio's blocking
//! pool. At most `jobs` batches are in flight; reports are emitted in
//! source order.

use anyhow::Result;
use keypack_core::codec::verify_roundtrip;
use keypack_core::{Batch, BatchReport, Codec, StatisticsTotals};
use serde_json::json;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// How reports are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Evaluates every configured codec over a stream of batches
pub struct Runner {
    codecs: Arc<Vec<Box<dyn Codec>>>,
    jobs: usize,
    verify: bool,
}

impl Runner {
    pub fn new(codecs: Vec<Box<dyn Codec>>, jobs: usize, verify: bool) -> Self {
        Self {
            codecs: Arc::new(codecs),
            jobs: jobs.max(1),
            verify,
        }
    }

    /// Evaluate all batches, writing each report as it completes
    pub async fn run<I, W>(&self, batches: I, format: OutputFormat, out: &mut W) -> Result<StatisticsTotals>
    where
        I: Iterator<Item = Batch>,
        W: Write,
    {
        let mut in_flight: VecDeque<JoinHandle<keypack_core::Result<BatchReport>>> = VecDeque::new();
        let mut totals = StatisticsTotals::new();

        for (index, batch) in batches.enumerate() {
            if in_flight.len() >= self.jobs {
                if let Some(handle) = in_flight.pop_front() {
                    let report = handle.await??;
                    emit(&report, format, out)?;
                    totals.add(&report);
                }
            }

            debug!(batch = index, records = batch.len(), "dispatching batch");
            let codecs = Arc::clone(&self.codecs);
            let verify = self.verify;
            in_flight.push_back(tokio::task::spawn_blocking(move || {
                evaluate_batch(index, &codecs, &batch, verify)
            }));
        }

        while let Some(handle) = in_flight.pop_front() {
            let report = handle.await??;
            emit(&report, format, out)?;
            totals.add(&report);
        }

        info!(batches = totals.batches(), "evaluation complete");
        Ok(totals)
    }
}

fn evaluate_batch(
    index: usize,
    codecs: &[Box<dyn Codec>],
    batch: &Batch,
    verify: bool,
) -> keypack_core::Result<BatchReport> {
    if verify {
        for codec in codecs {
            verify_roundtrip(codec.as_ref(), batch)?;
        }
    }
    BatchReport::evaluate(index, codecs, batch)
}

fn emit<W: Write>(report: &BatchReport, format: OutputFormat, out: &mut W) -> Result<()> {
    match format {
        OutputFormat::Text => writeln!(out, "{}", report)?,
        OutputFormat::Json => {
            for stats in &report.statistics {
                let mut line = stats.to_json();
                line["batch"] = json!(report.index);
                writeln!(out, "{}", line)?;
            }
        }
    }
    Ok(())
}

/// Write the end-of-run totals
pub fn emit_totals<W: Write>(totals: &StatisticsTotals, format: OutputFormat, out: &mut W) -> Result<()> {
    match format {
        OutputFormat::Text => writeln!(out, "{}", totals)?,
        OutputFormat::Json => {
            let all: Vec<_> = totals.iter().map(|s| s.to_json()).collect();
            writeln!(out, "{}", json!({ "batches": totals.batches(), "totals": all }))?;
        }
    }
    Ok(())
}
