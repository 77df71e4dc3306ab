//! Compression statistics
//!
//! Sizes are always wire-form lengths: the uncompressed size of a batch is
//! the length of its wire form, and the compressed size is the wire-form
//! length of the codec's encoded output. Derived values are computed on
//! demand; a zero denominator yields [`Derived::Undefined`] instead of a
//! NaN or infinity.

use crate::codec::Codec;
use crate::{wire, Record, Result};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use tracing::debug;

/// Why a derived statistic has no value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeCase {
    ZeroCompressedSize,
    ZeroUncompressedSize,
    ZeroRecords,
}

impl fmt::Display for EdgeCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EdgeCase::ZeroCompressedSize => "zero compressed size",
            EdgeCase::ZeroUncompressedSize => "zero uncompressed size",
            EdgeCase::ZeroRecords => "zero records",
        })
    }
}

/// A derived statistic
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Derived {
    Value(f64),
    Undefined(EdgeCase),
}

impl Derived {
    fn ratio(numerator: f64, denominator: u64, edge: EdgeCase) -> Self {
        if denominator == 0 {
            Derived::Undefined(edge)
        } else {
            Derived::Value(numerator / denominator as f64)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Derived::Value(v) => Some(*v),
            Derived::Undefined(_) => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Derived::Value(_))
    }
}

impl fmt::Display for Derived {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Derived::Value(v) => write!(f, "{:.4}", v),
            Derived::Undefined(edge) => write!(f, "undefined ({})", edge),
        }
    }
}

impl Serialize for Derived {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

/// Sizes measured for one codec over one batch (or a sum of batches)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionStatistics {
    /// Human-readable algorithm name
    pub algorithm: String,
    /// Wire-form bytes without compression
    pub uncompressed_size: u64,
    /// Wire-form bytes of the encoded batch
    pub compressed_size: u64,
    /// Number of records measured
    pub record_count: usize,
}

impl CompressionStatistics {
    pub fn new(
        algorithm: impl Into<String>,
        uncompressed_size: u64,
        compressed_size: u64,
        record_count: usize,
    ) -> Self {
        Self {
            algorithm: algorithm.into(),
            uncompressed_size,
            compressed_size,
            record_count,
        }
    }

    /// Uncompressed size over compressed size
    pub fn compression_ratio(&self) -> Derived {
        Derived::ratio(
            self.uncompressed_size as f64,
            self.compressed_size,
            EdgeCase::ZeroCompressedSize,
        )
    }

    /// Percentage of bytes saved relative to the uncompressed size
    pub fn savings_percentage(&self) -> Derived {
        match Derived::ratio(
            self.compressed_size as f64,
            self.uncompressed_size,
            EdgeCase::ZeroUncompressedSize,
        ) {
            Derived::Value(fraction) => Derived::Value(100.0 * (1.0 - fraction)),
            undefined => undefined,
        }
    }

    /// Compressed bytes per record
    pub fn size_per_record(&self) -> Derived {
        Derived::ratio(
            self.compressed_size as f64,
            self.record_count as u64,
            EdgeCase::ZeroRecords,
        )
    }

    /// Accumulate another measurement of the same algorithm
    pub fn merge(&mut self, other: &CompressionStatistics) {
        self.uncompressed_size += other.uncompressed_size;
        self.compressed_size += other.compressed_size;
        self.record_count += other.record_count;
    }

    /// JSON object with raw and derived values
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "algorithm": self.algorithm,
            "record_count": self.record_count,
            "uncompressed_size": self.uncompressed_size,
            "compressed_size": self.compressed_size,
            "compression_ratio": self.compression_ratio(),
            "savings_percentage": self.savings_percentage(),
            "size_per_record": self.size_per_record(),
        })
    }
}

impl fmt::Display for CompressionStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "algorithm         : {}", self.algorithm)?;
        writeln!(f, "batch size        : {}", self.record_count)?;
        writeln!(f, "uncompressed size : {}", self.uncompressed_size)?;
        writeln!(f, "compressed size   : {}", self.compressed_size)?;
        writeln!(f, "compression ratio : {}", self.compression_ratio())?;
        writeln!(f, "data savings pct  : {}", self.savings_percentage())?;
        writeln!(f, "size per element  : {}", self.size_per_record())
    }
}

/// Measure one codec over one batch
///
/// The batch is only read; the codec's output is measured and dropped.
pub fn evaluate(codec: &dyn Codec, batch: &[Record]) -> Result<CompressionStatistics> {
    let uncompressed = wire::batch_len(batch);
    let encoded = codec.compress(batch)?;
    let compressed = wire::encoded_len(encoded.records());

    debug!(
        codec = codec.name(),
        records = batch.len(),
        uncompressed,
        compressed,
        "evaluated batch"
    );

    Ok(CompressionStatistics::new(
        codec.name(),
        uncompressed,
        compressed,
        batch.len(),
    ))
}

/// Statistics of every configured codec for one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Position of the batch in the source stream
    pub index: usize,
    pub statistics: Vec<CompressionStatistics>,
}

impl BatchReport {
    /// Evaluate each codec over the batch, in order
    pub fn evaluate(index: usize, codecs: &[Box<dyn Codec>], batch: &[Record]) -> Result<Self> {
        let statistics = codecs
            .iter()
            .map(|codec| evaluate(codec.as_ref(), batch))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { index, statistics })
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "============ ScanResult compression stats =============")?;
        for stats in &self.statistics {
            writeln!(f, "{}", stats)?;
        }
        writeln!(f, "=======================================================")
    }
}

/// Per-algorithm totals accumulated across batches, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatisticsTotals {
    batches: usize,
    totals: Vec<CompressionStatistics>,
}

impl StatisticsTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a batch report into the totals
    pub fn add(&mut self, report: &BatchReport) {
        self.batches += 1;
        for stats in &report.statistics {
            match self.totals.iter_mut().find(|t| t.algorithm == stats.algorithm) {
                Some(total) => total.merge(stats),
                None => self.totals.push(stats.clone()),
            }
        }
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn get(&self, algorithm: &str) -> Option<&CompressionStatistics> {
        self.totals.iter().find(|t| t.algorithm == algorithm)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompressionStatistics> {
        self.totals.iter()
    }
}

impl fmt::Display for StatisticsTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "================ Totals over {} batches ================", self.batches)?;
        for stats in &self.totals {
            writeln!(f, "{}", stats)?;
        }
        writeln!(f, "=======================================================")
    }
}
