//! Keypack Core - Transport Compression for Sorted Key-Value Scans
//!
//! Evaluates strategies for shipping batches of sorted records (row,
//! column family, column qualifier, column visibility, timestamp, value)
//! from a data source to a consumer:
//!
//! - **Default**: omits leading key fields equal to the previous key
//! - **Deflate**: zlib over the canonical wire form of the batch
//! - **RelativeKey**: per-field prefix deltas against the previous key
//! - **DeflatedRelativeKey**: relative-key stream followed by zlib
//!
//! # Architecture
//!
//! - **Types**: immutable keys, values and records
//! - **Wire**: canonical length-prefixed encoding used for size accounting
//! - **Codec**: the [`codec::Codec`] trait and its four implementations
//! - **Batch**: lazy fixed-size batching of a record stream
//! - **Stats**: compressed/uncompressed sizes and derived ratios per codec
//!
//! Codecs hold no mutable state, so independent batches can be processed
//! on as many threads as the caller likes.

pub mod batch;
pub mod codec;
pub mod config;
pub mod stats;
pub mod wire;

mod error;
mod types;

pub use batch::{batches, Batcher};
pub use codec::{Codec, CodecKind};
pub use config::AnalyzerConfig;
pub use error::{PackError, Result};
pub use stats::{evaluate, BatchReport, CompressionStatistics, Derived, EdgeCase, StatisticsTotals};
pub use types::*;

/// Keypack version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
