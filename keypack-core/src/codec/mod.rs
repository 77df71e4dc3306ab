//! Transport compression codecs
//!
//! Every codec turns an ordered batch of records into an [`EncodedBatch`]
//! and back. Codecs are stateless: a single instance may be shared across
//! threads and used on independent batches concurrently.
//!
//! - [`DefaultCodec`]: omits leading key fields equal to the previous key
//! - [`DeflateCodec`]: zlib over the wire form of the batch
//! - [`RelativeKeyCodec`]: per-field prefix deltas against the previous key
//! - [`DeflatedRelativeKeyCodec`]: relative-key stream, then zlib

mod deflate;
mod deflated_relative_key;
mod omission;
mod relative_key;
mod zlib;

pub use deflate::DeflateCodec;
pub use deflated_relative_key::DeflatedRelativeKeyCodec;
pub use omission::DefaultCodec;
pub use relative_key::{relative_keys, FieldDelta, RelativeKey, RelativeKeyCodec};

use crate::{Batch, EncodedBatch, PackError, Record, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trait for all transport compression codecs
///
/// Implementations must round-trip any batch exactly:
/// `decompress(compress(b)) == b`.
pub trait Codec: Send + Sync {
    /// Human-readable algorithm name used in reports
    fn name(&self) -> &'static str;

    /// Encode an ordered batch of records
    fn compress(&self, batch: &[Record]) -> Result<EncodedBatch>;

    /// Decode a batch previously produced by [`Codec::compress`]
    fn decompress(&self, encoded: &EncodedBatch) -> Result<Batch>;
}

/// Compress and decompress a batch, failing unless the result is identical
pub fn verify_roundtrip(codec: &dyn Codec, batch: &[Record]) -> Result<()> {
    let decoded = codec.decompress(&codec.compress(batch)?)?;
    if decoded.len() != batch.len() {
        return Err(PackError::corrupt(format!(
            "{} round-trip returned {} of {} records",
            codec.name(),
            decoded.len(),
            batch.len()
        )));
    }
    if let Some(i) = batch.iter().zip(&decoded).position(|(a, b)| a != b) {
        return Err(PackError::corrupt(format!(
            "{} round-trip altered record {}",
            codec.name(),
            i
        )));
    }
    Ok(())
}

/// Codec identifier used in configuration and on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodecKind {
    Default,
    Deflate,
    RelativeKey,
    DeflatedRelativeKey,
}

impl CodecKind {
    /// Every codec, in report order
    pub const ALL: [CodecKind; 4] = [
        CodecKind::Default,
        CodecKind::Deflate,
        CodecKind::RelativeKey,
        CodecKind::DeflatedRelativeKey,
    ];

    /// Configuration name of the codec
    pub fn as_str(&self) -> &'static str {
        match self {
            CodecKind::Default => "default",
            CodecKind::Deflate => "deflate",
            CodecKind::RelativeKey => "relative-key",
            CodecKind::DeflatedRelativeKey => "deflated-relative-key",
        }
    }

    /// Instantiate the codec; `deflate_level` only affects zlib-backed codecs
    /// and is clamped to zlib's 0-9 range
    pub fn build(&self, deflate_level: u32) -> Box<dyn Codec> {
        match self {
            CodecKind::Default => Box::new(DefaultCodec),
            CodecKind::Deflate => Box::new(DeflateCodec::new(deflate_level)),
            CodecKind::RelativeKey => Box::new(RelativeKeyCodec),
            CodecKind::DeflatedRelativeKey => Box::new(DeflatedRelativeKeyCodec::new(deflate_level)),
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodecKind {
    type Err = PackError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "default" => Ok(CodecKind::Default),
            "deflate" | "deflated" => Ok(CodecKind::Deflate),
            "relative-key" | "relativekey" | "rk" => Ok(CodecKind::RelativeKey),
            "deflated-relative-key" | "deflatedrelativekey" | "drk" => {
                Ok(CodecKind::DeflatedRelativeKey)
            }
            other => Err(PackError::Config(format!("Unknown codec: {}", other))),
        }
    }
}
