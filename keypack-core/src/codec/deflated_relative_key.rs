//! Relative-key stream written through zlib

use super::{relative_key, zlib, Codec};
use crate::config::{DEFAULT_DEFLATE_LEVEL, MAX_DEFLATE_LEVEL};
use crate::{Batch, EncodedBatch, Record, Result};
use bytes::Bytes;
use flate2::Compression;
use tracing::debug;

/// Codec combining relative-key deltas with zlib entropy coding
#[derive(Debug, Clone, Copy)]
pub struct DeflatedRelativeKeyCodec {
    level: Compression,
}

impl DeflatedRelativeKeyCodec {
    pub const NAME: &'static str = "DeflatedRelativeKey";

    /// Create a codec with the given zlib level; levels above 9 are clamped
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(MAX_DEFLATE_LEVEL)),
        }
    }

    pub fn level(&self) -> u32 {
        self.level.level()
    }
}

impl Default for DeflatedRelativeKeyCodec {
    fn default() -> Self {
        Self::new(DEFAULT_DEFLATE_LEVEL)
    }
}

impl Codec for DeflatedRelativeKeyCodec {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn compress(&self, batch: &[Record]) -> Result<EncodedBatch> {
        let stream = relative_key::write_stream(batch)?;
        let compressed = zlib::deflate(Self::NAME, batch.len(), &stream, self.level)?;
        debug!(
            records = batch.len(),
            stream_bytes = stream.len(),
            deflated_bytes = compressed.len(),
            "deflated relative-key codec encoded batch"
        );
        Ok(EncodedBatch::opaque(compressed))
    }

    fn decompress(&self, encoded: &EncodedBatch) -> Result<Batch> {
        let payload = encoded.opaque_payload(Self::NAME)?;
        let inflated = zlib::inflate(Self::NAME, payload)?;
        relative_key::read_stream(Bytes::from(inflated))
    }
}
