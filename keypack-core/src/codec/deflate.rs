//! zlib compression of the batch wire form

use super::{zlib, Codec};
use crate::config::{DEFAULT_DEFLATE_LEVEL, MAX_DEFLATE_LEVEL};
use crate::{wire, Batch, EncodedBatch, Record, Result};
use bytes::Bytes;
use flate2::Compression;
use tracing::debug;

/// Codec that deflates the wire form of the whole batch into one blob
#[derive(Debug, Clone, Copy)]
pub struct DeflateCodec {
    level: Compression,
}

impl DeflateCodec {
    pub const NAME: &'static str = "Deflate";

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

impl Default for DeflateCodec {
    fn default() -> Self {
        Self::new(DEFAULT_DEFLATE_LEVEL)
    }
}

impl Codec for DeflateCodec {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn compress(&self, batch: &[Record]) -> Result<EncodedBatch> {
        let serialized = wire::encode_batch(batch)?;
        let compressed = zlib::deflate(Self::NAME, batch.len(), &serialized, self.level)?;
        debug!(
            records = batch.len(),
            wire_bytes = serialized.len(),
            deflated_bytes = compressed.len(),
            "deflate codec encoded batch"
        );
        Ok(EncodedBatch::opaque(compressed))
    }

    fn decompress(&self, encoded: &EncodedBatch) -> Result<Batch> {
        let payload = encoded.opaque_payload(Self::NAME)?;
        let inflated = zlib::inflate(Self::NAME, payload)?;
        wire::decode_batch(Bytes::from(inflated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EncodedRecord, PackError, StructuredKey, Value};

    fn batch() -> Batch {
        (0..20u64)
            .map(|i| {
                Record::new(
                    StructuredKey::new(format!("row-{:02}", i), "cf", "cq", "A&B&C", 1_700_000_000_000),
                    Value::empty(),
                )
            })
            .collect()
    }

    #[test]
    fn test_roundtrip_and_size() {
        let batch = batch();
        let codec = DeflateCodec::default();
        let encoded = codec.compress(&batch).unwrap();

        assert_eq!(encoded.len(), 1);
        assert!(wire::encoded_len(encoded.records()) < wire::batch_len(&batch));
        assert_eq!(codec.decompress(&encoded).unwrap(), batch);
    }

    #[test]
    fn test_level_clamped() {
        assert_eq!(DeflateCodec::new(42).level(), 9);
        assert_eq!(DeflateCodec::new(0).level(), 0);
        assert_eq!(DeflateCodec::default().level(), DEFAULT_DEFLATE_LEVEL);
    }

    #[test]
    fn test_deterministic() {
        let batch = batch();
        let codec = DeflateCodec::new(9);
        assert_eq!(codec.compress(&batch).unwrap(), codec.compress(&batch).unwrap());
    }

    #[test]
    fn test_cardinality_guard() {
        let codec = DeflateCodec::default();
        let encoded = codec.compress(&batch()).unwrap();
        let mut records = encoded.records().to_vec();
        records.push(EncodedRecord::opaque(Bytes::new()));

        let result = codec.decompress(&EncodedBatch::new(records));
        assert!(matches!(
            result,
            Err(PackError::MalformedInput { codec: "Deflate", expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn test_garbage_payload() {
        let codec = DeflateCodec::default();
        let result = codec.decompress(&EncodedBatch::opaque(Bytes::from_static(b"\x00\x01garbage")));
        assert!(matches!(result, Err(PackError::Backend { codec: "Deflate", .. })));
    }

    #[test]
    fn test_rejects_bytes_after_stream() {
        let codec = DeflateCodec::default();
        let encoded = codec.compress(&batch()[..1]).unwrap();
        let mut blob = encoded.opaque_payload(DeflateCodec::NAME).unwrap().to_vec();
        blob.extend_from_slice(b"GARBAGE");

        let result = codec.decompress(&EncodedBatch::opaque(blob));
        assert!(matches!(result, Err(PackError::CorruptEncoding(_))));
    }
}
