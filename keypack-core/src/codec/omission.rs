//! Previous-key field omission
//!
//! For each key the fields are compared to the previous key in priority
//! order (row, column family, column qualifier, column visibility). Fields
//! before the first difference are omitted; that field and every later one
//! are sent. Timestamps and values are always sent.

use super::Codec;
use crate::{Batch, EncodedBatch, EncodedRecord, KeyField, PackError, Record, Result, StructuredKey};
use bytes::Bytes;
use tracing::debug;

/// Codec that omits leading key fields shared with the previous key
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCodec;

impl DefaultCodec {
    pub const NAME: &'static str = "Default";
}

/// Number of leading fields of `key` equal to those of `prev`
fn shared_fields(prev: Option<&StructuredKey>, key: &StructuredKey) -> usize {
    match prev {
        None => 0,
        Some(prev) => KeyField::ALL
            .iter()
            .take_while(|f| prev.field(**f) == key.field(**f))
            .count(),
    }
}

impl Codec for DefaultCodec {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn compress(&self, batch: &[Record]) -> Result<EncodedBatch> {
        let mut encoded = Vec::with_capacity(batch.len());

        batch.iter().fold(None, |prev: Option<&StructuredKey>, record| {
            let key = record.key();
            let omitted = shared_fields(prev, key);
            encoded.push(EncodedRecord {
                fields: KeyField::ALL.map(|f| {
                    (f.index() >= omitted).then(|| key.field(f).clone())
                }),
                timestamp: key.timestamp(),
                value: record.value().as_bytes().clone(),
            });
            Some(key)
        });

        debug!(records = batch.len(), "default codec encoded batch");
        Ok(EncodedBatch::new(encoded))
    }

    fn decompress(&self, encoded: &EncodedBatch) -> Result<Batch> {
        let mut decoded: Batch = Vec::with_capacity(encoded.len());

        for (i, record) in encoded.records().iter().enumerate() {
            let omitted = record.fields.iter().take_while(|f| f.is_none()).count();
            if record.fields[omitted..].iter().any(Option::is_none) {
                return Err(PackError::corrupt(format!(
                    "record {} omits a field after sending an earlier one",
                    i
                )));
            }

            let prev = decoded.last().map(Record::key);
            let fields: [Bytes; 4] = match prev {
                Some(prev) => KeyField::ALL.map(|f| match record.field(f) {
                    Some(bytes) => bytes.clone(),
                    None => prev.field(f).clone(),
                }),
                None if omitted == 0 => KeyField::ALL.map(|f| {
                    record.field(f).cloned().unwrap_or_default()
                }),
                None => {
                    return Err(PackError::corrupt(
                        "first record omits fields with no previous key",
                    ))
                }
            };

            decoded.push(Record::new(
                StructuredKey::from_fields(fields, record.timestamp),
                record.value.clone(),
            ));
        }

        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{wire, Value};

    fn key(row: &'static str, cf: &'static str, cq: &'static str, ts: u64) -> StructuredKey {
        StructuredKey::new(row, cf, cq, "vis", ts)
    }

    #[test]
    fn test_field_omission() {
        let batch = vec![
            Record::new(key("rowA", "cf", "cq1", 100), Value::empty()),
            Record::new(key("rowA", "cf", "cq2", 99), Value::empty()),
            Record::new(key("rowB", "cf", "cq1", 98), Value::empty()),
            Record::new(key("rowB", "cf", "cq1", 97), Value::empty()),
        ];

        let encoded = DefaultCodec.compress(&batch).unwrap();
        let presence: Vec<u8> = encoded.records().iter().map(|r| r.presence()).collect();

        // first record sends everything, the second omits row and cf, the
        // third changes row, the fourth only changes the timestamp
        assert_eq!(presence, vec![0b1111, 0b1100, 0b1111, 0b0000]);
        assert_eq!(encoded.records()[3].timestamp, 97);

        assert_eq!(DefaultCodec.decompress(&encoded).unwrap(), batch);
    }

    #[test]
    fn test_empty_fields_are_not_omissions() {
        let batch = vec![
            Record::new(StructuredKey::new("r", "", "", "", 5), Value::empty()),
            Record::new(StructuredKey::new("s", "", "", "", 5), "x"),
        ];
        let encoded = DefaultCodec.compress(&batch).unwrap();
        assert_eq!(encoded.records()[1].field(KeyField::ColumnFamily), Some(&Bytes::new()));
        assert_eq!(DefaultCodec.decompress(&encoded).unwrap(), batch);
    }

    #[test]
    fn test_smaller_than_wire_form() {
        let batch: Batch = (0..50u64)
            .map(|i| {
                Record::new(
                    StructuredKey::new("shared-row", "family", format!("q{:03}", i), "A&B", i),
                    Value::empty(),
                )
            })
            .collect();
        let encoded = DefaultCodec.compress(&batch).unwrap();
        assert!(wire::encoded_len(encoded.records()) < wire::batch_len(&batch));
    }

    #[test]
    fn test_rejects_invalid_omissions() {
        let record = Record::new(key("r", "f", "q", 1), Value::empty());

        let mut leading = EncodedRecord::full(&record);
        leading.fields[0] = None;
        let result = DefaultCodec.decompress(&EncodedBatch::new(vec![leading]));
        assert!(matches!(result, Err(PackError::CorruptEncoding(_))));

        let mut gap = EncodedRecord::full(&record);
        gap.fields[2] = None;
        let result = DefaultCodec.decompress(&EncodedBatch::new(vec![
            EncodedRecord::full(&record),
            gap,
        ]));
        assert!(matches!(result, Err(PackError::CorruptEncoding(_))));
    }
}
