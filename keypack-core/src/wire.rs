//! Canonical wire form for record sequences
//!
//! The wire form is the accounting baseline for every codec: the
//! uncompressed size of a batch is the length of its wire form, and the
//! compressed size is the length of the wire form of the codec's output.
//!
//! Format:
//! - 4 bytes: record count
//! - per record:
//!   - 1 byte: presence mask (bit i set when key field i is present)
//!   - per present field: 4 bytes length + N bytes
//!   - 8 bytes: timestamp
//!   - 4 bytes: value length + N bytes value
//!
//! All integers are little-endian.

use crate::{Batch, EncodedRecord, KeyField, PackError, Record, Result, StructuredKey};
use bytes::{Buf, BufMut, Bytes, BytesMut};

const ALL_PRESENT: u8 = 0b1111;

/// Fixed bytes per record besides field and value payloads
const RECORD_OVERHEAD: usize = 1 + 8 + 4;

/// Serialize a batch of full records
pub fn encode_batch(records: &[Record]) -> Result<Bytes> {
    let encoded: Vec<EncodedRecord> = records.iter().map(EncodedRecord::full).collect();
    encode(&encoded)
}

/// Serialize a sequence of (possibly partial) records
pub fn encode(records: &[EncodedRecord]) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(encoded_len(records) as usize);
    put_u32_len(&mut buf, records.len(), "record count")?;

    for record in records {
        buf.put_u8(record.presence());
        for field in record.fields.iter().flatten() {
            put_len_prefixed(&mut buf, field, "key field")?;
        }
        buf.put_u64_le(record.timestamp);
        put_len_prefixed(&mut buf, &record.value, "value")?;
    }

    Ok(buf.freeze())
}

/// Parse a wire-form byte sequence back into encoded records
pub fn decode(bytes: Bytes) -> Result<Vec<EncodedRecord>> {
    let mut reader = Reader::new(bytes, "wire form");
    let count = reader.get_u32()? as usize;
    let mut records = Vec::with_capacity(count.min(reader.remaining() / RECORD_OVERHEAD));

    for _ in 0..count {
        let presence = reader.get_u8()?;
        if presence & !ALL_PRESENT != 0 {
            return Err(PackError::corrupt(format!(
                "reserved presence bits set: {:#04x}",
                presence
            )));
        }

        let mut fields: [Option<Bytes>; 4] = Default::default();
        for (i, slot) in fields.iter_mut().enumerate() {
            if presence & (1 << i) != 0 {
                *slot = Some(reader.get_len_prefixed()?);
            }
        }
        let timestamp = reader.get_u64()?;
        let value = reader.get_len_prefixed()?;

        records.push(EncodedRecord {
            fields,
            timestamp,
            value,
        });
    }

    reader.finish()?;
    Ok(records)
}

/// Parse a wire-form byte sequence that must contain only full records
pub fn decode_batch(bytes: Bytes) -> Result<Batch> {
    decode(bytes)?
        .into_iter()
        .enumerate()
        .map(|(i, encoded)| {
            let EncodedRecord {
                fields,
                timestamp,
                value,
            } = encoded;
            let [row, cf, cq, cv] = fields;
            match (row, cf, cq, cv) {
                (Some(row), Some(cf), Some(cq), Some(cv)) => Ok(Record::new(
                    StructuredKey::from_fields([row, cf, cq, cv], timestamp),
                    value,
                )),
                _ => Err(PackError::corrupt(format!(
                    "record {} is missing key fields in a full batch",
                    i
                ))),
            }
        })
        .collect()
}

/// Wire-form length of a batch of full records, without serializing it
pub fn batch_len(records: &[Record]) -> u64 {
    let payload: u64 = records
        .iter()
        .map(|r| {
            let key = r.key();
            let fields: usize = KeyField::ALL.iter().map(|f| 4 + key.field(*f).len()).sum();
            (RECORD_OVERHEAD + fields + r.value().len()) as u64
        })
        .sum();
    4 + payload
}

/// Wire-form length of a sequence of encoded records, without serializing it
pub fn encoded_len(records: &[EncodedRecord]) -> u64 {
    let payload: u64 = records
        .iter()
        .map(|r| {
            let fields: usize = r.fields.iter().flatten().map(|f| 4 + f.len()).sum();
            (RECORD_OVERHEAD + fields + r.value.len()) as u64
        })
        .sum();
    4 + payload
}

pub(crate) fn put_u32_len(buf: &mut impl BufMut, len: usize, what: &str) -> Result<()> {
    let len = u32::try_from(len).map_err(|_| {
        PackError::corrupt(format!("{} of {} exceeds the 32-bit frame limit", what, len))
    })?;
    buf.put_u32_le(len);
    Ok(())
}

pub(crate) fn put_len_prefixed(buf: &mut impl BufMut, bytes: &[u8], what: &str) -> Result<()> {
    put_u32_len(buf, bytes.len(), what)?;
    buf.put_slice(bytes);
    Ok(())
}

/// Bounds-checked little-endian reader over an encoded buffer
pub(crate) struct Reader {
    buf: Bytes,
    what: &'static str,
}

impl Reader {
    pub(crate) fn new(buf: Bytes, what: &'static str) -> Self {
        Self { buf, what }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn need(&self, n: usize) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(PackError::corrupt(format!(
                "{} truncated: needed {} more bytes, {} left",
                self.what,
                n,
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    pub(crate) fn get_u8(&mut self) -> Result<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub(crate) fn get_u32(&mut self) -> Result<u32> {
        self.need(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub(crate) fn get_u64(&mut self) -> Result<u64> {
        self.need(8)?;
        Ok(self.buf.get_u64_le())
    }

    pub(crate) fn get_bytes(&mut self, len: usize) -> Result<Bytes> {
        self.need(len)?;
        Ok(self.buf.copy_to_bytes(len))
    }

    pub(crate) fn get_len_prefixed(&mut self) -> Result<Bytes> {
        let len = self.get_u32()? as usize;
        self.get_bytes(len)
    }

    /// Fail if any bytes are left unread
    pub(crate) fn finish(self) -> Result<()> {
        if self.buf.has_remaining() {
            return Err(PackError::corrupt(format!(
                "{} has {} trailing bytes",
                self.what,
                self.buf.remaining()
            )));
        }
        Ok(())
    }
}
