//! Relative-key encoding
//!
//! Each key is written as a delta against the previous key in the batch,
//! starting from the all-empty key. Every byte-string field becomes one of:
//!
//! - `Same`: identical to the previous key's field, nothing is written
//! - `Prefix`: shares a prefix long enough to pay for its length field,
//!   only the shared length and the remaining suffix are written
//! - `Full`: written in full
//!
//! Once a field differs from its predecessor at the very first byte, every
//! later field is written `Full`, even when it repeats exactly: prefix
//! sharing is only meaningful while the preceding fields still line up.
//! Timestamps are written in full.
//!
//! Stream format:
//! - 4 bytes: record count
//! - per record:
//!   - 1 byte: field modes, 2 bits per field, row in the low bits
//!   - per field: nothing (`Same`), shared length + suffix (`Prefix`), or
//!     length + bytes (`Full`)
//!   - 8 bytes: timestamp
//!   - 4 bytes: value length + N bytes value

use super::Codec;
use crate::wire::{self, Reader};
use crate::{Batch, EncodedBatch, KeyField, PackError, Record, Result, StructuredKey};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

/// Shared prefixes no longer than the prefix-length field are sent in full
const MIN_SHARED_PREFIX: usize = std::mem::size_of::<u32>();

const MODE_SAME: u8 = 0;
const MODE_PREFIX: u8 = 1;
const MODE_FULL: u8 = 2;

/// Encoding of one key field relative to the previous key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDelta<'a> {
    /// Identical to the previous field
    Same { len: usize },
    /// First `shared` bytes come from the previous field
    Prefix { shared: usize, suffix: &'a [u8] },
    /// No inherited bytes
    Full(&'a [u8]),
}

impl<'a> FieldDelta<'a> {
    /// Choose an encoding for `current` given the previous key's field
    pub fn against(previous: &[u8], current: &'a [u8]) -> Self {
        if previous == current {
            return FieldDelta::Same { len: current.len() };
        }
        let shared = common_prefix(previous, current);
        if shared > MIN_SHARED_PREFIX {
            FieldDelta::Prefix {
                shared,
                suffix: &current[shared..],
            }
        } else {
            FieldDelta::Full(current)
        }
    }

    /// Number of bytes inherited from the previous field
    pub fn prefix_len(&self) -> usize {
        match self {
            FieldDelta::Same { len } => *len,
            FieldDelta::Prefix { shared, .. } => *shared,
            FieldDelta::Full(_) => 0,
        }
    }

    /// Bytes written for this field
    pub fn suffix(&self) -> &'a [u8] {
        match self {
            FieldDelta::Same { .. } => &[],
            FieldDelta::Prefix { suffix, .. } => *suffix,
            FieldDelta::Full(bytes) => *bytes,
        }
    }

    fn mode(&self) -> u8 {
        match self {
            FieldDelta::Same { .. } => MODE_SAME,
            FieldDelta::Prefix { .. } => MODE_PREFIX,
            FieldDelta::Full(_) => MODE_FULL,
        }
    }
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// True when `current` forces every later field to be written in full
fn diverges(previous: &[u8], current: &[u8]) -> bool {
    previous != current && common_prefix(previous, current) == 0
}

/// A key expressed relative to its predecessor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativeKey<'a> {
    fields: [FieldDelta<'a>; 4],
    timestamp: u64,
}

impl<'a> RelativeKey<'a> {
    /// Compute the delta of `key` against `prev`
    pub fn between(prev: &StructuredKey, key: &'a StructuredKey) -> Self {
        let mut diverged = false;
        let fields = KeyField::ALL.map(|f| {
            let current = &key.field(f)[..];
            let previous = &prev.field(f)[..];
            let delta = if diverged {
                FieldDelta::Full(current)
            } else {
                FieldDelta::against(previous, current)
            };
            diverged = diverged || diverges(previous, current);
            delta
        });
        Self {
            fields,
            timestamp: key.timestamp(),
        }
    }

    pub fn field(&self, field: KeyField) -> FieldDelta<'a> {
        self.fields[field.index()]
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn modes(&self) -> u8 {
        self.fields
            .iter()
            .enumerate()
            .fold(0u8, |modes, (i, delta)| modes | (delta.mode() << (2 * i)))
    }

    fn write(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u8(self.modes());
        for delta in &self.fields {
            match delta {
                FieldDelta::Same { .. } => {}
                FieldDelta::Prefix { shared, suffix } => {
                    wire::put_u32_len(buf, *shared, "shared prefix")?;
                    wire::put_len_prefixed(buf, suffix, "key suffix")?;
                }
                FieldDelta::Full(bytes) => wire::put_len_prefixed(buf, bytes, "key field")?,
            }
        }
        buf.put_u64_le(self.timestamp);
        Ok(())
    }
}

/// Relative keys of a batch, each against its predecessor
pub fn relative_keys(batch: &[Record]) -> Vec<RelativeKey<'_>> {
    let sentinel = StructuredKey::default();
    let mut out = Vec::with_capacity(batch.len());
    batch.iter().fold(&sentinel, |prev, record| {
        out.push(RelativeKey::between(prev, record.key()));
        record.key()
    });
    out
}

/// Write the relative-key stream for a batch
pub(super) fn write_stream(batch: &[Record]) -> Result<BytesMut> {
    let sentinel = StructuredKey::default();
    let mut buf = BytesMut::with_capacity(wire::batch_len(batch) as usize);
    wire::put_u32_len(&mut buf, batch.len(), "record count")?;

    batch.iter().try_fold(&sentinel, |prev, record| {
        let rk = RelativeKey::between(prev, record.key());
        trace!(modes = rk.modes(), timestamp = rk.timestamp, "relative key");
        rk.write(&mut buf)?;
        wire::put_len_prefixed(&mut buf, record.value().as_bytes(), "value")?;
        Ok::<_, PackError>(record.key())
    })?;

    Ok(buf)
}

/// Parse a relative-key stream produced by [`write_stream`]
pub(super) fn read_stream(bytes: Bytes) -> Result<Batch> {
    let mut reader = Reader::new(bytes, "relative-key stream");
    let count = reader.get_u32()? as usize;
    // every entry needs at least a mode byte, a timestamp and a value length
    let mut decoded = Vec::with_capacity(count.min(reader.remaining() / 13));

    (0..count).try_fold(StructuredKey::default(), |prev, i| {
        let key = read_key(&mut reader, &prev, i)?;
        let value = reader.get_len_prefixed()?;
        decoded.push(Record::new(key.clone(), value));
        Ok::<_, PackError>(key)
    })?;

    reader.finish()?;
    Ok(decoded)
}

fn read_key(reader: &mut Reader, prev: &StructuredKey, index: usize) -> Result<StructuredKey> {
    let modes = reader.get_u8()?;
    let mut diverged = false;
    let mut fields: [Bytes; 4] = Default::default();

    for field in KeyField::ALL {
        let mode = (modes >> (2 * field.index())) & 0b11;
        let previous = prev.field(field);

        if diverged && (mode == MODE_SAME || mode == MODE_PREFIX) {
            return Err(PackError::corrupt(format!(
                "record {}: {} inherits bytes after an earlier field diverged",
                index,
                field.name()
            )));
        }

        let bytes = match mode {
            MODE_SAME => previous.clone(),
            MODE_PREFIX => {
                let shared = reader.get_u32()? as usize;
                let suffix = reader.get_len_prefixed()?;
                if shared > previous.len() {
                    return Err(PackError::corrupt(format!(
                        "record {}: {} shares {} bytes of a {}-byte predecessor",
                        index,
                        field.name(),
                        shared,
                        previous.len()
                    )));
                }
                let mut joined = BytesMut::with_capacity(shared + suffix.len());
                joined.put_slice(&previous[..shared]);
                joined.put_slice(&suffix);
                joined.freeze()
            }
            MODE_FULL => reader.get_len_prefixed()?,
            invalid => {
                return Err(PackError::corrupt(format!(
                    "record {}: invalid field mode {}",
                    index, invalid
                )))
            }
        };

        diverged = diverged || diverges(previous, &bytes);
        fields[field.index()] = bytes;
    }

    let timestamp = reader.get_u64()?;
    Ok(StructuredKey::from_fields(fields, timestamp))
}

/// Codec writing relative keys without further compression
#[derive(Debug, Clone, Copy, Default)]
pub struct RelativeKeyCodec;

impl RelativeKeyCodec {
    pub const NAME: &'static str = "RelativeKey";
}

impl Codec for RelativeKeyCodec {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn compress(&self, batch: &[Record]) -> Result<EncodedBatch> {
        let stream = write_stream(batch)?;
        debug!(
            records = batch.len(),
            bytes = stream.len(),
            "relative-key codec encoded batch"
        );
        Ok(EncodedBatch::opaque(stream.freeze()))
    }

    fn decompress(&self, encoded: &EncodedBatch) -> Result<Batch> {
        let payload = encoded.opaque_payload(Self::NAME)?;
        read_stream(payload.clone())
    }
}
