//! Core types for Keypack

use crate::{PackError, Result};
use bytes::Bytes;
use std::cmp::Ordering;
use std::fmt;

/// Record timestamp (opaque to the codecs, typically milliseconds)
pub type Timestamp = u64;

/// An ordered batch of records, compressed as one unit
pub type Batch = Vec<Record>;

/// The byte-string components of a key, in field-priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyField {
    Row,
    ColumnFamily,
    ColumnQualifier,
    ColumnVisibility,
}

impl KeyField {
    /// All byte-string fields in priority order
    pub const ALL: [KeyField; 4] = [
        KeyField::Row,
        KeyField::ColumnFamily,
        KeyField::ColumnQualifier,
        KeyField::ColumnVisibility,
    ];

    /// Position of the field in priority order
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            KeyField::Row => "row",
            KeyField::ColumnFamily => "column family",
            KeyField::ColumnQualifier => "column qualifier",
            KeyField::ColumnVisibility => "column visibility",
        }
    }
}

/// Composite record key: row, column family, column qualifier,
/// column visibility and timestamp
///
/// Keys sort ascending by the four byte-string fields and descending by
/// timestamp, so the newest version of a cell comes first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StructuredKey {
    row: Bytes,
    column_family: Bytes,
    column_qualifier: Bytes,
    column_visibility: Bytes,
    timestamp: Timestamp,
}

impl StructuredKey {
    /// Create a new key
    pub fn new(
        row: impl Into<Bytes>,
        column_family: impl Into<Bytes>,
        column_qualifier: impl Into<Bytes>,
        column_visibility: impl Into<Bytes>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            row: row.into(),
            column_family: column_family.into(),
            column_qualifier: column_qualifier.into(),
            column_visibility: column_visibility.into(),
            timestamp,
        }
    }

    /// Build a key from its four fields in priority order
    pub(crate) fn from_fields(fields: [Bytes; 4], timestamp: Timestamp) -> Self {
        let [row, column_family, column_qualifier, column_visibility] = fields;
        Self {
            row,
            column_family,
            column_qualifier,
            column_visibility,
            timestamp,
        }
    }

    pub fn row(&self) -> &Bytes {
        &self.row
    }

    pub fn column_family(&self) -> &Bytes {
        &self.column_family
    }

    pub fn column_qualifier(&self) -> &Bytes {
        &self.column_qualifier
    }

    pub fn column_visibility(&self) -> &Bytes {
        &self.column_visibility
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Get a byte-string field by position
    pub fn field(&self, field: KeyField) -> &Bytes {
        match field {
            KeyField::Row => &self.row,
            KeyField::ColumnFamily => &self.column_family,
            KeyField::ColumnQualifier => &self.column_qualifier,
            KeyField::ColumnVisibility => &self.column_visibility,
        }
    }

    /// Get the size in bytes (approximate)
    pub fn size(&self) -> usize {
        KeyField::ALL.iter().map(|f| self.field(*f).len()).sum::<usize>() + 8
    }
}

impl Ord for StructuredKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row
            .cmp(&other.row)
            .then_with(|| self.column_family.cmp(&other.column_family))
            .then_with(|| self.column_qualifier.cmp(&other.column_qualifier))
            .then_with(|| self.column_visibility.cmp(&other.column_visibility))
            .then_with(|| other.timestamp.cmp(&self.timestamp))
    }
}

impl PartialOrd for StructuredKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for StructuredKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}:{} [{}] {}",
            String::from_utf8_lossy(&self.row),
            String::from_utf8_lossy(&self.column_family),
            String::from_utf8_lossy(&self.column_qualifier),
            String::from_utf8_lossy(&self.column_visibility),
            self.timestamp
        )
    }
}

/// Opaque record value; may be empty but is never absent
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Value(Bytes);

impl Value {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn empty() -> Self {
        Self(Bytes::new())
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value(Bytes::from(v))
    }
}

impl From<&'static str> for Value {
    fn from(s: &'static str) -> Self {
        Value(Bytes::from_static(s.as_bytes()))
    }
}

/// A key-value pair, the atomic unit of compression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    key: StructuredKey,
    value: Value,
}

impl Record {
    /// Create a new record
    pub fn new(key: StructuredKey, value: impl Into<Value>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }

    pub fn key(&self) -> &StructuredKey {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Raw field bytes (approximate, for logging only)
    pub fn raw_size(&self) -> usize {
        self.key.size() + self.value.len()
    }
}

/// A record as it appears in an encoded batch
///
/// Key fields set to `None` are omitted and must be recovered from the
/// preceding record. Single-blob codecs omit every key field and carry the
/// compressed payload as the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRecord {
    pub fields: [Option<Bytes>; 4],
    pub timestamp: Timestamp,
    pub value: Bytes,
}

impl EncodedRecord {
    /// Encode a record with every field present
    pub fn full(record: &Record) -> Self {
        let key = record.key();
        Self {
            fields: KeyField::ALL.map(|f| Some(key.field(f).clone())),
            timestamp: key.timestamp(),
            value: record.value().as_bytes().clone(),
        }
    }

    /// Wrap a compressed blob as a synthetic record
    pub fn opaque(blob: Bytes) -> Self {
        Self {
            fields: [None, None, None, None],
            timestamp: 0,
            value: blob,
        }
    }

    pub fn field(&self, field: KeyField) -> Option<&Bytes> {
        self.fields[field.index()].as_ref()
    }

    /// Bitmask of present fields, bit i for field i in priority order
    pub fn presence(&self) -> u8 {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_some())
            .fold(0u8, |mask, (i, _)| mask | (1 << i))
    }
}

/// The output of a codec: a sequence of encoded records
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedBatch {
    records: Vec<EncodedRecord>,
}

impl EncodedBatch {
    pub fn new(records: Vec<EncodedRecord>) -> Self {
        Self { records }
    }

    /// A batch consisting of a single opaque pseudo-record
    pub fn opaque(blob: impl Into<Bytes>) -> Self {
        Self {
            records: vec![EncodedRecord::opaque(blob.into())],
        }
    }

    pub fn records(&self) -> &[EncodedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Extract the blob of a single-record batch
    pub fn opaque_payload(&self, codec: &'static str) -> Result<&Bytes> {
        match self.records.as_slice() {
            [only] => Ok(&only.value),
            other => Err(PackError::MalformedInput {
                codec,
                expected: 1,
                actual: other.len(),
            }),
        }
    }
}

impl From<Vec<EncodedRecord>> for EncodedBatch {
    fn from(records: Vec<EncodedRecord>) -> Self {
        Self::new(records)
    }
}
