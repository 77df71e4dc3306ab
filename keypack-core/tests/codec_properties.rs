//! Round-trip and size properties shared by every codec

use keypack_core::codec::{relative_keys, CodecKind, DefaultCodec, RelativeKeyCodec};
use keypack_core::{
    batches, evaluate, wire, Codec, Derived, EdgeCase, KeyField, PackError, Record, StructuredKey,
    Value,
};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use uuid::Uuid;

/// Wire-form framing of a batch holding one empty opaque record
const OPAQUE_FRAMING: u64 = 4 + 1 + 8 + 4;

fn all_codecs() -> Vec<Box<dyn Codec>> {
    CodecKind::ALL.iter().map(|k| k.build(6)).collect()
}

fn scenario_a() -> Vec<Record> {
    vec![
        Record::new(StructuredKey::new("rowA", "cf", "cq1", "vis", 100), Value::empty()),
        Record::new(StructuredKey::new("rowA", "cf", "cq2", "vis", 99), Value::empty()),
        Record::new(StructuredKey::new("rowB", "cf", "cq1", "vis", 98), Value::empty()),
    ]
}

/// Twenty records with random row, family and qualifier, as a scan of
/// freshly written data would look
fn scenario_c() -> Vec<Record> {
    let mut records: Vec<Record> = (0..20)
        .map(|_| {
            Record::new(
                StructuredKey::new(
                    Uuid::new_v4().to_string(),
                    Uuid::new_v4().to_string(),
                    Uuid::new_v4().to_string(),
                    "A&B&C",
                    1_700_000_000_000,
                ),
                Value::empty(),
            )
        })
        .collect();
    records.sort_by(|a, b| a.key().cmp(b.key()));
    records
}

fn random_bytes(rng: &mut StdRng, max: usize) -> Vec<u8> {
    let len = rng.gen_range(0..=max);
    (0..len).map(|_| rng.gen_range(b'a'..=b'd')).collect()
}

fn random_batch(seed: u64, n: usize) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut records: Vec<Record> = (0..n)
        .map(|_| {
            let key = StructuredKey::new(
                random_bytes(&mut rng, 12),
                random_bytes(&mut rng, 3),
                random_bytes(&mut rng, 8),
                random_bytes(&mut rng, 2),
                rng.gen(),
            );
            Record::new(key, random_bytes(&mut rng, 16))
        })
        .collect();
    records.sort_by(|a, b| a.key().cmp(b.key()));
    records
}

#[test]
fn roundtrip_every_codec() {
    let cases = vec![
        Vec::new(),
        scenario_a(),
        scenario_c(),
        vec![Record::new(StructuredKey::default(), Value::empty())],
        vec![
            Record::new(StructuredKey::new("", "", "", "", u64::MAX), Value::empty()),
            Record::new(StructuredKey::new("", "", "", "", 0), "v"),
            Record::new(StructuredKey::new("a", "", "b", "", 0), Value::empty()),
            Record::new(StructuredKey::new("a", "", "b", "c", 0), "\x00\x01"),
        ],
        random_batch(7, 500),
        random_batch(11, 1000),
    ];

    for codec in all_codecs() {
        for batch in &cases {
            let encoded = codec.compress(batch).unwrap();
            let decoded = codec.decompress(&encoded).unwrap();
            assert_eq!(&decoded, batch, "{} failed on a batch of {}", codec.name(), batch.len());
        }
    }
}

#[test]
fn unsorted_input_roundtrips() {
    let mut batch = random_batch(3, 200);
    batch.reverse();
    batch.swap(10, 150);

    for codec in all_codecs() {
        let decoded = codec.decompress(&codec.compress(&batch).unwrap()).unwrap();
        assert_eq!(decoded, batch, "{}", codec.name());
    }
}

#[test]
fn duplicate_records_are_kept() {
    let record = Record::new(StructuredKey::new("r", "f", "q", "v", 1), "same");
    let batch = vec![record.clone(), record.clone(), record];

    for codec in all_codecs() {
        let decoded = codec.decompress(&codec.compress(&batch).unwrap()).unwrap();
        assert_eq!(decoded.len(), 3, "{}", codec.name());
        assert_eq!(decoded, batch);
    }
}

#[test]
fn encoding_is_deterministic() {
    let batch = random_batch(5, 300);
    for codec in all_codecs() {
        let first = codec.compress(&batch).unwrap();
        let second = codec.compress(&batch).unwrap();
        assert_eq!(first, second, "{}", codec.name());
        assert_eq!(wire::encode(first.records()).unwrap(), wire::encode(second.records()).unwrap());
    }
}

#[test]
fn relative_key_beats_unshared_encoding() {
    let batch = vec![
        Record::new(StructuredKey::new("rowA", "family", "qualifier", "vis", 5), Value::empty()),
        Record::new(StructuredKey::new("rowB", "family", "qualifier", "vis", 5), Value::empty()),
        Record::new(StructuredKey::new("rowC", "family", "qualifier", "vis", 5), Value::empty()),
    ];

    // every field written with its length, no sharing at all
    let unshared: usize = 4 + batch
        .iter()
        .map(|r| {
            let fields: usize = KeyField::ALL.iter().map(|f| 4 + r.key().field(*f).len()).sum();
            1 + fields + 8 + 4 + r.value().len()
        })
        .sum::<usize>();

    let encoded = RelativeKeyCodec.compress(&batch).unwrap();
    let stream = encoded.opaque_payload("test").unwrap();
    assert!(stream.len() < unshared, "{} >= {}", stream.len(), unshared);
}

#[test]
fn cardinality_guard() {
    let blob_codecs = [CodecKind::Deflate, CodecKind::RelativeKey, CodecKind::DeflatedRelativeKey];
    let sample = scenario_a();

    for kind in blob_codecs {
        let codec = kind.build(6);
        let single = codec.compress(&sample).unwrap();

        let empty = keypack_core::EncodedBatch::default();
        assert!(matches!(
            codec.decompress(&empty),
            Err(PackError::MalformedInput { actual: 0, .. })
        ));

        let mut doubled = single.records().to_vec();
        doubled.extend_from_slice(single.records());
        assert!(matches!(
            codec.decompress(&keypack_core::EncodedBatch::new(doubled)),
            Err(PackError::MalformedInput { expected: 1, actual: 2, .. })
        ));
    }
}

#[test]
fn scenario_a_field_sharing() {
    let batch = scenario_a();

    let encoded = DefaultCodec.compress(&batch).unwrap();
    let second = &encoded.records()[1];
    assert!(second.field(KeyField::Row).is_none());
    assert!(second.field(KeyField::ColumnFamily).is_none());
    assert!(second.field(KeyField::ColumnQualifier).is_some());
    assert!(second.field(KeyField::ColumnVisibility).is_some());
    assert_eq!(encoded.records()[2].presence(), 0b1111);

    let keys = relative_keys(&batch);
    let row = keys[1].field(KeyField::Row);
    assert_eq!((row.prefix_len(), row.suffix()), (4, &b""[..]));
    let row = keys[2].field(KeyField::Row);
    assert_eq!((row.prefix_len(), row.suffix()), (0, &b"rowB"[..]));
}

#[test]
fn scenario_b_empty_batch() {
    for codec in all_codecs() {
        let encoded = codec.compress(&[]).unwrap();
        assert!(codec.decompress(&encoded).unwrap().is_empty());

        let stats = evaluate(codec.as_ref(), &[]).unwrap();
        assert_eq!(stats.record_count, 0);
        assert_eq!(stats.size_per_record(), Derived::Undefined(EdgeCase::ZeroRecords));
        assert!(stats.to_string().contains("undefined"));
    }
}

#[test]
fn scenario_c_reports() {
    let batch = scenario_c();
    for codec in all_codecs() {
        let stats = evaluate(codec.as_ref(), &batch).unwrap();
        let report = stats.to_string();
        assert_eq!(report.lines().count(), 7);
        assert!(report.starts_with(&format!("algorithm         : {}", codec.name())));
        // a single opaque record adds its own count and record framing
        assert!(
            stats.compressed_size <= stats.uncompressed_size + OPAQUE_FRAMING,
            "{}: {} > {}",
            codec.name(),
            stats.compressed_size,
            stats.uncompressed_size
        );
        assert!(stats.compression_ratio().is_defined());
    }
}

#[test]
fn relative_key_writes_full_fields_after_divergence() {
    let batch = vec![
        Record::new(StructuredKey::new("apple", "fam", "qualifier", "vis", 9), Value::empty()),
        Record::new(StructuredKey::new("zebra", "fam", "qualifier", "vis", 9), Value::empty()),
    ];
    let keys = relative_keys(&batch);
    for field in KeyField::ALL {
        let delta = keys[1].field(field);
        assert_eq!(delta.prefix_len(), 0, "{} inherited bytes", field.name());
        assert_eq!(delta.suffix(), &batch[1].key().field(field)[..]);
    }

    let codec = RelativeKeyCodec;
    assert_eq!(codec.decompress(&codec.compress(&batch).unwrap()).unwrap(), batch);
}

#[test]
fn blob_codecs_reject_trailing_bytes() {
    let batch = scenario_a();
    for kind in [CodecKind::Deflate, CodecKind::RelativeKey, CodecKind::DeflatedRelativeKey] {
        let codec = kind.build(6);
        let encoded = codec.compress(&batch).unwrap();
        let mut blob = encoded.opaque_payload("test").unwrap().to_vec();
        blob.extend_from_slice(b"GARBAGE");

        let result = codec.decompress(&keypack_core::EncodedBatch::opaque(blob));
        assert!(
            matches!(result, Err(PackError::CorruptEncoding(_))),
            "{} accepted trailing bytes",
            codec.name()
        );
    }
}

#[test]
fn batching_then_compressing() {
    let records = random_batch(13, 2500);
    let mut restored = Vec::new();
    let codec = CodecKind::DeflatedRelativeKey.build(6);

    for batch in batches(records.clone(), 1000).unwrap() {
        assert!(batch.len() <= 1000);
        restored.extend(codec.decompress(&codec.compress(&batch).unwrap()).unwrap());
    }
    assert_eq!(restored, records);
}
