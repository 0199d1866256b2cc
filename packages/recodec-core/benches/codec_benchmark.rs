//! Codec and container benchmarks.
//!
//! - Encode/decode of the user record, fresh and with value reuse
//! - Resolved decode with a promoting reader schema
//! - Container write and read over an in-memory buffer

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use recodec_core::container::Metadata;
use recodec_core::{resolve, ContainerReader, ContainerWriter, Decoder, Encoder, Schema, Value};
use std::hint::black_box;
use std::time::Duration;

const USER_SCHEMA: &str = r#"{
    "namespace": "example.avro",
    "type": "record",
    "name": "User",
    "fields": [
        {"name": "name", "type": "string"},
        {"name": "favorite_number", "type": ["null", "int"]},
        {"name": "favorite_color", "type": ["null", "string"]},
        {"name": "scores", "type": {"type": "array", "items": "int"}}
    ]
}"#;

/// Creates `count` users with random numbers and scores.
fn random_users(count: usize) -> Vec<Value> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            let number: Option<i32> = rng.gen_bool(0.5).then(|| rng.gen());
            Value::Record(vec![
                ("name".into(), Value::from(format!("user-{}", i))),
                ("favorite_number".into(), Value::from(number)),
                ("favorite_color".into(), Value::from(Some("blue"))),
                (
                    "scores".into(),
                    Value::Array((0..rng.gen_range(0..16)).map(|_| Value::Int(rng.gen())).collect()),
                ),
            ])
        })
        .collect()
}

/// Benchmark: encode and decode a single record
fn benchmark_record_codec(c: &mut Criterion) {
    let schema = Schema::parse(USER_SCHEMA).unwrap();
    let encoder = Encoder::new(&schema);
    let decoder = Decoder::new(&schema);
    let users = random_users(1_000);
    let encoded: Vec<Vec<u8>> = users
        .iter()
        .map(|u| {
            let mut out = Vec::new();
            encoder.encode_to_vec(u, &mut out).unwrap();
            out
        })
        .collect();

    let mut group = c.benchmark_group("record_codec");
    group.throughput(Throughput::Elements(users.len() as u64));

    group.bench_function("encode", |b| {
        let mut out = Vec::with_capacity(64 * 1024);
        b.iter(|| {
            out.clear();
            for user in &users {
                encoder.encode_to_vec(black_box(user), &mut out).unwrap();
            }
            black_box(out.len());
        })
    });

    group.bench_function("decode_fresh", |b| {
        b.iter(|| {
            for bytes in &encoded {
                black_box(decoder.decode(&mut bytes.as_slice()).unwrap());
            }
        })
    });

    group.bench_function("decode_reuse", |b| {
        let mut target = Value::Null;
        b.iter(|| {
            for bytes in &encoded {
                decoder.decode_into(&mut bytes.as_slice(), &mut target).unwrap();
            }
            black_box(&target);
        })
    });

    let reader_schema = Schema::parse(&USER_SCHEMA.replace(r#""items": "int""#, r#""items": "double""#)).unwrap();
    let plan = resolve(&schema, &reader_schema).unwrap();
    group.bench_function("decode_resolved", |b| {
        let mut target = Value::Null;
        b.iter(|| {
            for bytes in &encoded {
                plan.decode_into(&mut bytes.as_slice(), &mut target).unwrap();
            }
            black_box(&target);
        })
    });

    group.finish();
}

/// Benchmark: container write and read for several file sizes
fn benchmark_container(c: &mut Criterion) {
    let schema = Schema::parse(USER_SCHEMA).unwrap();
    let mut group = c.benchmark_group("container");
    group.sample_size(20);
    group.warm_up_time(Duration::from_secs(1));

    for count in [100usize, 10_000] {
        let users = random_users(count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("write", count), &users, |b, users| {
            b.iter(|| {
                let mut writer = ContainerWriter::create(&schema, Metadata::new(), Vec::new()).unwrap();
                writer.extend(users).unwrap();
                black_box(writer.close().unwrap());
            })
        });

        let mut writer = ContainerWriter::create(&schema, Metadata::new(), Vec::new()).unwrap();
        writer.extend(&users).unwrap();
        let file = writer.close().unwrap();

        group.bench_with_input(BenchmarkId::new("read", count), &file, |b, file| {
            b.iter(|| {
                let mut reader = ContainerReader::open(file.as_slice()).unwrap();
                let mut target = Value::Null;
                while reader.has_next().unwrap() {
                    reader.next_into(&mut target).unwrap();
                }
                black_box(&target);
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_record_codec, benchmark_container);
criterion_main!(benches);
