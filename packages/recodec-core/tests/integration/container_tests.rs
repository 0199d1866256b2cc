//! Container files written to and read from disk.

use std::fs::{File, OpenOptions};

use ntest::timeout;
use tempfile::tempdir;

use recodec_core::config::{EncoderConfig, WriterConfig};
use recodec_core::container::{Metadata, SYNC_SIZE};
use recodec_core::{ContainerReader, ContainerWriter, Schema, Value};

use super::helpers::{read_file, write_file};

fn event_schema() -> Schema {
    Schema::parse(
        r#"{"type": "record", "name": "Event", "namespace": "metrics", "fields": [
            {"name": "id", "type": "long"},
            {"name": "kind", "type": {"type": "enum", "name": "Kind", "symbols": ["START", "STOP"]}},
            {"name": "tags", "type": {"type": "map", "values": "string"}},
            {"name": "samples", "type": {"type": "array", "items": "double"}},
            {"name": "digest", "type": {"type": "fixed", "name": "Digest", "size": 4}}
        ]}"#,
    )
    .unwrap()
}

fn event(id: i64) -> Value {
    let mut tags = std::collections::HashMap::new();
    tags.insert("host".to_string(), Value::from(format!("node-{}", id % 3)));
    Value::Record(vec![
        ("id".into(), Value::Long(id)),
        (
            "kind".into(),
            Value::Enum((id % 2) as u32, if id % 2 == 0 { "START" } else { "STOP" }.into()),
        ),
        ("tags".into(), Value::Map(tags)),
        (
            "samples".into(),
            Value::Array((0..(id % 4)).map(|i| Value::Double(i as f64 * 0.5)).collect()),
        ),
        ("digest".into(), Value::Fixed((id as u32).to_le_bytes().to_vec())),
    ])
}

#[timeout(5000)]
#[test]
fn test_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.bin");
    let events: Vec<Value> = (0..500).map(event).collect();

    write_file(&path, &event_schema(), &events);
    assert_eq!(read_file(&path), events);
}

#[timeout(5000)]
#[test]
fn test_many_blocks_with_byte_sizes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.bin");
    let config = WriterConfig {
        sync_interval: 256,
        encoder: EncoderConfig {
            block_byte_sizes: true,
        },
    };

    let file = File::create(&path).unwrap();
    let mut writer = ContainerWriter::with_config(&event_schema(), Metadata::new(), file, config).unwrap();
    let events: Vec<Value> = (0..200).map(event).collect();
    writer.extend(&events).unwrap();
    assert!(writer.block_count() > 1);
    writer.close().unwrap();

    let mut reader = ContainerReader::open(File::open(&path).unwrap()).unwrap();
    let mut target = Value::Null;
    for expected in &events {
        reader.next_into(&mut target).unwrap();
        assert_eq!(&target, expected);
    }
    assert!(!reader.has_next().unwrap());
    assert!(reader.blocks_read() > 1);
}

#[timeout(5000)]
#[test]
fn test_append_to_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.bin");
    write_file(&path, &event_schema(), &[event(0), event(1)]);

    let file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
    let mut writer = ContainerWriter::append_to(file).unwrap();
    writer.append_value(&event(2)).unwrap();
    writer.close().unwrap();

    assert_eq!(read_file(&path), vec![event(0), event(1), event(2)]);

    let bytes = std::fs::read(&path).unwrap();
    let reader = ContainerReader::open(bytes.as_slice()).unwrap();
    let sync = *reader.sync_marker();
    let markers = bytes.windows(SYNC_SIZE).filter(|w| *w == sync).count();
    // Header plus one block per writer session.
    assert_eq!(markers, 3);
}

#[timeout(5000)]
#[test]
fn test_empty_container() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.bin");
    write_file(&path, &Schema::Long, &[]);

    let mut reader = ContainerReader::open(File::open(&path).unwrap()).unwrap();
    assert_eq!(reader.writer_schema(), &Schema::Long);
    assert!(!reader.has_next().unwrap());
    assert!(reader.next().is_none());
}
