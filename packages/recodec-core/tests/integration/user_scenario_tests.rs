//! The two-user walkthrough with generic and statically-shaped records.

use std::fs::File;

use ntest::timeout;
use tempfile::tempdir;

use recodec_core::container::Metadata;
use recodec_core::{single_object, ContainerReader, ContainerWriter, GenericRecord, SpecificRecord, Value};

use super::helpers::{alyssa, ben, user_schema, User};

#[timeout(5000)]
#[test]
fn test_generic_write_generic_read() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("users.avro");
    let schema = user_schema();

    let mut writer = ContainerWriter::create(&schema, Metadata::new(), File::create(&path).unwrap()).unwrap();
    writer.append(&alyssa(&schema)).unwrap();
    writer.append(&ben(&schema)).unwrap();
    writer.close().unwrap();

    let mut reader = ContainerReader::open(File::open(&path).unwrap()).unwrap();
    let mut record = GenericRecord::new(schema.clone());
    let mut seen = Vec::new();
    while reader.has_next().unwrap() {
        reader.next_record_into(&mut record).unwrap();
        seen.push(record.to_string());
    }
    assert_eq!(seen.len(), 2);

    let first = &seen[0];
    assert!(first.contains("Alyssa"));
    assert!(first.contains("256"));
    assert!(first.contains("null"));
    assert_eq!(record.get("name"), Some(&Value::from("Ben")));
    assert_eq!(
        record.get("favorite_color").cloned().and_then(Value::into_nullable),
        Some(Value::from("red"))
    );
}

#[timeout(5000)]
#[test]
fn test_specific_write_specific_read() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("users.avro");
    let users = vec![
        User::new("Alyssa", Some(256), None),
        User::new("Ben", Some(7), Some("red")),
        User::new("Charlie", None, Some("blue")),
    ];

    let file = File::create(&path).unwrap();
    let mut writer = ContainerWriter::create(User::schema(), Metadata::new(), file).unwrap();
    writer.extend(&users).unwrap();
    writer.close().unwrap();

    let mut reader = ContainerReader::open(File::open(&path).unwrap()).unwrap();
    assert_eq!(reader.writer_schema(), User::schema());
    let mut read = Vec::new();
    while reader.has_next().unwrap() {
        read.push(reader.next_specific::<User>().unwrap());
    }
    assert_eq!(read, users);
}

#[timeout(5000)]
#[test]
fn test_generic_and_specific_interoperate() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("users.avro");
    let schema = user_schema();

    let mut writer = ContainerWriter::create(&schema, Metadata::new(), File::create(&path).unwrap()).unwrap();
    writer.append(&alyssa(&schema)).unwrap();
    writer.append(&User::new("Ben", Some(7), Some("red"))).unwrap();
    writer.close().unwrap();

    let mut reader = ContainerReader::open(File::open(&path).unwrap()).unwrap();
    let mut user = User::default();
    reader.next_specific_into(&mut user).unwrap();
    assert_eq!(user, User::new("Alyssa", Some(256), None));
    reader.next_specific_into(&mut user).unwrap();
    assert_eq!(user, User::new("Ben", Some(7), Some("red")));
    assert!(!reader.has_next().unwrap());
}

#[timeout(5000)]
#[test]
fn test_reuse_matches_fresh_reads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("users.avro");
    let schema = user_schema();
    let users: Vec<GenericRecord> = (0..100)
        .map(|i| {
            let mut record = GenericRecord::new(schema.clone());
            record.put("name", format!("user-{}", i));
            if i % 3 == 0 {
                record.put("favorite_number", i);
            }
            if i % 5 == 0 {
                record.put("favorite_color", "green");
            }
            record
        })
        .collect();

    let mut writer = ContainerWriter::create(&schema, Metadata::new(), File::create(&path).unwrap()).unwrap();
    writer.extend(&users).unwrap();
    writer.close().unwrap();

    let fresh: Vec<Value> = ContainerReader::open(File::open(&path).unwrap())
        .unwrap()
        .collect::<recodec_core::Result<_>>()
        .unwrap();

    let mut reader = ContainerReader::open(File::open(&path).unwrap()).unwrap();
    let mut reused = Value::Null;
    for expected in &fresh {
        reader.next_into(&mut reused).unwrap();
        assert_eq!(&reused, expected);
    }
    assert_eq!(fresh.len(), 100);
}

#[timeout(5000)]
#[test]
fn test_single_object_user() {
    let user = User::new("Alyssa", Some(256), None);
    let bytes = single_object::encode(&user.to_value(), User::schema()).unwrap();
    assert_eq!(single_object::fingerprint(&bytes).unwrap(), User::schema().fingerprint());
    let decoded = User::from_value(single_object::decode(User::schema(), &bytes).unwrap()).unwrap();
    assert_eq!(decoded, user);
}
