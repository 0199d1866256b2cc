//! Files written with one schema version and read with another.

use std::fs::File;

use ntest::timeout;
use tempfile::tempdir;

use recodec_core::error::SchemaResolutionError;
use recodec_core::{ContainerReader, Error, Schema, Value};

use super::helpers::{user_schema, write_file, USER_SCHEMA};

const ORDER_V1: &str = r#"{"type": "record", "name": "Order", "namespace": "shop", "fields": [
    {"name": "id", "type": "int"},
    {"name": "amount", "type": "float"},
    {"name": "status", "type": {"type": "enum", "name": "Status", "symbols": ["NEW", "PAID", "SHIPPED"]}},
    {"name": "note", "type": "string"}
]}"#;

const ORDER_V2: &str = r#"{"type": "record", "name": "Order", "namespace": "shop", "fields": [
    {"name": "id", "type": "long"},
    {"name": "total", "aliases": ["amount"], "type": "double"},
    {"name": "status", "type": {"type": "enum", "name": "Status", "symbols": ["NEW", "PAID", "UNKNOWN"], "default": "UNKNOWN"}},
    {"name": "currency", "type": "string", "default": "EUR"},
    {"name": "lines", "type": {"type": "array", "items": "int"}, "default": []}
]}"#;

fn order_v1(id: i32, status: (u32, &str)) -> Value {
    Value::Record(vec![
        ("id".into(), Value::Int(id)),
        ("amount".into(), Value::Float(id as f32 * 1.5)),
        ("status".into(), Value::Enum(status.0, status.1.into())),
        ("note".into(), Value::from("fragile")),
    ])
}

fn order_v2(id: i64, status: (u32, &str)) -> Value {
    Value::Record(vec![
        ("id".into(), Value::Long(id)),
        ("total".into(), Value::Double(id as f64 * 1.5)),
        ("status".into(), Value::Enum(status.0, status.1.into())),
        ("currency".into(), Value::from("EUR")),
        ("lines".into(), Value::Array(Vec::new())),
    ])
}

#[timeout(5000)]
#[test]
fn test_read_old_orders_with_new_schema() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("orders.bin");
    let writer_schema = Schema::parse(ORDER_V1).unwrap();
    write_file(
        &path,
        &writer_schema,
        &[order_v1(1, (0, "NEW")), order_v1(2, (1, "PAID")), order_v1(3, (2, "SHIPPED"))],
    );

    let reader_schema = Schema::parse(ORDER_V2).unwrap();
    let reader = ContainerReader::open_with_schema(File::open(&path).unwrap(), reader_schema).unwrap();
    assert_eq!(reader.writer_schema(), &writer_schema);
    let orders = reader.collect::<recodec_core::Result<Vec<_>>>().unwrap();
    assert_eq!(
        orders,
        vec![
            order_v2(1, (0, "NEW")),
            order_v2(2, (1, "PAID")),
            // Symbol missing from the reader enum falls back to its default.
            order_v2(3, (2, "UNKNOWN")),
        ]
    );
}

#[timeout(5000)]
#[test]
fn test_incompatible_reader_schema() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("orders.bin");
    write_file(&path, &Schema::parse(ORDER_V1).unwrap(), &[order_v1(1, (0, "NEW"))]);

    // A new field without a default cannot be filled from old data.
    let reader_schema = Schema::parse(
        r#"{"type": "record", "name": "Order", "namespace": "shop", "fields": [
            {"name": "id", "type": "int"},
            {"name": "customer", "type": "string"}
        ]}"#,
    )
    .unwrap();
    let err = ContainerReader::open_with_schema(File::open(&path).unwrap(), reader_schema)
        .err()
        .unwrap();
    assert!(matches!(
        err,
        Error::Resolution(SchemaResolutionError::MissingDefault { field, .. }) if field == "customer"
    ));

    // Narrowing a number is never allowed.
    let reader_schema = Schema::parse(
        r#"{"type": "record", "name": "Order", "namespace": "shop", "fields": [
            {"name": "amount", "type": "int"}
        ]}"#,
    )
    .unwrap();
    let err = ContainerReader::open_with_schema(File::open(&path).unwrap(), reader_schema)
        .err()
        .unwrap();
    assert!(matches!(
        err,
        Error::Resolution(SchemaResolutionError::TypeMismatch { .. })
    ));
}

#[timeout(5000)]
#[test]
fn test_user_gains_optional_field() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("users.bin");
    let user = Value::Record(vec![
        ("name".into(), Value::from("Alyssa")),
        ("favorite_number".into(), Value::Int(256)),
        ("favorite_color".into(), Value::Null),
    ]);
    write_file(&path, &user_schema(), &[user]);

    let evolved = USER_SCHEMA.replace(
        r#"{"name": "favorite_color", "type": ["null", "string"]}"#,
        r#"{"name": "favorite_color", "type": ["null", "string"]},
        {"name": "email", "type": ["null", "string"], "default": null}"#,
    );
    let reader_schema = Schema::parse(&evolved).unwrap();
    let mut reader = ContainerReader::open_with_schema(File::open(&path).unwrap(), reader_schema).unwrap();
    let record = reader.next_record().unwrap();
    assert_eq!(record.get("name"), Some(&Value::from("Alyssa")));
    assert_eq!(
        record.get("favorite_number").cloned().and_then(Value::into_nullable),
        Some(Value::Int(256))
    );
    assert!(record.get("favorite_color").unwrap().is_null());
    assert!(record.get("email").unwrap().is_null());
}

#[timeout(5000)]
#[test]
fn test_field_dropped_by_reader_is_skipped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("users.bin");
    let users: Vec<Value> = (0..50)
        .map(|i| {
            Value::Record(vec![
                ("name".into(), Value::from(format!("user-{}", i))),
                ("favorite_number".into(), Value::from(Some(i))),
                ("favorite_color".into(), Value::from(Some("blue"))),
            ])
        })
        .collect();
    write_file(&path, &user_schema(), &users);

    let reader_schema = Schema::parse(
        r#"{"type": "record", "name": "User", "namespace": "example.avro", "fields": [
            {"name": "favorite_color", "type": ["null", "string"]}
        ]}"#,
    )
    .unwrap();
    let reader = ContainerReader::open_with_schema(File::open(&path).unwrap(), reader_schema).unwrap();
    let colors: Vec<Option<Value>> = reader
        .map(|v| v.unwrap().field("favorite_color").cloned().and_then(Value::into_nullable))
        .collect();
    assert_eq!(colors.len(), 50);
    assert!(colors.iter().all(|c| c == &Some(Value::from("blue"))));
}
