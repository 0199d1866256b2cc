//! Reading damaged container files.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use ntest::timeout;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;

use recodec_core::container::{Metadata, SYNC_SIZE};
use recodec_core::error::ContainerFormatError;
use recodec_core::{ContainerReader, ContainerWriter, Error, Schema, Value};

/// Writes `n` longs, one block per record, and returns the sync marker.
fn write_blocks(path: &Path, n: i64) -> [u8; SYNC_SIZE] {
    let file = File::create(path).unwrap();
    let mut writer = ContainerWriter::create(&Schema::Long, Metadata::new(), file).unwrap();
    for i in 0..n {
        writer.append_value(&Value::Long(i)).unwrap();
        writer.flush().unwrap();
    }
    let sync = *writer.sync_marker();
    writer.close().unwrap();
    sync
}

fn sync_offsets(bytes: &[u8], sync: &[u8; SYNC_SIZE]) -> Vec<usize> {
    bytes
        .windows(SYNC_SIZE)
        .enumerate()
        .filter(|(_, w)| *w == sync)
        .map(|(i, _)| i)
        .collect()
}

/// Reads every recoverable record, resynchronizing after each error.
fn read_recovering(path: &Path) -> (Vec<Value>, usize) {
    let mut reader = ContainerReader::open(File::open(path).unwrap()).unwrap();
    let mut values = Vec::new();
    let mut errors = 0;
    loop {
        match reader.has_next() {
            Ok(false) => break,
            Ok(true) => match reader.next_value() {
                Ok(value) => {
                    values.push(value);
                    continue;
                }
                Err(_) => errors += 1,
            },
            Err(_) => errors += 1,
        }
        if !reader.resync().unwrap() {
            break;
        }
    }
    (values, errors)
}

#[timeout(5000)]
#[test]
fn test_skip_block_with_damaged_sync_marker() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("longs.bin");
    let sync = write_blocks(&path, 20);

    let mut bytes = fs::read(&path).unwrap();
    let offsets = sync_offsets(&bytes, &sync);
    assert_eq!(offsets.len(), 21);
    // Marker closing block 5.
    bytes[offsets[6] + 3] ^= 0x55;
    fs::write(&path, &bytes).unwrap();

    let (values, errors) = read_recovering(&path);
    assert_eq!(errors, 1);
    // Block 6 is lost with block 5: its start was hidden behind the damage.
    let expected: Vec<Value> = (0..20).filter(|i| *i != 5 && *i != 6).map(Value::Long).collect();
    assert_eq!(values, expected);
}

#[timeout(5000)]
#[test]
fn test_truncated_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("longs.bin");
    write_blocks(&path, 10);

    let file = OpenOptions::new().write(true).open(&path).unwrap();
    let len = file.metadata().unwrap().len();
    file.set_len(len - 5).unwrap();
    drop(file);

    let mut reader = ContainerReader::open(File::open(&path).unwrap()).unwrap();
    for i in 0..9 {
        assert_eq!(reader.next_value().unwrap(), Value::Long(i));
    }
    assert!(matches!(
        reader.next_value().unwrap_err(),
        Error::Container(ContainerFormatError::CorruptBlock { block: 9, .. })
    ));
    assert!(!reader.resync().unwrap());
    assert!(!reader.has_next().unwrap());
}

#[timeout(10000)]
#[test]
fn test_random_damage_never_panics() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("longs.bin");
    let sync = write_blocks(&path, 200);
    let pristine = fs::read(&path).unwrap();
    let body_start = sync_offsets(&pristine, &sync)[0] + SYNC_SIZE;

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        let mut bytes = pristine.clone();
        for _ in 0..rng.gen_range(1..8) {
            let at = rng.gen_range(body_start..bytes.len());
            bytes[at] = rng.gen();
        }
        fs::write(&path, &bytes).unwrap();

        read_recovering(&path);
    }

    fs::write(&path, &pristine).unwrap();
    let (values, errors) = read_recovering(&path);
    assert_eq!(errors, 0);
    assert_eq!(values.len(), 200);
}
