//! Writes and reads a small file of user records.
//!
//! Provides commands for:
//! - Writing users from a schema file as generic records
//! - Writing users as statically-shaped records
//! - Reading a file back, optionally resolved against another schema
//! - Inspecting a file's header and blocks

mod user;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use recodec_core::container::{Metadata, CODEC_KEY, FINGERPRINT_KEY};
use recodec_core::{ContainerReader, ContainerWriter, GenericRecord, Schema, SpecificRecord, Value};
use tracing::info;

use user::User;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Container file to write or read
    #[arg(short, long, global = true, default_value = "users.avro")]
    file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write Alyssa and Ben as generic records of a parsed schema
    WriteGeneric {
        /// Schema definition file
        #[arg(short, long, default_value = "schemas/user.avsc")]
        schema: PathBuf,
    },

    /// Write Alyssa, Ben and Charlie as statically-shaped records
    WriteSpecific,

    /// Print every record of the file
    Read {
        /// Reader schema to resolve records into (defaults to the writer schema)
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Read through the statically-shaped user record
        #[arg(long)]
        specific: bool,

        /// Decode every record into a fresh value instead of reusing one
        #[arg(long)]
        fresh: bool,
    },

    /// Print the header and count the blocks and records
    Inspect,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt::init();

    match cli.command {
        Commands::WriteGeneric { schema } => write_generic(&schema, &cli.file),
        Commands::WriteSpecific => write_specific(&cli.file),
        Commands::Read {
            schema,
            specific,
            fresh,
        } => read(&cli.file, schema.as_deref(), specific, fresh),
        Commands::Inspect => inspect(&cli.file),
    }
}

fn write_generic(schema_path: &Path, file: &Path) -> Result<()> {
    let schema = Arc::new(
        Schema::parse_file(schema_path)
            .with_context(|| format!("Failed to load schema {}", schema_path.display()))?,
    );

    let mut alyssa = GenericRecord::new(Arc::clone(&schema));
    alyssa.put("name", "Alyssa");
    alyssa.put("favorite_number", 256);
    // Leave favorite color null

    let mut ben = GenericRecord::new(Arc::clone(&schema));
    ben.put("name", "Ben");
    ben.put("favorite_number", 7);
    ben.put("favorite_color", "red");

    let sink = File::create(file).with_context(|| format!("Failed to create {}", file.display()))?;
    let mut writer = ContainerWriter::create(&schema, Metadata::new(), sink)?;
    writer.append(&alyssa)?;
    writer.append(&ben)?;
    let records = writer.record_count();
    writer.close()?;

    info!("Wrote {} generic records to {}", records, file.display());
    Ok(())
}

fn write_specific(file: &Path) -> Result<()> {
    let users = [
        User::new("Alyssa", Some(256), None),
        User::new("Ben", Some(7), Some("red")),
        User::new("Charlie", None, Some("blue")),
    ];

    let sink = File::create(file).with_context(|| format!("Failed to create {}", file.display()))?;
    let mut writer = ContainerWriter::create(User::schema(), Metadata::new(), sink)?;
    writer.extend(&users)?;
    let records = writer.record_count();
    writer.close()?;

    info!("Wrote {} specific records to {}", records, file.display());
    Ok(())
}

fn read(file: &Path, schema_path: Option<&Path>, specific: bool, fresh: bool) -> Result<()> {
    let source = File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let reader_schema = match (schema_path, specific) {
        (Some(path), _) => Some(
            Schema::parse_file(path).with_context(|| format!("Failed to load schema {}", path.display()))?,
        ),
        (None, true) => Some(User::schema().clone()),
        (None, false) => None,
    };
    let mut reader = match reader_schema {
        Some(schema) => ContainerReader::open_with_schema(source, schema)?,
        None => ContainerReader::open(source)?,
    };

    if specific {
        let mut user = User::default();
        while reader.has_next()? {
            if fresh {
                user = reader.next_specific()?;
            } else {
                reader.next_specific_into(&mut user)?;
            }
            println!("{}", user);
        }
    } else {
        let mut record = Value::Null;
        while reader.has_next()? {
            if fresh {
                record = reader.next_value()?;
            } else {
                reader.next_into(&mut record)?;
            }
            println!("{}", record);
        }
    }
    Ok(())
}

fn inspect(file: &Path) -> Result<()> {
    let source = File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let mut reader = ContainerReader::open(source)?;

    println!("schema:      {}", reader.writer_schema().to_json());
    println!("fingerprint: {}", reader.fingerprint());
    let mut keys: Vec<&String> = reader.metadata().keys().collect();
    keys.sort();
    for key in keys {
        let value = reader.metadata_value(key).unwrap_or_default();
        match key.as_str() {
            FINGERPRINT_KEY => println!("meta {}: {:02x?}", key, value),
            CODEC_KEY => println!("meta {}: {}", key, String::from_utf8_lossy(value)),
            _ => println!("meta {}: {} bytes", key, value.len()),
        }
    }

    let mut records = 0u64;
    let mut target = Value::Null;
    while reader.has_next()? {
        reader.next_into(&mut target)?;
        records += 1;
    }
    println!("blocks:      {}", reader.blocks_read());
    println!("records:     {}", records);
    Ok(())
}
