//! Writer/reader schema resolution.
//!
//! [`resolve`] compares the schema data was written with against the schema
//! the caller wants to read it as and produces a [`DecodePlan`]. The plan
//! always consumes exactly the bytes the writer schema implies, while the
//! values it produces have the reader's shape.

mod execute;


use std::mem;

use tracing::debug;

use crate::config::DecodeLimits;
use crate::error::SchemaResolutionError;
use crate::schema::{EnumSchema, Name, NameTable, RecordSchema, Schema};
use crate::value::Value;

type Result<T> = std::result::Result<T, SchemaResolutionError>;

/// Compiled decoding instructions for one (writer, reader) schema pair.
///
/// Resolving the same pair twice yields equal plans.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodePlan {
    root: Action,
    /// Record plans, referenced by index from [`Action::Record`].
    records: Vec<RecordPlan>,
    limits: DecodeLimits,
}

impl DecodePlan {
    /// Replaces the decode limits.
    pub fn with_limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> DecodeLimits {
        self.limits
    }

    /// Number of distinct record pairings in the plan.
    pub fn record_plans(&self) -> usize {
        self.records.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    IntToLong,
    IntToFloat,
    IntToDouble,
    LongToFloat,
    LongToDouble,
    FloatToDouble,
    StringToBytes,
    BytesToString,
    Fixed(usize),
    Enum {
        name: String,
        /// Indexed by writer ordinal
        symbols: Vec<EnumSymbol>,
    },
    Array(Box<Action>),
    Map(Box<Action>),
    /// Writer union; indexed by writer branch. Branches that could not be
    /// resolved fail only when the data selects them.
    WriterUnion(Vec<std::result::Result<Branch, SchemaResolutionError>>),
    /// Non-union writer read into a reader union branch.
    ToUnion { index: u32, action: Box<Action> },
    Record(usize),
}

#[derive(Debug, Clone, PartialEq)]
enum EnumSymbol {
    /// Reader ordinal and symbol
    Known(u32, String),
    /// Writer symbol the reader does not know
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Branch {
    /// Reader branch when the reader is a union too
    reader_index: Option<u32>,
    action: Action,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct RecordPlan {
    /// Reader field names in reader order
    reader_fields: Vec<String>,
    /// One per writer field, in writer order
    actions: Vec<FieldAction>,
    /// Reader fields absent from the writer, with their default values
    defaults: Vec<(usize, Value)>,
}

#[derive(Debug, Clone, PartialEq)]
enum FieldAction {
    Read { reader_index: usize, plan: Action },
    Skip(Action),
}

/// Resolves `writer` against `reader`.
///
/// Fails when the schemas cannot be reconciled: incompatible types, record
/// or enum name mismatches, fixed size mismatches, reader fields without a
/// default, invalid defaults, or a union with no usable branch.
pub fn resolve(writer: &Schema, reader: &Schema) -> Result<DecodePlan> {
    let writer_names = NameTable::build(writer);
    let reader_names = NameTable::build(reader);
    let mut resolver = Resolver {
        writer_names: &writer_names,
        reader_names: &reader_names,
        identity: false,
        memo: Vec::new(),
        records: Vec::new(),
    };
    let root = resolver.resolve(writer, reader)?;
    debug!(
        "Resolved {} against {} with {} record plans",
        writer.describe(),
        reader.describe(),
        resolver.records.len()
    );
    Ok(DecodePlan {
        root,
        records: resolver.records,
        limits: DecodeLimits::default(),
    })
}

/// Key of a memoized record plan: writer name, reader name, identity mode.
type MemoKey = (String, String, bool);

struct Resolver<'a> {
    writer_names: &'a NameTable,
    reader_names: &'a NameTable,
    /// Builds skip plans: the reader side is the writer schema itself.
    identity: bool,
    memo: Vec<MemoKey>,
    records: Vec<RecordPlan>,
}

impl<'a> Resolver<'a> {
    fn resolve(&mut self, writer: &Schema, reader: &Schema) -> Result<Action> {
        let writer = deref(self.writer_names, writer)?;
        let reader = deref(self.reader_table(), reader)?;

        if let Schema::Union(union) = writer {
            return self.resolve_writer_union(union.variants(), reader);
        }

        if let Schema::Union(union) = reader {
            let (index, action) = self.select_reader_branch(writer, union.variants())?;
            return Ok(Action::ToUnion {
                index: index as u32,
                action: Box::new(action),
            });
        }

        let action = match (writer, reader) {
            (Schema::Null, Schema::Null) => Action::Null,
            (Schema::Boolean, Schema::Boolean) => Action::Boolean,
            (Schema::Int, Schema::Int) => Action::Int,
            (Schema::Int, Schema::Long) => Action::IntToLong,
            (Schema::Int, Schema::Float) => Action::IntToFloat,
            (Schema::Int, Schema::Double) => Action::IntToDouble,
            (Schema::Long, Schema::Long) => Action::Long,
            (Schema::Long, Schema::Float) => Action::LongToFloat,
            (Schema::Long, Schema::Double) => Action::LongToDouble,
            (Schema::Float, Schema::Float) => Action::Float,
            (Schema::Float, Schema::Double) => Action::FloatToDouble,
            (Schema::Double, Schema::Double) => Action::Double,
            (Schema::Bytes, Schema::Bytes) => Action::Bytes,
            (Schema::Bytes, Schema::String) => Action::BytesToString,
            (Schema::String, Schema::String) => Action::String,
            (Schema::String, Schema::Bytes) => Action::StringToBytes,
            (Schema::Array(w), Schema::Array(r)) => Action::Array(Box::new(self.resolve(w, r)?)),
            (Schema::Map(w), Schema::Map(r)) => Action::Map(Box::new(self.resolve(w, r)?)),
            (Schema::Fixed(w), Schema::Fixed(r)) => {
                check_name(&w.name, &r.name, &r.aliases)?;
                if w.size != r.size {
                    return Err(SchemaResolutionError::FixedSizeMismatch {
                        name: r.name.fullname(),
                        writer: w.size,
                        reader: r.size,
                    });
                }
                Action::Fixed(w.size)
            }
            (Schema::Enum(w), Schema::Enum(r)) => resolve_enum(w, r)?,
            (Schema::Record(w), Schema::Record(r)) => self.resolve_record(w, r)?,
            (w, r) => {
                return Err(SchemaResolutionError::TypeMismatch {
                    writer: w.describe(),
                    reader: r.describe(),
                })
            }
        };
        Ok(action)
    }

    fn reader_table(&self) -> &'a NameTable {
        if self.identity {
            self.writer_names
        } else {
            self.reader_names
        }
    }

    /// Plan that reads `writer` as itself, used to skip writer-only data.
    fn skip_plan(&mut self, writer: &Schema) -> Result<Action> {
        let previous = mem::replace(&mut self.identity, true);
        let result = self.resolve(writer, writer);
        self.identity = previous;
        result
    }

    fn resolve_writer_union(&mut self, variants: &[Schema], reader: &Schema) -> Result<Action> {
        let branches: Vec<_> = variants
            .iter()
            .map(|variant| match reader {
                Schema::Union(union) => self
                    .select_reader_branch(variant, union.variants())
                    .map(|(index, action)| Branch {
                        reader_index: Some(index as u32),
                        action,
                    }),
                _ => self.resolve(variant, reader).map(|action| Branch {
                    reader_index: None,
                    action,
                }),
            })
            .collect();

        if let Some(Err(first)) = branches.first() {
            if branches.iter().all(|b| b.is_err()) {
                return Err(first.clone());
            }
        }
        Ok(Action::WriterUnion(branches))
    }

    /// First reader branch of the writer's own type, else the first branch
    /// the writer type resolves to.
    fn select_reader_branch(&mut self, writer: &Schema, branches: &[Schema]) -> Result<(usize, Action)> {
        let writer = deref(self.writer_names, writer)?;
        for (index, branch) in branches.iter().enumerate() {
            let Ok(branch_schema) = deref(self.reader_table(), branch) else {
                continue;
            };
            if same_type(writer, branch_schema) {
                if let Ok(action) = self.resolve(writer, branch) {
                    return Ok((index, action));
                }
            }
        }
        for (index, branch) in branches.iter().enumerate() {
            if let Ok(action) = self.resolve(writer, branch) {
                return Ok((index, action));
            }
        }
        Err(SchemaResolutionError::NoMatchingBranch {
            writer: writer.describe(),
        })
    }

    fn resolve_record(&mut self, writer: &RecordSchema, reader: &RecordSchema) -> Result<Action> {
        check_name(&writer.name, &reader.name, &reader.aliases)?;

        let key = (writer.name.fullname(), reader.name.fullname(), self.identity);
        if let Some(index) = self.memo.iter().position(|k| *k == key) {
            return Ok(Action::Record(index));
        }

        // Registered before the fields so recursive references find it.
        let index = self.records.len();
        self.memo.push(key);
        self.records.push(RecordPlan::default());

        match self.plan_record(writer, reader) {
            Ok(plan) => {
                self.records[index] = plan;
                Ok(Action::Record(index))
            }
            Err(e) => {
                // Plans made during the failed attempt may point at it.
                self.memo.truncate(index);
                self.records.truncate(index);
                Err(e)
            }
        }
    }

    fn plan_record(&mut self, writer: &RecordSchema, reader: &RecordSchema) -> Result<RecordPlan> {
        let mut matched = vec![false; reader.fields.len()];
        let mut actions = Vec::with_capacity(writer.fields.len());

        for writer_field in &writer.fields {
            let reader_index = reader.fields.iter().position(|f| {
                f.name == writer_field.name || f.aliases.iter().any(|a| *a == writer_field.name)
            });
            let action = match reader_index {
                Some(reader_index) if !matched[reader_index] => {
                    matched[reader_index] = true;
                    let plan = self.resolve(&writer_field.schema, &reader.fields[reader_index].schema)?;
                    FieldAction::Read { reader_index, plan }
                }
                _ => FieldAction::Skip(self.skip_plan(&writer_field.schema)?),
            };
            actions.push(action);
        }

        let mut defaults = Vec::new();
        for (index, field) in reader.fields.iter().enumerate() {
            if matched[index] {
                continue;
            }
            let json = field
                .default
                .as_ref()
                .ok_or_else(|| SchemaResolutionError::MissingDefault {
                    record: reader.name.fullname(),
                    field: field.name.clone(),
                })?;
            let value = Value::from_default_json(json, &field.schema, self.reader_table())
                .map_err(|message| SchemaResolutionError::InvalidDefault {
                    field: field.name.clone(),
                    message,
                })?;
            defaults.push((index, value));
        }

        Ok(RecordPlan {
            reader_fields: reader.fields.iter().map(|f| f.name.clone()).collect(),
            actions,
            defaults,
        })
    }
}

fn deref<'s>(names: &'s NameTable, schema: &'s Schema) -> Result<&'s Schema> {
    names
        .resolve(schema)
        .ok_or_else(|| SchemaResolutionError::TypeMismatch {
            writer: schema.describe(),
            reader: "an undefined type".to_string(),
        })
}

/// Named types match on full name, unqualified name, or a reader alias.
fn check_name(writer: &Name, reader: &Name, aliases: &[Name]) -> Result<()> {
    if writer.matches(reader) || aliases.iter().any(|alias| alias.matches(writer)) {
        Ok(())
    } else {
        Err(SchemaResolutionError::NameMismatch {
            writer: writer.fullname(),
            reader: reader.fullname(),
        })
    }
}

fn resolve_enum(writer: &EnumSchema, reader: &EnumSchema) -> Result<Action> {
    check_name(&writer.name, &reader.name, &reader.aliases)?;
    let fallback = reader
        .default
        .as_ref()
        .and_then(|symbol| reader.ordinal(symbol).map(|o| (o, symbol)));
    let symbols = writer
        .symbols
        .iter()
        .map(|symbol| match (reader.ordinal(symbol), fallback) {
            (Some(ordinal), _) => EnumSymbol::Known(ordinal as u32, symbol.clone()),
            (None, Some((ordinal, default))) => EnumSymbol::Known(ordinal as u32, default.clone()),
            (None, None) => EnumSymbol::Unknown(symbol.clone()),
        })
        .collect();
    Ok(Action::Enum {
        name: reader.name.fullname(),
        symbols,
    })
}

/// Whether two dereferenced schemas are the same kind of type, and for
/// named types, carry the same name.
fn same_type(writer: &Schema, reader: &Schema) -> bool {
    if mem::discriminant(writer) != mem::discriminant(reader) {
        return false;
    }
    match (writer.name(), reader.name()) {
        (Some(w), Some(r)) => w.matches(r),
        _ => true,
    }
}
