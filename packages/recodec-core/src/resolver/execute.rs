//! Running a [`DecodePlan`] against encoded bytes.

use std::collections::HashMap;
use std::io::Read;

use super::{Action, Branch, DecodePlan, EnumSymbol, FieldAction, RecordPlan};
use crate::codec::varint::{read_int, read_long};
use crate::codec::{
    check_items, read_block_header, read_boolean, read_bytes_slot, read_double, read_float, read_len, read_string,
    read_string_slot, set_enum, skip_bytes,
};
use crate::error::{DecodeError, Result, SchemaResolutionError};
use crate::value::Value;

impl DecodePlan {
    /// Decodes one writer datum into a fresh reader-shaped value.
    pub fn decode<R: Read + ?Sized>(&self, input: &mut R) -> Result<Value> {
        let mut value = Value::Null;
        self.decode_into(input, &mut value)?;
        Ok(value)
    }

    /// Decodes one writer datum over `target`, reusing its allocations
    /// where the shape matches.
    pub fn decode_into<R: Read + ?Sized>(&self, input: &mut R, target: &mut Value) -> Result<()> {
        self.run(&self.root, input, target)
    }

    /// Consumes one writer datum without building a value.
    ///
    /// Array and map blocks written with a byte size are skipped whole.
    pub fn skip<R: Read + ?Sized>(&self, input: &mut R) -> Result<()> {
        self.skip_action(&self.root, input)
    }

    fn run<R: Read + ?Sized>(&self, action: &Action, input: &mut R, target: &mut Value) -> Result<()> {
        match action {
            Action::Null => *target = Value::Null,
            Action::Boolean => *target = Value::Boolean(read_boolean(input)?),
            Action::Int => *target = Value::Int(read_int(input)?),
            Action::Long => *target = Value::Long(read_long(input)?),
            Action::Float => *target = Value::Float(read_float(input)?),
            Action::Double => *target = Value::Double(read_double(input)?),
            Action::IntToLong => *target = Value::Long(read_int(input)? as i64),
            Action::IntToFloat => *target = Value::Float(read_int(input)? as f32),
            Action::IntToDouble => *target = Value::Double(read_int(input)? as f64),
            Action::LongToFloat => *target = Value::Float(read_long(input)? as f32),
            Action::LongToDouble => *target = Value::Double(read_long(input)? as f64),
            Action::FloatToDouble => *target = Value::Double(read_float(input)? as f64),
            Action::Bytes | Action::StringToBytes => {
                let len = read_len(input, &self.limits)?;
                read_bytes_slot(input, len, target, Value::Bytes)?;
            }
            Action::String | Action::BytesToString => read_string_slot(input, &self.limits, target)?,
            Action::Fixed(size) => read_bytes_slot(input, *size, target, Value::Fixed)?,
            Action::Enum { name, symbols } => {
                let ordinal = read_long(input)?;
                let symbol = usize::try_from(ordinal)
                    .ok()
                    .and_then(|i| symbols.get(i))
                    .ok_or(DecodeError::EnumOrdinalOutOfRange {
                        ordinal,
                        symbols: symbols.len(),
                    })?;
                match symbol {
                    EnumSymbol::Known(reader_ordinal, symbol) => set_enum(target, *reader_ordinal, symbol),
                    EnumSymbol::Unknown(symbol) => {
                        return Err(SchemaResolutionError::UnknownEnumSymbol {
                            name: name.clone(),
                            symbol: symbol.clone(),
                        }
                        .into())
                    }
                }
            }
            Action::Array(items) => {
                if !matches!(target, Value::Array(_)) {
                    *target = Value::Array(Vec::new());
                }
                if let Value::Array(vec) = target {
                    let mut n: usize = 0;
                    while let Some((count, _)) = read_block_header(input, &self.limits)? {
                        check_items::<Value>(n.saturating_add(count), &self.limits)?;
                        for _ in 0..count {
                            if n < vec.len() {
                                self.run(items, input, &mut vec[n])?;
                            } else {
                                let mut item = Value::Null;
                                self.run(items, input, &mut item)?;
                                vec.push(item);
                            }
                            n += 1;
                        }
                    }
                    vec.truncate(n);
                }
            }
            Action::Map(values) => {
                let mut map = match std::mem::replace(target, Value::Null) {
                    Value::Map(mut map) => {
                        map.clear();
                        map
                    }
                    _ => HashMap::new(),
                };
                let mut n = 0;
                while let Some((count, _)) = read_block_header(input, &self.limits)? {
                    n += count;
                    check_items::<(String, Value)>(n, &self.limits)?;
                    for _ in 0..count {
                        let key = read_string(input, &self.limits)?;
                        let mut value = Value::Null;
                        self.run(values, input, &mut value)?;
                        map.insert(key, value);
                    }
                }
                *target = Value::Map(map);
            }
            Action::WriterUnion(branches) => {
                let branch = self.select_branch(branches, input)?;
                match branch.reader_index {
                    Some(reader_index) => self.run_in_union(reader_index, &branch.action, input, target)?,
                    None => self.run(&branch.action, input, target)?,
                }
            }
            Action::ToUnion { index, action } => self.run_in_union(*index, action, input, target)?,
            Action::Record(index) => self.run_record(&self.records[*index], input, target)?,
        }
        Ok(())
    }

    fn run_in_union<R: Read + ?Sized>(
        &self,
        index: u32,
        action: &Action,
        input: &mut R,
        target: &mut Value,
    ) -> Result<()> {
        match target {
            Value::Union(i, inner) => {
                *i = index;
                self.run(action, input, inner)
            }
            _ => {
                let mut inner = Value::Null;
                self.run(action, input, &mut inner)?;
                *target = Value::Union(index, Box::new(inner));
                Ok(())
            }
        }
    }

    fn run_record<R: Read + ?Sized>(&self, plan: &RecordPlan, input: &mut R, target: &mut Value) -> Result<()> {
        let reusable = matches!(target, Value::Record(fields)
            if fields.len() == plan.reader_fields.len()
                && fields.iter().zip(&plan.reader_fields).all(|((n, _), f)| n == f));
        if !reusable {
            *target = Value::Record(
                plan.reader_fields
                    .iter()
                    .map(|name| (name.clone(), Value::Null))
                    .collect(),
            );
        }
        let Value::Record(fields) = target else {
            return Ok(());
        };
        for action in &plan.actions {
            match action {
                FieldAction::Read { reader_index, plan } => {
                    self.run(plan, input, &mut fields[*reader_index].1)?
                }
                FieldAction::Skip(plan) => self.skip_action(plan, input)?,
            }
        }
        for (index, default) in &plan.defaults {
            fields[*index].1.clone_from(default);
        }
        Ok(())
    }

    /// Reads a writer union index and returns the branch it selects.
    fn select_branch<'p, R: Read + ?Sized>(
        &self,
        branches: &'p [std::result::Result<Branch, SchemaResolutionError>],
        input: &mut R,
    ) -> Result<&'p Branch> {
        let index = read_long(input)?;
        let branch = usize::try_from(index)
            .ok()
            .and_then(|i| branches.get(i))
            .ok_or(DecodeError::UnionIndexOutOfRange {
                index,
                branches: branches.len(),
            })?;
        match branch {
            Ok(branch) => Ok(branch),
            Err(e) => Err(SchemaResolutionError::UnresolvedBranch {
                index: index as usize,
                message: e.to_string(),
            }
            .into()),
        }
    }

    fn skip_action<R: Read + ?Sized>(&self, action: &Action, input: &mut R) -> Result<()> {
        match action {
            Action::Null => {}
            Action::Boolean => skip_bytes(input, 1)?,
            Action::Int
            | Action::Long
            | Action::IntToLong
            | Action::IntToFloat
            | Action::IntToDouble
            | Action::LongToFloat
            | Action::LongToDouble
            | Action::Enum { .. } => {
                read_long(input)?;
            }
            Action::Float | Action::FloatToDouble => skip_bytes(input, 4)?,
            Action::Double => skip_bytes(input, 8)?,
            Action::Bytes | Action::String | Action::StringToBytes | Action::BytesToString => {
                let len = read_len(input, &self.limits)?;
                skip_bytes(input, len)?;
            }
            Action::Fixed(size) => skip_bytes(input, *size)?,
            Action::Array(items) => {
                while let Some((count, byte_size)) = read_block_header(input, &self.limits)? {
                    match byte_size {
                        Some(size) => skip_bytes(input, size)?,
                        None => {
                            for _ in 0..count {
                                self.skip_action(items, input)?;
                            }
                        }
                    }
                }
            }
            Action::Map(values) => {
                while let Some((count, byte_size)) = read_block_header(input, &self.limits)? {
                    match byte_size {
                        Some(size) => skip_bytes(input, size)?,
                        None => {
                            for _ in 0..count {
                                let len = read_len(input, &self.limits)?;
                                skip_bytes(input, len)?;
                                self.skip_action(values, input)?;
                            }
                        }
                    }
                }
            }
            Action::WriterUnion(branches) => {
                let branch = self.select_branch(branches, input)?;
                self.skip_action(&branch.action, input)?;
            }
            Action::ToUnion { action, .. } => self.skip_action(action, input)?,
            Action::Record(index) => {
                for action in &self.records[*index].actions {
                    match action {
                        FieldAction::Read { plan, .. } | FieldAction::Skip(plan) => {
                            self.skip_action(plan, input)?
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
