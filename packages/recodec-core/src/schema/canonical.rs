//! Full JSON rendering and Parsing Canonical Form.

use std::collections::HashSet;

use serde_json::{json, Map, Value as JsonValue};

use super::{Name, Schema};

/// Renders the full definition of `schema`.
///
/// A named type is written out once; later occurrences become its full name.
pub(crate) fn to_json(schema: &Schema) -> JsonValue {
    let mut seen = HashSet::new();
    render_json(schema, &mut seen, None)
}

fn render_json(schema: &Schema, seen: &mut HashSet<String>, enclosing: Option<&str>) -> JsonValue {
    if let Schema::Ref(name) = schema {
        return JsonValue::String(name.fullname());
    }
    if let Some(name) = schema.name() {
        if !seen.insert(name.fullname()) {
            return JsonValue::String(name.fullname());
        }
    }

    match schema {
        Schema::Array(items) => json!({"type": "array", "items": render_json(items, seen, enclosing)}),
        Schema::Map(values) => json!({"type": "map", "values": render_json(values, seen, enclosing)}),
        Schema::Union(union) => JsonValue::Array(
            union
                .variants()
                .iter()
                .map(|v| render_json(v, seen, enclosing))
                .collect(),
        ),
        Schema::Record(record) => {
            let mut map = named_header("record", &record.name, &record.aliases, &record.doc, enclosing);
            let namespace = record.name.namespace.as_deref();
            let fields = record
                .fields
                .iter()
                .map(|field| {
                    let mut f = Map::new();
                    f.insert("name".into(), JsonValue::String(field.name.clone()));
                    f.insert("type".into(), render_json(&field.schema, seen, namespace));
                    if let Some(doc) = &field.doc {
                        f.insert("doc".into(), JsonValue::String(doc.clone()));
                    }
                    if let Some(default) = &field.default {
                        f.insert("default".into(), default.clone());
                    }
                    if !field.aliases.is_empty() {
                        f.insert("aliases".into(), json!(field.aliases));
                    }
                    JsonValue::Object(f)
                })
                .collect();
            map.insert("fields".into(), JsonValue::Array(fields));
            JsonValue::Object(map)
        }
        Schema::Enum(e) => {
            let mut map = named_header("enum", &e.name, &e.aliases, &e.doc, enclosing);
            map.insert("symbols".into(), json!(e.symbols));
            if let Some(default) = &e.default {
                map.insert("default".into(), JsonValue::String(default.clone()));
            }
            JsonValue::Object(map)
        }
        Schema::Fixed(f) => {
            let mut map = named_header("fixed", &f.name, &f.aliases, &f.doc, enclosing);
            map.insert("size".into(), json!(f.size));
            JsonValue::Object(map)
        }
        primitive => JsonValue::String(primitive.type_name().to_string()),
    }
}

fn named_header(
    kind: &str,
    name: &Name,
    aliases: &[Name],
    doc: &Option<String>,
    enclosing: Option<&str>,
) -> Map<String, JsonValue> {
    let mut map = Map::new();
    map.insert("type".into(), JsonValue::String(kind.to_string()));
    map.insert("name".into(), JsonValue::String(name.name.clone()));
    // Only written when it differs from what the parser would inherit.
    if name.namespace.as_deref() != enclosing {
        let namespace = name.namespace.clone().unwrap_or_default();
        map.insert("namespace".into(), JsonValue::String(namespace));
    }
    if let Some(doc) = doc {
        map.insert("doc".into(), JsonValue::String(doc.clone()));
    }
    if !aliases.is_empty() {
        let aliases: Vec<String> = aliases.iter().map(Name::fullname).collect();
        map.insert("aliases".into(), json!(aliases));
    }
    map
}

/// Renders the Parsing Canonical Form: full names, no docs, aliases or
/// defaults, fixed attribute order, no whitespace.
pub(crate) fn canonical_form(schema: &Schema) -> String {
    let mut out = String::new();
    let mut seen = HashSet::new();
    render_canonical(schema, &mut seen, &mut out);
    out
}

fn render_canonical(schema: &Schema, seen: &mut HashSet<String>, out: &mut String) {
    if let Schema::Ref(name) = schema {
        push_str_literal(out, &name.fullname());
        return;
    }
    if let Some(name) = schema.name() {
        if !seen.insert(name.fullname()) {
            push_str_literal(out, &name.fullname());
            return;
        }
    }

    match schema {
        Schema::Array(items) => {
            out.push_str(r#"{"type":"array","items":"#);
            render_canonical(items, seen, out);
            out.push('}');
        }
        Schema::Map(values) => {
            out.push_str(r#"{"type":"map","values":"#);
            render_canonical(values, seen, out);
            out.push('}');
        }
        Schema::Union(union) => {
            out.push('[');
            for (i, variant) in union.variants().iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                render_canonical(variant, seen, out);
            }
            out.push(']');
        }
        Schema::Record(record) => {
            out.push_str(r#"{"name":"#);
            push_str_literal(out, &record.name.fullname());
            out.push_str(r#","type":"record","fields":["#);
            for (i, field) in record.fields.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(r#"{"name":"#);
                push_str_literal(out, &field.name);
                out.push_str(r#","type":"#);
                render_canonical(&field.schema, seen, out);
                out.push('}');
            }
            out.push_str("]}");
        }
        Schema::Enum(e) => {
            out.push_str(r#"{"name":"#);
            push_str_literal(out, &e.name.fullname());
            out.push_str(r#","type":"enum","symbols":["#);
            for (i, symbol) in e.symbols.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                push_str_literal(out, symbol);
            }
            out.push_str("]}");
        }
        Schema::Fixed(f) => {
            out.push_str(r#"{"name":"#);
            push_str_literal(out, &f.name.fullname());
            out.push_str(&format!(r#","type":"fixed","size":{}}}"#, f.size));
        }
        primitive => push_str_literal(out, primitive.type_name()),
    }
}

fn push_str_literal(out: &mut String, s: &str) {
    out.push_str(&JsonValue::String(s.to_string()).to_string());
}
