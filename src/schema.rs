//! Persisted record loading and schema migration.
//!
//! Records are JSON. Three layouts have been written over time:
//!
//! - **v1** (no version tag): flat S2ORC-style record with `metadata`,
//!   `body_text` paragraphs carrying `cite_spans` / `ref_spans` / `eq_spans`,
//!   `::`-joined section names, and `bib_entries` / `ref_entries` maps,
//!   optionally nested under `pdf_parse` or `grobid_parse`.
//! - **v2**: the current layout, except bibliography and assets are lists
//!   and the unresolved count sits at the top level.
//! - **v3**: [`Document`] as serialized today.
//!
//! Migrations run on the JSON value in ascending version order before the
//! value is deserialized.

use crate::document::{Document, SpanKind};
use crate::error::{Error, Result};
use serde_json::{json, Map, Value};
use std::path::Path;

/// Output format version written by this build.
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

/// Load a record of any supported version from JSON text.
pub fn load_document(json: &str) -> Result<Document> {
    let value: Value = serde_json::from_str(json)?;
    load_value(value)
}

/// Load a record from a file.
pub fn load_document_file(path: impl AsRef<Path>) -> Result<Document> {
    let json = std::fs::read_to_string(path)?;
    load_document(&json)
}

/// Write a record as indented JSON.
pub fn save_document_file(doc: &Document, path: impl AsRef<Path>) -> Result<()> {
    std::fs::write(path, doc.to_json_pretty()?)?;
    Ok(())
}

/// Migrate a parsed record to the current version and deserialize it.
pub fn load_value(mut value: Value) -> Result<Document> {
    let mut version = detect_version(&value)?;
    if version == 1 {
        value = migrate_v1_to_v2(value)?;
        version = 2;
    }
    if version == 2 {
        value = migrate_v2_to_v3(value)?;
    }
    Ok(serde_json::from_value(value)?)
}

/// Schema version of a record; untagged records are v1.
pub fn detect_version(value: &Value) -> Result<u32> {
    let object = value
        .as_object()
        .ok_or_else(|| Error::InvalidRecord("record is not a JSON object".to_string()))?;
    let version = match object.get("schema_version") {
        None | Some(Value::Null) => return Ok(1),
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    };
    match version {
        Some(v @ 1..=3) => Ok(v as u32),
        _ => Err(Error::UnsupportedSchemaVersion {
            found: object
                .get("schema_version")
                .map(|v| v.to_string())
                .unwrap_or_default(),
            supported: CURRENT_SCHEMA_VERSION,
        }),
    }
}

/// v1 → v2: S2ORC-style record to the list-based structured layout.
pub fn migrate_v1_to_v2(value: Value) -> Result<Value> {
    let record = flatten_parse_nesting(into_object(value)?);
    let empty = Map::new();
    let bib_entries = record
        .get("bib_entries")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let ref_entries = record
        .get("ref_entries")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let mut unresolved = 0usize;
    let mut units = |key: &str, headers: bool| -> Result<Vec<Value>> {
        let paragraphs: &[Value] = match record.get(key) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        };
        v1_units(paragraphs, headers, bib_entries, ref_entries, &mut unresolved)
    };
    let abstract_paragraphs = units("abstract", false)?;
    let body = units("body_text", true)?;
    let back_matter = units("back_matter", true)?;

    let metadata = record
        .get("metadata")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let bibliography: Vec<Value> = bib_entries
        .iter()
        .map(|(key, entry)| v1_bib_entry(key, entry))
        .collect();
    let assets: Vec<Value> = ref_entries
        .iter()
        .map(|(key, entry)| v1_asset(key, entry))
        .collect();

    log::debug!(
        "migrated v1 record: {} body unit(s), {} bib entries, {} assets",
        body.len(),
        bibliography.len(),
        assets.len()
    );
    Ok(json!({
        "schema_version": 2,
        "paper_id": string_of(record.get("paper_id")).unwrap_or_default(),
        "title": string_of(metadata.get("title")).unwrap_or_default(),
        "authors": metadata.get("authors").cloned().unwrap_or_else(|| json!([])),
        "year": string_of(metadata.get("year")),
        "abstract": abstract_paragraphs,
        "body": body,
        "back_matter": back_matter,
        "bibliography": bibliography,
        "assets": assets,
        "citation_style": "unknown",
        "unresolved_references": unresolved,
    }))
}

/// v2 → v3: keyed bibliography and assets, diagnostics object.
pub fn migrate_v2_to_v3(value: Value) -> Result<Value> {
    let mut record = into_object(value)?;

    for (field, id_key) in [("bibliography", "ref_id"), ("assets", "asset_id")] {
        if let Some(Value::Array(items)) = record.remove(field) {
            let mut keyed = Map::new();
            for item in items {
                let id = item
                    .get(id_key)
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        Error::InvalidRecord(format!("{} entry without {}", field, id_key))
                    })?
                    .to_string();
                if keyed.insert(id.clone(), item).is_some() {
                    return Err(Error::InvalidRecord(format!(
                        "duplicate {} '{}' in {}",
                        id_key, id, field
                    )));
                }
            }
            record.insert(field.to_string(), Value::Object(keyed));
        }
    }

    let unresolved = record
        .remove("unresolved_references")
        .unwrap_or_else(|| json!(0));
    let warnings = record.remove("warnings").unwrap_or_else(|| json!([]));
    record.insert(
        "diagnostics".to_string(),
        json!({ "unresolved_references": unresolved, "warnings": warnings }),
    );
    record.insert("schema_version".to_string(), json!(3));
    Ok(Value::Object(record))
}

fn into_object(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidRecord(format!(
            "expected a JSON object, found {}",
            other
        ))),
    }
}

/// Lift `pdf_parse` / `grobid_parse` contents to the top level.
fn flatten_parse_nesting(mut record: Map<String, Value>) -> Map<String, Value> {
    for nested_key in ["grobid_parse", "pdf_parse"] {
        if let Some(Value::Object(nested)) = record.remove(nested_key) {
            for (key, value) in nested {
                record.entry(key).or_insert(value);
            }
        }
    }
    record
}

fn string_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn v1_units(
    paragraphs: &[Value],
    headers: bool,
    bib_entries: &Map<String, Value>,
    ref_entries: &Map<String, Value>,
    unresolved: &mut usize,
) -> Result<Vec<Value>> {
    let mut units = Vec::new();
    let mut current_section: Option<Vec<String>> = None;

    for (index, paragraph) in paragraphs.iter().enumerate() {
        let text = paragraph
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidRecord(format!("paragraph {} has no text", index)))?;
        let section_path: Vec<String> = paragraph
            .get("section")
            .and_then(Value::as_str)
            .map(|s| {
                s.split("::")
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if headers && !section_path.is_empty() && current_section.as_ref() != Some(&section_path) {
            units.push(json!({
                "type": "header",
                "level": section_path.len(),
                "text": section_path.last().cloned().unwrap_or_default(),
                "number": string_of(paragraph.get("sec_num")),
                "section_path": section_path,
            }));
        }
        current_section = Some(section_path.clone());

        let spans = v1_spans(paragraph, bib_entries, ref_entries, unresolved)?;
        let mut unit = json!({
            "text": text,
            "spans": spans,
            "section_path": section_path,
        });
        if headers {
            unit["type"] = json!("paragraph");
        }
        units.push(unit);
    }
    Ok(units)
}

fn v1_spans(
    paragraph: &Value,
    bib_entries: &Map<String, Value>,
    ref_entries: &Map<String, Value>,
    unresolved: &mut usize,
) -> Result<Vec<Value>> {
    let mut spans: Vec<(u64, Value)> = Vec::new();
    for field in ["cite_spans", "ref_spans", "eq_spans"] {
        let Some(Value::Array(items)) = paragraph.get(field) else {
            continue;
        };
        for item in items {
            let offset = |key: &str| {
                item.get(key).and_then(Value::as_u64).ok_or_else(|| {
                    Error::InvalidRecord(format!("{} entry without numeric {}", field, key))
                })
            };
            let (start, end) = (offset("start")?, offset("end")?);
            let target = item
                .get("ref_id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let (kind, resolved) = match field {
                "cite_spans" => (SpanKind::Citation, bib_entries.contains_key(&target)),
                "eq_spans" => (SpanKind::EquationRef, ref_entries.contains_key(&target)),
                _ => (
                    v1_ref_kind(&target, ref_entries),
                    ref_entries.contains_key(&target),
                ),
            };
            if !resolved {
                *unresolved += 1;
            }
            spans.push((
                start,
                json!({
                    "start": start,
                    "end": end,
                    "kind": kind,
                    "target_id": target,
                    "resolved": resolved,
                }),
            ));
        }
    }
    spans.sort_by_key(|(start, _)| *start);
    Ok(spans.into_iter().map(|(_, span)| span).collect())
}

/// Span kind of a v1 `ref_spans` item: the entry's `type`, else the id prefix.
fn v1_ref_kind(target: &str, ref_entries: &Map<String, Value>) -> SpanKind {
    let declared = ref_entries
        .get(target)
        .and_then(|entry| entry.get("type"))
        .and_then(Value::as_str);
    match declared {
        Some("table") => SpanKind::TableRef,
        Some("figure") => SpanKind::FigureRef,
        Some("equation") | Some("formula") => SpanKind::EquationRef,
        Some("footnote") => SpanKind::FootnoteRef,
        _ if target.starts_with("TABREF") => SpanKind::TableRef,
        _ if target.starts_with("EQREF") => SpanKind::EquationRef,
        _ if target.starts_with("FOOTREF") => SpanKind::FootnoteRef,
        _ => SpanKind::FigureRef,
    }
}

fn v1_bib_entry(key: &str, entry: &Value) -> Value {
    let field = |name: &str| string_of(entry.get(name));
    let authors: Vec<Value> = entry
        .get("authors")
        .and_then(Value::as_array)
        .map(|authors| {
            authors
                .iter()
                .map(|a| {
                    json!({
                        "first": string_of(a.get("first")).unwrap_or_default(),
                        "middle": a.get("middle").cloned().unwrap_or_else(|| json!([])),
                        "last": string_of(a.get("last")).unwrap_or_default(),
                        "suffix": string_of(a.get("suffix")).unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let mut identifiers = Map::new();
    if let Some(Value::Object(other_ids)) = entry.get("other_ids") {
        for (scheme, ids) in other_ids {
            let ids: Vec<Value> = match ids {
                Value::Array(items) => items.iter().filter(|v| v.is_string()).cloned().collect(),
                Value::String(s) if !s.is_empty() => vec![json!(s)],
                _ => Vec::new(),
            };
            if !ids.is_empty() {
                identifiers.insert(scheme.clone(), Value::Array(ids));
            }
        }
    }

    json!({
        "ref_id": key,
        "raw_text": field("raw_text").unwrap_or_default(),
        "title": field("title"),
        "authors": authors,
        "venue": field("venue"),
        "volume": field("volume"),
        "issue": field("issue"),
        "pages": field("pages"),
        "year": field("year").and_then(|y| y.parse::<u32>().ok()),
        "identifiers": identifiers,
        "urls": [],
        "aliases": [],
    })
}

fn v1_asset(key: &str, entry: &Value) -> Value {
    let kind = match entry.get("type").and_then(Value::as_str) {
        Some("table") => "table",
        Some("equation") | Some("formula") => "equation",
        Some("footnote") => "footnote",
        _ => "figure",
    };
    let content = match (kind, string_of(entry.get("content"))) {
        ("table", Some(text)) => json!({ "format": "raw_text", "text": text }),
        _ => Value::Null,
    };
    json!({
        "asset_id": key,
        "kind": kind,
        "text": string_of(entry.get("text")).unwrap_or_default(),
        "label": string_of(entry.get("num")),
        "spans": [],
        "content": content,
        "uris": [],
    })
}
