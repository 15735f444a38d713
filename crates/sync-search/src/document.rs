//! Mapping from normalized documents to Tantivy documents.

use serde_json::Value;
use tantivy::doc;
use tantivy::TantivyDocument;

use sync_types::Document;

use crate::error::SearchError;
use crate::schema::DocumentSchema;

/// Convert a normalized document to a Tantivy document.
///
/// Text field contains every string attribute and metadata value.
/// Body field contains the full document JSON.
pub fn to_tantivy_doc(
    schema: &DocumentSchema,
    document: &Document,
) -> Result<TantivyDocument, SearchError> {
    let body = serde_json::to_string(document)?;

    Ok(doc!(
        schema.doc_key => document.key(),
        schema.doc_type => document.doc_type.clone(),
        schema.doc_id => document.id.to_string(),
        schema.text => extract_text(document),
        schema.body => body
    ))
}

/// Collect searchable text from a document.
///
/// Attributes come first in key order, then metadata values.
pub fn extract_text(document: &Document) -> String {
    let mut parts = Vec::new();
    for value in document.fields.values() {
        collect_strings(value, &mut parts);
    }
    for value in document.meta.values() {
        collect_strings(value, &mut parts);
    }
    parts.join(" ")
}

fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) if !s.trim().is_empty() => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}
