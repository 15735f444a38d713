//! Tantivy schema for synchronized content documents.
//!
//! Every content type shares one schema: addressing fields, a full-text
//! field built from the document's string values, and the stored JSON body.

use tantivy::schema::{Field, Schema, STORED, STRING, TEXT};

use crate::SearchError;

/// Schema field handles for efficient access
#[derive(Debug, Clone)]
pub struct DocumentSchema {
    schema: Schema,
    /// Unique address `{doc_type}:{id}` (STRING | STORED)
    pub doc_key: Field,
    /// Content type name (STRING | STORED)
    pub doc_type: Field,
    /// Record id as text (STRING | STORED)
    pub doc_id: Field,
    /// Searchable text from attribute and metadata strings (TEXT)
    pub text: Field,
    /// Full document as JSON (STORED)
    pub body: Field,
}

impl DocumentSchema {
    /// Get the underlying Tantivy schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Create a DocumentSchema from an existing Tantivy Schema
    pub fn from_schema(schema: Schema) -> Result<Self, SearchError> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|_| SearchError::SchemaMismatch(format!("missing {} field", name)))
        };
        let doc_key = field("doc_key")?;
        let doc_type = field("doc_type")?;
        let doc_id = field("doc_id")?;
        let text = field("text")?;
        let body = field("body")?;

        Ok(Self {
            schema,
            doc_key,
            doc_type,
            doc_id,
            text,
            body,
        })
    }
}

/// Build the document schema.
pub fn build_document_schema() -> DocumentSchema {
    let mut schema_builder = Schema::builder();

    let doc_key = schema_builder.add_text_field("doc_key", STRING | STORED);
    let doc_type = schema_builder.add_text_field("doc_type", STRING | STORED);
    let doc_id = schema_builder.add_text_field("doc_id", STRING | STORED);
    let text = schema_builder.add_text_field("text", TEXT);
    let body = schema_builder.add_text_field("body", STORED);

    let schema = schema_builder.build();

    DocumentSchema {
        schema,
        doc_key,
        doc_type,
        doc_id,
        text,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_schema() {
        let schema = build_document_schema();
        for name in ["doc_key", "doc_type", "doc_id", "text", "body"] {
            assert!(schema.schema().get_field(name).is_ok(), "missing {}", name);
        }
    }

    #[test]
    fn test_from_schema() {
        let original = build_document_schema();
        let rebuilt = DocumentSchema::from_schema(original.schema().clone()).unwrap();
        assert_eq!(rebuilt.doc_key, original.doc_key);
        assert_eq!(rebuilt.body, original.body);
    }

    #[test]
    fn test_from_schema_mismatch() {
        let mut builder = Schema::builder();
        builder.add_text_field("doc_key", STRING);
        let err = DocumentSchema::from_schema(builder.build()).unwrap_err();
        assert!(err.to_string().contains("doc_type"));
    }
}
