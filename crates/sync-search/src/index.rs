//! The document index shared by the indexer and the searcher.

use std::path::Path;

use tantivy::directory::MmapDirectory;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyError};
use tracing::{debug, info};

use sync_types::IndexSettings;

use crate::error::SearchError;
use crate::schema::{build_document_schema, DocumentSchema};

const BYTES_PER_MB: usize = 1024 * 1024;

/// Tantivy index holding the normalized documents of every content type.
pub struct SearchIndex {
    index: Index,
    schema: DocumentSchema,
    writer_memory_mb: usize,
}

impl SearchIndex {
    /// Open the index under `path`, creating an empty one on first use.
    ///
    /// An index written with a different schema is rejected rather than
    /// silently reused.
    pub fn open(path: &Path, settings: &IndexSettings) -> Result<Self, SearchError> {
        std::fs::create_dir_all(path)?;
        let directory = MmapDirectory::open(path).map_err(TantivyError::from)?;
        let index = Index::open_or_create(directory, build_document_schema().schema().clone())
            .map_err(|e| match e {
                TantivyError::SchemaError(msg) => SearchError::SchemaMismatch(msg),
                other => SearchError::Tantivy(other),
            })?;

        info!(path = %path.display(), "Opened document index");
        Self::from_index(index, settings)
    }

    /// Throwaway index held in RAM, with default settings.
    pub fn in_memory() -> Self {
        let schema = build_document_schema();
        Self {
            index: Index::create_in_ram(schema.schema().clone()),
            schema,
            writer_memory_mb: IndexSettings::default().writer_memory_mb,
        }
    }

    fn from_index(index: Index, settings: &IndexSettings) -> Result<Self, SearchError> {
        let schema = DocumentSchema::from_schema(index.schema())?;
        Ok(Self {
            index,
            schema,
            writer_memory_mb: settings.writer_memory_mb,
        })
    }

    /// Field handles of the document schema.
    pub fn schema(&self) -> &DocumentSchema {
        &self.schema
    }

    pub(crate) fn index(&self) -> &Index {
        &self.index
    }

    pub(crate) fn writer(&self) -> Result<IndexWriter, SearchError> {
        let writer = self.index.writer(self.writer_memory_mb * BYTES_PER_MB)?;
        debug!(memory_mb = self.writer_memory_mb, "Created index writer");
        Ok(writer)
    }

    /// Readers only see new commits after an explicit reload.
    pub(crate) fn reader(&self) -> Result<IndexReader, SearchError> {
        Ok(self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?)
    }
}
