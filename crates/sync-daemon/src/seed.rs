//! JSON Lines loader for the record store.
//!
//! Each non-empty line is one row object. An optional `meta` array holds
//! metadata rows as `{"meta_id": .., "key": .., "value": ..}`.

use std::io::BufRead;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use sync_storage::RecordWriter;
use sync_types::{RawRecord, RecordId, META_FIELD};

#[derive(Debug, Deserialize)]
struct MetaRow {
    meta_id: Value,
    key: String,
    value: Value,
}

/// Counts from one load.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedStats {
    pub records: usize,
    pub metadata: usize,
}

/// Load rows of `doc_type` from `reader` into `writer`.
pub fn seed_records(
    writer: &dyn RecordWriter,
    doc_type: &str,
    primary_key: &str,
    reader: impl BufRead,
) -> Result<SeedStats> {
    let mut stats = SeedStats::default();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("Failed to read line {}", line_no))?;
        if line.trim().is_empty() {
            continue;
        }

        let mut row: RawRecord = serde_json::from_str(&line)
            .with_context(|| format!("Line {} is not a JSON object", line_no))?;
        let Some(id) = row.get(primary_key).and_then(RecordId::from_value) else {
            bail!("Line {} has no usable {}", line_no, primary_key);
        };

        let meta_rows: Vec<MetaRow> = match row.remove(META_FIELD) {
            Some(meta) => serde_json::from_value(meta)
                .with_context(|| format!("Line {} has malformed meta", line_no))?,
            None => Vec::new(),
        };

        writer.put_record(doc_type, &id, &row)?;
        stats.records += 1;

        for meta in meta_rows {
            let Some(meta_id) = RecordId::from_value(&meta.meta_id) else {
                bail!("Line {} has a metadata row without meta_id", line_no);
            };
            writer.put_metadata(doc_type, &id, &meta_id, &meta.key, meta.value)?;
            stats.metadata += 1;
        }
        debug!(doc_type, id = %id, "Seeded record");
    }

    info!(
        doc_type,
        records = stats.records,
        metadata = stats.metadata,
        "Seed complete"
    );
    Ok(stats)
}
