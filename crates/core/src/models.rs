use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One page of a loaded PDF. Produced by the loader, consumed by the chunker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDocument {
    pub document_id: String,
    pub title: String,
    pub source_path: String,
    pub checksum: String,
    pub page: u32,
    pub text: String,
    pub loaded_at: DateTime<Utc>,
}

/// A bounded-length segment of a page's text. `sequence` is the chunk's
/// position across the whole load, assigned in document order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub document_id: String,
    pub source_path: String,
    pub page: u32,
    pub sequence: u64,
    pub text: String,
}

/// The remote-store representation of a chunk. The index service embeds
/// `chunk_text` itself, so no vector is carried locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub chunk_text: String,
    pub category: String,
}

/// A similarity-query hit, flattened from the index response. Ordering and
/// scoring are the remote service's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub id: String,
    pub score: f64,
    pub chunk_text: String,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_records: u64,
    pub namespaces: BTreeMap<String, u64>,
}
