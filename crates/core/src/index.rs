use crate::error::PipelineError;
use crate::models::{Chunk, IndexRecord, IndexStats, ScoredRecord};
use crate::traits::RecordIndex;
use tracing::{error, info};

/// Owns the remote index for the duration of a run: rebuilds it from chunks
/// and serves queries against its namespace. Concurrent runs against the same
/// index name would race destructively; single-writer use is assumed.
pub struct IndexManager<S: RecordIndex> {
    store: S,
    namespace: String,
    category: String,
    batch_size: usize,
}

impl<S: RecordIndex + Send + Sync> IndexManager<S> {
    pub fn new(
        store: S,
        namespace: impl Into<String>,
        category: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            category: category.into(),
            batch_size: batch_size.max(1),
        }
    }

    /// Deletes and recreates the index, then upserts all chunks in batches.
    /// Any setup or upsert failure is fatal; there is no partial fallback.
    pub async fn rebuild(&self, chunks: &[Chunk]) -> Result<IndexStats, PipelineError> {
        if let Err(reset_error) = self.store.reset().await {
            error!(
                reason = %reset_error,
                "index setup failed; verify the API key and that the index \
                 name and region are correct"
            );
            return Err(reset_error);
        }

        let records = make_records(chunks, &self.category);
        let batch_count = records.len().div_ceil(self.batch_size);

        for (number, batch) in records.chunks(self.batch_size).enumerate() {
            info!(
                batch = number + 1,
                of = batch_count,
                size = batch.len(),
                "upserting batch"
            );

            if let Err(upsert_error) = self.store.upsert_records(&self.namespace, batch).await {
                error!(
                    batch = number + 1,
                    size = batch.len(),
                    reason = %upsert_error,
                    "batch upsert failed; verify the API key and index \
                     availability, then retry this batch"
                );
                return Err(upsert_error);
            }
        }

        info!(records = records.len(), namespace = %self.namespace, "upsert complete");

        let stats = self.store.describe_stats().await?;
        info!(total_records = stats.total_records, "index stats");
        Ok(stats)
    }

    /// Top-k similarity query against the managed namespace. Ordering and
    /// scoring are the remote service's; nothing is re-ranked locally.
    pub async fn query(
        &self,
        text: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredRecord>, PipelineError> {
        self.store
            .search_records(&self.namespace, text, top_k)
            .await
    }
}

/// One record per chunk, in order, with position-based ids `doc_0 .. doc_{n-1}`.
/// Ids are unique and stable within a single build.
pub fn make_records(chunks: &[Chunk], category: &str) -> Vec<IndexRecord> {
    chunks
        .iter()
        .enumerate()
        .map(|(position, chunk)| IndexRecord {
            id: format!("doc_{position}"),
            chunk_text: chunk.text.clone(),
            category: category.to_string(),
        })
        .collect()
}
