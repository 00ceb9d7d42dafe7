use crate::error::PipelineError;
use crate::models::{IndexRecord, IndexStats, ScoredRecord};
use async_trait::async_trait;

/// A remote vector index with integrated embedding. `reset` is structural
/// (delete-if-present, recreate, wait for readiness); the record operations
/// are scoped to a namespace.
#[async_trait]
pub trait RecordIndex {
    async fn reset(&self) -> Result<(), PipelineError>;

    async fn upsert_records(
        &self,
        namespace: &str,
        records: &[IndexRecord],
    ) -> Result<(), PipelineError>;

    async fn search_records(
        &self,
        namespace: &str,
        text: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredRecord>, PipelineError>;

    async fn describe_stats(&self) -> Result<IndexStats, PipelineError>;
}

/// A hosted text-generation model.
#[async_trait]
pub trait AnswerModel {
    async fn generate(&self, question: &str, context: &str) -> Result<String, PipelineError>;
}
