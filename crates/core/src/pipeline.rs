use crate::chunking::{chunk_documents, ChunkingConfig};
use crate::error::PipelineError;
use crate::index::IndexManager;
use crate::llm::stuff_context;
use crate::loader::load_documents;
use crate::models::{PageDocument, ScoredRecord};
use crate::traits::{AnswerModel, RecordIndex};
use std::path::Path;
use tracing::info;

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// The folder held no loadable documents; nothing touched the index.
    NoDocuments,
    Answered {
        answer: String,
        hits: Vec<ScoredRecord>,
        documents: usize,
        chunks: usize,
    },
}

/// The linear question-answering pipeline: load, chunk, rebuild the index,
/// retrieve, generate. Every stage blocks until its remote call completes;
/// dependencies are passed in explicitly.
pub struct QaPipeline<S: RecordIndex, M: AnswerModel> {
    index: IndexManager<S>,
    model: M,
    chunking: ChunkingConfig,
    top_k: usize,
}

impl<S, M> QaPipeline<S, M>
where
    S: RecordIndex + Send + Sync,
    M: AnswerModel + Send + Sync,
{
    pub fn new(index: IndexManager<S>, model: M, chunking: ChunkingConfig, top_k: usize) -> Self {
        Self {
            index,
            model,
            chunking,
            top_k,
        }
    }

    pub async fn run(
        &self,
        folder: &Path,
        question: &str,
    ) -> Result<PipelineOutcome, PipelineError> {
        info!(folder = %folder.display(), "loading documents");
        let documents = load_documents(folder);
        self.run_documents(&documents, question).await
    }

    /// Runs the pipeline over already-loaded documents. Split out from `run`
    /// so the stages past loading can be driven without PDF fixtures.
    pub async fn run_documents(
        &self,
        documents: &[PageDocument],
        question: &str,
    ) -> Result<PipelineOutcome, PipelineError> {
        info!(documents = documents.len(), "documents loaded");

        if documents.is_empty() {
            return Ok(PipelineOutcome::NoDocuments);
        }

        info!("chunking documents");
        let chunks = chunk_documents(documents, &self.chunking)?;
        info!(chunks = chunks.len(), "documents chunked");

        if chunks.is_empty() {
            return Ok(PipelineOutcome::NoDocuments);
        }

        info!("rebuilding index");
        self.index.rebuild(&chunks).await?;

        info!(question, top_k = self.top_k, "querying index");
        let hits = self.index.query(question, self.top_k).await?;
        info!(hits = hits.len(), "records retrieved");

        let context = stuff_context(&hits);
        info!("generating answer");
        let answer = self.model.generate(question, &context).await?;

        Ok(PipelineOutcome::Answered {
            answer,
            hits,
            documents: documents.len(),
            chunks: chunks.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{PipelineOutcome, QaPipeline};
    use crate::chunking::ChunkingConfig;
    use crate::error::PipelineError;
    use crate::index::IndexManager;
    use crate::models::{IndexRecord, IndexStats, PageDocument, ScoredRecord};
    use crate::traits::{AnswerModel, RecordIndex};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeIndex {
        reset_called: Arc<AtomicBool>,
        upserted: Arc<Mutex<Vec<IndexRecord>>>,
        hits: Vec<ScoredRecord>,
    }

    #[async_trait]
    impl RecordIndex for FakeIndex {
        async fn reset(&self) -> Result<(), PipelineError> {
            self.reset_called.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn upsert_records(
            &self,
            _namespace: &str,
            records: &[IndexRecord],
        ) -> Result<(), PipelineError> {
            self.upserted.lock().unwrap().extend_from_slice(records);
            Ok(())
        }

        async fn search_records(
            &self,
            _namespace: &str,
            _text: &str,
            top_k: usize,
        ) -> Result<Vec<ScoredRecord>, PipelineError> {
            let mut hits = self.hits.clone();
            hits.sort_by(|left, right| right.score.total_cmp(&left.score));
            hits.truncate(top_k);
            Ok(hits)
        }

        async fn describe_stats(&self) -> Result<IndexStats, PipelineError> {
            let total = self.upserted.lock().unwrap().len() as u64;
            Ok(IndexStats {
                total_records: total,
                namespaces: Default::default(),
            })
        }
    }

    struct FakeModel;

    #[async_trait]
    impl AnswerModel for FakeModel {
        async fn generate(
            &self,
            question: &str,
            context: &str,
        ) -> Result<String, PipelineError> {
            Ok(format!("q={question};ctx={context}"))
        }
    }

    fn page(text: &str) -> PageDocument {
        PageDocument {
            document_id: "doc-1".to_string(),
            title: "doc-1.pdf".to_string(),
            source_path: "/tmp/doc-1.pdf".to_string(),
            checksum: "checksum".to_string(),
            page: 1,
            text: text.to_string(),
            loaded_at: Utc::now(),
        }
    }

    fn scored(id: &str, score: f64, text: &str) -> ScoredRecord {
        ScoredRecord {
            id: id.to_string(),
            score,
            chunk_text: text.to_string(),
            category: None,
        }
    }

    fn pipeline(
        fake: FakeIndex,
        top_k: usize,
    ) -> QaPipeline<FakeIndex, FakeModel> {
        let index = IndexManager::new(fake, "default", "budget", 50);
        QaPipeline::new(index, FakeModel, ChunkingConfig::default(), top_k)
    }

    #[tokio::test]
    async fn empty_document_set_short_circuits_before_index_build() {
        let reset_called = Arc::new(AtomicBool::new(false));
        let fake = FakeIndex {
            reset_called: reset_called.clone(),
            ..Default::default()
        };

        let outcome = pipeline(fake, 2)
            .run_documents(&[], "any question")
            .await
            .expect("empty input is not an error");

        assert!(matches!(outcome, PipelineOutcome::NoDocuments));
        assert!(!reset_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn whitespace_only_documents_short_circuit_too() {
        let reset_called = Arc::new(AtomicBool::new(false));
        let fake = FakeIndex {
            reset_called: reset_called.clone(),
            ..Default::default()
        };

        let outcome = pipeline(fake, 2)
            .run_documents(&[page("   \n\n  ")], "any question")
            .await
            .expect("blank input is not an error");

        assert!(matches!(outcome, PipelineOutcome::NoDocuments));
        assert!(!reset_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn top_k_limits_and_orders_retrieved_records() {
        let fake = FakeIndex {
            hits: vec![
                scored("doc_0", 0.10, "a"),
                scored("doc_1", 0.90, "b"),
                scored("doc_2", 0.50, "c"),
                scored("doc_3", 0.70, "d"),
                scored("doc_4", 0.30, "e"),
            ],
            ..Default::default()
        };

        let outcome = pipeline(fake, 2)
            .run_documents(&[page("Some page text to index.")], "test")
            .await
            .expect("pipeline should succeed");

        let PipelineOutcome::Answered { hits, .. } = outcome else {
            panic!("expected an answer");
        };
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "doc_1");
        assert_eq!(hits[1].id, "doc_3");
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn answer_is_generated_from_retrieved_context() {
        let upserted = Arc::new(Mutex::new(Vec::new()));
        let fake = FakeIndex {
            upserted: upserted.clone(),
            hits: vec![scored("doc_0", 0.9, "retrieved excerpt")],
            ..Default::default()
        };

        let outcome = pipeline(fake, 2)
            .run_documents(&[page("Some page text to index.")], "what is it?")
            .await
            .expect("pipeline should succeed");

        let PipelineOutcome::Answered {
            answer,
            documents,
            chunks,
            ..
        } = outcome
        else {
            panic!("expected an answer");
        };

        assert_eq!(answer, "q=what is it?;ctx=retrieved excerpt");
        assert_eq!(documents, 1);
        assert_eq!(chunks, 1);

        let records = upserted.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "doc_0");
        assert_eq!(records[0].chunk_text, "Some page text to index.");
    }
}
