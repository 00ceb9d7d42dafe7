pub mod chunking;
pub mod config;
pub mod error;
pub mod extractor;
pub mod index;
pub mod llm;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod stores;
pub mod traits;

pub use chunking::{chunk_documents, split_text, ChunkingConfig};
pub use config::{
    missing_credentials, Credentials, IndexConfig, LlmConfig, ReadinessPolicy, GOOGLE_API_KEY,
    PINECONE_API_KEY, REQUIRED_ENV_VARS,
};
pub use error::{IngestError, PipelineError};
pub use extractor::{extract_page_texts, LopdfExtractor, PageText, PdfExtractor};
pub use index::{make_records, IndexManager};
pub use llm::{build_prompt, stuff_context, GeminiClient};
pub use loader::{discover_pdf_files, load_documents};
pub use models::{Chunk, IndexRecord, IndexStats, PageDocument, ScoredRecord};
pub use pipeline::{PipelineOutcome, QaPipeline};
pub use stores::PineconeIndex;
pub use traits::{AnswerModel, RecordIndex};
