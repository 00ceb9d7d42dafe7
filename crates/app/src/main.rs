use chrono::Utc;
use clap::Parser;
use pdf_answer_core::{
    ChunkingConfig, Credentials, GeminiClient, IndexConfig, IndexManager, LlmConfig,
    PineconeIndex, PipelineOutcome, QaPipeline,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-answer", version)]
struct Cli {
    /// Folder that contains PDFs, scanned recursively.
    #[arg(long, default_value = "./documents")]
    folder: PathBuf,

    /// Question answered over the folder's contents.
    #[arg(
        long,
        default_value = "How much the agriculture target will be increased by how many crore?"
    )]
    question: String,

    /// Vector index name. The run deletes and recreates it.
    #[arg(long, default_value = "lanchain")]
    index_name: String,

    /// Namespace written to and queried within the index.
    #[arg(long, default_value = "default")]
    namespace: String,

    /// Maximum characters per chunk.
    #[arg(long, default_value_t = 800)]
    chunk_size: usize,

    /// Characters shared between consecutive chunks.
    #[arg(long, default_value_t = 50)]
    chunk_overlap: usize,

    /// Records per upsert request.
    #[arg(long, default_value_t = 50)]
    batch_size: usize,

    /// Number of records retrieved per query.
    #[arg(long, default_value_t = 2)]
    top_k: usize,

    /// Category tag stamped onto every record.
    #[arg(long, default_value = "budget")]
    category: String,

    /// Serverless cloud for index creation.
    #[arg(long, default_value = "aws")]
    cloud: String,

    /// Serverless region for index creation.
    #[arg(long, default_value = "us-east-1")]
    region: String,

    /// Hosted embedding model the index runs over record text.
    #[arg(long, default_value = "llama-text-embed-v2")]
    embedding_model: String,

    /// Vector-index control-plane base URL.
    #[arg(long, default_value = "https://api.pinecone.io")]
    pinecone_url: String,

    /// Generation model.
    #[arg(long, default_value = "gemini-2.0-flash")]
    model: String,

    /// Generation sampling temperature.
    #[arg(long, default_value_t = 0.5)]
    temperature: f32,

    /// Language-model API base URL.
    #[arg(long, default_value = "https://generativelanguage.googleapis.com")]
    gemini_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let credentials = match Credentials::from_env() {
        Ok(credentials) => credentials,
        Err(error) => {
            eprintln!("Error: {error}");
            eprintln!("Please provide the API keys via the environment or a .env file.");
            std::process::exit(1);
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "pdf-answer boot"
    );

    let chunking = ChunkingConfig::new(cli.chunk_size, cli.chunk_overlap)?;

    let index_config = IndexConfig {
        name: cli.index_name,
        cloud: cli.cloud,
        region: cli.region,
        embedding_model: cli.embedding_model,
        control_plane_url: cli.pinecone_url,
        ..IndexConfig::default()
    };

    let llm_config = LlmConfig {
        model: cli.model,
        temperature: cli.temperature,
        endpoint: cli.gemini_url,
        ..LlmConfig::default()
    };

    let store = PineconeIndex::new(credentials.pinecone_api_key, index_config)?;
    let index = IndexManager::new(store, cli.namespace, cli.category, cli.batch_size);
    let model = GeminiClient::new(credentials.google_api_key, llm_config);

    let pipeline = QaPipeline::new(index, model, chunking, cli.top_k);

    match pipeline.run(&cli.folder, &cli.question).await? {
        PipelineOutcome::NoDocuments => {
            println!(
                "No documents found in {}. Please check the directory path.",
                cli.folder.display()
            );
        }
        PipelineOutcome::Answered {
            answer,
            hits,
            documents,
            chunks,
        } => {
            info!(documents, chunks, hits = hits.len(), "pipeline finished");
            for hit in &hits {
                println!("[{}] score={:.4}", hit.id, hit.score);
            }
            println!("Answer: {answer}");
        }
    }

    Ok(())
}
