use crate::error::PipelineError;
use std::time::Duration;

/// Environment variable holding the vector-index service credential.
pub const PINECONE_API_KEY: &str = "PINECONE_API_KEY";
/// Environment variable holding the language-model service credential.
pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";

pub const REQUIRED_ENV_VARS: [&str; 2] = [GOOGLE_API_KEY, PINECONE_API_KEY];

/// Remote index settings. Defaults mirror a serverless index with integrated
/// embedding: the service embeds the field named by `text_field` itself.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Index name. The build phase deletes and recreates it unconditionally.
    pub name: String,
    /// Serverless cloud provider tag.
    pub cloud: String,
    /// Serverless region.
    pub region: String,
    /// Hosted embedding model the index runs over `text_field`.
    pub embedding_model: String,
    /// Record field the service embeds.
    pub text_field: String,
    /// Control-plane base URL.
    pub control_plane_url: String,
    pub readiness: ReadinessPolicy,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: "lanchain".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            embedding_model: "llama-text-embed-v2".to_string(),
            text_field: "chunk_text".to_string(),
            control_plane_url: "https://api.pinecone.io".to_string(),
            readiness: ReadinessPolicy::default(),
        }
    }
}

/// Poll-with-backoff schedule used after structural index operations. The
/// remote service is eventually consistent, so create/delete must settle
/// before writes are issued.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl ReadinessPolicy {
    /// The wait before each poll attempt: doubling from `initial_delay`,
    /// capped at `max_delay`, `max_attempts` entries in total.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        let initial = self.initial_delay;
        let cap = self.max_delay;
        (0..self.max_attempts).map(move |attempt| {
            let factor = 1u32 << attempt.min(16);
            initial.saturating_mul(factor).min(cap)
        })
    }
}

/// Generation settings for the hosted language model.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// API base URL.
    pub endpoint: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.5,
            max_output_tokens: 1024,
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub pinecone_api_key: String,
    pub google_api_key: String,
}

impl Credentials {
    /// Reads both required credentials from the process environment. All
    /// missing names are reported together so the caller can list them.
    pub fn from_env() -> Result<Self, PipelineError> {
        let missing = missing_credentials(|name| std::env::var(name).ok());
        if !missing.is_empty() {
            return Err(PipelineError::MissingCredentials(missing));
        }

        Ok(Self {
            pinecone_api_key: std::env::var(PINECONE_API_KEY).unwrap_or_default(),
            google_api_key: std::env::var(GOOGLE_API_KEY).unwrap_or_default(),
        })
    }
}

/// Names from `REQUIRED_ENV_VARS` the lookup has no non-empty value for.
pub fn missing_credentials(
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<&'static str> {
    REQUIRED_ENV_VARS
        .iter()
        .copied()
        .filter(|&name| {
            lookup(name)
                .map(|value| value.trim().is_empty())
                .unwrap_or(true)
        })
        .collect()
}
