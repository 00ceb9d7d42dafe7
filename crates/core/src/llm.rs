use crate::config::LlmConfig;
use crate::error::PipelineError;
use crate::models::ScoredRecord;
use crate::traits::AnswerModel;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Hosted generation client. One synchronous call per question; no retry,
/// no streaming.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    config: LlmConfig,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl AnswerModel for GeminiClient {
    async fn generate(&self, question: &str, context: &str) -> Result<String, PipelineError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: build_prompt(question, context),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::BackendResponse {
                backend: "gemini".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: GenerateResponse = response.json().await?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or_else(|| {
                PipelineError::EmptyGeneration(format!(
                    "model {} returned no candidates",
                    self.config.model
                ))
            })
    }
}

/// Concatenates retrieved texts into one prompt context, in retrieval order.
pub fn stuff_context(hits: &[ScoredRecord]) -> String {
    hits.iter()
        .map(|hit| hit.chunk_text.as_str())
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Context-then-question prompt, answered only from the supplied excerpts.
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "Answer the question using only the following document excerpts.\n\n\
         {context}\n\nQuestion: {question}\nAnswer:"
    )
}

#[cfg(test)]
mod tests {
    use super::{build_prompt, stuff_context};
    use crate::models::ScoredRecord;

    fn hit(id: &str, score: f64, text: &str) -> ScoredRecord {
        ScoredRecord {
            id: id.to_string(),
            score,
            chunk_text: text.to_string(),
            category: Some("budget".to_string()),
        }
    }

    #[test]
    fn context_concatenates_hits_in_retrieval_order() {
        let hits = vec![hit("doc_2", 0.9, "top excerpt"), hit("doc_5", 0.4, "next excerpt")];

        let context = stuff_context(&hits);

        assert_eq!(context, "top excerpt\n\nnext excerpt");
    }

    #[test]
    fn blank_hits_are_dropped_from_context() {
        let hits = vec![hit("doc_0", 0.9, "  "), hit("doc_1", 0.5, "kept")];
        assert_eq!(stuff_context(&hits), "kept");
    }

    #[test]
    fn prompt_contains_context_then_question() {
        let prompt = build_prompt("what is the target?", "excerpt body");

        let context_at = prompt.find("excerpt body").unwrap();
        let question_at = prompt.find("what is the target?").unwrap();
        assert!(context_at < question_at);
        assert!(prompt.ends_with("Answer:"));
    }
}
