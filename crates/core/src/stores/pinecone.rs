use crate::config::IndexConfig;
use crate::error::PipelineError;
use crate::models::{IndexRecord, IndexStats, ScoredRecord};
use crate::traits::RecordIndex;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::info;
use url::Url;

const API_VERSION: &str = "2025-01";

/// Client for a serverless vector-index service with integrated embedding.
/// Control-plane calls (list/create/delete/describe) go to the configured
/// base URL; record reads and writes go to the per-index data host that
/// `describe` reports once the index is ready.
pub struct PineconeIndex {
    client: Client,
    api_key: String,
    control_url: Url,
    config: IndexConfig,
    host: RwLock<Option<String>>,
}

impl PineconeIndex {
    pub fn new(api_key: impl Into<String>, config: IndexConfig) -> Result<Self, PipelineError> {
        let control_url = Url::parse(&config.control_plane_url)?;

        Ok(Self {
            client: Client::new(),
            api_key: api_key.into(),
            control_url,
            config,
            host: RwLock::new(None),
        })
    }

    fn control_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.control_url.as_str().trim_end_matches('/'), path)
    }

    async fn index_exists(&self) -> Result<bool, PipelineError> {
        let response = self
            .client
            .get(self.control_endpoint("/indexes"))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-Api-Version", API_VERSION)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::BackendResponse {
                backend: "pinecone".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let listed = parsed
            .pointer("/indexes")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(listed.iter().any(|index| {
            index.pointer("/name").and_then(Value::as_str) == Some(self.config.name.as_str())
        }))
    }

    async fn delete_index(&self) -> Result<(), PipelineError> {
        let response = self
            .client
            .delete(self.control_endpoint(&format!("/indexes/{}", self.config.name)))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-Api-Version", API_VERSION)
            .send()
            .await?;

        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            return Err(PipelineError::BackendResponse {
                backend: "pinecone".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }

    async fn create_index(&self) -> Result<(), PipelineError> {
        let response = self
            .client
            .post(self.control_endpoint("/indexes/create-for-model"))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-Api-Version", API_VERSION)
            .json(&json!({
                "name": self.config.name,
                "cloud": self.config.cloud,
                "region": self.config.region,
                "embed": {
                    "model": self.config.embedding_model,
                    "field_map": { "text": self.config.text_field },
                },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::BackendResponse {
                backend: "pinecone".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }

    /// `None` when the index does not exist; otherwise its data host and
    /// whether it is ready for reads and writes.
    async fn describe_index(&self) -> Result<Option<(String, bool)>, PipelineError> {
        let response = self
            .client
            .get(self.control_endpoint(&format!("/indexes/{}", self.config.name)))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-Api-Version", API_VERSION)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(PipelineError::BackendResponse {
                backend: "pinecone".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let host = parsed
            .pointer("/host")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let ready = parsed
            .pointer("/status/ready")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(Some((host, ready)))
    }

    async fn wait_until_deleted(&self) -> Result<(), PipelineError> {
        for delay in self.config.readiness.delays() {
            tokio::time::sleep(delay).await;
            if !self.index_exists().await? {
                return Ok(());
            }
        }

        Err(PipelineError::NotReady(format!(
            "index '{}' was not deleted within the poll budget",
            self.config.name
        )))
    }

    async fn wait_until_ready(&self) -> Result<String, PipelineError> {
        for delay in self.config.readiness.delays() {
            tokio::time::sleep(delay).await;
            if let Some((host, true)) = self.describe_index().await? {
                if !host.is_empty() {
                    return Ok(host);
                }
            }
        }

        Err(PipelineError::NotReady(format!(
            "index '{}' did not become ready; verify the API key and that the \
             index exists in region {}",
            self.config.name, self.config.region
        )))
    }

    async fn data_endpoint(&self, path: &str) -> Result<String, PipelineError> {
        if let Some(host) = self.host.read().await.clone() {
            return Ok(format!("https://{host}{path}"));
        }

        let (host, ready) = self.describe_index().await?.ok_or_else(|| {
            PipelineError::NotReady(format!("index '{}' does not exist", self.config.name))
        })?;

        if !ready || host.is_empty() {
            return Err(PipelineError::NotReady(format!(
                "index '{}' is not ready yet",
                self.config.name
            )));
        }

        *self.host.write().await = Some(host.clone());
        Ok(format!("https://{host}{path}"))
    }
}

#[async_trait]
impl RecordIndex for PineconeIndex {
    async fn reset(&self) -> Result<(), PipelineError> {
        if self.index_exists().await? {
            info!(index = %self.config.name, "deleting existing index");
            self.delete_index().await?;
            self.wait_until_deleted().await?;
        }

        info!(index = %self.config.name, model = %self.config.embedding_model,
            "creating index with integrated embedding");
        self.create_index().await?;

        let host = self.wait_until_ready().await?;
        *self.host.write().await = Some(host);
        Ok(())
    }

    async fn upsert_records(
        &self,
        namespace: &str,
        records: &[IndexRecord],
    ) -> Result<(), PipelineError> {
        if records.is_empty() {
            return Ok(());
        }

        let endpoint = self
            .data_endpoint(&format!("/records/namespaces/{namespace}/upsert"))
            .await?;
        let payload = ndjson_body(records)?;

        let response = self
            .client
            .post(endpoint)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-Api-Version", API_VERSION)
            .header("Content-Type", "application/x-ndjson")
            .body(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::BackendResponse {
                backend: "pinecone".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }

    async fn search_records(
        &self,
        namespace: &str,
        text: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredRecord>, PipelineError> {
        let endpoint = self
            .data_endpoint(&format!("/records/namespaces/{namespace}/search"))
            .await?;

        let response = self
            .client
            .post(endpoint)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-Api-Version", API_VERSION)
            .json(&json!({
                "query": {
                    "top_k": top_k,
                    "inputs": { "text": text },
                },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::BackendResponse {
                backend: "pinecone".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        Ok(flatten_hits(&parsed))
    }

    async fn describe_stats(&self) -> Result<IndexStats, PipelineError> {
        let endpoint = self.data_endpoint("/describe_index_stats").await?;

        let response = self
            .client
            .post(endpoint)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-Api-Version", API_VERSION)
            .json(&json!({}))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PipelineError::BackendResponse {
                backend: "pinecone".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        Ok(parse_stats(&parsed))
    }
}

fn ndjson_body(records: &[IndexRecord]) -> Result<String, PipelineError> {
    let lines = records
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, serde_json::Error>>()?;
    Ok(lines.join("\n") + "\n")
}

/// Flattens a search response into hits, preserving the service's descending
/// score order.
fn flatten_hits(parsed: &Value) -> Vec<ScoredRecord> {
    let hits = parsed
        .pointer("/result/hits")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    hits.iter()
        .map(|hit| ScoredRecord {
            id: hit
                .pointer("/_id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            score: hit
                .pointer("/_score")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            chunk_text: hit
                .pointer("/fields/chunk_text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            category: hit
                .pointer("/fields/category")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
        .collect()
}

fn parse_stats(parsed: &Value) -> IndexStats {
    let total_records = parsed
        .pointer("/totalRecordCount")
        .or_else(|| parsed.pointer("/totalVectorCount"))
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let mut namespaces = BTreeMap::new();
    if let Some(listed) = parsed.pointer("/namespaces").and_then(Value::as_object) {
        for (name, detail) in listed {
            let count = detail
                .pointer("/recordCount")
                .or_else(|| detail.pointer("/vectorCount"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            namespaces.insert(name.clone(), count);
        }
    }

    IndexStats {
        total_records,
        namespaces,
    }
}
