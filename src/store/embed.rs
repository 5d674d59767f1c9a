// src/store/embed.rs
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{AdvisorError, Result};

#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn dimensions(&self) -> usize;
}

/// OpenAI embeddings API. Shares the chat model's API key.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
    dims: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

impl OpenAiEmbedder {
    pub fn new(cfg: &EmbeddingConfig, llm: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| AdvisorError::Embedding {
                message: format!("building http client: {e}"),
            })?;
        Ok(Self {
            client,
            api_key: llm.api_key.clone().filter(|k| !k.is_empty()),
            model: cfg.model.clone(),
            endpoint: cfg.endpoint.clone(),
            dims: cfg.dimension,
        })
    }
}

fn parse_embedding(body: &str) -> Result<Vec<f32>> {
    let parsed: EmbeddingResponse =
        serde_json::from_str(body).map_err(|e| AdvisorError::Embedding {
            message: format!("parsing embedding response: {e}"),
        })?;
    parsed
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .ok_or_else(|| AdvisorError::Embedding {
            message: "embedding response had no data".to_string(),
        })
}

#[async_trait::async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(AdvisorError::Credential { service: "OpenAI" })?;
        debug!(model = %self.model, chars = text.len(), "requesting embedding");

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| AdvisorError::Embedding {
                message: format!("request failed: {e}"),
            })?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| AdvisorError::Embedding {
            message: format!("reading body: {e}"),
        })?;
        if !status.is_success() {
            return Err(AdvisorError::Embedding {
                message: format!("provider returned {status}"),
            });
        }
        parse_embedding(&body)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Deterministic bag-of-words embedder (feature hashing, L2-normalized).
/// Lets the store run offline and in tests.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for tok in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(tok.to_lowercase().as_bytes());
            let mut b = [0u8; 8];
            b.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(b) % self.dims as u64) as usize;
            v[bucket] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

#[async_trait::async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}
