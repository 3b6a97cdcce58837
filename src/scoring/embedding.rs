//! Embedding-similarity scorer.
//!
//! Embeds the candidate and reference through an OpenAI-compatible
//! `/embeddings` endpoint and reports their cosine similarity as
//! `semantic_similarity`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::ScoringConfig;
use crate::scoring::scorer::{FeedbackScorer, ScoreMap, ScoringError};

pub const SEMANTIC_SIMILARITY: &str = "semantic_similarity";

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

pub struct EmbeddingScorer {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl EmbeddingScorer {
    pub fn from_config(config: &ScoringConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.embedding_model.clone(),
            api_key: config.resolve_api_key(),
        }
    }

    /// Embed both texts in one request; returns them in input order.
    async fn embed_pair(&self, a: &str, b: &str) -> Result<(Vec<f32>, Vec<f32>), ScoringError> {
        let url = format!("{}/embeddings", self.base_url);
        let body = json!({
            "input": [a, b],
            "model": self.model,
            "encoding_format": "float"
        });

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ScoringError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| ScoringError::Parse(e.to_string()))?;
        if parsed.data.len() != 2 {
            return Err(ScoringError::Parse(format!(
                "expected 2 embeddings, got {}",
                parsed.data.len()
            )));
        }
        parsed.data.sort_by_key(|d| d.index);
        let second = parsed.data.pop().map(|d| d.embedding).unwrap_or_default();
        let first = parsed.data.pop().map(|d| d.embedding).unwrap_or_default();
        Ok((first, second))
    }
}

#[async_trait]
impl FeedbackScorer for EmbeddingScorer {
    fn name(&self) -> &str {
        "embedding-similarity"
    }

    async fn score(&self, candidate: &str, reference: &str) -> Result<ScoreMap, ScoringError> {
        let (a, b) = self.embed_pair(candidate, reference).await?;
        let mut scores = ScoreMap::new();
        scores.insert(SEMANTIC_SIMILARITY.to_string(), cosine_similarity(&a, &b));
        Ok(scores)
    }
}

/// Cosine similarity; `None` for mismatched lengths or zero-norm vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return None;
    }
    Some(dot / (na.sqrt() * nb.sqrt()))
}
