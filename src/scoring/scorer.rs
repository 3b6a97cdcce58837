//! The secondary-evaluator seam.
//!
//! A [`FeedbackScorer`] compares generated feedback with a human reference
//! and returns named metrics. Metrics that could not be computed are `None`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

/// Metric name → value. `None` marks an undefined metric.
pub type ScoreMap = BTreeMap<String, Option<f64>>;

/// Errors raised by scorer backends.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("scorer request failed: {0}")]
    Request(String),

    #[error("scorer returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected scorer response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ScoringError {
    fn from(e: reqwest::Error) -> Self {
        ScoringError::Request(e.to_string())
    }
}

/// Scores candidate feedback against a reference text.
#[async_trait]
pub trait FeedbackScorer: Send + Sync {
    /// Short backend name recorded in reports.
    fn name(&self) -> &str;

    async fn score(&self, candidate: &str, reference: &str) -> Result<ScoreMap, ScoringError>;
}

/// Map non-finite values to `None`.
pub fn normalize(scores: ScoreMap) -> ScoreMap {
    scores
        .into_iter()
        .map(|(k, v)| (k, v.filter(|x| x.is_finite())))
        .collect()
}
