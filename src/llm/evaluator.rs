//! Call boundary for one audio evaluation.
//!
//! [`IeltsEvaluator`] builds the request, opens the stream, aggregates it,
//! and converts any failure into an [`EvaluationFailed`] so callers can tell
//! "the model produced empty feedback" apart from "the call failed".

use std::sync::Arc;

use thiserror::Error;

use crate::config::LlmConfig;
use crate::llm::aggregator::{AggregatedResult, StreamingResponseAggregator};
use crate::llm::audio::AudioReference;
use crate::llm::endpoint::{ApiEndpoint, CompletionEndpoint, LlmError};
use crate::llm::prompt::{EvaluationRequest, PromptBuilder};
use crate::llm::rubric::Rubric;

/// An evaluation that did not produce a result. Partial output is discarded.
#[derive(Debug, Error)]
#[error("evaluation of {locator} failed: {source}")]
pub struct EvaluationFailed {
    pub locator: String,
    #[source]
    pub source: LlmError,
}

/// Scores IELTS Speaking recordings through a streaming endpoint.
pub struct IeltsEvaluator {
    endpoint: Arc<dyn CompletionEndpoint>,
    prompt_builder: PromptBuilder,
    model: String,
}

impl IeltsEvaluator {
    pub fn new(
        endpoint: Arc<dyn CompletionEndpoint>,
        prompt_builder: PromptBuilder,
        model: impl Into<String>,
    ) -> Self {
        Self {
            endpoint,
            prompt_builder,
            model: model.into(),
        }
    }

    /// Evaluator backed by [`ApiEndpoint`] with the configured model.
    pub fn from_config(config: &LlmConfig, rubric: &Rubric) -> Self {
        Self::new(
            Arc::new(ApiEndpoint::from_config(config)),
            PromptBuilder::new(rubric),
            config.model.clone(),
        )
    }

    /// Same endpoint and rubric, different model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Evaluate the clip at `locator`.
    pub async fn evaluate(&self, locator: &str) -> Result<AggregatedResult, EvaluationFailed> {
        log::info!("Evaluating audio: {locator}");
        let request = self.prompt_builder.build(AudioReference::new(locator));

        match self.run(&request).await {
            Ok(result) => {
                if let Some(usage) = &result.usage {
                    log::info!(
                        "Usage: prompt={:?} completion={:?} total={:?}",
                        usage.prompt_tokens,
                        usage.completion_tokens,
                        usage.total_tokens
                    );
                }
                log::debug!("Feedback length: {} chars", result.text.len());
                Ok(result)
            }
            Err(source) => {
                log::error!("Evaluation of {locator} failed: {source}");
                Err(EvaluationFailed {
                    locator: locator.to_string(),
                    source,
                })
            }
        }
    }

    async fn run(&self, request: &EvaluationRequest) -> Result<AggregatedResult, LlmError> {
        let stream = self.endpoint.stream(request, &self.model).await?;
        log::info!("Streaming response from {}", self.model);
        StreamingResponseAggregator::new().consume(stream).await
    }

    /// Evaluate and return only the text; failures yield `""` after logging.
    pub async fn evaluate_text(&self, locator: &str) -> String {
        self.evaluate(locator)
            .await
            .map(|result| result.text)
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
