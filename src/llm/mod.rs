//! LLM evaluation module.
//!
//! This module provides:
//! * [`AudioReference`]: audio locator with derived format tag.
//! * [`Rubric`]: the grading rubric asset, loaded once.
//! * [`PromptBuilder`] / [`EvaluationRequest`]: multimodal request assembly.
//! * [`ResponseFragment`]: typed stream chunks decoded at the transport boundary.
//! * [`SseDecoder`]: incremental server-sent-events framing.
//! * [`StreamingResponseAggregator`]: reduces fragments to one text result.
//! * [`CompletionEndpoint`] / [`ApiEndpoint`]: the streaming chat-completions client.
//! * [`IeltsEvaluator`]: end-to-end evaluation of one clip.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use ielts_speaking_eval::config::AppConfig;
//! use ielts_speaking_eval::llm::{IeltsEvaluator, Rubric};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let rubric = Rubric::from_config(&config.rubric).unwrap();
//!     let evaluator = IeltsEvaluator::from_config(&config.llm, &rubric);
//!
//!     match evaluator.evaluate("https://example.org/part_1.mp3").await {
//!         Ok(result) => println!("{}", result.text),
//!         Err(e) => eprintln!("{e}"),
//!     }
//! }
//! ```

pub mod aggregator;
pub mod audio;
pub mod endpoint;
pub mod evaluator;
pub mod fragment;
pub mod prompt;
pub mod rubric;
pub mod sse;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use aggregator::{AggregatedResult, StreamingResponseAggregator};
pub use audio::AudioReference;
pub use endpoint::{fragment_stream, ApiEndpoint, CompletionEndpoint, FragmentStream, LlmError};
pub use evaluator::{EvaluationFailed, IeltsEvaluator};
pub use fragment::{DeltaItem, FragmentDelta, ResponseFragment, Usage};
pub use prompt::{ChatMessage, ContentItem, EvaluationRequest, InputAudio, PromptBuilder, Role};
pub use rubric::{Rubric, RubricError, RubricSource};
pub use sse::{SseDecoder, SseEvent};
