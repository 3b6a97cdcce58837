//! Secondary scoring of generated feedback against a human reference.
//!
//! * [`FeedbackScorer`]: async trait for scorer backends.
//! * [`EmbeddingScorer`]: cosine similarity of OpenAI-compatible embeddings.
//! * [`ScoreReport`]: captures scores or the scorer's failure, saved as JSON.

pub mod embedding;
pub mod report;
pub mod scorer;

pub use embedding::{cosine_similarity, EmbeddingScorer, SEMANTIC_SIMILARITY};
pub use report::{ReportStatus, ScoreReport, ScoredSample, EVALUATION_QUESTION};
pub use scorer::{normalize, FeedbackScorer, ScoreMap, ScoringError};
