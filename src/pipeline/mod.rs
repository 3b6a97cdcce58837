//! Session orchestration for multi-part IELTS Speaking tests.
//!
//! # Architecture
//!
//! ```text
//! SessionPart (part1..N)
//!        │
//!        ▼
//! EvaluationSession::run()         ← sequential, one part at a time
//!        │
//!        ├─ IeltsEvaluator::evaluate  → partN_feedback.txt
//!        │     (failure recorded, next part continues)
//!        │
//!        ├─ combine_feedback          → combined_feedback.txt
//!        │
//!        └─ [reference + scorer] ScoreReport::evaluate
//!                                     → evaluation_results.json
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use ielts_speaking_eval::config::AppConfig;
//! use ielts_speaking_eval::llm::{IeltsEvaluator, Rubric};
//! use ielts_speaking_eval::pipeline::{EvaluationSession, SessionPart};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::default();
//!     let rubric = Rubric::from_config(&config.rubric)?;
//!     let evaluator = IeltsEvaluator::from_config(&config.llm, &rubric);
//!
//!     let session = EvaluationSession::new(evaluator, "results/run-1");
//!     let parts = SessionPart::numbered(["part1.mp3", "part2.mp3", "part3.mp3"]);
//!     let summary = session.run(&parts, None).await?;
//!     summary.log();
//!     Ok(())
//! }
//! ```

pub mod output;
pub mod session;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use output::{load_text, save_text};
pub use session::{
    combine_feedback, EvaluationSession, PartResult, SessionError, SessionPart, SessionSummary,
    COMBINED_FEEDBACK_FILE, SCORE_REPORT_FILE,
};
